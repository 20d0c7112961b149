//! Song generation tools: prompt mode, custom mode and local media checks.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::modules::request::{
    CustomRequest, DEFAULT_STYLE_WEIGHT, DEFAULT_TAGS, DEFAULT_WEIRDNESS, GenerationRequest,
    PromptRequest, VocalGender,
};
use crate::modules::task::{GenerationOutcome, TaskOptions, run_generation};
use crate::paths::validate_input_file;
use crate::tools::spec::{
    ToolCapability, ToolContext, ToolError, ToolResult, ToolSpec, optional_bool, optional_f64,
    optional_str, required_str,
};

// === Helpers ===

async fn run_and_report(
    request: GenerationRequest,
    input: &Value,
    context: &ToolContext,
) -> ToolResult {
    let options = TaskOptions {
        output_directory: optional_str(input, "output_directory").map(str::to_string),
        show_progress: false,
    };
    match run_generation(&context.config, &request, &options).await {
        Ok(outcome) => outcome_result(&outcome),
        Err(failure) => ToolResult::error(failure.to_string())
            .with_metadata(json!({ "phase": failure.phase.to_string() })),
    }
}

fn outcome_result(outcome: &GenerationOutcome) -> ToolResult {
    ToolResult::success(outcome.success_messages().join("\n")).with_metadata(json!({
        "task_id": outcome.job.as_str(),
        "output_dir": outcome.output_dir.display().to_string(),
        "artifacts": outcome.artifacts,
    }))
}

fn output_directory_schema() -> Value {
    json!({
        "type": "string",
        "description": "Directory to save songs in. Relative paths use the configured base path; defaults to the desktop"
    })
}

// === Prompt Mode ===

pub struct GeneratePromptSongTool;

#[async_trait]
impl ToolSpec for GeneratePromptSongTool {
    fn name(&self) -> &'static str {
        "generate_prompt_song"
    }

    fn description(&self) -> &'static str {
        "Generate a song from a short description. The service writes the title, lyrics and style. Returns the paths of the saved audio files."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "What the song should be about (max 1200 characters)"
                },
                "instrumental": {
                    "type": "boolean",
                    "description": "Generate without vocals",
                    "default": false
                },
                "model": {
                    "type": "string",
                    "description": "Model identifier (default from config, chirp-v3-5)"
                },
                "album_id": {
                    "type": "string",
                    "description": "Album to attach the song to"
                },
                "output_directory": output_directory_schema()
            },
            "required": ["prompt"]
        })
    }

    fn capabilities(&self) -> Vec<ToolCapability> {
        vec![ToolCapability::Network, ToolCapability::WritesFiles]
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let request = GenerationRequest::Prompt(PromptRequest {
            prompt: required_str(&input, "prompt")?.to_string(),
            instrumental: optional_bool(&input, "instrumental", false),
            model: optional_str(&input, "model")
                .map_or_else(|| context.config.prompt_model(), str::to_string),
            album_id: optional_str(&input, "album_id").map(str::to_string),
        });
        Ok(run_and_report(request, &input, context).await)
    }
}

// === Custom Mode ===

pub struct GenerateCustomSongTool;

#[async_trait]
impl ToolSpec for GenerateCustomSongTool {
    fn name(&self) -> &'static str {
        "generate_custom_song"
    }

    fn description(&self) -> &'static str {
        "Generate a song from your own title, lyrics and style tags. Returns the paths of the saved audio files."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Song title" },
                "lyric": {
                    "type": "string",
                    "description": "Lyrics, optionally with [Verse]/[Chorus] markers"
                },
                "model": {
                    "type": "string",
                    "description": "Model identifier (default from config, chirp-v4)"
                },
                "tags": {
                    "type": "string",
                    "description": "Style tags, e.g. 'pop, acoustic'",
                    "default": DEFAULT_TAGS
                },
                "instrumental": { "type": "boolean", "default": false },
                "vocal_gender": {
                    "type": "string",
                    "enum": ["m", "f"],
                    "default": "m"
                },
                "weirdness_constraint": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "default": DEFAULT_WEIRDNESS
                },
                "style_weight": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "default": DEFAULT_STYLE_WEIGHT
                },
                "output_directory": output_directory_schema()
            },
            "required": ["title", "lyric"]
        })
    }

    fn capabilities(&self) -> Vec<ToolCapability> {
        vec![ToolCapability::Network, ToolCapability::WritesFiles]
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let vocal_gender = match optional_str(&input, "vocal_gender") {
            Some(raw) => raw
                .parse::<VocalGender>()
                .map_err(|e| ToolError::invalid_input(e.to_string()))?,
            None => VocalGender::default(),
        };
        let request = GenerationRequest::Custom(CustomRequest {
            title: required_str(&input, "title")?.to_string(),
            lyric: required_str(&input, "lyric")?.to_string(),
            model: optional_str(&input, "model")
                .map_or_else(|| context.config.custom_model(), str::to_string),
            tags: optional_str(&input, "tags")
                .unwrap_or(DEFAULT_TAGS)
                .to_string(),
            instrumental: optional_bool(&input, "instrumental", false),
            vocal_gender,
            weirdness_constraint: optional_f64(&input, "weirdness_constraint", DEFAULT_WEIRDNESS)?,
            style_weight: optional_f64(&input, "style_weight", DEFAULT_STYLE_WEIGHT)?,
        });
        Ok(run_and_report(request, &input, context).await)
    }
}

// === Media Check ===

/// Confirms a local path points at an existing audio or video file.
pub struct CheckMediaFileTool;

#[async_trait]
impl ToolSpec for CheckMediaFileTool {
    fn name(&self) -> &'static str {
        "check_media_file"
    }

    fn description(&self) -> &'static str {
        "Check that a local path is an existing audio or video file (wav, mp3, m4a, aac, ogg, flac, mp4, avi, mov, wmv)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input_file_path": {
                    "type": "string",
                    "description": "Absolute path, or relative to the configured base path"
                },
                "skip_media_check": {
                    "type": "boolean",
                    "description": "Accept any existing file regardless of extension",
                    "default": false
                }
            },
            "required": ["input_file_path"]
        })
    }

    fn capabilities(&self) -> Vec<ToolCapability> {
        vec![ToolCapability::ReadOnly]
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let raw = required_str(&input, "input_file_path")?;
        let media_check = !optional_bool(&input, "skip_media_check", false);
        let base = context.config.base_path();

        Ok(
            match validate_input_file(raw, base.as_deref(), media_check) {
                Ok(path) => ToolResult::success(format!("Valid media file: {}", path.display()))
                    .with_metadata(json!({ "path": path.display().to_string() })),
                Err(e) => ToolResult::error(e.to_string()),
            },
        )
    }
}
