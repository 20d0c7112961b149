//! Song generation requests and their validation.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{GenerationError, Result};

/// Longest accepted prompt, in characters after trimming.
pub const MAX_PROMPT_CHARS: usize = 1200;

pub const DEFAULT_TAGS: &str = "pop";
pub const DEFAULT_WEIRDNESS: f64 = 0.6;
pub const DEFAULT_STYLE_WEIGHT: f64 = 0.7;

// === Types ===

/// Inspiration mode: the service writes title, lyrics and style itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub prompt: String,
    pub instrumental: bool,
    pub model: String,
    pub album_id: Option<String>,
}

/// Custom mode: the caller supplies title, lyrics and style.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRequest {
    pub title: String,
    pub lyric: String,
    pub model: String,
    pub tags: String,
    pub instrumental: bool,
    pub vocal_gender: VocalGender,
    pub weirdness_constraint: f64,
    pub style_weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Prompt(PromptRequest),
    Custom(CustomRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum VocalGender {
    #[default]
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl VocalGender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VocalGender::Male => "m",
            VocalGender::Female => "f",
        }
    }
}

impl fmt::Display for VocalGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VocalGender {
    type Err = GenerationError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Ok(VocalGender::Male),
            "f" | "female" => Ok(VocalGender::Female),
            other => Err(GenerationError::validation(format!(
                "vocal_gender must be 'm' or 'f', got '{other}'"
            ))),
        }
    }
}

// === Wire bodies ===

#[derive(Debug, Serialize)]
pub(crate) struct PromptBody<'a> {
    prompt: &'a str,
    instrumental: bool,
    model_type: &'a str,
    #[serde(rename = "albumId")]
    album_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomBody<'a> {
    #[serde(rename = "model_type")]
    model_type: &'a str,
    lyric: &'a str,
    title: &'a str,
    tags: &'a str,
    instrumental: bool,
    vocal_gender: VocalGender,
    weirdness_constraint: f64,
    style_weight: f64,
}

// === Validation ===

impl GenerationRequest {
    /// Check every field before anything reaches the network.
    pub fn validate(&self) -> Result<()> {
        match self {
            GenerationRequest::Prompt(request) => {
                let prompt = request.prompt.trim();
                if prompt.is_empty() {
                    return Err(GenerationError::validation("Prompt text is required."));
                }
                if prompt.chars().count() > MAX_PROMPT_CHARS {
                    return Err(GenerationError::validation(format!(
                        "Prompt text must be at most {MAX_PROMPT_CHARS} characters."
                    )));
                }
                require_non_empty("model_type", &request.model)
            }
            GenerationRequest::Custom(request) => {
                require_non_empty("title", &request.title)?;
                require_non_empty("lyric", &request.lyric)?;
                require_non_empty("model_type", &request.model)?;
                require_unit_interval("weirdness_constraint", request.weirdness_constraint)?;
                require_unit_interval("style_weight", request.style_weight)
            }
        }
    }

    /// Service path that accepts this kind of request.
    #[must_use]
    pub fn endpoint(&self) -> &'static str {
        match self {
            GenerationRequest::Prompt(_) => "/generate/prompt",
            GenerationRequest::Custom(_) => "/generate/custom",
        }
    }

    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            GenerationRequest::Prompt(_) => "prompt",
            GenerationRequest::Custom(_) => "custom",
        }
    }

    /// Label for downloaded items that come back without a title.
    #[must_use]
    pub fn fallback_label<'a>(&'a self, default: &'a str) -> &'a str {
        match self {
            GenerationRequest::Prompt(_) => default,
            GenerationRequest::Custom(request) => request.title.trim(),
        }
    }

    pub(crate) fn body(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            GenerationRequest::Prompt(request) => serde_json::to_value(PromptBody {
                prompt: request.prompt.trim(),
                instrumental: request.instrumental,
                model_type: request.model.trim(),
                album_id: request
                    .album_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|id| !id.is_empty()),
            }),
            GenerationRequest::Custom(request) => serde_json::to_value(CustomBody {
                model_type: request.model.trim(),
                lyric: &request.lyric,
                title: request.title.trim(),
                tags: request.tags.trim(),
                instrumental: request.instrumental,
                vocal_gender: request.vocal_gender,
                weirdness_constraint: request.weirdness_constraint,
                style_weight: request.style_weight,
            }),
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GenerationError::validation(format!("{field} is required.")));
    }
    Ok(())
}

fn require_unit_interval(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GenerationError::validation(format!(
            "{field} must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}
