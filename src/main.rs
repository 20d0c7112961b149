//! CLI entry point for the `YourMusic` song generator.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::Colorize;
use dotenvy::dotenv;

mod client;
mod config;
mod error;
mod logging;
mod modules;
mod palette;
mod paths;
mod tools;
mod ui;
mod utils;

use crate::config::Config;
use crate::error::GenerationError;
use crate::modules::request::{
    CustomRequest, DEFAULT_STYLE_WEIGHT, DEFAULT_TAGS, DEFAULT_WEIRDNESS, GenerationRequest,
    PromptRequest, VocalGender,
};
use crate::modules::task::{TaskOptions, run_generation};
use crate::tools::{ToolContext, ToolRegistry};

#[derive(Parser, Debug)]
#[command(
    name = "yourmusic",
    author,
    version,
    about = "YourMusic CLI - generate songs and save them locally",
    after_help = "Examples:\
    \\n   yourmusic prompt \"a song about quiet mornings\"\
    \\n   yourmusic custom --title \"Evening Rain\" --lyric-file rain.txt --tags \"lofi, piano\"\
    \\n   yourmusic tool generate_prompt_song '{\"prompt\": \"harbor lights\"}'\
    \\n   yourmusic doctor"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Config profile name
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Generate a song from a short description
    Prompt {
        /// What the song should be about
        prompt: String,
        /// Generate without vocals
        #[arg(long)]
        instrumental: bool,
        /// Model identifier (default from config)
        #[arg(long)]
        model: Option<String>,
        /// Album to attach the song to
        #[arg(long)]
        album_id: Option<String>,
        /// Output directory (default: desktop)
        #[arg(short, long)]
        output_dir: Option<String>,
    },
    /// Generate a song from your own title and lyrics
    Custom {
        #[arg(long)]
        title: String,
        /// Lyrics text
        #[arg(long, conflicts_with = "lyric_file", required_unless_present = "lyric_file")]
        lyric: Option<String>,
        /// Read lyrics from a file
        #[arg(long)]
        lyric_file: Option<PathBuf>,
        /// Model identifier (default from config)
        #[arg(long)]
        model: Option<String>,
        /// Style tags
        #[arg(long, default_value = DEFAULT_TAGS)]
        tags: String,
        /// Generate without vocals
        #[arg(long)]
        instrumental: bool,
        /// Vocal gender: m or f
        #[arg(long, default_value = "m")]
        vocal_gender: VocalGender,
        /// Weirdness constraint, 0.0 to 1.0
        #[arg(long, default_value_t = DEFAULT_WEIRDNESS)]
        weirdness: f64,
        /// Style weight, 0.0 to 1.0
        #[arg(long, default_value_t = DEFAULT_STYLE_WEIGHT)]
        style_weight: f64,
        /// Output directory (default: desktop)
        #[arg(short, long)]
        output_dir: Option<String>,
    },
    /// Check that a local path is a usable audio or video file
    CheckFile {
        path: String,
        /// Accept any existing file regardless of extension
        #[arg(long)]
        skip_media_check: bool,
    },
    /// List available tools
    Tools {
        /// Also print each tool's JSON input schema
        #[arg(long)]
        schema: bool,
    },
    /// Run a tool with JSON input
    Tool {
        name: String,
        /// JSON object with the tool input
        #[arg(default_value = "{}")]
        input: String,
    },
    /// Check configuration and output directory
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    logging::set_verbose(cli.verbose);
    logging::init_tracing(cli.verbose);

    match cli.command.clone() {
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        Commands::Doctor => {
            run_doctor(&cli);
            Ok(())
        }
        Commands::Prompt {
            prompt,
            instrumental,
            model,
            album_id,
            output_dir,
        } => {
            let config = load_config_from_cli(&cli)?;
            let request = GenerationRequest::Prompt(PromptRequest {
                prompt,
                instrumental,
                model: model.unwrap_or_else(|| config.prompt_model()),
                album_id,
            });
            run_generate(&config, &request, output_dir).await
        }
        Commands::Custom {
            title,
            lyric,
            lyric_file,
            model,
            tags,
            instrumental,
            vocal_gender,
            weirdness,
            style_weight,
            output_dir,
        } => {
            let config = load_config_from_cli(&cli)?;
            let lyric = match (lyric, lyric_file) {
                (Some(lyric), _) => lyric,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read lyric file: {}", path.display()))?,
                (None, None) => anyhow::bail!("either --lyric or --lyric-file is required"),
            };
            let request = GenerationRequest::Custom(CustomRequest {
                title,
                lyric,
                model: model.unwrap_or_else(|| config.custom_model()),
                tags,
                instrumental,
                vocal_gender,
                weirdness_constraint: weirdness,
                style_weight,
            });
            run_generate(&config, &request, output_dir).await
        }
        Commands::CheckFile {
            path,
            skip_media_check,
        } => {
            let config = load_config_from_cli(&cli)?;
            let base = config.base_path();
            let checked = paths::validate_input_file(&path, base.as_deref(), !skip_media_check)?;
            println!("Valid media file: {}", checked.display());
            Ok(())
        }
        Commands::Tools { schema } => {
            let config = load_config_from_cli(&cli)?;
            list_tools(
                &ToolRegistry::with_music_tools(ToolContext::new(config)),
                schema,
            );
            Ok(())
        }
        Commands::Tool { name, input } => {
            let config = load_config_from_cli(&cli)?;
            run_tool(config, &name, &input).await
        }
    }
}

fn load_config_from_cli(cli: &Cli) -> Result<Config> {
    let profile = cli
        .profile
        .clone()
        .or_else(|| std::env::var("YOURMUSIC_PROFILE").ok());
    Config::load(cli.config.clone(), profile.as_deref())
}

/// Generate shell completions for the given shell
fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

async fn run_generate(
    config: &Config,
    request: &GenerationRequest,
    output_dir: Option<String>,
) -> Result<()> {
    let options = TaskOptions {
        output_directory: output_dir,
        show_progress: !logging::is_verbose(),
    };
    match run_generation(config, request, &options).await {
        Ok(outcome) => {
            let (r, g, b) = palette::GREEN_RGB;
            for line in outcome.success_messages() {
                println!("{}", line.truecolor(r, g, b));
            }
            Ok(())
        }
        Err(failure) => {
            tracing::debug!(error = ?failure.error, phase = %failure.phase, "generation failed");
            if let Some(hint) = failure_hint(&failure.error) {
                let (r, g, b) = palette::SILVER_RGB;
                eprintln!("{}", hint.truecolor(r, g, b));
            }
            anyhow::bail!("{failure}")
        }
    }
}

fn failure_hint(error: &GenerationError) -> Option<&'static str> {
    match error {
        GenerationError::MissingCredential => {
            Some("Set YOURMUSIC_API_KEY or api_key in ~/.yourmusic/config.toml")
        }
        GenerationError::PollTimeout { .. } => {
            Some("The job may still finish; raise TIME_OUT_SECONDS to wait longer")
        }
        error if error.is_transport() => {
            Some("Check your network connection and YOURMUSIC_API_URL, then run 'yourmusic doctor'")
        }
        _ => None,
    }
}

fn list_tools(registry: &ToolRegistry, show_schema: bool) {
    let (r, g, b) = palette::BLUE_RGB;
    let (muted_r, muted_g, muted_b) = palette::SILVER_RGB;
    for name in registry.names() {
        let Some(tool) = registry.get(name) else {
            continue;
        };
        let capabilities = tool
            .capabilities()
            .iter()
            .map(|capability| format!("{capability:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        let access = if tool.is_read_only() { "read-only" } else { "writes files" };
        println!(
            "{} {}",
            name.truecolor(r, g, b).bold(),
            format!("[{access}; {capabilities}]").truecolor(muted_r, muted_g, muted_b)
        );
        println!("  {}", tool.description());
        if show_schema {
            for line in utils::pretty_json(&tool.input_schema()).lines() {
                println!("  {line}");
            }
        }
    }
}

async fn run_tool(config: Config, name: &str, input: &str) -> Result<()> {
    let input: serde_json::Value =
        serde_json::from_str(input).context("Tool input must be a JSON object")?;
    let registry = ToolRegistry::with_music_tools(ToolContext::from_shared(Arc::new(config)));
    let result = registry.execute(name, input).await?;

    if result.success {
        println!("{}", result.content);
    } else {
        let (r, g, b) = palette::RED_RGB;
        eprintln!("{}", result.content.truecolor(r, g, b));
    }
    if let Some(metadata) = result.metadata.as_ref() {
        println!("{}", utils::pretty_json(metadata));
    }
    if !result.success {
        anyhow::bail!("tool '{name}' failed");
    }
    Ok(())
}

fn run_doctor(cli: &Cli) {
    let (blue_r, blue_g, blue_b) = palette::BLUE_RGB;
    let (green_r, green_g, green_b) = palette::GREEN_RGB;
    let (orange_r, orange_g, orange_b) = palette::ORANGE_RGB;
    let (red_r, red_g, red_b) = palette::RED_RGB;
    let ok = "✓".truecolor(green_r, green_g, green_b);
    let maybe = "!".truecolor(orange_r, orange_g, orange_b);
    let bad = "✗".truecolor(red_r, red_g, red_b);

    println!(
        "{}",
        "YourMusic CLI Doctor"
            .truecolor(blue_r, blue_g, blue_b)
            .bold()
    );
    println!("{}", "====================".truecolor(blue_r, blue_g, blue_b));
    println!();
    println!("  yourmusic: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("{}", "Configuration:".bold());
    match cli.config.clone().or_else(config::default_config_path) {
        Some(path) if path.exists() => println!("  {ok} config found at {}", path.display()),
        Some(path) => println!(
            "  {maybe} {} not found (will use defaults)",
            path.display()
        ),
        None => println!("  {maybe} no home directory; using defaults"),
    }

    let config = match load_config_from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            println!("  {bad} failed to load config: {e:#}");
            return;
        }
    };

    println!();
    println!("{}", "Service:".bold());
    if config.yourmusic_api_key().is_ok() {
        println!("  {ok} API key configured");
    } else {
        println!("  {bad} API key not configured");
        println!("    Set YOURMUSIC_API_KEY or api_key in config.toml");
    }
    println!("  {ok} base URL: {}", config.yourmusic_base_url());
    let poll = config.poll_settings();
    println!(
        "  {ok} polling every {:?}, giving up after {:?}",
        poll.interval, poll.timeout
    );

    println!();
    println!("{}", "Output:".bold());
    let base = config.base_path();
    if let Some(base) = base.as_ref() {
        if base.is_dir() {
            println!("  {ok} base path: {}", base.display());
        } else {
            println!("  {maybe} base path does not exist yet: {}", base.display());
        }
    }
    match paths::planned_output_dir(config.output_dir.as_deref(), base.as_deref()) {
        Ok(dir) if paths::is_writable(&dir) => {
            println!("  {ok} output directory writable: {}", dir.display());
        }
        Ok(dir) => println!("  {bad} output directory not writable: {}", dir.display()),
        Err(e) => println!("  {bad} could not resolve output directory: {e}"),
    }
}
