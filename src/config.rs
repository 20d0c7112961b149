//! Configuration loading and defaults for yourmusic-cli.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::GenerationError;

// === Defaults ===

pub const DEFAULT_BASE_URL: &str = "https://app.yourmusic.fun";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 600.0;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECONDS: u64 = 600;
pub const DEFAULT_PROMPT_MODEL: &str = "chirp-v3-5";
pub const DEFAULT_CUSTOM_MODEL: &str = "chirp-v4";
pub const DEFAULT_FALLBACK_LABEL: &str = "Song";
pub const DEFAULT_FILE_EXTENSION: &str = "mp3";

// === Types ===

/// Resolved CLI configuration, including defaults and environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Base directory for relative output and input paths.
    pub base_path: Option<String>,
    /// Output directory used when a run does not name one.
    pub output_dir: Option<String>,
    /// Ceiling for the whole polling phase, in seconds.
    pub timeout_seconds: Option<f64>,
    pub poll_interval_ms: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
    /// Ceiling for one artifact download, body included.
    pub download_timeout_seconds: Option<u64>,
    pub default_prompt_model: Option<String>,
    pub default_custom_model: Option<String>,
    pub fallback_label: Option<String>,
    pub file_extension: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(flatten)]
    base: Config,
    profiles: Option<HashMap<String, Config>>,
}

/// Timing of the status polling loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

/// How downloaded artifacts are named on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    /// Label used when an item carries no title.
    pub fallback_label: String,
    pub extension: String,
}

impl Default for ArtifactNaming {
    fn default() -> Self {
        Self {
            fallback_label: DEFAULT_FALLBACK_LABEL.to_string(),
            extension: DEFAULT_FILE_EXTENSION.to_string(),
        }
    }
}

// === Config Loading ===

impl Config {
    /// Load configuration from disk and merge with environment overrides.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// # use crate::config::Config;
    /// let config = Config::load(None, None)?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn load(path: Option<PathBuf>, profile: Option<&str>) -> Result<Self> {
        let path = path.or_else(default_config_path);
        let mut config = if let Some(path) = path.as_ref() {
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_toml(&contents, profile)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            } else {
                Config::default()
            }
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document and apply the selected profile.
    pub fn from_toml(contents: &str, profile: Option<&str>) -> Result<Self> {
        let parsed: ConfigFile = toml::from_str(contents)?;
        apply_profile(parsed, profile)
    }

    /// Validate that config fields hold usable values.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref key) = self.api_key
            && key.trim().is_empty()
        {
            anyhow::bail!("api_key cannot be empty string");
        }
        if let Some(timeout) = self.timeout_seconds
            && !(timeout.is_finite() && timeout > 0.0)
        {
            anyhow::bail!("timeout_seconds must be a positive number of seconds, got {timeout}");
        }
        if let Some(timeout) = self.timeout_seconds
            && Duration::try_from_secs_f64(timeout).is_err()
        {
            anyhow::bail!("timeout_seconds is too large, got {timeout}");
        }
        if self.poll_interval_ms == Some(0) {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }
        if self.request_timeout_seconds == Some(0) {
            anyhow::bail!("request_timeout_seconds must be greater than zero");
        }
        if self.download_timeout_seconds == Some(0) {
            anyhow::bail!("download_timeout_seconds must be greater than zero");
        }
        Ok(())
    }

    /// Return the service base URL (normalized).
    #[must_use]
    pub fn yourmusic_base_url(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        base.trim().trim_end_matches('/').to_string()
    }

    /// Read the API key; its absence is fatal for any generation run.
    pub fn yourmusic_api_key(&self) -> std::result::Result<String, GenerationError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or(GenerationError::MissingCredential)
    }

    /// Resolve the base directory for relative paths.
    #[must_use]
    pub fn base_path(&self) -> Option<PathBuf> {
        self.base_path
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(expand_path)
    }

    /// Per-request timeout for service calls; also the connect timeout for downloads.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_seconds
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        )
    }

    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(
            self.download_timeout_seconds
                .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECONDS),
        )
    }

    #[must_use]
    pub fn poll_settings(&self) -> PollSettings {
        let defaults = PollSettings::default();
        PollSettings {
            interval: self
                .poll_interval_ms
                .map_or(defaults.interval, Duration::from_millis),
            timeout: self
                .timeout_seconds
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(defaults.timeout),
        }
    }

    #[must_use]
    pub fn artifact_naming(&self) -> ArtifactNaming {
        let defaults = ArtifactNaming::default();
        ArtifactNaming {
            fallback_label: non_empty(self.fallback_label.as_deref())
                .unwrap_or(defaults.fallback_label),
            extension: non_empty(self.file_extension.as_deref())
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or(defaults.extension),
        }
    }

    #[must_use]
    pub fn prompt_model(&self) -> String {
        non_empty(self.default_prompt_model.as_deref())
            .unwrap_or_else(|| DEFAULT_PROMPT_MODEL.to_string())
    }

    #[must_use]
    pub fn custom_model(&self) -> String {
        non_empty(self.default_custom_model.as_deref())
            .unwrap_or_else(|| DEFAULT_CUSTOM_MODEL.to_string())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

// === Paths ===

pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("YOURMUSIC_CONFIG_PATH")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".yourmusic").join("config.toml"))
}

pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

// === Environment Overrides ===

fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(value) = lookup("YOURMUSIC_API_KEY") {
        config.api_key = Some(value);
    }
    if let Some(value) = lookup("YOURMUSIC_API_URL") {
        config.base_url = Some(value);
    }
    if let Some(value) = lookup("YOURMUSIC_MCP_BASE_PATH") {
        config.base_path = Some(value);
    }
    if let Some(value) = lookup("YOURMUSIC_OUTPUT_DIR") {
        config.output_dir = Some(value);
    }
    if let Some(value) = lookup("TIME_OUT_SECONDS") {
        match value.trim().parse::<f64>() {
            Ok(parsed) => config.timeout_seconds = Some(parsed),
            Err(_) => tracing::warn!("Ignoring TIME_OUT_SECONDS={value}: not a number"),
        }
    }
}

fn apply_profile(config: ConfigFile, profile: Option<&str>) -> Result<Config> {
    if let Some(profile_name) = profile {
        let profiles = config.profiles.as_ref();
        match profiles.and_then(|profiles| profiles.get(profile_name)) {
            Some(override_cfg) => Ok(merge_config(config.base, override_cfg.clone())),
            None => {
                let available = profiles
                    .map(|profiles| {
                        let mut keys = profiles.keys().cloned().collect::<Vec<_>>();
                        keys.sort();
                        if keys.is_empty() {
                            "none".to_string()
                        } else {
                            keys.join(", ")
                        }
                    })
                    .unwrap_or_else(|| "none".to_string());
                anyhow::bail!(
                    "Profile '{}' not found. Available profiles: {}",
                    profile_name,
                    available
                )
            }
        }
    } else {
        Ok(config.base)
    }
}

fn merge_config(base: Config, override_cfg: Config) -> Config {
    Config {
        api_key: override_cfg.api_key.or(base.api_key),
        base_url: override_cfg.base_url.or(base.base_url),
        base_path: override_cfg.base_path.or(base.base_path),
        output_dir: override_cfg.output_dir.or(base.output_dir),
        timeout_seconds: override_cfg.timeout_seconds.or(base.timeout_seconds),
        poll_interval_ms: override_cfg.poll_interval_ms.or(base.poll_interval_ms),
        request_timeout_seconds: override_cfg
            .request_timeout_seconds
            .or(base.request_timeout_seconds),
        download_timeout_seconds: override_cfg
            .download_timeout_seconds
            .or(base.download_timeout_seconds),
        default_prompt_model: override_cfg
            .default_prompt_model
            .or(base.default_prompt_model),
        default_custom_model: override_cfg
            .default_custom_model
            .or(base.default_custom_model),
        fallback_label: override_cfg.fallback_label.or(base.fallback_label),
        file_extension: override_cfg.file_extension.or(base.file_extension),
    }
}
