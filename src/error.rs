//! Error types for song generation.
//!
//! Every failure of a generation run maps onto one `GenerationError`
//! variant. The task orchestrator wraps it in a `TaskFailure` that also
//! records which phase of the run produced it.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Errors produced while validating, submitting, polling, or downloading.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error(
        "Cannot find API key. Please set YOURMUSIC_API_KEY environment variable or api_key in config.toml."
    )]
    MissingCredential,

    #[error("Directory ({}) is not writeable", path.display())]
    DirectoryNotWritable { path: PathBuf },

    #[error("File path ({}) must be absolute when no base path is configured", path.display())]
    PathNotAbsolute { path: PathBuf },

    #[error("File ({}) does not exist", path.display())]
    FileNotFound { path: PathBuf },

    #[error("File ({}) is not a file", path.display())]
    NotAFile { path: PathBuf },

    #[error("File ({}) is not an audio or video file", path.display())]
    UnsupportedMediaType { path: PathBuf },

    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("{context}: {source}")]
    MalformedResponse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create song generation task: {message}")]
    SubmissionRejected { message: String },

    #[error("No task ID returned from API")]
    NoJobId,

    #[error("Song generation timed out after {seconds} seconds")]
    PollTimeout { seconds: f64 },

    #[error("Song generation failed with error status: {message}")]
    RemoteJobError { message: String },

    #[error("Failed to download song from {url} (HTTP {status})")]
    DownloadFailed { url: String, status: u16 },

    #[error("No songs were downloaded successfully")]
    NoArtifactsProduced,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    #[must_use]
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn malformed(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this failure came from the network layer rather than the service.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::HttpStatus { .. } | Self::MalformedResponse { .. }
        )
    }
}

/// Phase of a generation run, used to annotate failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validation,
    Credentials,
    OutputDirectory,
    Submission,
    Polling,
    Download,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Validation => "validation",
            Phase::Credentials => "credential check",
            Phase::OutputDirectory => "output directory",
            Phase::Submission => "submission",
            Phase::Polling => "polling",
            Phase::Download => "download",
        };
        f.write_str(label)
    }
}

/// The single reported failure of one generation run.
#[derive(Debug, Error)]
#[error("Song generation failed during {phase}: {error}")]
pub struct TaskFailure {
    pub phase: Phase,
    #[source]
    pub error: GenerationError,
}

impl TaskFailure {
    #[must_use]
    pub fn new(phase: Phase, error: GenerationError) -> Self {
        Self { phase, error }
    }
}
