//! Tool abstractions for exposing song generation to a calling host.
//!
//! - `ToolSpec`: what every tool implements
//! - `ToolContext`: shared configuration handed to each call
//! - `ToolResult`: text plus optional structured metadata

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

/// Capabilities a tool declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCapability {
    /// Only inspects local state
    ReadOnly,
    /// Writes files to disk
    WritesFiles,
    /// Talks to the remote service
    Network,
}

/// Errors raised before a tool gets to do its work.
///
/// Failures of the work itself are reported as `ToolResult::error`.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Failed to validate input: {message}")]
    InvalidInput { message: String },

    #[error("Failed to validate input: missing required field '{field}'")]
    MissingField { field: String },

    #[error("Failed to locate tool: {message}")]
    NotAvailable { message: String },
}

impl ToolError {
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn not_available(msg: impl Into<String>) -> Self {
        Self::NotAvailable {
            message: msg.into(),
        }
    }
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Human-readable output
    pub content: String,
    pub success: bool,
    /// Structured data for the host, e.g. saved artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    #[must_use]
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            metadata: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            success: false,
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Context passed to tools during execution.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Arc<Config>,
}

impl ToolContext {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn from_shared(config: Arc<Config>) -> Self {
        Self { config }
    }
}

/// The trait every tool implements.
#[async_trait]
pub trait ToolSpec: Send + Sync {
    /// Unique name used by the host to call the tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's input.
    fn input_schema(&self) -> Value;

    fn capabilities(&self) -> Vec<ToolCapability>;

    fn is_read_only(&self) -> bool {
        let caps = self.capabilities();
        caps.contains(&ToolCapability::ReadOnly) && !caps.contains(&ToolCapability::WritesFiles)
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError>;
}

// === Helper functions for extracting values from JSON input ===

/// Required, non-blank string field.
pub fn required_str<'a>(input: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    input
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ToolError::missing_field(field))
}

/// Optional string field; blank strings count as absent.
pub fn optional_str<'a>(input: &'a Value, field: &str) -> Option<&'a str> {
    input
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
}

pub fn optional_bool(input: &Value, field: &str, default: bool) -> bool {
    input
        .get(field)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(default)
}

/// Optional number field. Present but non-numeric values are rejected.
pub fn optional_f64(input: &Value, field: &str, default: f64) -> Result<f64, ToolError> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| ToolError::invalid_input(format!("'{field}' must be a number"))),
    }
}
