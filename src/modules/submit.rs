//! Job submission for both generation modes.

use std::fmt;

use serde_json::Value;

use crate::client::YourMusicClient;
use crate::error::{GenerationError, Result};
use crate::logging;
use crate::modules::request::GenerationRequest;

/// Application-level success code in service responses.
pub(crate) const SERVICE_OK: i64 = 200;

/// Identifier of one remote generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(String);

impl JobHandle {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// === API Calls ===

/// Submit a validated request and return the job it created.
pub async fn submit(client: &YourMusicClient, request: &GenerationRequest) -> Result<JobHandle> {
    let body = request
        .body()
        .map_err(|e| GenerationError::malformed("Failed to encode request body", e))?;
    let response = client.post_json(request.endpoint(), &body).await?;

    ensure_accepted(&response)?;
    let handle = extract_task_id(&response)
        .map(JobHandle::new)
        .ok_or(GenerationError::NoJobId)?;

    logging::info(format!(
        "Song generation task created successfully ({} mode). Task ID: {handle}",
        request.mode()
    ));
    tracing::info!(task_id = %handle, mode = request.mode(), "job submitted");
    Ok(handle)
}

// === Response Parsing ===

pub(crate) fn service_code_ok(response: &Value) -> bool {
    response.get("code").and_then(Value::as_i64) == Some(SERVICE_OK)
}

pub(crate) fn service_message(response: &Value) -> Option<&str> {
    response
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
}

fn ensure_accepted(response: &Value) -> Result<()> {
    if response.is_null() {
        return Err(GenerationError::SubmissionRejected {
            message: "No response".to_string(),
        });
    }
    if !service_code_ok(response) {
        return Err(GenerationError::SubmissionRejected {
            message: service_message(response)
                .unwrap_or("Unknown error")
                .to_string(),
        });
    }
    Ok(())
}

/// The job id lives on the first element of `data.data`.
fn extract_task_id(response: &Value) -> Option<String> {
    let first = response.get("data")?.get("data")?.as_array()?.first()?;
    match first.get("taskId")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
