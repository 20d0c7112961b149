//! Job status polling.
//!
//! The service reports one status label per generated item. Labels are
//! normalized into `ItemStatus`, and each poll response collapses into a
//! single `AggregateJobState` that drives the polling loop.

use serde_json::{Map, Value, json};
use tokio::time::{Instant, sleep};

use crate::client::YourMusicClient;
use crate::config::PollSettings;
use crate::error::{GenerationError, Result};
use crate::modules::submit::{JobHandle, service_code_ok, service_message};

const STATUS_PATH: &str = "/generate/status";

// === Types ===

/// One generated item as reported by a status poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobItem {
    fields: Map<String, Value>,
}

impl JobItem {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    /// Non-empty string field, trimmed.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn status_label(&self) -> &str {
        self.str_field("status").unwrap_or("unknown")
    }

    #[must_use]
    pub fn status(&self) -> ItemStatus {
        ItemStatus::from_label(self.status_label())
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }
}

/// Normalized per-item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Complete,
    Error,
}

impl ItemStatus {
    /// Map the service's status vocabulary onto the closed set.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "complete" | "completed" | "success" | "succeeded" => ItemStatus::Complete,
            "error" | "failed" | "failure" => ItemStatus::Error,
            _ => ItemStatus::Pending,
        }
    }
}

/// Lifecycle state of the whole job for one poll response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateJobState {
    Processing,
    Completed,
    Error,
    NoData,
}

impl AggregateJobState {
    #[must_use]
    pub fn from_items(items: &[JobItem]) -> Self {
        if items.is_empty() {
            return AggregateJobState::NoData;
        }
        if items.iter().any(|item| item.status() == ItemStatus::Error) {
            AggregateJobState::Error
        } else if items.iter().all(|item| item.status() == ItemStatus::Complete) {
            AggregateJobState::Completed
        } else {
            AggregateJobState::Processing
        }
    }
}

/// Result of one status poll.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub state: AggregateJobState,
    pub items: Vec<JobItem>,
}

impl StatusSnapshot {
    fn from_response(response: &Value) -> Result<Self> {
        if !service_code_ok(response) {
            let code = response
                .get("code")
                .map_or_else(|| "missing".to_string(), Value::to_string);
            return Err(GenerationError::RemoteJobError {
                message: service_message(response)
                    .map_or_else(|| format!("status query returned code {code}"), str::to_string),
            });
        }
        let items: Vec<JobItem> = response
            .get("data")
            .and_then(Value::as_array)
            .map(|items| items.iter().cloned().map(JobItem::from_value).collect())
            .unwrap_or_default();
        Ok(Self {
            state: AggregateJobState::from_items(&items),
            items,
        })
    }

    fn error_message(&self) -> String {
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| item.status() == ItemStatus::Error)
            .map_or_else(
                || "job reported an error".to_string(),
                |(index, item)| match item.title() {
                    Some(title) => format!(
                        "item {} ('{title}') reported status '{}'",
                        index + 1,
                        item.status_label()
                    ),
                    None => format!(
                        "item {} reported status '{}'",
                        index + 1,
                        item.status_label()
                    ),
                },
            )
    }
}

// === API Calls ===

/// Query the job once.
pub async fn query_status(client: &YourMusicClient, handle: &JobHandle) -> Result<StatusSnapshot> {
    let response = client
        .post_json(STATUS_PATH, &json!({ "taskId": handle.as_str() }))
        .await?;
    StatusSnapshot::from_response(&response)
}

/// Poll until the job completes, fails, or the ceiling passes.
///
/// The ceiling is checked before every poll and the wait between polls is
/// clipped to the time left, so a timeout overshoots by at most one poll.
/// `on_poll` sees the attempt number and state of every response.
pub async fn wait_for_completion<F>(
    client: &YourMusicClient,
    handle: &JobHandle,
    settings: PollSettings,
    mut on_poll: F,
) -> Result<Vec<JobItem>>
where
    F: FnMut(u32, AggregateJobState),
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let elapsed = started.elapsed();
        if elapsed >= settings.timeout {
            tracing::warn!(task_id = %handle, attempt, "polling timed out");
            return Err(GenerationError::PollTimeout {
                seconds: settings.timeout.as_secs_f64(),
            });
        }

        attempt += 1;
        let snapshot = query_status(client, handle).await?;
        tracing::debug!(task_id = %handle, attempt, state = ?snapshot.state, items = snapshot.items.len(), "poll");
        on_poll(attempt, snapshot.state);

        match snapshot.state {
            AggregateJobState::Completed => return Ok(snapshot.items),
            AggregateJobState::Error => {
                return Err(GenerationError::RemoteJobError {
                    message: snapshot.error_message(),
                });
            }
            AggregateJobState::Processing | AggregateJobState::NoData => {
                let remaining = settings.timeout.saturating_sub(started.elapsed());
                sleep(settings.interval.min(remaining)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for_base_url(base_url: String) -> YourMusicClient {
        let config = Config {
            api_key: Some("test".to_string()),
            base_url: Some(base_url),
            ..Config::default()
        };
        YourMusicClient::new(&config).expect("create client")
    }

    fn items(statuses: &[&str]) -> Vec<JobItem> {
        statuses
            .iter()
            .map(|status| JobItem::from_value(json!({ "status": status })))
            .collect()
    }

    fn status_body(statuses: &[&str]) -> Value {
        let data: Vec<Value> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                json!({
                    "status": status,
                    "title": format!("Take {}", i + 1),
                    "audio_url": format!("https://cdn.example/{i}.mp3")
                })
            })
            .collect();
        json!({ "code": 200, "data": data })
    }

    async fn mount_status(server: &MockServer, body: Value, times: Option<u64>) {
        let mock = Mock::given(method("POST"))
            .and(path(STATUS_PATH))
            .and(body_json(json!({ "taskId": "job-123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        match times {
            Some(n) => mock.up_to_n_times(n).mount(server).await,
            None => mock.mount(server).await,
        }
    }

    fn fast(interval_ms: u64, timeout_ms: u64) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn status_labels_normalize() {
        assert_eq!(ItemStatus::from_label("complete"), ItemStatus::Complete);
        assert_eq!(ItemStatus::from_label("SUCCESS"), ItemStatus::Complete);
        assert_eq!(ItemStatus::from_label("error"), ItemStatus::Error);
        assert_eq!(ItemStatus::from_label("failed"), ItemStatus::Error);
        assert_eq!(ItemStatus::from_label("streaming"), ItemStatus::Pending);
        assert_eq!(ItemStatus::from_label("unknown"), ItemStatus::Pending);
        assert_eq!(JobItem::from_value(json!({})).status(), ItemStatus::Pending);
    }

    #[test]
    fn aggregate_state_rules() {
        assert_eq!(AggregateJobState::from_items(&[]), AggregateJobState::NoData);
        assert_eq!(
            AggregateJobState::from_items(&items(&["complete", "complete"])),
            AggregateJobState::Completed
        );
        assert_eq!(
            AggregateJobState::from_items(&items(&["complete", "queued"])),
            AggregateJobState::Processing
        );
        assert_eq!(
            AggregateJobState::from_items(&items(&["queued", "error"])),
            AggregateJobState::Error
        );
        assert_eq!(
            AggregateJobState::from_items(&[JobItem::from_value(json!("not an object"))]),
            AggregateJobState::Processing
        );
    }

    #[test]
    fn status_code_failure_is_remote_error() {
        let err = StatusSnapshot::from_response(&json!({ "code": 500, "message": "task lost" }))
            .expect_err("code 500");
        assert!(matches!(err, GenerationError::RemoteJobError { ref message } if message == "task lost"));
    }

    #[tokio::test]
    async fn returns_items_after_processing_then_completed() {
        let server = MockServer::start().await;
        mount_status(&server, status_body(&["streaming", "queued"]), Some(2)).await;
        mount_status(&server, status_body(&["complete", "complete"]), None).await;

        let client = client_for_base_url(server.uri());
        let mut states = Vec::new();
        let started = std::time::Instant::now();
        let items = wait_for_completion(&client, &JobHandle::new("job-123"), fast(50, 5_000), |n, s| {
            states.push((n, s));
        })
        .await
        .expect("completed");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title(), Some("Take 1"));
        assert_eq!(
            states,
            vec![
                (1, AggregateJobState::Processing),
                (2, AggregateJobState::Processing),
                (3, AggregateJobState::Completed),
            ]
        );
        // Two waits between three polls.
        assert!(started.elapsed() >= Duration::from_millis(100));
        let requests = server.received_requests().await.expect("recording enabled");
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn empty_data_counts_as_processing() {
        let server = MockServer::start().await;
        mount_status(&server, json!({ "code": 200, "data": [] }), Some(1)).await;
        mount_status(&server, status_body(&["complete"]), None).await;

        let client = client_for_base_url(server.uri());
        let mut states = Vec::new();
        wait_for_completion(&client, &JobHandle::new("job-123"), fast(10, 5_000), |_, s| {
            states.push(s);
        })
        .await
        .expect("completed");
        assert_eq!(states, vec![AggregateJobState::NoData, AggregateJobState::Completed]);
    }

    #[tokio::test]
    async fn stops_on_error_after_two_polls() {
        let server = MockServer::start().await;
        mount_status(&server, status_body(&["queued"]), Some(1)).await;
        mount_status(&server, status_body(&["complete", "error"]), None).await;

        let client = client_for_base_url(server.uri());
        let err = wait_for_completion(&client, &JobHandle::new("job-123"), fast(10, 5_000), |_, _| {})
            .await
            .expect_err("error state");

        match err {
            GenerationError::RemoteJobError { message } => {
                assert!(message.contains("item 2"));
                assert!(message.contains("'error'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let requests = server.received_requests().await.expect("recording enabled");
        assert_eq!(requests.len(), 2);
    }

    #[tokio::test]
    async fn times_out_within_one_poll_of_the_ceiling() {
        let server = MockServer::start().await;
        mount_status(&server, status_body(&["queued"]), None).await;

        let client = client_for_base_url(server.uri());
        let ceiling = Duration::from_millis(300);
        let started = std::time::Instant::now();
        let err = wait_for_completion(&client, &JobHandle::new("job-123"), fast(40, 300), |_, _| {})
            .await
            .expect_err("timeout");
        let elapsed = started.elapsed();

        assert!(matches!(err, GenerationError::PollTimeout { .. }));
        assert!(elapsed >= ceiling);
        // Generous bound for one local round-trip on a slow CI machine.
        assert!(elapsed < ceiling + Duration::from_secs(2), "took {elapsed:?}");
        let polls = server.received_requests().await.expect("recording enabled").len();
        assert!(polls >= 2, "expected repeated polling, saw {polls}");
    }

    #[tokio::test]
    async fn transport_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STATUS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for_base_url(server.uri());
        let err = wait_for_completion(&client, &JobHandle::new("job-123"), fast(10, 5_000), |_, _| {})
            .await
            .expect_err("500");
        assert!(err.is_transport());
        let requests = server.received_requests().await.expect("recording enabled");
        assert_eq!(requests.len(), 1);
    }
}
