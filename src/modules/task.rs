//! End-to-end song generation: validate, submit, poll, download.

use std::path::PathBuf;

use crate::client::YourMusicClient;
use crate::config::{ArtifactNaming, Config};
use crate::error::{GenerationError, Phase, TaskFailure};
use crate::modules::download::{ArtifactFile, download_artifacts};
use crate::modules::request::GenerationRequest;
use crate::modules::status::wait_for_completion;
use crate::modules::submit::{JobHandle, submit};
use crate::paths::resolve_output_dir;
use crate::ui::spinner;

/// Options for one generation run.
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Output directory hint; falls back to `output_dir` from config, then the desktop.
    pub output_directory: Option<String>,
    /// Show a terminal spinner while polling.
    pub show_progress: bool,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub job: JobHandle,
    pub output_dir: PathBuf,
    pub artifacts: Vec<ArtifactFile>,
}

impl GenerationOutcome {
    /// One line per saved song.
    #[must_use]
    pub fn success_messages(&self) -> Vec<String> {
        self.artifacts
            .iter()
            .map(|artifact| {
                format!(
                    "Success! Song generated and saved as: {}",
                    artifact.path.display()
                )
            })
            .collect()
    }
}

/// Run one generation job from request to files on disk.
///
/// Nothing touches the network until the request is valid, an API key is
/// present and the output directory is writable. Any failure ends the run;
/// files already written are left in place.
pub async fn run_generation(
    config: &Config,
    request: &GenerationRequest,
    options: &TaskOptions,
) -> Result<GenerationOutcome, TaskFailure> {
    let fail = |phase: Phase| move |error: GenerationError| TaskFailure::new(phase, error);

    request.validate().map_err(fail(Phase::Validation))?;
    let client = YourMusicClient::new(config).map_err(fail(Phase::Credentials))?;

    let hint = options
        .output_directory
        .as_deref()
        .or(config.output_dir.as_deref());
    let base_path = config.base_path();
    let output_dir =
        resolve_output_dir(hint, base_path.as_deref()).map_err(fail(Phase::OutputDirectory))?;

    let job = submit(&client, request)
        .await
        .map_err(fail(Phase::Submission))?;

    let progress = options.show_progress.then(|| spinner("Generating song..."));
    let polled = wait_for_completion(&client, &job, config.poll_settings(), |attempt, state| {
        if let Some(progress) = &progress {
            progress.set_message(format!("Generating song... (poll {attempt}: {state:?})"));
        }
    })
    .await;
    if let Some(progress) = &progress {
        progress.finish_and_clear();
    }
    let items = polled.map_err(fail(Phase::Polling))?;

    let defaults = config.artifact_naming();
    let naming = ArtifactNaming {
        fallback_label: request.fallback_label(&defaults.fallback_label).to_string(),
        extension: defaults.extension.clone(),
    };
    let artifacts = download_artifacts(&client, &items, &output_dir, &naming)
        .await
        .map_err(fail(Phase::Download))?;

    tracing::info!(task_id = %job, files = artifacts.len(), "generation finished");
    Ok(GenerationOutcome {
        job,
        output_dir,
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::request::{CustomRequest, PromptRequest, VocalGender};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        Config {
            api_key: Some("test".to_string()),
            base_url: Some(server.uri()),
            poll_interval_ms: Some(20),
            timeout_seconds: Some(10.0),
            ..Config::default()
        }
    }

    fn prompt_request(text: &str) -> GenerationRequest {
        GenerationRequest::Prompt(PromptRequest {
            prompt: text.to_string(),
            instrumental: false,
            model: "chirp-v3-5".to_string(),
            album_id: None,
        })
    }

    fn options_for(dir: &tempfile::TempDir) -> TaskOptions {
        TaskOptions {
            output_directory: Some(dir.path().to_string_lossy().into_owned()),
            show_progress: false,
        }
    }

    async fn mount_submission(server: &MockServer, endpoint: &str) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": { "data": [ { "taskId": "job-123" } ] }
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn prompt_song_end_to_end() {
        let server = MockServer::start().await;
        let audio_url = format!("{}/y.mp3", server.uri());
        let audio = vec![0xAB_u8; 64 * 1024];

        mount_submission(&server, "/generate/prompt").await;
        Mock::given(method("POST"))
            .and(path("/generate/status"))
            .and(body_json(json!({ "taskId": "job-123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": [ { "status": "streaming", "title": "Quiet Morning" } ]
            })))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/generate/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": [ { "status": "complete", "title": "Quiet Morning", "audio_url": audio_url } ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/y.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(audio.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = run_generation(
            &config_for(&server),
            &prompt_request("a song about quiet mornings"),
            &options_for(&dir),
        )
        .await
        .expect("generation");

        assert_eq!(outcome.job.as_str(), "job-123");
        assert_eq!(outcome.artifacts.len(), 1);
        let artifact = &outcome.artifacts[0];
        assert_eq!(artifact.filename, "Quiet Morning1.mp3");
        assert_eq!(artifact.bytes, 65_536);
        assert_eq!(artifact.path, dir.path().join("Quiet Morning1.mp3"));
        assert_eq!(std::fs::read(&artifact.path).expect("read").len(), 65_536);
        assert_eq!(
            outcome.success_messages(),
            vec![format!(
                "Success! Song generated and saved as: {}",
                artifact.path.display()
            )]
        );
    }

    #[tokio::test]
    async fn custom_song_falls_back_to_request_title() {
        let server = MockServer::start().await;
        mount_submission(&server, "/generate/custom").await;
        Mock::given(method("POST"))
            .and(path("/generate/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": [ { "status": "complete", "url": format!("{}/c.mp3", server.uri()) } ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/c.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3".to_vec()))
            .mount(&server)
            .await;

        let request = GenerationRequest::Custom(CustomRequest {
            title: "Cicada Summer".to_string(),
            lyric: "[Verse]\nshells on the bark".to_string(),
            model: "chirp-v4".to_string(),
            tags: "folk".to_string(),
            instrumental: false,
            vocal_gender: VocalGender::Male,
            weirdness_constraint: 0.6,
            style_weight: 0.7,
        });
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = run_generation(&config_for(&server), &request, &options_for(&dir))
            .await
            .expect("generation");
        assert_eq!(outcome.artifacts[0].filename, "Cicada Summer1.mp3");
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_network() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");

        let failure = run_generation(&config_for(&server), &prompt_request("   "), &options_for(&dir))
            .await
            .expect_err("empty prompt");
        assert_eq!(failure.phase, Phase::Validation);
        assert!(matches!(failure.error, GenerationError::Validation(_)));

        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn missing_credential_fails_before_submission() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config {
            api_key: None,
            ..config_for(&server)
        };

        let failure = run_generation(&config, &prompt_request("hello"), &options_for(&dir))
            .await
            .expect_err("no key");
        assert_eq!(failure.phase, Phase::Credentials);
        assert!(failure.to_string().contains("during credential check"));
        assert!(matches!(failure.error, GenerationError::MissingCredential));
        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn unusable_output_directory_fails_before_submission() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"not a directory").expect("write");
        let options = TaskOptions {
            output_directory: Some(blocker.join("sub").to_string_lossy().into_owned()),
            show_progress: false,
        };

        let failure = run_generation(&config_for(&server), &prompt_request("hello"), &options)
            .await
            .expect_err("parent is a regular file");
        assert_eq!(failure.phase, Phase::OutputDirectory);
        assert!(matches!(
            failure.error,
            GenerationError::DirectoryNotWritable { .. }
        ));
        assert!(failure.to_string().contains("during output directory"));
        let requests = server.received_requests().await.expect("recording enabled");
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn rejected_submission_reports_phase() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate/prompt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 401,
                "message": "Invalid token"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let failure = run_generation(&config_for(&server), &prompt_request("hello"), &options_for(&dir))
            .await
            .expect_err("rejected");
        assert_eq!(failure.phase, Phase::Submission);
        let message = failure.to_string();
        assert!(message.contains("during submission"), "{message}");
        assert!(message.contains("Invalid token"), "{message}");
    }

    #[tokio::test]
    async fn remote_error_reports_polling_phase() {
        let server = MockServer::start().await;
        mount_submission(&server, "/generate/prompt").await;
        Mock::given(method("POST"))
            .and(path("/generate/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": [ { "status": "error" } ]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let failure = run_generation(&config_for(&server), &prompt_request("hello"), &options_for(&dir))
            .await
            .expect_err("remote error");
        assert_eq!(failure.phase, Phase::Polling);
        assert!(matches!(failure.error, GenerationError::RemoteJobError { .. }));
    }
}
