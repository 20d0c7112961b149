//! HTTP client for the YourMusic.Fun service.
//!
//! Service calls are bounded by the request timeout. Artifact downloads
//! share it as a connect timeout and get their own, longer ceiling for the
//! body. Service calls send the bearer credential; downloads go to
//! arbitrary hosts and do not.

use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::{GenerationError, Result};
use crate::logging;
use crate::utils::truncate_with_ellipsis;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Client for YourMusic.Fun API requests.
#[derive(Clone)]
#[must_use]
pub struct YourMusicClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
    download_timeout: Duration,
}

// === YourMusicClient ===

impl YourMusicClient {
    /// Create a client from config. Fails without touching the network when
    /// no API key is configured.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.yourmusic_api_key()?;
        let base_url = config.yourmusic_base_url();
        let request_timeout = config.request_timeout();
        let download_timeout = config.download_timeout();

        logging::info(format!("YourMusic base URL: {base_url}"));

        let http_client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| GenerationError::transport("Failed to build HTTP client", e))?;

        Ok(Self {
            http_client,
            base_url,
            api_key,
            request_timeout,
            download_timeout,
        })
    }

    /// POST a JSON body to a service path and parse the JSON response.
    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| GenerationError::transport(format!("Failed to reach {url}"), e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read body: {e})"));
            return Err(GenerationError::HttpStatus {
                url,
                status: status.as_u16(),
                body: truncate_with_ellipsis(&text, MAX_ERROR_BODY_CHARS, "..."),
            });
        }

        let text = response.text().await.map_err(|e| {
            GenerationError::transport(format!("Failed to read response from {url}"), e)
        })?;
        serde_json::from_str(&text).map_err(|e| {
            GenerationError::malformed(format!("Failed to parse response from {url}"), e)
        })
    }

    /// Fetch an artifact. Anything other than HTTP 200 is a failed download.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        tracing::debug!(%url, "GET artifact");

        let response = self
            .http_client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| GenerationError::transport(format!("Failed to download {url}"), e))?;

        if response.status() != StatusCode::OK {
            return Err(GenerationError::DownloadFailed {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| GenerationError::transport(format!("Failed to read body of {url}"), e))
    }
}
