// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Provides [`AnthropicClient`] which handles request construction,
//! authentication via `x-api-key` and `anthropic-version` headers, and
//! transient error retry. Call failures come back as [`ProviderFailure`]
//! values so the adapter can fold them into generation outcomes.

use std::time::Duration;

use omnigen_core::{OmnigenError, ProviderFailure};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse, ModelList};

/// Base URL for the Anthropic API.
const API_BASE_URL: &str = "https://api.anthropic.com";

/// Pinned API version header value.
const API_VERSION: &str = "2023-06-01";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// HTTP client for Anthropic API communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503, 529).
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    max_retries: u32,
    base_url: String,
}

impl AnthropicClient {
    /// Creates a new Anthropic API client authenticated with `api_key`.
    pub fn new(api_key: &str) -> Result<Self, OmnigenError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key).map_err(|e| {
                OmnigenError::Config(format!("invalid API key header value: {e}"))
            })?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(API_VERSION),
        );
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OmnigenError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: 1,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL, e.g. for a regional gateway or a test server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sends a completion request and returns the full response.
    ///
    /// On transient errors (429, 500, 503, 529), retries once after a 1-second delay.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ProviderFailure> {
        let url = format!("{}/v1/messages", self.base_url);
        let mut last_failure = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| ProviderFailure::transport(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    ProviderFailure::transport(format!("failed to read response body: {e}"))
                })?;
                return serde_json::from_str(&body).map_err(|e| {
                    ProviderFailure::parse(format!("failed to parse API response: {e}"))
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_failure = Some(ProviderFailure::http_status(
                    status.as_u16(),
                    format!("API returned {status}: {body}"),
                ));
                continue;
            }

            // Non-transient error or exhausted retries.
            return Err(rejection_failure(status, response).await);
        }

        Err(last_failure.unwrap_or_else(|| {
            ProviderFailure::transport("completion request failed after retries")
        }))
    }

    /// Fetches one page of the model catalog. One authenticated GET; the
    /// health probe uses it because it spends no tokens. Not retried.
    pub async fn list_models(&self) -> Result<ModelList, ProviderFailure> {
        let url = format!("{}/v1/models?limit=1", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderFailure::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection_failure(status, response).await);
        }
        response
            .json::<ModelList>()
            .await
            .map_err(|e| ProviderFailure::parse(format!("failed to parse model list: {e}")))
    }
}

/// Maps a non-2xx response into a failure carrying the provider's own
/// message where the error body decodes, and the raw body otherwise.
async fn rejection_failure(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> ProviderFailure {
    let body = response.text().await.unwrap_or_default();
    let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
        format!(
            "Anthropic API error ({}): {}",
            api_err.error.type_, api_err.error.message
        )
    } else {
        format!("API returned {status}: {body}")
    };
    ProviderFailure::http_status(status.as_u16(), message)
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}
