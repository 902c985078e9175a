// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI Chat Completions API.
//!
//! Provides [`OpenAiClient`] which handles request construction, bearer
//! authentication, streaming SSE responses, and transient error retry.
//! Call failures come back as [`ProviderFailure`] values so the adapter
//! can fold them into generation outcomes.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use omnigen_core::{OmnigenError, ProviderFailure};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::sse::{self, StreamEvent};
use crate::types::{
    ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse, ModelList, StreamOptions,
};

/// Base URL for the OpenAI API.
const API_BASE_URL: &str = "https://api.openai.com";

/// Per-request timeout. Chat completions finish well inside this; the
/// task-level polling budget is a separate concern.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// HTTP client for OpenAI API communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503, 529).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    max_retries: u32,
    base_url: String,
}

impl OpenAiClient {
    /// Creates a new OpenAI API client authenticated with `api_key`.
    pub fn new(api_key: &str) -> Result<Self, OmnigenError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                OmnigenError::Config(format!("invalid API key header value: {e}"))
            })?,
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

    /// Sends a non-streaming request and returns the parsed completion.
    ///
    /// On transient errors (429, 500, 503, 529), retries once after a 1-second delay.
    pub async fn complete_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderFailure> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut req = request.clone();
        req.stream = false;
        req.stream_options = None;

        let mut last_failure = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&req)
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

    /// Sends a streaming request and returns a stream of SSE events.
    ///
    /// Usage reporting is enabled so the final chunk carries token counts.
    /// On transient errors (429, 500, 503, 529), retries once after a 1-second delay.
    pub async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<
        Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderFailure>> + Send>>,
        ProviderFailure,
    > {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut req = request.clone();
        req.stream = true;
        req.stream_options = Some(StreamOptions {
            include_usage: true,
        });

        let mut last_failure = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&req)
                .send()
                .await
                .map_err(|e| ProviderFailure::transport(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            debug!(status = %status, attempt, "streaming response received");

            if status.is_success() {
                return Ok(sse::parse_sse_stream(response));
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

            return Err(rejection_failure(status, response).await);
        }

        Err(last_failure.unwrap_or_else(|| {
            ProviderFailure::transport("streaming request failed after retries")
        }))
    }

    /// Fetches the model catalog. One authenticated GET; the health probe
    /// uses it because it spends no tokens. Not retried: a health check
    /// should observe failures, not mask them.
    pub async fn list_models(&self) -> Result<ModelList, ProviderFailure> {
        let url = format!("{}/v1/models", self.base_url);
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
        match api_err.error.type_ {
            Some(type_) => format!("OpenAI API error ({type_}): {}", api_err.error.message),
            None => format!("OpenAI API error: {}", api_err.error.message),
        }
    } else {
        format!("API returned {status}: {body}")
    };
    ProviderFailure::http_status(status.as_u16(), message)
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}
