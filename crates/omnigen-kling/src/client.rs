// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Kling video API.
//!
//! [`KlingClient`] owns transport only: authentication, retry on transient
//! HTTP errors, and envelope decoding. It does *not* interpret envelope
//! codes — a `{code: 500}` under HTTP 200 comes back as a successfully
//! decoded [`Envelope`] for the adapter to classify. Typed payloads are
//! returned together with the verbatim body so the adapter can attach it
//! to outcomes for the audit trail.

use std::time::Duration;

use omnigen_core::{OmnigenError, ProviderFailure};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{AccountCredits, CreateTaskRequest, CreatedTask, Envelope, TaskRecord};

/// Base URL for the Kling API.
const API_BASE_URL: &str = "https://api.klingai.com";

/// Per-request timeout. Creation and status calls are quick; the heavy
/// work happens provider-side between polls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for Kling API communication.
///
/// Manages bearer authentication, connection pooling, and retry logic for
/// transient errors (429, 500, 503, 529) on task creation.
#[derive(Debug, Clone)]
pub struct KlingClient {
    client: reqwest::Client,
    max_retries: u32,
    base_url: String,
}

impl KlingClient {
    /// Creates a new Kling API client authenticated with `api_key`.
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

    /// Submits a generation task to the family endpoint (`text-to-video`
    /// or `image-to-video`).
    ///
    /// On transient HTTP errors (429, 500, 503, 529), retries once after a
    /// 1-second delay; envelope-level rejections are never retried.
    pub async fn create_task(
        &self,
        family: &str,
        request: &CreateTaskRequest,
    ) -> Result<(Envelope<CreatedTask>, serde_json::Value), ProviderFailure> {
        let url = format!("{}/v1/videos/{family}", self.base_url);
        let mut last_failure = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying task creation after transient error");
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
            debug!(status = %status, attempt, "task creation response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    ProviderFailure::transport(format!("failed to read response body: {e}"))
                })?;
                return decode_envelope(&body);
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
            ProviderFailure::transport("task creation failed after retries")
        }))
    }

    /// Fetches the current record of a submitted task. Not retried: the
    /// poll loop owns the cadence and absorbs transient probe failures.
    pub async fn task_record(
        &self,
        external_task_id: &str,
    ) -> Result<(Envelope<TaskRecord>, serde_json::Value), ProviderFailure> {
        let url = format!("{}/v1/videos/record-info", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("taskId", external_task_id)])
            .send()
            .await
            .map_err(|e| ProviderFailure::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection_failure(status, response).await);
        }
        let body = response.text().await.map_err(|e| {
            ProviderFailure::transport(format!("failed to read response body: {e}"))
        })?;
        decode_envelope(&body)
    }

    /// Fetches the account credit balance. One authenticated GET; the
    /// health probe uses it because it creates nothing. Not retried.
    pub async fn account_credits(&self) -> Result<Envelope<AccountCredits>, ProviderFailure> {
        let url = format!("{}/v1/account/credits", self.base_url);
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
        let body = response.text().await.map_err(|e| {
            ProviderFailure::transport(format!("failed to read response body: {e}"))
        })?;
        let (envelope, _) = decode_envelope(&body)?;
        Ok(envelope)
    }
}

/// Decodes a body into its typed envelope plus the verbatim JSON value.
fn decode_envelope<T: DeserializeOwned>(
    body: &str,
) -> Result<(Envelope<T>, serde_json::Value), ProviderFailure> {
    let raw: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProviderFailure::parse(format!("undecodable response body: {e}")))?;
    let envelope: Envelope<T> = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderFailure::parse(format!("unexpected envelope shape: {e}")))?;
    Ok((envelope, raw))
}

/// Maps a non-2xx response into a failure carrying the provider's own
/// message where the body still decodes as an envelope.
async fn rejection_failure(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> ProviderFailure {
    let body = response.text().await.unwrap_or_default();
    let message =
        if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
            format!("Kling API error ({}): {}", envelope.code, envelope.msg)
        } else {
            format!("API returned {status}: {body}")
        };
    ProviderFailure::http_status(status.as_u16(), message)
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}
