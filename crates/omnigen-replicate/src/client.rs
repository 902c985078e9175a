// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Replicate predictions API.
//!
//! [`ReplicateClient`] handles bearer authentication, transient-error
//! retry on creation, and prediction decoding. Typed predictions are
//! returned together with the verbatim body so the adapter can attach it
//! to outcomes for the audit trail.

use std::time::Duration;

use omnigen_core::{OmnigenError, ProviderFailure};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{Account, ApiErrorResponse, CreatePredictionRequest, Prediction};

/// Base URL for the Replicate API.
const API_BASE_URL: &str = "https://api.replicate.com";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for Replicate API communication.
///
/// Manages bearer authentication, connection pooling, and retry logic for
/// transient errors (429, 500, 503, 529) on prediction creation.
#[derive(Debug, Clone)]
pub struct ReplicateClient {
    client: reqwest::Client,
    max_retries: u32,
    base_url: String,
}

impl ReplicateClient {
    /// Creates a new Replicate API client authenticated with `api_token`.
    pub fn new(api_token: &str) -> Result<Self, OmnigenError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {api_token}")).map_err(|e| {
                OmnigenError::Config(format!("invalid API token header value: {e}"))
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

    /// Overrides the base URL, e.g. for a proxy or a test server.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Creates a prediction and returns the initial resource (normally in
    /// `starting` state).
    ///
    /// On transient errors (429, 500, 503, 529), retries once after a
    /// 1-second delay.
    pub async fn create_prediction(
        &self,
        request: &CreatePredictionRequest,
    ) -> Result<(Prediction, serde_json::Value), ProviderFailure> {
        let url = format!("{}/v1/predictions", self.base_url);
        let mut last_failure = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying prediction creation after transient error");
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
            debug!(status = %status, attempt, "prediction creation response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| {
                    ProviderFailure::transport(format!("failed to read response body: {e}"))
                })?;
                return decode_prediction(&body);
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
            ProviderFailure::transport("prediction creation failed after retries")
        }))
    }

    /// Fetches the current state of a prediction. Not retried: the poll
    /// loop owns the cadence and absorbs transient probe failures.
    pub async fn get_prediction(
        &self,
        prediction_id: &str,
    ) -> Result<(Prediction, serde_json::Value), ProviderFailure> {
        let url = format!("{}/v1/predictions/{prediction_id}", self.base_url);
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
        decode_prediction(&body)
    }

    /// Fetches the authenticated account. One cheap GET; the health probe
    /// uses it because it creates nothing. Not retried.
    pub async fn account(&self) -> Result<Account, ProviderFailure> {
        let url = format!("{}/v1/account", self.base_url);
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
            .json::<Account>()
            .await
            .map_err(|e| ProviderFailure::parse(format!("failed to parse account: {e}")))
    }
}

/// Decodes a body into its typed prediction plus the verbatim JSON value.
fn decode_prediction(
    body: &str,
) -> Result<(Prediction, serde_json::Value), ProviderFailure> {
    let raw: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ProviderFailure::parse(format!("undecodable response body: {e}")))?;
    let prediction: Prediction = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderFailure::parse(format!("unexpected prediction shape: {e}")))?;
    Ok((prediction, raw))
}

/// Maps a non-2xx response into a failure carrying the provider's own
/// message where the error body decodes.
async fn rejection_failure(
    status: reqwest::StatusCode,
    response: reqwest::Response,
) -> ProviderFailure {
    let body = response.text().await.unwrap_or_default();
    let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
        format!("Replicate API error: {}", api_err.detail)
    } else {
        format!("API returned {status}: {body}")
    };
    ProviderFailure::http_status(status.as_u16(), message)
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}
