// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Kling video API.
//!
//! Kling answers almost every request with HTTP 200 and carries the real
//! verdict in a `{code, msg, data}` envelope; `code == 200` is the only
//! success value. Task records report coarse states
//! (`pending|processing|success|fail`) and deliver results as
//! `resultJson` — a JSON *string* that needs a second decode.

use serde::{Deserialize, Serialize};

/// Response envelope wrapped around every Kling payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Whether the envelope reports success. The HTTP status is no signal
    /// here; rejections ride under HTTP 200.
    pub fn is_ok(&self) -> bool {
        self.code == 200
    }
}

/// Body of a task creation request.
///
/// The endpoint path already selects the family (text-to-video or
/// image-to-video); `model` carries only the version half of the model id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Clip length in seconds, as a string enum (`"5"` or `"10"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// `data` payload of a successful creation envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    pub task_id: String,
}

/// `data` payload of a status probe.
///
/// `state` is kept verbatim: the audit trail stores the provider's own
/// wording, and words this adapter does not recognize must stay
/// non-terminal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_id: String,
    pub state: String,
    #[serde(default)]
    pub result_json: Option<String>,
    #[serde(default)]
    pub fail_code: Option<String>,
    #[serde(default)]
    pub fail_msg: Option<String>,
}

/// Decoded form of [`TaskRecord::result_json`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    #[serde(default)]
    pub result_urls: Vec<String>,
}

/// `data` payload of the account credits endpoint, used as a health probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCredits {
    #[serde(default)]
    pub remaining_credits: f64,
}
