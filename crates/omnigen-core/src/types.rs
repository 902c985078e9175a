// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Omnigen lifecycle.
//!
//! Field names on the serialized structs are part of the external API and
//! must stay stable: `status`, `external_task_id`, `result_url`,
//! `result_urls`, `credits_spent`, `provider_cost`, `error_code`,
//! `error_message`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Current UTC time in the ISO-8601 millisecond form used for all record
/// timestamps, matching the SQL default `strftime('%Y-%m-%dT%H:%M:%fZ','now')`.
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Output modality of a provider adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    Video,
    Audio,
}

/// Lifecycle state of a tracked generation task.
///
/// `pending` and `processing` are live; `completed` and `failed` are
/// terminal and immutable once reached.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Whether the lifecycle state machine permits moving to `next`.
    ///
    /// Legal moves: pending → processing (external task id obtained),
    /// pending → completed or failed (one-shot synchronous result,
    /// creation rejection), processing → completed or failed. Terminal
    /// states admit nothing.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match (self, next) {
            (TaskState::Pending, TaskState::Processing) => true,
            (TaskState::Pending | TaskState::Processing, TaskState::Completed) => true,
            (TaskState::Pending | TaskState::Processing, TaskState::Failed) => true,
            _ => false,
        }
    }
}

/// Normalized view of a provider's own task state, as reported by a status
/// probe. Adapters fold provider-specific vocabularies into this enum
/// (e.g. a provider-side `canceled` folds into `Failed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ExternalTaskState {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

/// Kind of a task audit-trail event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    SentToProvider,
    Poll,
    Completed,
    Failed,
    Timeout,
}

/// Health classification reported by adapter health checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Down,
    /// No credential configured; the provider was not contacted.
    NoKey,
}

/// Result of a single adapter health probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn healthy(latency_ms: u64) -> Self {
        Self {
            status: HealthState::Healthy,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    pub fn degraded(latency_ms: u64, error: impl Into<String>) -> Self {
        Self {
            status: HealthState::Degraded,
            latency_ms: Some(latency_ms),
            error: Some(error.into()),
        }
    }

    pub fn down(error: impl Into<String>) -> Self {
        Self {
            status: HealthState::Down,
            latency_ms: None,
            error: Some(error.into()),
        }
    }

    pub fn no_key() -> Self {
        Self {
            status: HealthState::NoKey,
            latency_ms: None,
            error: None,
        }
    }
}

/// Feature surface reported by an adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub models: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aspect_ratios: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub durations: Vec<u32>,
    #[serde(default)]
    pub supports_audio: bool,
    #[serde(default)]
    pub supports_image_input: bool,
    #[serde(default)]
    pub supports_streaming: bool,
    #[serde(default)]
    pub max_output_count: u32,
}

/// Role of a chat message in a conversational request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of a conversational request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Provider-agnostic generation parameters.
///
/// Each adapter reads the subset it understands and ignores the rest.
/// Persisted verbatim on the task record so async finalization can rebuild
/// usage metrics without the original request in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Clip length in seconds for video models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    /// Whether to generate an audio track alongside video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<bool>,
    /// Reference image URLs for image-to-video or image-conditioned models.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Requested number of outputs for providers that support batches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// A normalized generation request, independent of provider wire formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Prior conversation turns for chat models. The `prompt` field is the
    /// final user turn and is always present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system_prompt: None,
            messages: Vec::new(),
            options: GenerationOptions::default(),
        }
    }
}

/// Billable quantities extracted from a finished generation.
///
/// Token counts come from provider usage accounting only, never from local
/// estimation. Media quantities come from the request parameters and the
/// observed outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub with_audio: bool,
    #[serde(default = "default_output_count")]
    pub output_count: u32,
}

fn default_output_count() -> u32 {
    1
}

impl UsageMetrics {
    pub fn tokens(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            duration_secs: None,
            with_audio: false,
            output_count: 1,
        }
    }

    /// Media usage derived from the request parameters.
    pub fn from_options(options: &GenerationOptions) -> Self {
        Self {
            input_tokens: None,
            output_tokens: None,
            duration_secs: options.duration_secs,
            with_audio: options.sound.unwrap_or(false),
            output_count: options.output_count.unwrap_or(1).max(1),
        }
    }
}

/// Result of one generation, successful or not.
///
/// Provider-call failures are carried here as values; adapters never raise
/// them as `Err` across the trait boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
}

impl GenerationOutcome {
    pub fn ok_text(content: impl Into<String>, usage: UsageMetrics) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            result_urls: Vec::new(),
            usage: Some(usage),
            error_code: None,
            error_message: None,
            raw_response: None,
        }
    }

    pub fn ok_media(result_urls: Vec<String>) -> Self {
        Self {
            success: true,
            content: None,
            result_urls,
            usage: None,
            error_code: None,
            error_message: None,
            raw_response: None,
        }
    }

    pub fn failure(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            result_urls: Vec::new(),
            usage: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            raw_response: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw_response = Some(raw);
        self
    }
}

/// Result of submitting work to a task-based provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreation {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
}

impl TaskCreation {
    pub fn ok(external_task_id: impl Into<String>, raw: serde_json::Value) -> Self {
        Self {
            success: true,
            external_task_id: Some(external_task_id.into()),
            error_code: None,
            error_message: None,
            raw_response: Some(raw),
        }
    }

    pub fn rejected(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            external_task_id: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            raw_response: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw_response = Some(raw);
        self
    }
}

/// Result of one status probe against a task-based provider.
///
/// `success: false` means the *probe itself* failed (transport or decode);
/// a provider-reported task failure is `success: true` with
/// `state: Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusProbe {
    pub success: bool,
    #[serde(skip, default)]
    pub state: Option<ExternalTaskState>,
    /// Provider's own status string, verbatim, for the audit trail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
}

impl TaskStatusProbe {
    pub fn in_progress(
        state: ExternalTaskState,
        external_status: impl Into<String>,
        raw: serde_json::Value,
    ) -> Self {
        Self {
            success: true,
            state: Some(state),
            external_status: Some(external_status.into()),
            result_urls: Vec::new(),
            error_code: None,
            error_message: None,
            raw_response: Some(raw),
        }
    }

    pub fn succeeded(
        result_urls: Vec<String>,
        external_status: impl Into<String>,
        raw: serde_json::Value,
    ) -> Self {
        Self {
            success: true,
            state: Some(ExternalTaskState::Succeeded),
            external_status: Some(external_status.into()),
            result_urls,
            error_code: None,
            error_message: None,
            raw_response: Some(raw),
        }
    }

    pub fn provider_failed(
        error_code: impl Into<String>,
        error_message: impl Into<String>,
        external_status: impl Into<String>,
        raw: serde_json::Value,
    ) -> Self {
        Self {
            success: true,
            state: Some(ExternalTaskState::Failed),
            external_status: Some(external_status.into()),
            result_urls: Vec::new(),
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            raw_response: Some(raw),
        }
    }

    /// Probe-level failure: the provider could not be reached or answered
    /// with an undecodable or error response. Retryable unless the code
    /// says otherwise.
    pub fn probe_error(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            state: None,
            external_status: None,
            result_urls: Vec::new(),
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            raw_response: None,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw_response = Some(raw);
        self
    }
}

/// A tracked generation task as persisted and served over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub provider: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_task_id: Option<String>,
    pub status: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_spent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_cost: Option<f64>,
    /// Normalized request options as JSON, kept for async cost finalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_params: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl TaskRecord {
    /// A fresh `pending` record for a just-submitted request.
    pub fn new(provider: impl Into<String>, request: &GenerationRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider: provider.into(),
            model: request.model.clone(),
            external_task_id: None,
            status: TaskState::Pending,
            result_url: None,
            result_urls: Vec::new(),
            error_code: None,
            error_message: None,
            credits_spent: None,
            provider_cost: None,
            request_params: serde_json::to_string(&request.options).ok(),
            created_at: now_iso(),
            completed_at: None,
        }
    }

    /// Request options round-tripped from `request_params`, defaulting when
    /// absent or unreadable.
    pub fn options(&self) -> GenerationOptions {
        self.request_params
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// One row of a task's append-only audit trail, ordered by `seq`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub seq: i64,
    pub task_id: String,
    pub event_type: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: String,
}

/// An event to append; `seq` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTaskEvent {
    pub task_id: String,
    pub event_type: EventKind,
    pub external_status: Option<String>,
    pub response_data: Option<String>,
    pub error_message: Option<String>,
}

impl NewTaskEvent {
    pub fn created(task_id: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            event_type: EventKind::Created,
            external_status: None,
            response_data: None,
            error_message: None,
        }
    }

    pub fn sent_to_provider(task_id: &str, raw: Option<&serde_json::Value>) -> Self {
        Self {
            task_id: task_id.to_string(),
            event_type: EventKind::SentToProvider,
            external_status: None,
            response_data: raw.map(|v| v.to_string()),
            error_message: None,
        }
    }

    /// A poll event mirroring one status probe, logged regardless of the
    /// probe's outcome.
    pub fn poll(task_id: &str, probe: &TaskStatusProbe) -> Self {
        Self {
            task_id: task_id.to_string(),
            event_type: EventKind::Poll,
            external_status: probe.external_status.clone(),
            response_data: probe.raw_response.as_ref().map(|v| v.to_string()),
            error_message: if probe.success {
                None
            } else {
                probe.error_message.clone()
            },
        }
    }

    pub fn completed(
        task_id: &str,
        external_status: Option<String>,
        raw: Option<&serde_json::Value>,
    ) -> Self {
        Self {
            task_id: task_id.to_string(),
            event_type: EventKind::Completed,
            external_status,
            response_data: raw.map(|v| v.to_string()),
            error_message: None,
        }
    }

    pub fn failed(
        task_id: &str,
        external_status: Option<String>,
        raw: Option<&serde_json::Value>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            task_id: task_id.to_string(),
            event_type: EventKind::Failed,
            external_status,
            response_data: raw.map(|v| v.to_string()),
            error_message,
        }
    }

    pub fn timeout(task_id: &str, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.to_string(),
            event_type: EventKind::Timeout,
            external_status: None,
            response_data: None,
            error_message: Some(message.into()),
        }
    }
}

/// Everything needed to move a task to a terminal state in one atomic step:
/// the record update and the single terminal event.
#[derive(Debug, Clone)]
pub struct TaskFinalization {
    pub status: TaskState,
    pub result_url: Option<String>,
    pub result_urls: Vec<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub credits_spent: Option<f64>,
    pub provider_cost: Option<f64>,
    pub event: NewTaskEvent,
}

impl TaskFinalization {
    pub fn completed(
        result_urls: Vec<String>,
        provider_cost: Option<f64>,
        credits_spent: Option<f64>,
        event: NewTaskEvent,
    ) -> Self {
        Self {
            status: TaskState::Completed,
            result_url: result_urls.first().cloned(),
            result_urls,
            error_code: None,
            error_message: None,
            credits_spent,
            provider_cost,
            event,
        }
    }

    pub fn failed(
        error_code: impl Into<String>,
        error_message: impl Into<String>,
        event: NewTaskEvent,
    ) -> Self {
        Self {
            status: TaskState::Failed,
            result_url: None,
            result_urls: Vec::new(),
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            credits_spent: None,
            provider_cost: None,
            event,
        }
    }
}

/// Listing filter for task queries. Empty filter matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskState>,
}

/// Pagination window for task listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// A claimed poll-queue entry handed to the worker.
#[derive(Debug, Clone)]
pub struct PollTicket {
    pub id: i64,
    pub task_id: String,
    /// 1-based poll attempt this ticket represents.
    pub attempt: u32,
    /// Consecutive probe failures leading up to this attempt.
    pub transport_errors: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_transition_table() {
        use TaskState::*;

        let legal = [
            (Pending, Processing),
            (Pending, Completed),
            (Pending, Failed),
            (Processing, Completed),
            (Processing, Failed),
        ];
        for (from, to) in legal {
            assert!(from.can_transition_to(to), "{from} -> {to} must be legal");
        }

        // Terminal states admit nothing; nothing moves backwards.
        for from in [Completed, Failed] {
            for to in [Pending, Processing, Completed, Failed] {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be illegal");
            }
        }
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn task_state_serializes_lowercase() {
        let json = serde_json::to_string(&TaskState::Processing).expect("serialize");
        assert_eq!(json, "\"processing\"");
        let back: TaskState = serde_json::from_str("\"completed\"").expect("deserialize");
        assert_eq!(back, TaskState::Completed);
        assert_eq!(TaskState::Pending.to_string(), "pending");
    }

    #[test]
    fn event_kind_snake_case_forms() {
        assert_eq!(EventKind::SentToProvider.to_string(), "sent_to_provider");
        assert_eq!(EventKind::Poll.to_string(), "poll");
        assert_eq!(EventKind::Timeout.to_string(), "timeout");
        let json = serde_json::to_string(&EventKind::SentToProvider).expect("serialize");
        assert_eq!(json, "\"sent_to_provider\"");
    }

    #[test]
    fn health_state_no_key_form() {
        assert_eq!(HealthState::NoKey.to_string(), "no_key");
        let json = serde_json::to_string(&HealthReport::no_key()).expect("serialize");
        assert_eq!(json, "{\"status\":\"no_key\"}");
    }

    #[test]
    fn outcome_constructors() {
        let ok = GenerationOutcome::ok_text("hello", UsageMetrics::tokens(10, 5));
        assert!(ok.success);
        assert_eq!(ok.content.as_deref(), Some("hello"));
        assert!(ok.error_code.is_none());

        let failed = GenerationOutcome::failure(crate::error::ErrorCode::Transport, "conn refused");
        assert!(!failed.success);
        assert_eq!(failed.error_code.as_deref(), Some("TRANSPORT"));

        // Provider-native codes pass through verbatim.
        let rejected = GenerationOutcome::failure("500", "server error");
        assert_eq!(rejected.error_code.as_deref(), Some("500"));
    }

    #[test]
    fn usage_from_options_reads_media_fields() {
        let options = GenerationOptions {
            duration_secs: Some(10),
            sound: Some(true),
            output_count: Some(4),
            ..Default::default()
        };
        let usage = UsageMetrics::from_options(&options);
        assert_eq!(usage.duration_secs, Some(10));
        assert!(usage.with_audio);
        assert_eq!(usage.output_count, 4);

        // Defaults: one output, no audio.
        let usage = UsageMetrics::from_options(&GenerationOptions::default());
        assert_eq!(usage.output_count, 1);
        assert!(!usage.with_audio);
    }

    #[test]
    fn new_task_record_starts_pending() {
        let request = GenerationRequest::new("some-model", "a prompt");
        let record = TaskRecord::new("someprovider", &request);
        assert_eq!(record.status, TaskState::Pending);
        assert_eq!(record.provider, "someprovider");
        assert_eq!(record.model, "some-model");
        assert!(record.external_task_id.is_none());
        assert!(!record.id.is_empty());
        assert!(record.created_at.ends_with('Z'));
        // Options survive the params round-trip.
        assert_eq!(record.options().output_count, None);
    }

    #[test]
    fn record_params_round_trip() {
        let mut request = GenerationRequest::new("m", "p");
        request.options.duration_secs = Some(5);
        request.options.sound = Some(false);
        let record = TaskRecord::new("prov", &request);
        let options = record.options();
        assert_eq!(options.duration_secs, Some(5));
        assert_eq!(options.sound, Some(false));
    }

    #[test]
    fn record_serialization_field_names() {
        let request = GenerationRequest::new("m", "p");
        let mut record = TaskRecord::new("prov", &request);
        record.status = TaskState::Completed;
        record.result_urls = vec!["https://cdn.example/out.mp4".into()];
        record.result_url = record.result_urls.first().cloned();
        record.credits_spent = Some(0.55);
        record.provider_cost = Some(0.275);

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["result_url"], "https://cdn.example/out.mp4");
        assert_eq!(value["credits_spent"], 0.55);
        assert_eq!(value["provider_cost"], 0.275);
        assert!(value.get("error_code").is_none());
    }

    #[test]
    fn poll_event_mirrors_probe() {
        let probe = TaskStatusProbe::in_progress(
            ExternalTaskState::Processing,
            "processing",
            serde_json::json!({"status": "processing"}),
        );
        let event = NewTaskEvent::poll("task-1", &probe);
        assert_eq!(event.event_type, EventKind::Poll);
        assert_eq!(event.external_status.as_deref(), Some("processing"));
        assert!(event.response_data.is_some());
        assert!(event.error_message.is_none());

        let failed_probe = TaskStatusProbe::probe_error("TRANSPORT", "connect timeout");
        let event = NewTaskEvent::poll("task-1", &failed_probe);
        assert_eq!(event.error_message.as_deref(), Some("connect timeout"));
        assert!(event.response_data.is_none());
    }
}
