// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI Chat Completions request/response types and SSE chunk types.

use serde::{Deserialize, Serialize};

// --- Request types ---

/// A request to the Chat Completions API.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model identifier (e.g., "gpt-4o").
    pub model: String,

    /// Ordered conversation messages, system turn first.
    pub messages: Vec<WireMessage>,

    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Whether to stream the response.
    pub stream: bool,

    /// Streaming options; only valid together with `stream: true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

/// Extra options for streaming requests.
#[derive(Debug, Clone, Serialize)]
pub struct StreamOptions {
    /// Ask the provider to append a final chunk carrying token usage.
    pub include_usage: bool,
}

/// A single message in the Chat Completions conversation format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    pub content: String,
}

// --- Response types ---

/// A full response from the Chat Completions API.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Response ID.
    pub id: String,
    /// Model that generated the response.
    pub model: String,
    /// Completion choices; one unless `n > 1` was requested.
    pub choices: Vec<Choice>,
    /// Token usage statistics.
    pub usage: ChatUsage,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub index: u32,
    /// The generated assistant message.
    pub message: ResponseMessage,
    /// Reason the generation stopped ("stop", "length", ...).
    pub finish_reason: Option<String>,
}

/// The assistant message within a choice.
///
/// `content` is null when the model produced only tool calls; Omnigen does
/// not request tools, but the field stays optional so such responses still
/// decode.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
}

/// Token accounting reported by the API.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatUsage {
    /// Number of input tokens consumed.
    pub prompt_tokens: u64,
    /// Number of output tokens generated.
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

// --- SSE chunk types ---

/// One streamed chunk of a chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    /// Empty on the final usage-only chunk.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Present only on the final chunk when usage reporting was requested.
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

/// One choice within a streamed chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    /// Incremental fields for this choice.
    pub delta: ChunkDelta,
    /// Set on the chunk that closes the choice.
    pub finish_reason: Option<String>,
}

/// Incremental fields within a streamed choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

// --- Error and catalog types ---

/// API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// Error detail within an API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    /// Human-readable error message.
    pub message: String,
    /// Error class identifier (e.g., "invalid_request_error").
    #[serde(rename = "type")]
    pub type_: Option<String>,
    /// Machine-readable code where the API provides one.
    #[serde(default)]
    pub code: Option<String>,
}

/// Response of `GET /v1/models`, used by the health probe.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    pub data: Vec<ModelEntry>,
}

/// One catalog entry in the model list.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}
