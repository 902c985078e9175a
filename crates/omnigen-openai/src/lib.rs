// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI Chat Completions provider adapter for the Omnigen aggregator.
//!
//! This crate implements [`ProviderAdapter`] for the Chat Completions API:
//! synchronous single-shot generation with provider-reported token usage,
//! plus a streaming variant for direct conversational callers. The task
//! orchestrator only ever uses `generate`.

pub mod client;
pub mod sse;
pub mod types;

use std::pin::Pin;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use omnigen_core::pricing::{AdapterDescriptor, PriceDescriptor, PricingTable};
use omnigen_core::traits::ProviderAdapter;
use omnigen_core::{
    Capabilities, ErrorCode, GenerationOutcome, GenerationRequest, HealthReport, Modality,
    OmnigenError, ProviderFailure, UsageMetrics,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::sse::StreamEvent;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest, WireMessage};

/// OpenAI chat provider implementing [`ProviderAdapter`].
///
/// Synchronous: one request reaches a terminal outcome, no external task
/// id, no polling.
pub struct OpenAiAdapter {
    client: OpenAiClient,
    descriptor: AdapterDescriptor,
}

/// One increment of a streamed completion: appended text, the finish
/// reason on the closing chunk, token usage on the final accounting chunk.
#[derive(Debug, Clone, Default)]
pub struct StreamDelta {
    pub text: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<UsageMetrics>,
}

impl OpenAiAdapter {
    /// Creates an adapter authenticated with `api_key`.
    pub fn new(api_key: &str) -> Result<Self, OmnigenError> {
        let client = OpenAiClient::new(api_key)?;
        info!("OpenAI adapter initialized");
        Ok(Self {
            client,
            descriptor: descriptor(),
        })
    }

    /// Points the adapter at a different API host (gateway or test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(base_url);
        self
    }

    /// Streams a completion as incremental [`StreamDelta`]s.
    ///
    /// Convenience surface for conversational callers, outside the
    /// outcome-value contract of [`ProviderAdapter::generate`]; failures
    /// surface as [`OmnigenError::Internal`] carrying the classified code
    /// and message.
    pub async fn stream_generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamDelta, OmnigenError>> + Send>>, OmnigenError>
    {
        let api_request = build_chat_request(request, true);
        let events = self
            .client
            .stream_chat(&api_request)
            .await
            .map_err(failure_to_error)?;

        let deltas = events.filter_map(|result| async move {
            match result {
                Ok(StreamEvent::Chunk(chunk)) => Some(Ok(chunk_to_delta(chunk))),
                Ok(StreamEvent::Done) => None,
                Err(failure) => Some(Err(failure_to_error(failure))),
            }
        });
        Ok(Box::pin(deltas))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        let api_request = build_chat_request(&request, false);
        match self.client.complete_chat(&api_request).await {
            Ok(response) => {
                let content = response
                    .choices
                    .iter()
                    .filter_map(|choice| choice.message.content.as_deref())
                    .collect::<Vec<_>>()
                    .join("");
                let usage = UsageMetrics::tokens(
                    response.usage.prompt_tokens,
                    response.usage.completion_tokens,
                );
                GenerationOutcome::ok_text(content, usage)
            }
            Err(failure) => GenerationOutcome::failure(failure.error_code, failure.message),
        }
    }

    fn calculate_cost(&self, model: &str, usage: &UsageMetrics) -> Result<f64, OmnigenError> {
        omnigen_cost::compute_provider_cost(
            &self.descriptor.name,
            &self.descriptor.pricing,
            model,
            usage,
        )
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            models: self.descriptor.pricing.model_ids().map(String::from).collect(),
            supports_streaming: true,
            max_output_count: 1,
            ..Default::default()
        }
    }

    async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        match self.client.list_models().await {
            Ok(_) => HealthReport::healthy(started.elapsed().as_millis() as u64),
            Err(failure) if failure.error_code == ErrorCode::Transport.as_str() => {
                HealthReport::down(failure.message)
            }
            Err(failure) => HealthReport::degraded(
                started.elapsed().as_millis() as u64,
                format!("{}: {}", failure.error_code, failure.message),
            ),
        }
    }

    async fn shutdown(&self) -> Result<(), OmnigenError> {
        debug!("OpenAI adapter shutting down");
        Ok(())
    }
}

/// Converts a normalized [`GenerationRequest`] into the Chat Completions
/// wire shape. The system prompt becomes a leading system message, prior
/// turns follow in order, and `prompt` is always the final user message.
fn build_chat_request(request: &GenerationRequest, stream: bool) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 2);
    if let Some(system) = &request.system_prompt {
        messages.push(WireMessage {
            role: "system".to_string(),
            content: system.clone(),
        });
    }
    for turn in &request.messages {
        messages.push(WireMessage {
            role: turn.role.to_string(),
            content: turn.content.clone(),
        });
    }
    messages.push(WireMessage {
        role: "user".to_string(),
        content: request.prompt.clone(),
    });

    ChatCompletionRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.options.max_tokens,
        temperature: request.options.temperature,
        stream,
        stream_options: None,
    }
}

/// Maps an SSE chunk to a [`StreamDelta`], reading the first choice only
/// (Omnigen never requests more than one).
fn chunk_to_delta(chunk: ChatCompletionChunk) -> StreamDelta {
    let mut delta = StreamDelta::default();
    if let Some(choice) = chunk.choices.into_iter().next() {
        delta.text = choice.delta.content;
        delta.finish_reason = choice.finish_reason;
    }
    if let Some(usage) = chunk.usage {
        delta.usage = Some(UsageMetrics::tokens(
            usage.prompt_tokens,
            usage.completion_tokens,
        ));
    }
    delta
}

/// Conversion for the streaming convenience path, where no outcome value
/// exists to carry the failure.
fn failure_to_error(failure: ProviderFailure) -> OmnigenError {
    OmnigenError::Internal(format!("{}: {}", failure.error_code, failure.message))
}

fn pricing() -> PricingTable {
    PricingTable::new()
        .with_model("gpt-4o", PriceDescriptor::tokens(0.0025, 0.01))
        .with_model("gpt-4o-mini", PriceDescriptor::tokens(0.000_15, 0.000_6))
        .with_model("gpt-4.1", PriceDescriptor::tokens(0.002, 0.008))
        .with_model("gpt-4.1-mini", PriceDescriptor::tokens(0.000_4, 0.001_6))
}

/// Static identity of this adapter, constructible without a credential.
pub fn descriptor() -> AdapterDescriptor {
    AdapterDescriptor::new("openai", "OpenAI", Modality::Text, pricing())
}
