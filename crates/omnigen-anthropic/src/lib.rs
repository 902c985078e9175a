// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages provider adapter for the Omnigen aggregator.
//!
//! This crate implements [`ProviderAdapter`] for the Anthropic Messages
//! API: synchronous single-shot generation with provider-reported token
//! usage. The system prompt travels separately from the conversation and
//! `max_tokens` is mandatory on the wire, so the adapter supplies a
//! default when the caller set none.

pub mod client;
pub mod types;

use std::time::Instant;

use async_trait::async_trait;
use omnigen_core::pricing::{AdapterDescriptor, PriceDescriptor, PricingTable};
use omnigen_core::traits::ProviderAdapter;
use omnigen_core::{
    Capabilities, ChatRole, ErrorCode, GenerationOutcome, GenerationRequest, HealthReport,
    Modality, OmnigenError, UsageMetrics,
};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest, ResponseContentBlock};

/// Applied when the caller did not set `max_tokens`; the API rejects
/// requests without one.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Messages provider implementing [`ProviderAdapter`].
///
/// Synchronous: one request reaches a terminal outcome, no external task
/// id, no polling.
pub struct AnthropicAdapter {
    client: AnthropicClient,
    descriptor: AdapterDescriptor,
}

impl AnthropicAdapter {
    /// Creates an adapter authenticated with `api_key`.
    pub fn new(api_key: &str) -> Result<Self, OmnigenError> {
        let client = AnthropicClient::new(api_key)?;
        info!("Anthropic adapter initialized");
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
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        let api_request = build_message_request(&request);
        match self.client.complete_message(&api_request).await {
            Ok(response) => {
                let content = response
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ResponseContentBlock::Text { text } => Some(text.as_str()),
                        ResponseContentBlock::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");
                let usage = UsageMetrics::tokens(
                    response.usage.input_tokens,
                    response.usage.output_tokens,
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
        debug!("Anthropic adapter shutting down");
        Ok(())
    }
}

/// Converts a normalized [`GenerationRequest`] into the Messages wire
/// shape. System text (the request's system prompt plus any system turns
/// in the history, which the API rejects inline) is carried in the
/// top-level `system` field; `prompt` is always the final user message.
fn build_message_request(request: &GenerationRequest) -> MessageRequest {
    let mut system_parts: Vec<&str> = Vec::new();
    if let Some(system) = request.system_prompt.as_deref() {
        system_parts.push(system);
    }

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    for turn in &request.messages {
        match turn.role {
            ChatRole::System => system_parts.push(&turn.content),
            ChatRole::User | ChatRole::Assistant => messages.push(ApiMessage {
                role: turn.role.to_string(),
                content: turn.content.clone(),
            }),
        }
    }
    messages.push(ApiMessage {
        role: "user".to_string(),
        content: request.prompt.clone(),
    });

    MessageRequest {
        model: request.model.clone(),
        messages,
        system: if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        },
        max_tokens: request.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: request.options.temperature,
    }
}

fn pricing() -> PricingTable {
    PricingTable::new()
        .with_model(
            "claude-sonnet-4-20250514",
            PriceDescriptor::tokens(0.003, 0.015),
        )
        .with_model(
            "claude-opus-4-20250514",
            PriceDescriptor::tokens(0.015, 0.075),
        )
        .with_model(
            "claude-3-5-haiku-20241022",
            PriceDescriptor::tokens(0.000_8, 0.004),
        )
}

/// Static identity of this adapter, constructible without a credential.
pub fn descriptor() -> AdapterDescriptor {
    AdapterDescriptor::new("anthropic", "Anthropic", Modality::Text, pricing())
}
