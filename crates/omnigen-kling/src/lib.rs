// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kling video provider adapter for the Omnigen aggregator.
//!
//! This crate implements [`TaskProviderAdapter`] for Kling's
//! create-and-poll video API. Model ids carry a family suffix
//! (`kling-2.6/text-to-video`) that selects the endpoint; the version
//! half travels in the payload. Creation rejections arrive as non-200
//! envelope codes under HTTP 200 and are preserved verbatim, and results
//! come back as a nested `resultJson` string needing its own decode.

pub mod client;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use omnigen_core::poll::{PollProfile, run_to_completion};
use omnigen_core::pricing::{AdapterDescriptor, PriceDescriptor, PriceUnit, PricingTable};
use omnigen_core::traits::{ProviderAdapter, TaskProviderAdapter};
use omnigen_core::{
    Capabilities, ErrorCode, ExternalTaskState, GenerationOutcome, GenerationRequest,
    HealthReport, Modality, OmnigenError, ProviderFailure, TaskCreation, TaskStatusProbe,
    UsageMetrics,
};
use tracing::{debug, info};

use crate::client::KlingClient;
use crate::types::{CreateTaskRequest, ResultPayload};

/// Kling video provider implementing [`TaskProviderAdapter`].
///
/// Task-based: creation returns an external task id which is then polled
/// until the provider reports `success` or `fail`.
pub struct KlingAdapter {
    client: KlingClient,
    descriptor: AdapterDescriptor,
}

impl KlingAdapter {
    /// Creates an adapter authenticated with `api_key`.
    pub fn new(api_key: &str) -> Result<Self, OmnigenError> {
        let client = KlingClient::new(api_key)?;
        info!("Kling adapter initialized");
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
impl ProviderAdapter for KlingAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    /// Blocking convenience: runs the full create-and-poll cycle
    /// in-process. Long-running callers go through the orchestrator
    /// instead.
    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        run_to_completion(self, &request).await
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
            aspect_ratios: vec!["16:9".into(), "9:16".into(), "1:1".into()],
            durations: vec![5, 10],
            supports_audio: true,
            supports_image_input: true,
            supports_streaming: false,
            max_output_count: 1,
        }
    }

    async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        match self.client.account_credits().await {
            Ok(envelope) if envelope.is_ok() => {
                HealthReport::healthy(started.elapsed().as_millis() as u64)
            }
            Ok(envelope) => HealthReport::degraded(
                started.elapsed().as_millis() as u64,
                format!("{}: {}", envelope.code, envelope.msg),
            ),
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
        debug!("Kling adapter shutting down");
        Ok(())
    }
}

#[async_trait]
impl TaskProviderAdapter for KlingAdapter {
    async fn create_task(&self, request: &GenerationRequest) -> TaskCreation {
        let Some((version, family)) = split_model(&request.model) else {
            return TaskCreation::rejected(
                ErrorCode::ProviderRejected,
                format!(
                    "unrecognized model id `{}`: expected `<version>/<family>`",
                    request.model
                ),
            );
        };

        let payload = build_create_request(request, version);
        let (envelope, raw) = match self.client.create_task(family, &payload).await {
            Ok(pair) => pair,
            Err(failure) => {
                return TaskCreation::rejected(failure.error_code, failure.message);
            }
        };

        if !envelope.is_ok() {
            return TaskCreation::rejected(envelope.code.to_string(), envelope.msg)
                .with_raw(raw);
        }
        match envelope.data {
            Some(created) => TaskCreation::ok(created.task_id, raw),
            None => TaskCreation::rejected(
                ErrorCode::ParseError,
                "creation reply carried no task id",
            )
            .with_raw(raw),
        }
    }

    async fn get_task_status(&self, external_task_id: &str) -> TaskStatusProbe {
        let (envelope, raw) = match self.client.task_record(external_task_id).await {
            Ok(pair) => pair,
            Err(failure) => {
                return TaskStatusProbe::probe_error(failure.error_code, failure.message);
            }
        };

        if !envelope.is_ok() {
            return TaskStatusProbe::probe_error(envelope.code.to_string(), envelope.msg)
                .with_raw(raw);
        }
        let Some(record) = envelope.data else {
            return TaskStatusProbe::probe_error(
                ErrorCode::ParseError,
                "status reply carried no task record",
            )
            .with_raw(raw);
        };

        match record.state.as_str() {
            "success" => match decode_result(record.result_json.as_deref()) {
                Ok(urls) => TaskStatusProbe::succeeded(urls, record.state, raw),
                Err(failure) => {
                    TaskStatusProbe::probe_error(failure.error_code, failure.message)
                        .with_raw(raw)
                }
            },
            "fail" => TaskStatusProbe::provider_failed(
                record
                    .fail_code
                    .unwrap_or_else(|| ErrorCode::ProviderTaskFailed.into()),
                record
                    .fail_msg
                    .unwrap_or_else(|| "provider reported failure without detail".to_string()),
                record.state,
                raw,
            ),
            // Anything else is in flight. Words this adapter does not
            // recognize must never terminate a task.
            _ => TaskStatusProbe::in_progress(in_flight_state(&record.state), record.state, raw),
        }
    }

    fn poll_profile(&self) -> PollProfile {
        // Video renders take minutes; 10s x 60 gives a 10-minute window.
        PollProfile::new(Duration::from_secs(10), 60)
    }
}

/// Splits a model id into its version and family halves:
/// `kling-2.6/text-to-video` → `("kling-2.6", "text-to-video")`.
fn split_model(model: &str) -> Option<(&str, &str)> {
    model.split_once('/').filter(|(v, f)| !v.is_empty() && !f.is_empty())
}

fn build_create_request(request: &GenerationRequest, version: &str) -> CreateTaskRequest {
    CreateTaskRequest {
        model: version.to_string(),
        prompt: request.prompt.clone(),
        negative_prompt: request.options.negative_prompt.clone(),
        duration: request.options.duration_secs.map(|d| d.to_string()),
        aspect_ratio: request.options.aspect_ratio.clone(),
        sound: request.options.sound,
        image_url: request.options.image_urls.first().cloned(),
    }
}

fn in_flight_state(state: &str) -> ExternalTaskState {
    if state == "pending" {
        ExternalTaskState::Pending
    } else {
        ExternalTaskState::Processing
    }
}

/// Second decode for the `resultJson` string carried by success records.
/// A success record without decodable results is a parse failure, which
/// the poll loop treats as terminal.
fn decode_result(result_json: Option<&str>) -> Result<Vec<String>, ProviderFailure> {
    let text = result_json
        .ok_or_else(|| ProviderFailure::parse("success record carried no resultJson"))?;
    let payload: ResultPayload = serde_json::from_str(text)
        .map_err(|e| ProviderFailure::parse(format!("undecodable resultJson: {e}")))?;
    Ok(payload.result_urls)
}

fn pricing() -> PricingTable {
    let kling_26 = || {
        PriceDescriptor::per_unit(PriceUnit::Video, 0.275)
            .with_variant("5s", 0.275)
            .with_variant("5s_audio", 0.55)
            .with_variant("10s", 0.55)
            .with_variant("10s_audio", 1.1)
    };
    PricingTable::new()
        .with_model("kling-2.6/text-to-video", kling_26())
        .with_model("kling-2.6/image-to-video", kling_26())
        .with_model(
            "kling-2.5-turbo/text-to-video",
            PriceDescriptor::per_unit(PriceUnit::Video, 0.21)
                .with_variant("5s", 0.21)
                .with_variant("10s", 0.42),
        )
}

/// Static identity of this adapter, constructible without a credential.
pub fn descriptor() -> AdapterDescriptor {
    AdapterDescriptor::new("kling", "Kling", Modality::Video, pricing())
}
