// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replicate provider adapter for the Omnigen aggregator.
//!
//! This crate implements [`TaskProviderAdapter`] over Replicate's
//! prediction API: POST creates a prediction in `starting` state, GET
//! reports `starting | processing | succeeded | failed | canceled`, and
//! results arrive directly in `output` as a URL string or a list of
//! them. A remotely canceled prediction is reported as a failed task.

pub mod client;
pub mod types;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use omnigen_core::poll::{PollProfile, run_to_completion};
use omnigen_core::pricing::{AdapterDescriptor, PriceDescriptor, PriceUnit, PricingTable};
use omnigen_core::traits::{ProviderAdapter, TaskProviderAdapter};
use omnigen_core::{
    Capabilities, ErrorCode, ExternalTaskState, GenerationOutcome, GenerationRequest,
    HealthReport, Modality, OmnigenError, TaskCreation, TaskStatusProbe, UsageMetrics,
};
use tracing::{debug, info};

use crate::client::ReplicateClient;
use crate::types::{CreatePredictionRequest, Prediction, PredictionInput};

/// Replicate provider implementing [`TaskProviderAdapter`].
///
/// Fronts a small curated set of image and video models; the pricing
/// table is the allowlist.
pub struct ReplicateAdapter {
    client: ReplicateClient,
    descriptor: AdapterDescriptor,
}

impl ReplicateAdapter {
    /// Creates an adapter authenticated with `api_token`.
    pub fn new(api_token: &str) -> Result<Self, OmnigenError> {
        let client = ReplicateClient::new(api_token)?;
        info!("Replicate adapter initialized");
        Ok(Self {
            client,
            descriptor: descriptor(),
        })
    }

    /// Points the adapter at a different API host (proxy or test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.client = self.client.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl ProviderAdapter for ReplicateAdapter {
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
            aspect_ratios: vec![
                "1:1".into(),
                "16:9".into(),
                "9:16".into(),
                "4:3".into(),
                "3:4".into(),
            ],
            durations: Vec::new(),
            supports_audio: false,
            supports_image_input: true,
            supports_streaming: false,
            max_output_count: 4,
        }
    }

    async fn health_check(&self) -> HealthReport {
        let started = Instant::now();
        match self.client.account().await {
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
        debug!("Replicate adapter shutting down");
        Ok(())
    }
}

#[async_trait]
impl TaskProviderAdapter for ReplicateAdapter {
    async fn create_task(&self, request: &GenerationRequest) -> TaskCreation {
        let payload = build_create_request(request);
        match self.client.create_prediction(&payload).await {
            Ok((prediction, raw)) => TaskCreation::ok(prediction.id, raw),
            Err(failure) => TaskCreation::rejected(failure.error_code, failure.message),
        }
    }

    async fn get_task_status(&self, external_task_id: &str) -> TaskStatusProbe {
        let (prediction, raw) = match self.client.get_prediction(external_task_id).await {
            Ok(pair) => pair,
            Err(failure) => {
                return TaskStatusProbe::probe_error(failure.error_code, failure.message);
            }
        };
        classify_prediction(prediction, raw)
    }

    fn poll_profile(&self) -> PollProfile {
        // Image models finish in seconds, video models in minutes; 5s x
        // 120 covers both.
        PollProfile::new(Duration::from_secs(5), 120)
    }
}

fn build_create_request(request: &GenerationRequest) -> CreatePredictionRequest {
    CreatePredictionRequest {
        model: request.model.clone(),
        input: PredictionInput {
            prompt: request.prompt.clone(),
            negative_prompt: request.options.negative_prompt.clone(),
            aspect_ratio: request.options.aspect_ratio.clone(),
            num_outputs: request.options.output_count,
            image: request.options.image_urls.first().cloned(),
        },
    }
}

/// Maps a delivered prediction onto a status probe.
fn classify_prediction(prediction: Prediction, raw: serde_json::Value) -> TaskStatusProbe {
    match prediction.status.as_str() {
        "succeeded" => match prediction.output {
            Some(output) => {
                TaskStatusProbe::succeeded(output.into_urls(), prediction.status, raw)
            }
            None => TaskStatusProbe::probe_error(
                ErrorCode::ParseError,
                "succeeded prediction carried no output",
            )
            .with_raw(raw),
        },
        "failed" => TaskStatusProbe::provider_failed(
            ErrorCode::ProviderTaskFailed,
            prediction
                .error
                .unwrap_or_else(|| "prediction failed without detail".to_string()),
            prediction.status,
            raw,
        ),
        // A cancellation on the provider side still ends the task; it
        // maps to a failed state with its own code.
        "canceled" => TaskStatusProbe::provider_failed(
            ErrorCode::Canceled,
            prediction
                .error
                .unwrap_or_else(|| "prediction was canceled".to_string()),
            prediction.status,
            raw,
        ),
        "starting" => {
            TaskStatusProbe::in_progress(ExternalTaskState::Pending, prediction.status, raw)
        }
        // `processing` and any word this adapter does not recognize stay
        // in flight.
        _ => TaskStatusProbe::in_progress(ExternalTaskState::Processing, prediction.status, raw),
    }
}

fn pricing() -> PricingTable {
    PricingTable::new()
        .with_model(
            "black-forest-labs/flux-dev",
            PriceDescriptor::per_unit(PriceUnit::Image, 0.025).billed_per_output(),
        )
        .with_model(
            "black-forest-labs/flux-schnell",
            PriceDescriptor::per_unit(PriceUnit::Image, 0.003).billed_per_output(),
        )
        .with_model(
            "minimax/video-01",
            PriceDescriptor::per_unit(PriceUnit::Video, 0.5),
        )
}

/// Static identity of this adapter, constructible without a credential.
pub fn descriptor() -> AdapterDescriptor {
    AdapterDescriptor::new("replicate", "Replicate", Modality::Image, pricing())
}
