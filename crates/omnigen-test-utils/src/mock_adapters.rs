// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock provider adapters for deterministic testing.
//!
//! `MockSyncAdapter` implements `ProviderAdapter` with pre-configured
//! outcomes; `MockTaskAdapter` implements `TaskProviderAdapter` with a
//! scripted creation result and probe queue. Both enable fast,
//! CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use omnigen_core::poll::{PollProfile, run_to_completion};
use omnigen_core::pricing::{AdapterDescriptor, PriceDescriptor, PriceUnit, PricingTable};
use omnigen_core::traits::{ProviderAdapter, TaskProviderAdapter};
use omnigen_core::{
    Capabilities, GenerationOutcome, GenerationRequest, HealthReport, Modality, OmnigenError,
    TaskCreation, TaskStatusProbe, UsageMetrics,
};
use omnigen_cost::compute_provider_cost;

/// Registry name of [`MockSyncAdapter`].
pub const MOCK_SYNC_NAME: &str = "mock-sync";
/// The one model [`MockSyncAdapter`] prices.
pub const MOCK_TEXT_MODEL: &str = "mock-text-1";
/// Registry name of [`MockTaskAdapter`].
pub const MOCK_TASK_NAME: &str = "mock-task";
/// Video model priced by [`MockTaskAdapter`]: $0.50 base, $1.00 with audio.
pub const MOCK_VIDEO_MODEL: &str = "mock-video-1";
/// Image model priced by [`MockTaskAdapter`], billed per output.
pub const MOCK_IMAGE_MODEL: &str = "mock-image-1";

/// A mock synchronous provider that returns pre-configured outcomes.
///
/// Outcomes are popped from a FIFO queue. When the queue is empty, a
/// default successful text outcome is returned.
pub struct MockSyncAdapter {
    descriptor: AdapterDescriptor,
    outcomes: Mutex<VecDeque<GenerationOutcome>>,
    health: HealthReport,
    generate_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
}

impl MockSyncAdapter {
    /// Create a mock adapter with an empty outcome queue.
    pub fn new() -> Self {
        let pricing = PricingTable::new()
            .with_model(MOCK_TEXT_MODEL, PriceDescriptor::tokens(0.001, 0.002));
        Self {
            descriptor: AdapterDescriptor::new(MOCK_SYNC_NAME, "Mock Sync", Modality::Text, pricing),
            outcomes: Mutex::new(VecDeque::new()),
            health: HealthReport::healthy(1),
            generate_calls: AtomicUsize::new(0),
            shutdown_calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock adapter pre-loaded with the given outcomes.
    pub fn with_outcomes(outcomes: Vec<GenerationOutcome>) -> Self {
        let mut adapter = Self::new();
        *adapter.outcomes.get_mut() = VecDeque::from(outcomes);
        adapter
    }

    /// Replace the health report returned by `health_check`.
    pub fn with_health(mut self, health: HealthReport) -> Self {
        self.health = health;
        self
    }

    /// Add an outcome to the end of the queue.
    pub async fn push_outcome(&self, outcome: GenerationOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// Number of `generate` calls observed so far.
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Number of `shutdown` calls observed so far.
    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }

    /// Pop the next outcome, or return the default.
    async fn next_outcome(&self) -> GenerationOutcome {
        self.outcomes.lock().await.pop_front().unwrap_or_else(|| {
            GenerationOutcome::ok_text("mock output", UsageMetrics::tokens(10, 20))
        })
    }
}

impl Default for MockSyncAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MockSyncAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn generate(&self, _request: GenerationRequest) -> GenerationOutcome {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.next_outcome().await
    }

    fn calculate_cost(&self, model: &str, usage: &UsageMetrics) -> Result<f64, OmnigenError> {
        compute_provider_cost(self.name(), &self.descriptor.pricing, model, usage)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            models: self.descriptor.pricing.model_ids().map(String::from).collect(),
            max_output_count: 1,
            ..Capabilities::default()
        }
    }

    async fn health_check(&self) -> HealthReport {
        self.health.clone()
    }

    async fn shutdown(&self) -> Result<(), OmnigenError> {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A mock task-based provider with a scripted lifecycle.
///
/// `create_task` returns a fixed creation result; `get_task_status` pops
/// probes from a FIFO queue and falls back to a perpetual `processing`
/// probe when the queue runs dry, so tests control exactly how many polls
/// it takes to reach a terminal state.
pub struct MockTaskAdapter {
    descriptor: AdapterDescriptor,
    creation: TaskCreation,
    probes: Mutex<VecDeque<TaskStatusProbe>>,
    profile: PollProfile,
    health: HealthReport,
    create_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl MockTaskAdapter {
    /// Create a mock adapter that accepts every task and reports
    /// `processing` forever.
    pub fn new() -> Self {
        let pricing = PricingTable::new()
            .with_model(
                MOCK_VIDEO_MODEL,
                PriceDescriptor::per_unit(PriceUnit::Video, 0.5)
                    .with_variant("5s", 0.5)
                    .with_variant("5s_audio", 1.0)
                    .with_variant("10s", 1.0),
            )
            .with_model(
                MOCK_IMAGE_MODEL,
                PriceDescriptor::per_unit(PriceUnit::Image, 0.01).billed_per_output(),
            );
        Self {
            descriptor: AdapterDescriptor::new(MOCK_TASK_NAME, "Mock Task", Modality::Video, pricing),
            creation: TaskCreation::ok("mock-ext-1", serde_json::json!({"id": "mock-ext-1"})),
            probes: Mutex::new(VecDeque::new()),
            profile: PollProfile::new(Duration::from_millis(1), 3),
            health: HealthReport::healthy(1),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock adapter pre-loaded with the given probe sequence.
    pub fn with_probes(probes: Vec<TaskStatusProbe>) -> Self {
        let mut adapter = Self::new();
        *adapter.probes.get_mut() = VecDeque::from(probes);
        adapter
    }

    /// Replace the creation result returned by `create_task`.
    pub fn with_creation(mut self, creation: TaskCreation) -> Self {
        self.creation = creation;
        self
    }

    /// Replace the poll profile.
    pub fn with_poll_profile(mut self, profile: PollProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Replace the health report returned by `health_check`.
    pub fn with_health(mut self, health: HealthReport) -> Self {
        self.health = health;
        self
    }

    /// Add a probe to the end of the queue.
    pub async fn push_probe(&self, probe: TaskStatusProbe) {
        self.probes.lock().await.push_back(probe);
    }

    /// Number of `create_task` calls observed so far.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_task_status` calls observed so far.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTaskAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MockTaskAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        run_to_completion(self, &request).await
    }

    fn calculate_cost(&self, model: &str, usage: &UsageMetrics) -> Result<f64, OmnigenError> {
        compute_provider_cost(self.name(), &self.descriptor.pricing, model, usage)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            models: self.descriptor.pricing.model_ids().map(String::from).collect(),
            durations: vec![5, 10],
            supports_audio: true,
            max_output_count: 4,
            ..Capabilities::default()
        }
    }

    async fn health_check(&self) -> HealthReport {
        self.health.clone()
    }

    async fn shutdown(&self) -> Result<(), OmnigenError> {
        Ok(())
    }
}

#[async_trait]
impl TaskProviderAdapter for MockTaskAdapter {
    async fn create_task(&self, _request: &GenerationRequest) -> TaskCreation {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.creation.clone()
    }

    async fn get_task_status(&self, _external_task_id: &str) -> TaskStatusProbe {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.probes.lock().await.pop_front().unwrap_or_else(|| {
            TaskStatusProbe::in_progress(
                omnigen_core::ExternalTaskState::Processing,
                "processing",
                serde_json::json!({"status": "processing"}),
            )
        })
    }

    fn poll_profile(&self) -> PollProfile {
        self.profile
    }
}

#[cfg(test)]
mod tests {
    use omnigen_core::ExternalTaskState;

    use super::*;

    #[tokio::test]
    async fn sync_default_outcome_when_queue_empty() {
        let adapter = MockSyncAdapter::new();
        let outcome = adapter
            .generate(GenerationRequest::new(MOCK_TEXT_MODEL, "hello"))
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.content.as_deref(), Some("mock output"));
        assert_eq!(adapter.generate_calls(), 1);
    }

    #[tokio::test]
    async fn sync_queued_outcomes_returned_in_order() {
        let adapter = MockSyncAdapter::with_outcomes(vec![
            GenerationOutcome::failure("RATE_LIMIT", "slow down"),
            GenerationOutcome::ok_text("second", UsageMetrics::tokens(1, 2)),
        ]);
        let req = || GenerationRequest::new(MOCK_TEXT_MODEL, "hi");

        let first = adapter.generate(req()).await;
        assert!(!first.success);
        assert_eq!(first.error_code.as_deref(), Some("RATE_LIMIT"));

        let second = adapter.generate(req()).await;
        assert_eq!(second.content.as_deref(), Some("second"));

        // Queue exhausted, falls back to default
        let third = adapter.generate(req()).await;
        assert_eq!(third.content.as_deref(), Some("mock output"));
    }

    #[tokio::test]
    async fn sync_cost_uses_token_bands() {
        let adapter = MockSyncAdapter::new();
        let cost = adapter
            .calculate_cost(MOCK_TEXT_MODEL, &UsageMetrics::tokens(1000, 500))
            .unwrap();
        // 1000/1k * 0.001 + 500/1k * 0.002
        assert!((cost - 0.002).abs() < 1e-10, "got {cost}");
    }

    #[tokio::test]
    async fn sync_unknown_model_fails_closed() {
        let adapter = MockSyncAdapter::new();
        let err = adapter
            .calculate_cost("no-such-model", &UsageMetrics::tokens(1, 1))
            .unwrap_err();
        assert!(matches!(err, OmnigenError::UnknownModel { .. }));
    }

    #[tokio::test]
    async fn task_generate_runs_scripted_cycle() {
        let adapter = MockTaskAdapter::with_probes(vec![
            TaskStatusProbe::in_progress(
                ExternalTaskState::Processing,
                "processing",
                serde_json::json!({}),
            ),
            TaskStatusProbe::succeeded(
                vec!["https://cdn.example/out.mp4".into()],
                "success",
                serde_json::json!({}),
            ),
        ]);
        let outcome = adapter
            .generate(GenerationRequest::new(MOCK_VIDEO_MODEL, "a fox"))
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.result_urls, vec!["https://cdn.example/out.mp4"]);
        assert_eq!(adapter.create_calls(), 1);
        assert_eq!(adapter.status_calls(), 2);
    }

    #[tokio::test]
    async fn task_exhausted_queue_reports_processing() {
        let adapter = MockTaskAdapter::new();
        let probe = adapter.get_task_status("mock-ext-1").await;
        assert!(probe.success);
        assert_eq!(probe.state, Some(ExternalTaskState::Processing));
    }

    #[tokio::test]
    async fn task_rejected_creation_is_preserved() {
        let adapter = MockTaskAdapter::new()
            .with_creation(TaskCreation::rejected("500", "quota exceeded"));
        let creation = adapter
            .create_task(&GenerationRequest::new(MOCK_VIDEO_MODEL, "a fox"))
            .await;
        assert!(!creation.success);
        assert_eq!(creation.error_code.as_deref(), Some("500"));
    }

    #[tokio::test]
    async fn task_audio_variant_doubles_video_price() {
        let adapter = MockTaskAdapter::new();
        let usage = UsageMetrics {
            duration_secs: Some(5),
            with_audio: true,
            ..UsageMetrics::default()
        };
        let cost = adapter.calculate_cost(MOCK_VIDEO_MODEL, &usage).unwrap();
        assert!((cost - 1.0).abs() < f64::EPSILON, "got {cost}");
    }
}
