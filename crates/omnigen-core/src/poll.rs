// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixed-interval polling primitive for task-based providers.
//!
//! Both execution paths reuse this module's rules: the blocking
//! [`run_to_completion`] convenience used by `generate`, and the
//! orchestrator's queue-driven poller, apply the same probe
//! interpretation (transport errors are absorbed up to a consecutive
//! limit, parse errors on a delivered payload are terminal, the attempt
//! budget ends in a timeout failure).

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::traits::task::TaskProviderAdapter;
use crate::types::{ExternalTaskState, GenerationOutcome, GenerationRequest, UsageMetrics};

/// Consecutive probe failures tolerated before giving up on a provider.
/// Deliberately smaller than any adapter's attempt budget so a dead
/// credential or unreachable host fails fast instead of burning the full
/// polling window.
pub const DEFAULT_MAX_TRANSPORT_ERRORS: u32 = 10;

/// Polling cadence and attempt budget for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollProfile {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollProfile {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollProfile {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Polls `adapter` until the external task reaches a terminal state or the
/// profile's attempt budget runs out. Sleeps `profile.interval` before
/// every probe.
///
/// Probe-level failures (transport, undeliverable responses) do not
/// terminate the wait until [`DEFAULT_MAX_TRANSPORT_ERRORS`] accumulate
/// consecutively; a parse failure on a payload the provider did deliver is
/// terminal immediately.
pub async fn wait_for_completion(
    adapter: &dyn TaskProviderAdapter,
    external_task_id: &str,
    profile: &PollProfile,
) -> GenerationOutcome {
    let mut consecutive_transport = 0u32;

    for attempt in 1..=profile.max_attempts {
        tokio::time::sleep(profile.interval).await;

        let probe = adapter.get_task_status(external_task_id).await;
        debug!(
            provider = adapter.name(),
            external_task_id,
            attempt,
            probe_success = probe.success,
            state = ?probe.state,
            "poll attempt"
        );

        if !probe.success {
            if probe.error_code.as_deref() == Some(ErrorCode::ParseError.as_str()) {
                let mut outcome = GenerationOutcome::failure(
                    ErrorCode::ParseError,
                    probe
                        .error_message
                        .unwrap_or_else(|| "undecodable status payload".to_string()),
                );
                outcome.raw_response = probe.raw_response;
                return outcome;
            }
            consecutive_transport += 1;
            if consecutive_transport >= DEFAULT_MAX_TRANSPORT_ERRORS {
                warn!(
                    provider = adapter.name(),
                    external_task_id, consecutive_transport, "giving up after repeated probe failures"
                );
                return GenerationOutcome::failure(
                    ErrorCode::Transport,
                    format!("{consecutive_transport} consecutive status probes failed"),
                );
            }
            continue;
        }
        consecutive_transport = 0;

        match probe.state {
            Some(ExternalTaskState::Succeeded) => {
                let mut outcome = GenerationOutcome::ok_media(probe.result_urls);
                outcome.raw_response = probe.raw_response;
                return outcome;
            }
            Some(ExternalTaskState::Failed) => {
                let mut outcome = GenerationOutcome::failure(
                    probe
                        .error_code
                        .unwrap_or_else(|| ErrorCode::ProviderTaskFailed.into()),
                    probe
                        .error_message
                        .unwrap_or_else(|| "provider reported task failure".to_string()),
                );
                outcome.raw_response = probe.raw_response;
                return outcome;
            }
            _ => {}
        }
    }

    GenerationOutcome::failure(
        ErrorCode::Timeout,
        format!(
            "task did not complete within {} poll attempts",
            profile.max_attempts
        ),
    )
}

/// Runs the full create-and-poll cycle in-process: submit, then wait using
/// the adapter's own profile. Creation rejections surface as failed
/// outcomes with the provider's error code preserved; successful waits get
/// usage metrics rebuilt from the request parameters and the observed
/// output count.
pub async fn run_to_completion(
    adapter: &dyn TaskProviderAdapter,
    request: &GenerationRequest,
) -> GenerationOutcome {
    let creation = adapter.create_task(request).await;
    if !creation.success {
        let mut outcome = GenerationOutcome::failure(
            creation
                .error_code
                .unwrap_or_else(|| ErrorCode::ProviderRejected.into()),
            creation
                .error_message
                .unwrap_or_else(|| "provider rejected task creation".to_string()),
        );
        outcome.raw_response = creation.raw_response;
        return outcome;
    }

    let Some(external_task_id) = creation.external_task_id else {
        return GenerationOutcome::failure(
            ErrorCode::ParseError,
            "creation response carried no task id",
        );
    };

    let profile = adapter.poll_profile();
    let mut outcome = wait_for_completion(adapter, &external_task_id, &profile).await;
    if outcome.success {
        let mut usage = UsageMetrics::from_options(&request.options);
        if !outcome.result_urls.is_empty() {
            usage.output_count = outcome.result_urls.len() as u32;
        }
        outcome.usage = Some(usage);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::OmnigenError;
    use crate::pricing::{AdapterDescriptor, PricingTable};
    use crate::types::{Capabilities, HealthReport, Modality, TaskCreation, TaskStatusProbe};

    /// Scripted adapter: pops one probe per `get_task_status` call.
    struct ScriptedAdapter {
        descriptor: AdapterDescriptor,
        creation: TaskCreation,
        probes: Mutex<Vec<TaskStatusProbe>>,
        status_calls: AtomicUsize,
    }

    impl ScriptedAdapter {
        fn new(creation: TaskCreation, mut probes: Vec<TaskStatusProbe>) -> Self {
            probes.reverse();
            Self {
                descriptor: AdapterDescriptor::new(
                    "scripted",
                    "Scripted",
                    Modality::Video,
                    PricingTable::new(),
                ),
                creation,
                probes: Mutex::new(probes),
                status_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl crate::traits::ProviderAdapter for ScriptedAdapter {
        fn descriptor(&self) -> &AdapterDescriptor {
            &self.descriptor
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }

        async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
            run_to_completion(self, &request).await
        }

        fn calculate_cost(&self, model: &str, _usage: &UsageMetrics) -> Result<f64, OmnigenError> {
            Err(OmnigenError::UnknownModel {
                provider: "scripted".into(),
                model: model.into(),
            })
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }

        async fn health_check(&self) -> HealthReport {
            HealthReport::healthy(1)
        }

        async fn shutdown(&self) -> Result<(), OmnigenError> {
            Ok(())
        }
    }

    #[async_trait]
    impl TaskProviderAdapter for ScriptedAdapter {
        async fn create_task(&self, _request: &GenerationRequest) -> TaskCreation {
            self.creation.clone()
        }

        async fn get_task_status(&self, _external_task_id: &str) -> TaskStatusProbe {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.probes
                .lock()
                .expect("probe script lock")
                .pop()
                .unwrap_or_else(|| TaskStatusProbe::probe_error("TRANSPORT", "script exhausted"))
        }

        fn poll_profile(&self) -> PollProfile {
            PollProfile::new(Duration::from_millis(1), 3)
        }
    }

    fn processing_probe() -> TaskStatusProbe {
        TaskStatusProbe::in_progress(
            ExternalTaskState::Processing,
            "processing",
            serde_json::json!({"status": "processing"}),
        )
    }

    #[tokio::test]
    async fn wait_returns_success_outcome_with_urls() {
        let adapter = ScriptedAdapter::new(
            TaskCreation::ok("ext-1", serde_json::json!({})),
            vec![
                processing_probe(),
                TaskStatusProbe::succeeded(
                    vec!["https://cdn.example/a.mp4".into()],
                    "success",
                    serde_json::json!({"status": "success"}),
                ),
            ],
        );
        let outcome =
            wait_for_completion(&adapter, "ext-1", &adapter.poll_profile()).await;
        assert!(outcome.success);
        assert_eq!(outcome.result_urls, vec!["https://cdn.example/a.mp4"]);
        assert_eq!(adapter.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn wait_times_out_after_attempt_budget() {
        let adapter = ScriptedAdapter::new(
            TaskCreation::ok("ext-1", serde_json::json!({})),
            vec![processing_probe(), processing_probe(), processing_probe()],
        );
        let outcome =
            wait_for_completion(&adapter, "ext-1", &adapter.poll_profile()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_code.as_deref(), Some("TIMEOUT"));
        assert_eq!(adapter.status_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_absorbs_transport_errors_between_probes() {
        let adapter = ScriptedAdapter::new(
            TaskCreation::ok("ext-1", serde_json::json!({})),
            vec![
                TaskStatusProbe::probe_error("TRANSPORT", "connect refused"),
                TaskStatusProbe::succeeded(
                    vec!["https://cdn.example/a.mp4".into()],
                    "success",
                    serde_json::json!({}),
                ),
            ],
        );
        let outcome =
            wait_for_completion(&adapter, "ext-1", &adapter.poll_profile()).await;
        assert!(outcome.success, "one transport error must not end the wait");
    }

    #[tokio::test]
    async fn wait_stops_on_parse_error() {
        let adapter = ScriptedAdapter::new(
            TaskCreation::ok("ext-1", serde_json::json!({})),
            vec![TaskStatusProbe::probe_error("PARSE_ERROR", "bad resultJson")],
        );
        let outcome =
            wait_for_completion(&adapter, "ext-1", &adapter.poll_profile()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_code.as_deref(), Some("PARSE_ERROR"));
        assert_eq!(
            adapter.status_calls.load(Ordering::SeqCst),
            1,
            "parse errors are terminal"
        );
    }

    #[tokio::test]
    async fn wait_gives_up_after_consecutive_transport_failures() {
        let probes = (0..DEFAULT_MAX_TRANSPORT_ERRORS)
            .map(|_| TaskStatusProbe::probe_error("TRANSPORT", "unreachable"))
            .collect();
        let adapter =
            ScriptedAdapter::new(TaskCreation::ok("ext-1", serde_json::json!({})), probes);
        let profile = PollProfile::new(Duration::from_millis(1), 100);
        let outcome = wait_for_completion(&adapter, "ext-1", &profile).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_code.as_deref(), Some("TRANSPORT"));
        assert_eq!(
            adapter.status_calls.load(Ordering::SeqCst) as u32,
            DEFAULT_MAX_TRANSPORT_ERRORS
        );
    }

    #[tokio::test]
    async fn run_to_completion_surfaces_creation_rejection() {
        let adapter = ScriptedAdapter::new(
            TaskCreation::rejected("500", "insufficient credits")
                .with_raw(serde_json::json!({"code": 500})),
            vec![],
        );
        let outcome = run_to_completion(&adapter, &GenerationRequest::new("m", "p")).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error_code.as_deref(), Some("500"));
        assert_eq!(
            adapter.status_calls.load(Ordering::SeqCst),
            0,
            "rejected creation must not be polled"
        );
    }

    #[tokio::test]
    async fn run_to_completion_rebuilds_usage_from_request() {
        let adapter = ScriptedAdapter::new(
            TaskCreation::ok("ext-1", serde_json::json!({})),
            vec![TaskStatusProbe::succeeded(
                vec!["https://cdn.example/a.mp4".into()],
                "success",
                serde_json::json!({}),
            )],
        );
        let mut request = GenerationRequest::new("m", "p");
        request.options.duration_secs = Some(5);
        request.options.sound = Some(true);
        let outcome = run_to_completion(&adapter, &request).await;
        assert!(outcome.success);
        let usage = outcome.usage.expect("usage present");
        assert_eq!(usage.duration_secs, Some(5));
        assert!(usage.with_audio);
        assert_eq!(usage.output_count, 1);
    }
}
