// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The task lifecycle driver.
//!
//! The [`Orchestrator`] owns every state transition a task record makes.
//! Adapters produce outcomes and probes as plain values; this module turns
//! them into store writes: the `pending` insert at submission, the
//! `processing` move when a provider accepts work, and the single atomic
//! finalization into `completed` or `failed`. Synchronous providers cross
//! the whole lifecycle inside one `submit` call; task-based providers are
//! driven through the durable poll queue, one probe per claimed ticket.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use omnigen_config::model::PollConfig;
use omnigen_core::traits::TaskProviderAdapter;
use omnigen_core::{
    ErrorCode, ExternalTaskState, GenerationRequest, NewTaskEvent, OmnigenError, Page, PollProfile,
    PollQueue, PollTicket, PricingTable, TaskEvent, TaskFilter, TaskFinalization, TaskRecord,
    TaskStatusProbe, TaskStore, UsageMetrics,
};
use omnigen_cost::CostEngine;
use omnigen_registry::{AdapterRegistry, ResolvedAdapter};

/// Poll scheduling knobs, resolved from configuration.
///
/// Overrides apply uniformly across providers; unset overrides defer to
/// each adapter's own [`PollProfile`]. The transport-error limit is global
/// and deliberately smaller than any attempt budget so an unreachable
/// provider fails fast instead of burning its full polling window.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval_override: Option<std::time::Duration>,
    pub max_attempts_override: Option<u32>,
    pub max_transport_errors: u32,
}

impl PollSettings {
    pub fn from_config(config: &PollConfig) -> Self {
        Self {
            interval_override: config.interval_secs.map(std::time::Duration::from_secs),
            max_attempts_override: config.max_attempts,
            max_transport_errors: config.max_consecutive_transport_errors,
        }
    }

    /// An adapter's profile with the global overrides applied.
    fn effective(&self, profile: PollProfile) -> PollProfile {
        PollProfile {
            interval: self.interval_override.unwrap_or(profile.interval),
            max_attempts: self.max_attempts_override.unwrap_or(profile.max_attempts),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&PollConfig::default())
    }
}

/// A task record together with its full ordered audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub task: TaskRecord,
    pub events: Vec<TaskEvent>,
}

/// Coordinates adapters, the task store, the poll queue, and cost
/// computation.
///
/// All methods take `&self`; the orchestrator is shared behind an `Arc`
/// between the request handlers and the poll worker. Concurrent callers
/// cannot corrupt a task because every terminal write goes through the
/// store's conditional finalization.
pub struct Orchestrator {
    registry: Arc<AdapterRegistry>,
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn PollQueue>,
    cost: CostEngine,
    poll: PollSettings,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn PollQueue>,
        cost: CostEngine,
        poll: PollSettings,
    ) -> Self {
        Self {
            registry,
            store,
            queue,
            cost,
            poll,
        }
    }

    /// The adapter registry behind this orchestrator, for catalog and
    /// health surfaces.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Poll-queue entries not yet done, for operational visibility.
    pub async fn pending_polls(&self) -> Result<u64, OmnigenError> {
        self.queue.pending_count().await
    }

    /// Submits a generation and returns its task record.
    ///
    /// The provider is resolved and the model checked against its pricing
    /// table before anything is written, so an unknown provider, a missing
    /// credential, or an unpriced model never leaves an orphaned record.
    /// Synchronous providers return in a terminal state; task-based
    /// providers return `processing` (or `failed`, if creation was
    /// rejected) with the first poll scheduled.
    pub async fn submit(
        &self,
        provider: &str,
        request: GenerationRequest,
    ) -> Result<TaskRecord, OmnigenError> {
        let adapter = self.registry.resolve(provider)?;
        if adapter.descriptor().pricing.price_for(&request.model).is_none() {
            return Err(OmnigenError::UnknownModel {
                provider: provider.to_string(),
                model: request.model.clone(),
            });
        }

        let record = TaskRecord::new(provider, &request);
        let task_id = record.id.clone();
        self.store.insert_task(&record).await?;
        self.store
            .append_event(&NewTaskEvent::created(&task_id))
            .await?;
        info!(
            task_id = %task_id,
            provider,
            model = %request.model,
            "generation submitted"
        );

        match adapter.as_task() {
            Some(task_adapter) => {
                self.dispatch_to_provider(&task_id, task_adapter.as_ref(), &request)
                    .await?;
            }
            None => {
                self.complete_synchronously(&task_id, &adapter, request)
                    .await?;
            }
        }

        self.require_task(&task_id).await
    }

    /// The record and its event history. With `refresh`, one synchronous
    /// status probe runs first so the answer reflects the provider's
    /// current state rather than the last scheduled poll.
    pub async fn get_status(&self, task_id: &str, refresh: bool) -> Result<TaskView, OmnigenError> {
        if refresh {
            self.refresh(task_id).await?;
        }
        let task = self.require_task(task_id).await?;
        let events = self.store.events_for_task(task_id).await?;
        Ok(TaskView { task, events })
    }

    /// Lists task records newest-first, filtered and paginated.
    pub async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: &Page,
    ) -> Result<Vec<TaskRecord>, OmnigenError> {
        self.store.list_tasks(filter, page).await
    }

    /// One immediate status probe outside the worker cadence.
    ///
    /// Terminal tasks are returned unchanged, and a task with no external
    /// id yet has nothing to ask the provider about. The probe is logged
    /// like any queued poll and applies the same terminal transitions, so
    /// a refresh racing the worker still yields exactly one terminal
    /// event. Refresh never touches the attempt budget or the transport
    /// counter.
    pub async fn refresh(&self, task_id: &str) -> Result<TaskRecord, OmnigenError> {
        let record = self.require_task(task_id).await?;
        if record.status.is_terminal() {
            return Ok(record);
        }
        let Some(external_task_id) = record.external_task_id.clone() else {
            return Ok(record);
        };
        let adapter = self.registry.resolve(&record.provider)?;
        let Some(task_adapter) = adapter.as_task() else {
            return Ok(record);
        };

        let probe = task_adapter.get_task_status(&external_task_id).await;
        self.store
            .append_event(&NewTaskEvent::poll(task_id, &probe))
            .await?;
        self.apply_terminal_probe(&record, &probe).await?;
        self.require_task(task_id).await
    }

    /// Marks a live task abandoned: `failed` with code `CANCELED`, all
    /// scheduled polls dropped. Work the provider already accepted cannot
    /// be retracted; cancellation stops local tracking and billing.
    /// Canceling a terminal task only clears leftover queue entries.
    pub async fn cancel(&self, task_id: &str) -> Result<TaskRecord, OmnigenError> {
        let record = self.require_task(task_id).await?;
        if !record.status.is_terminal() {
            let message = "canceled by caller".to_string();
            let finalization = TaskFinalization::failed(
                ErrorCode::Canceled,
                message.clone(),
                NewTaskEvent::failed(task_id, None, None, Some(message)),
            );
            if self.store.finalize_task(task_id, &finalization).await? {
                info!(task_id, "task canceled");
            }
        }
        let dropped = self.queue.cancel_for_task(task_id).await?;
        if dropped > 0 {
            debug!(task_id, dropped, "outstanding polls dropped");
        }
        self.require_task(task_id).await
    }

    /// Claims and executes one batch of due polls. Returns how many
    /// tickets ran.
    ///
    /// A ticket whose execution errors is released back to the queue so
    /// the next sweep can retry it without waiting for the lock window;
    /// if the release itself fails, lock expiry still recovers the entry.
    pub async fn run_due_polls(&self, limit: u32) -> Result<usize, OmnigenError> {
        let tickets = self.queue.claim_due(limit).await?;
        let count = tickets.len();
        for ticket in &tickets {
            if let Err(err) = self.execute_poll(ticket).await {
                error!(task_id = %ticket.task_id, error = %err, "poll execution failed");
                if let Err(release_err) = self.queue.release(ticket.id).await {
                    warn!(
                        ticket_id = ticket.id,
                        error = %release_err,
                        "failed to release errored poll ticket"
                    );
                }
            }
        }
        Ok(count)
    }

    /// Runs one claimed poll ticket: probe the provider, log the attempt,
    /// then finalize or schedule the next attempt.
    ///
    /// Duplicate execution is harmless. A ticket for a task that is gone
    /// or already terminal completes without probing, and finalization
    /// itself is idempotent, so at-least-once claim delivery never
    /// produces a second terminal event.
    pub async fn execute_poll(&self, ticket: &PollTicket) -> Result<(), OmnigenError> {
        let Some(record) = self.store.get_task(&ticket.task_id).await? else {
            warn!(task_id = %ticket.task_id, "poll ticket for unknown task");
            return self.queue.complete(ticket.id).await;
        };
        if record.status.is_terminal() {
            return self.queue.complete(ticket.id).await;
        }

        let (probe, profile) = self.probe_provider(&record).await;
        self.store
            .append_event(&NewTaskEvent::poll(&record.id, &probe))
            .await?;
        debug!(
            task_id = %record.id,
            attempt = ticket.attempt,
            probe_success = probe.success,
            state = ?probe.state,
            "poll attempt"
        );

        if probe.success {
            if !self.apply_terminal_probe(&record, &probe).await? {
                // Still running provider-side; a delivered probe resets
                // the consecutive transport counter.
                self.schedule_or_time_out(&record, ticket, &profile, 0)
                    .await?;
            }
        } else if probe.error_code.as_deref() == Some(ErrorCode::ParseError.as_str()) {
            // The provider answered; retrying will not make the payload
            // decodable.
            let message = probe
                .error_message
                .clone()
                .unwrap_or_else(|| "undecodable status payload".to_string());
            let finalization = TaskFinalization::failed(
                ErrorCode::ParseError,
                message.clone(),
                NewTaskEvent::failed(
                    &record.id,
                    probe.external_status.clone(),
                    probe.raw_response.as_ref(),
                    Some(message),
                ),
            );
            self.store.finalize_task(&record.id, &finalization).await?;
        } else {
            let transport_errors = ticket.transport_errors + 1;
            if transport_errors >= self.poll.max_transport_errors {
                warn!(
                    task_id = %record.id,
                    transport_errors,
                    "giving up after repeated probe failures"
                );
                let message = format!("{transport_errors} consecutive status probes failed");
                let finalization = TaskFinalization::failed(
                    ErrorCode::Transport,
                    message.clone(),
                    NewTaskEvent::failed(&record.id, None, None, Some(message)),
                );
                self.store.finalize_task(&record.id, &finalization).await?;
            } else {
                self.schedule_or_time_out(&record, ticket, &profile, transport_errors)
                    .await?;
            }
        }

        self.queue.complete(ticket.id).await
    }

    /// Submits the request to a task-based provider and arms the first
    /// poll.
    ///
    /// A rejection finalizes the task immediately with the provider's
    /// error code verbatim; an acceptance records the external id, logs
    /// the `sent_to_provider` event, and schedules attempt 1.
    async fn dispatch_to_provider(
        &self,
        task_id: &str,
        adapter: &dyn TaskProviderAdapter,
        request: &GenerationRequest,
    ) -> Result<(), OmnigenError> {
        let creation = adapter.create_task(request).await;

        if !creation.success {
            let code = creation
                .error_code
                .clone()
                .unwrap_or_else(|| ErrorCode::ProviderRejected.into());
            let message = creation
                .error_message
                .clone()
                .unwrap_or_else(|| "provider rejected task creation".to_string());
            warn!(task_id, code = %code, "task creation rejected");
            let finalization = TaskFinalization::failed(
                code,
                message.clone(),
                NewTaskEvent::failed(task_id, None, creation.raw_response.as_ref(), Some(message)),
            );
            self.store.finalize_task(task_id, &finalization).await?;
            return Ok(());
        }

        let Some(external_task_id) = creation.external_task_id.clone() else {
            // Accepted without an id: nothing can ever be polled, so the
            // task must not be left live.
            let message = "creation response carried no task id".to_string();
            let finalization = TaskFinalization::failed(
                ErrorCode::ParseError,
                message.clone(),
                NewTaskEvent::failed(task_id, None, creation.raw_response.as_ref(), Some(message)),
            );
            self.store.finalize_task(task_id, &finalization).await?;
            return Ok(());
        };

        let moved = self
            .store
            .mark_processing(
                task_id,
                &external_task_id,
                &NewTaskEvent::sent_to_provider(task_id, creation.raw_response.as_ref()),
            )
            .await?;
        if !moved {
            // Raced with a cancel between insert and acceptance. The
            // provider keeps working unobserved; there is no retraction.
            warn!(task_id, %external_task_id, "task left pending state before acceptance");
            return Ok(());
        }

        let profile = self.poll.effective(adapter.poll_profile());
        self.queue
            .schedule_poll(task_id, profile.interval, 1, 0)
            .await?;
        debug!(task_id, %external_task_id, "first poll scheduled");
        Ok(())
    }

    /// Runs a one-shot adapter to its terminal state: `pending` straight
    /// to `completed` or `failed`, costs included, within the submit call.
    async fn complete_synchronously(
        &self,
        task_id: &str,
        adapter: &ResolvedAdapter,
        request: GenerationRequest,
    ) -> Result<(), OmnigenError> {
        let model = request.model.clone();
        let options = request.options.clone();
        let outcome = adapter.generate(request).await;

        if !outcome.success {
            let code = outcome
                .error_code
                .clone()
                .unwrap_or_else(|| ErrorCode::ProviderRejected.into());
            let message = outcome
                .error_message
                .clone()
                .unwrap_or_else(|| "generation failed".to_string());
            warn!(task_id, code = %code, "synchronous generation failed");
            let finalization = TaskFinalization::failed(
                code,
                message.clone(),
                NewTaskEvent::failed(task_id, None, outcome.raw_response.as_ref(), Some(message)),
            );
            self.store.finalize_task(task_id, &finalization).await?;
            return Ok(());
        }

        let usage = outcome
            .usage
            .clone()
            .unwrap_or_else(|| UsageMetrics::from_options(&options));
        let (provider_cost, credits) = self.charge_for(
            task_id,
            adapter.name(),
            &adapter.descriptor().pricing,
            &model,
            &usage,
        );

        // Text generations carry their output in `content`; the stored
        // result columns treat it as the single output.
        let result_urls = if outcome.result_urls.is_empty() {
            outcome.content.clone().into_iter().collect()
        } else {
            outcome.result_urls.clone()
        };
        let finalization = TaskFinalization::completed(
            result_urls,
            provider_cost,
            credits,
            NewTaskEvent::completed(task_id, None, outcome.raw_response.as_ref()),
        );
        self.store.finalize_task(task_id, &finalization).await?;
        info!(task_id, "generation completed synchronously");
        Ok(())
    }

    /// One status probe for the record, with resolution failures folded
    /// into a probe-level error so they run through the normal retry
    /// ladder instead of aborting the ticket.
    async fn probe_provider(&self, record: &TaskRecord) -> (TaskStatusProbe, PollProfile) {
        let fallback = self.poll.effective(PollProfile::default());
        let Some(external_task_id) = record.external_task_id.as_deref() else {
            // Polls are only scheduled after mark_processing, so a live
            // ticket for a record without an external id is a store
            // inconsistency.
            return (
                TaskStatusProbe::probe_error(
                    ErrorCode::Misconfigured,
                    "task record has no external id",
                ),
                fallback,
            );
        };
        let task_adapter = match self.registry.resolve(&record.provider) {
            Ok(adapter) => match adapter.as_task() {
                Some(task_adapter) => task_adapter,
                None => {
                    return (
                        TaskStatusProbe::probe_error(
                            ErrorCode::Misconfigured,
                            format!("provider {} has no task surface", record.provider),
                        ),
                        fallback,
                    );
                }
            },
            // Credential pulled or provider unregistered mid-flight.
            Err(error) => {
                return (
                    TaskStatusProbe::probe_error(ErrorCode::Misconfigured, error.to_string()),
                    fallback,
                );
            }
        };

        let profile = self.poll.effective(task_adapter.poll_profile());
        (task_adapter.get_task_status(external_task_id).await, profile)
    }

    /// Applies a delivered probe's terminal state, if it carries one.
    /// Returns `true` when the task was submitted for finalization.
    async fn apply_terminal_probe(
        &self,
        record: &TaskRecord,
        probe: &TaskStatusProbe,
    ) -> Result<bool, OmnigenError> {
        match probe.state {
            Some(ExternalTaskState::Succeeded) => {
                self.finalize_success(record, probe).await?;
                Ok(true)
            }
            Some(ExternalTaskState::Failed) => {
                let code = probe
                    .error_code
                    .clone()
                    .unwrap_or_else(|| ErrorCode::ProviderTaskFailed.into());
                let message = probe
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "provider reported task failure".to_string());
                let finalization = TaskFinalization::failed(
                    code,
                    message.clone(),
                    NewTaskEvent::failed(
                        &record.id,
                        probe.external_status.clone(),
                        probe.raw_response.as_ref(),
                        Some(message),
                    ),
                );
                if self.store.finalize_task(&record.id, &finalization).await? {
                    info!(task_id = %record.id, "provider reported task failure");
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Completes a task from a successful probe. Usage is rebuilt from
    /// the persisted request parameters and the observed output count;
    /// costs are computed from the provider's pricing table; the record
    /// finalizes in one idempotent step.
    async fn finalize_success(
        &self,
        record: &TaskRecord,
        probe: &TaskStatusProbe,
    ) -> Result<(), OmnigenError> {
        let mut usage = UsageMetrics::from_options(&record.options());
        if !probe.result_urls.is_empty() {
            usage.output_count = probe.result_urls.len() as u32;
        }
        let (provider_cost, credits) = match self.registry.descriptor(&record.provider) {
            Some(descriptor) => self.charge_for(
                &record.id,
                &record.provider,
                &descriptor.pricing,
                &record.model,
                &usage,
            ),
            None => {
                warn!(
                    task_id = %record.id,
                    provider = %record.provider,
                    "provider gone from registry at finalization"
                );
                (None, None)
            }
        };
        let finalization = TaskFinalization::completed(
            probe.result_urls.clone(),
            provider_cost,
            credits,
            NewTaskEvent::completed(
                &record.id,
                probe.external_status.clone(),
                probe.raw_response.as_ref(),
            ),
        );
        if self.store.finalize_task(&record.id, &finalization).await? {
            info!(
                task_id = %record.id,
                outputs = finalization.result_urls.len(),
                "task completed"
            );
        }
        Ok(())
    }

    /// Schedules the next attempt, or fails the task with `TIMEOUT` when
    /// the budget is spent. The timeout event is itself the terminal
    /// event; no separate failed row is written.
    async fn schedule_or_time_out(
        &self,
        record: &TaskRecord,
        ticket: &PollTicket,
        profile: &PollProfile,
        transport_errors: u32,
    ) -> Result<(), OmnigenError> {
        if ticket.attempt >= profile.max_attempts {
            let message = format!(
                "task did not complete within {} poll attempts",
                profile.max_attempts
            );
            let finalization = TaskFinalization::failed(
                ErrorCode::Timeout,
                message.clone(),
                NewTaskEvent::timeout(&record.id, message),
            );
            if self.store.finalize_task(&record.id, &finalization).await? {
                warn!(task_id = %record.id, attempts = ticket.attempt, "poll budget exhausted");
            }
            return Ok(());
        }
        self.queue
            .schedule_poll(
                &record.id,
                profile.interval,
                ticket.attempt + 1,
                transport_errors,
            )
            .await?;
        Ok(())
    }

    /// Both cost currencies for a finished generation, or `None`s with a
    /// warning when the model cannot be priced. Completed work is never
    /// discarded over a billing gap.
    fn charge_for(
        &self,
        task_id: &str,
        provider: &str,
        pricing: &PricingTable,
        model: &str,
        usage: &UsageMetrics,
    ) -> (Option<f64>, Option<f64>) {
        match self.cost.charge(provider, pricing, model, usage) {
            Ok(charge) => (Some(charge.provider_cost), Some(charge.credits)),
            Err(error) => {
                warn!(task_id, provider, model, %error, "cost computation failed");
                (None, None)
            }
        }
    }

    async fn require_task(&self, task_id: &str) -> Result<TaskRecord, OmnigenError> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| OmnigenError::TaskNotFound {
                id: task_id.to_string(),
            })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("cost", &self.cost)
            .field("poll", &self.poll)
            .finish()
    }
}
