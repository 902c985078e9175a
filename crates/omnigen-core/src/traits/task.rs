// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait for task-based (create-then-poll) provider adapters.

use async_trait::async_trait;

use crate::poll::PollProfile;
use crate::traits::provider::ProviderAdapter;
use crate::types::{GenerationRequest, TaskCreation, TaskStatusProbe};

/// Adapter for providers whose generations run as remote asynchronous
/// tasks: submit, receive an external task id, poll until terminal.
///
/// The orchestrator drives these methods directly so it can persist state
/// between steps; the inherited `generate` remains available as a blocking
/// convenience that runs the full cycle in-process.
#[async_trait]
pub trait TaskProviderAdapter: ProviderAdapter {
    /// Submits work to the provider.
    ///
    /// A rejection (envelope error, HTTP error, undecodable body) comes
    /// back as `TaskCreation { success: false, .. }` with the provider's
    /// own error code preserved where one exists.
    async fn create_task(&self, request: &GenerationRequest) -> TaskCreation;

    /// Probes the provider for the current state of a submitted task.
    async fn get_task_status(&self, external_task_id: &str) -> TaskStatusProbe;

    /// Polling cadence and attempt budget appropriate for this provider's
    /// typical turnaround.
    fn poll_profile(&self) -> PollProfile;
}
