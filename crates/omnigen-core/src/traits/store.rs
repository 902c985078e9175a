// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits: task records, audit events, and the durable poll
//! queue.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::OmnigenError;
use crate::types::{
    NewTaskEvent, Page, PollTicket, TaskEvent, TaskFilter, TaskFinalization, TaskRecord,
};

/// Durable storage for task records and their append-only event trails.
///
/// Implementations enforce the lifecycle invariants at the storage layer:
/// state-changing writes are conditional on the current state, so
/// concurrent callers cannot double-finalize a task or resurrect a
/// terminal one.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Persists a fresh `pending` record.
    async fn insert_task(&self, record: &TaskRecord) -> Result<(), OmnigenError>;

    async fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, OmnigenError>;

    /// Lists tasks newest-first, filtered and paginated.
    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: &Page,
    ) -> Result<Vec<TaskRecord>, OmnigenError>;

    /// Moves a `pending` task to `processing`, records the provider's task
    /// id, and appends the given event in the same transaction. Returns
    /// `false` (and writes nothing) if the task was not `pending`.
    async fn mark_processing(
        &self,
        id: &str,
        external_task_id: &str,
        event: &NewTaskEvent,
    ) -> Result<bool, OmnigenError>;

    /// Atomically moves a live task to its terminal state: status, result
    /// fields, cost fields, `completed_at`, and the single terminal event
    /// are written in one transaction. Returns `false` (and writes
    /// nothing, event included) if the task is already terminal, which
    /// makes duplicate finalization from racing pollers a harmless no-op.
    async fn finalize_task(
        &self,
        id: &str,
        finalization: &TaskFinalization,
    ) -> Result<bool, OmnigenError>;

    /// Appends one audit event and returns its sequence number.
    async fn append_event(&self, event: &NewTaskEvent) -> Result<i64, OmnigenError>;

    /// Full audit trail for a task in insertion order.
    async fn events_for_task(&self, task_id: &str) -> Result<Vec<TaskEvent>, OmnigenError>;
}

/// Durable delayed re-invocation facility for poll scheduling.
///
/// Delivery is at-least-once: a claimed entry whose worker dies reappears
/// after its lock expires. Duplicate poll execution is safe because
/// finalization is idempotent.
#[async_trait]
pub trait PollQueue: Send + Sync + 'static {
    /// Enqueues a poll for `task_id` due after `due_in`, carrying the
    /// attempt number and the consecutive-transport-failure count.
    async fn schedule_poll(
        &self,
        task_id: &str,
        due_in: Duration,
        attempt: u32,
        transport_errors: u32,
    ) -> Result<i64, OmnigenError>;

    /// Claims up to `limit` due entries, locking each against other
    /// workers for the implementation's lock window.
    async fn claim_due(&self, limit: u32) -> Result<Vec<PollTicket>, OmnigenError>;

    /// Marks a claimed entry done. Idempotent.
    async fn complete(&self, ticket_id: i64) -> Result<(), OmnigenError>;

    /// Returns a claimed entry to the pool immediately, clearing its lock,
    /// so a worker that caught an error mid-step does not leave the entry
    /// stalled for the whole lock window. No-op on done entries.
    async fn release(&self, ticket_id: i64) -> Result<(), OmnigenError>;

    /// Drops all outstanding entries for a task (used on cancel). Returns
    /// the number of entries removed.
    async fn cancel_for_task(&self, task_id: &str) -> Result<u64, OmnigenError>;

    /// Entries not yet done, for operational visibility.
    async fn pending_count(&self) -> Result<u64, OmnigenError>;
}
