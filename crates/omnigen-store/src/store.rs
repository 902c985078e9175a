// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the TaskStore and PollQueue traits.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use omnigen_config::model::StoreConfig;
use omnigen_core::{
    NewTaskEvent, OmnigenError, Page, PollQueue, PollTicket, TaskEvent, TaskFilter,
    TaskFinalization, TaskRecord, TaskStore,
};

use crate::database::Database;
use crate::queries;

/// Lock horizon for claimed poll entries when none is configured.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// SQLite-backed task store and poll queue.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. One instance serves both persistence traits; the
/// task tables and the poll queue live in the same database file so their
/// transactions share a writer.
pub struct SqliteStore {
    db: Database,
    lock_timeout: Duration,
}

impl SqliteStore {
    /// Open the store at the configured path, honoring the WAL setting.
    pub async fn open(config: &StoreConfig) -> Result<Self, OmnigenError> {
        let db = Database::open_with_wal(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "sqlite store opened");
        Ok(Self {
            db,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// In-memory store with the full schema. Test use.
    pub async fn in_memory() -> Result<Self, OmnigenError> {
        Ok(Self {
            db: Database::in_memory().await?,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Override the lock horizon used by [`PollQueue::claim_due`].
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Checkpoint the WAL so the database file is complete on disk.
    pub async fn close(&self) -> Result<(), OmnigenError> {
        self.db.close().await
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn insert_task(&self, record: &TaskRecord) -> Result<(), OmnigenError> {
        queries::tasks::insert_task(&self.db, record).await
    }

    async fn get_task(&self, id: &str) -> Result<Option<TaskRecord>, OmnigenError> {
        queries::tasks::get_task(&self.db, id).await
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: &Page,
    ) -> Result<Vec<TaskRecord>, OmnigenError> {
        queries::tasks::list_tasks(&self.db, filter, page).await
    }

    async fn mark_processing(
        &self,
        id: &str,
        external_task_id: &str,
        event: &NewTaskEvent,
    ) -> Result<bool, OmnigenError> {
        queries::tasks::mark_processing(&self.db, id, external_task_id, event).await
    }

    async fn finalize_task(
        &self,
        id: &str,
        finalization: &TaskFinalization,
    ) -> Result<bool, OmnigenError> {
        queries::tasks::finalize_task(&self.db, id, finalization).await
    }

    async fn append_event(&self, event: &NewTaskEvent) -> Result<i64, OmnigenError> {
        queries::events::append_event(&self.db, event).await
    }

    async fn events_for_task(&self, task_id: &str) -> Result<Vec<TaskEvent>, OmnigenError> {
        queries::events::events_for_task(&self.db, task_id).await
    }
}

#[async_trait]
impl PollQueue for SqliteStore {
    async fn schedule_poll(
        &self,
        task_id: &str,
        due_in: Duration,
        attempt: u32,
        transport_errors: u32,
    ) -> Result<i64, OmnigenError> {
        queries::poll_queue::schedule_poll(&self.db, task_id, due_in, attempt, transport_errors)
            .await
    }

    async fn claim_due(&self, limit: u32) -> Result<Vec<PollTicket>, OmnigenError> {
        queries::poll_queue::claim_due(&self.db, limit, self.lock_timeout).await
    }

    async fn complete(&self, ticket_id: i64) -> Result<(), OmnigenError> {
        queries::poll_queue::complete(&self.db, ticket_id).await
    }

    async fn release(&self, ticket_id: i64) -> Result<(), OmnigenError> {
        queries::poll_queue::release(&self.db, ticket_id).await
    }

    async fn cancel_for_task(&self, task_id: &str) -> Result<u64, OmnigenError> {
        queries::poll_queue::cancel_for_task(&self.db, task_id).await
    }

    async fn pending_count(&self) -> Result<u64, OmnigenError> {
        queries::poll_queue::pending_count(&self.db).await
    }
}
