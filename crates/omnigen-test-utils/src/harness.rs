// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store fixtures for integration tests.
//!
//! `StoreHarness` hands tests a fully migrated [`SqliteStore`], either
//! in-memory or in a temp directory that lives exactly as long as the
//! harness does.

use std::sync::Arc;

use omnigen_config::model::StoreConfig;
use omnigen_core::OmnigenError;
use omnigen_store::SqliteStore;

/// A migrated store plus the temp directory keeping a file-backed
/// database alive.
pub struct StoreHarness {
    pub store: Arc<SqliteStore>,
    _temp_dir: Option<tempfile::TempDir>,
}

impl StoreHarness {
    /// In-memory store with the full schema applied.
    pub async fn in_memory() -> Result<Self, OmnigenError> {
        Ok(Self {
            store: Arc::new(SqliteStore::in_memory().await?),
            _temp_dir: None,
        })
    }

    /// File-backed store in a fresh temp directory, opened through the
    /// same [`StoreConfig`] path production uses. The directory is
    /// removed when the harness drops.
    pub async fn file_backed() -> Result<Self, OmnigenError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| OmnigenError::Config(format!("temp dir for test store: {e}")))?;
        let db_path = temp_dir.path().join("omnigen-test.db");
        let config = StoreConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        Ok(Self {
            store: Arc::new(SqliteStore::open(&config).await?),
            _temp_dir: Some(temp_dir),
        })
    }
}
