// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Omnigen integration tests.
//!
//! Provides mock adapters and store fixtures for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockSyncAdapter`] - Mock synchronous provider with pre-configured outcomes
//! - [`MockTaskAdapter`] - Mock task-based provider with a scripted probe queue
//! - [`StaticCredentials`] - Fixed credential map for registry tests
//! - [`StoreHarness`] - Migrated SQLite store, in-memory or temp-file backed

pub mod credentials;
pub mod harness;
pub mod mock_adapters;

pub use credentials::StaticCredentials;
pub use harness::StoreHarness;
pub use mock_adapters::{MockSyncAdapter, MockTaskAdapter};
