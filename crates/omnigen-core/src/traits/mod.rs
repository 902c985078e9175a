// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the Omnigen adapter architecture.
//!
//! Provider adapters extend the [`ProviderAdapter`] base trait; task-based
//! providers additionally implement [`TaskProviderAdapter`]. All traits use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod credentials;
pub mod provider;
pub mod store;
pub mod task;

// Re-export all traits at the traits module level for convenience.
pub use credentials::CredentialResolver;
pub use provider::ProviderAdapter;
pub use store::{PollQueue, TaskStore};
pub use task::TaskProviderAdapter;
