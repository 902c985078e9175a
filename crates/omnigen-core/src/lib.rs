// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Omnigen provider aggregator.
//!
//! This crate provides the foundational trait definitions, error types,
//! pricing descriptors, and lifecycle types used throughout the Omnigen
//! workspace. All provider adapters implement traits defined here.

pub mod error;
pub mod poll;
pub mod pricing;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorCode, OmnigenError, ProviderFailure};
pub use poll::{DEFAULT_MAX_TRANSPORT_ERRORS, PollProfile, run_to_completion, wait_for_completion};
pub use pricing::{
    AdapterDescriptor, MultiOutputPolicy, PriceDescriptor, PriceUnit, PricingTable,
    duration_variant_key,
};
pub use types::{
    Capabilities, ChatMessage, ChatRole, EventKind, ExternalTaskState, GenerationOptions,
    GenerationOutcome, GenerationRequest, HealthReport, HealthState, Modality, NewTaskEvent, Page,
    PollTicket, TaskCreation, TaskEvent, TaskFilter, TaskFinalization, TaskRecord, TaskState,
    TaskStatusProbe, UsageMetrics, now_iso,
};

// Re-export all adapter and facility traits at crate root.
pub use traits::{CredentialResolver, PollQueue, ProviderAdapter, TaskProviderAdapter, TaskStore};
