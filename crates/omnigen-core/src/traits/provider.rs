// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait all provider adapters implement.

use async_trait::async_trait;

use crate::error::OmnigenError;
use crate::pricing::AdapterDescriptor;
use crate::types::{Capabilities, GenerationOutcome, GenerationRequest, HealthReport, Modality, UsageMetrics};

/// The base trait for every Omnigen provider adapter, synchronous or
/// task-based.
///
/// The central contract: `generate` returns an outcome *value* in every
/// case. A provider being down, rejecting a request, or failing a task is
/// reported inside [`GenerationOutcome`], never as `Err`. `Result`-returning
/// methods fail only on caller misuse (e.g. a model the adapter does not
/// price).
#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    /// Static identity: registry name, display name, modality, pricing.
    fn descriptor(&self) -> &AdapterDescriptor;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Runs one generation to completion. For task-based adapters this
    /// blocks through the provider's full create-and-poll cycle.
    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome;

    /// Provider cost in USD for one finished generation.
    ///
    /// Fails closed with [`OmnigenError::UnknownModel`] when the model is
    /// not in this adapter's pricing table.
    fn calculate_cost(&self, model: &str, usage: &UsageMetrics) -> Result<f64, OmnigenError>;

    /// Supported models, aspect ratios, durations, and feature flags.
    fn capabilities(&self) -> Capabilities;

    /// Issues a minimal real request against the provider and reports the
    /// observed health. Never errors; failures are part of the report.
    async fn health_check(&self) -> HealthReport;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), OmnigenError>;

    /// Registry name, from the descriptor.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Output modality, from the descriptor.
    fn modality(&self) -> Modality {
        self.descriptor().modality
    }
}
