// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost computation for the Omnigen provider aggregator.
//!
//! This crate provides:
//! - **Provider cost**: USD owed to the provider, computed from each
//!   adapter's pricing table (token bands or per-unit with variants)
//! - **Credits**: the user-facing charge, provider cost times a
//!   configurable markup

pub mod engine;

pub use engine::{Charge, CostEngine, DEFAULT_CREDIT_MARKUP, compute_provider_cost};
