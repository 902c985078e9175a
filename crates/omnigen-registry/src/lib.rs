// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter registry for the Omnigen provider aggregator.
//!
//! This crate owns the mapping from provider names to live adapter
//! instances: registration of descriptors and factories, credential
//! resolution from config and environment, per-credential instance
//! caching, catalog listings, and health fan-out. [`builtin_registry`]
//! wires up every compiled-in provider.

pub mod builtin;
pub mod credentials;
pub mod registry;

pub use builtin::builtin_registry;
pub use credentials::ConfigCredentials;
pub use registry::{AdapterRegistry, CatalogEntry, CatalogModel, ResolvedAdapter};
