// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential lookup trait.

/// Resolves API credentials per provider name.
///
/// Lookup is synchronous: implementations read configuration or process
/// environment, not remote secret stores.
pub trait CredentialResolver: Send + Sync + 'static {
    /// The credential for `provider`, or `None` when none is configured.
    fn credential_for(&self, provider: &str) -> Option<String>;
}
