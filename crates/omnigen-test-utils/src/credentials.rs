// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential resolver for tests.

use std::collections::HashMap;

use omnigen_core::CredentialResolver;

/// A fixed provider-to-key map implementing [`CredentialResolver`].
///
/// Providers absent from the map resolve to `None`, which is how tests
/// exercise the missing-credential paths without touching the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    keys: HashMap<String, String>,
}

impl StaticCredentials {
    /// An empty resolver: every lookup returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential for `provider`.
    pub fn with(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.keys.insert(provider.into(), key.into());
        self
    }
}

impl CredentialResolver for StaticCredentials {
    fn credential_for(&self, provider: &str) -> Option<String> {
        self.keys.get(provider).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_provider_resolves() {
        let creds = StaticCredentials::new().with("mock-task", "sk-test-123");
        assert_eq!(creds.credential_for("mock-task").as_deref(), Some("sk-test-123"));
    }

    #[test]
    fn unknown_provider_resolves_to_none() {
        let creds = StaticCredentials::new().with("mock-task", "sk-test-123");
        assert_eq!(creds.credential_for("other"), None);
    }
}
