// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential resolution from configuration and environment.
//!
//! Lookup order per provider: the `api_key` from the `[providers.*]`
//! config section, then the provider's conventional environment variable.
//! Blank values count as absent at both levels, so an empty string in a
//! committed config file does not shadow a usable environment key.

use omnigen_config::model::{ProviderConfig, ProvidersConfig};
use omnigen_core::CredentialResolver;

/// Environment variable consulted when the config carries no OpenAI key.
pub const OPENAI_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
/// Environment variable consulted when the config carries no Anthropic key.
pub const ANTHROPIC_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";
/// Environment variable consulted when the config carries no Kling key.
pub const KLING_KEY_ENV_VAR: &str = "KLING_API_KEY";
/// Environment variable consulted when the config carries no Replicate token.
pub const REPLICATE_TOKEN_ENV_VAR: &str = "REPLICATE_API_TOKEN";

/// [`CredentialResolver`] over the `[providers]` configuration sections
/// with per-provider environment fallbacks.
#[derive(Debug, Clone)]
pub struct ConfigCredentials {
    providers: ProvidersConfig,
}

impl ConfigCredentials {
    pub fn new(providers: ProvidersConfig) -> Self {
        Self { providers }
    }

    fn section(&self, provider: &str) -> Option<&ProviderConfig> {
        match provider {
            "openai" => Some(&self.providers.openai),
            "anthropic" => Some(&self.providers.anthropic),
            "kling" => Some(&self.providers.kling),
            "replicate" => Some(&self.providers.replicate),
            _ => None,
        }
    }

    fn env_var(provider: &str) -> Option<&'static str> {
        match provider {
            "openai" => Some(OPENAI_KEY_ENV_VAR),
            "anthropic" => Some(ANTHROPIC_KEY_ENV_VAR),
            "kling" => Some(KLING_KEY_ENV_VAR),
            "replicate" => Some(REPLICATE_TOKEN_ENV_VAR),
            _ => None,
        }
    }
}

impl CredentialResolver for ConfigCredentials {
    fn credential_for(&self, provider: &str) -> Option<String> {
        let section = self.section(provider)?;
        section
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| {
                Self::env_var(provider)
                    .and_then(|name| std::env::var(name).ok())
                    .filter(|key| !key.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn providers_with(section: &str, api_key: Option<&str>) -> ProvidersConfig {
        let mut providers = ProvidersConfig::default();
        let config = ProviderConfig {
            api_key: api_key.map(String::from),
            base_url: None,
        };
        match section {
            "openai" => providers.openai = config,
            "anthropic" => providers.anthropic = config,
            "kling" => providers.kling = config,
            "replicate" => providers.replicate = config,
            other => panic!("no such provider section: {other}"),
        }
        providers
    }

    #[test]
    fn configured_key_is_returned() {
        let resolver = ConfigCredentials::new(providers_with("openai", Some("sk-from-config")));
        assert_eq!(
            resolver.credential_for("openai").as_deref(),
            Some("sk-from-config")
        );
    }

    #[test]
    fn configured_key_wins_over_env() {
        // SAFETY: test-only env mutation. Tests using env vars must not run in parallel.
        unsafe { std::env::set_var(ANTHROPIC_KEY_ENV_VAR, "sk-from-env") };
        let resolver =
            ConfigCredentials::new(providers_with("anthropic", Some("sk-from-config")));
        let resolved = resolver.credential_for("anthropic");
        unsafe { std::env::remove_var(ANTHROPIC_KEY_ENV_VAR) };

        assert_eq!(resolved.as_deref(), Some("sk-from-config"));
    }

    #[test]
    fn blank_configured_key_falls_back_to_env() {
        // SAFETY: test-only env mutation. Tests using env vars must not run in parallel.
        unsafe { std::env::set_var(KLING_KEY_ENV_VAR, "sk-kling-env") };
        let resolver = ConfigCredentials::new(providers_with("kling", Some("")));
        let resolved = resolver.credential_for("kling");
        unsafe { std::env::remove_var(KLING_KEY_ENV_VAR) };

        assert_eq!(resolved.as_deref(), Some("sk-kling-env"));
    }

    #[test]
    fn blank_env_value_counts_as_absent() {
        // SAFETY: test-only env mutation. Tests using env vars must not run in parallel.
        unsafe { std::env::set_var(REPLICATE_TOKEN_ENV_VAR, "") };
        let resolver = ConfigCredentials::new(providers_with("replicate", None));
        let resolved = resolver.credential_for("replicate");
        unsafe { std::env::remove_var(REPLICATE_TOKEN_ENV_VAR) };

        assert_eq!(resolved, None);
    }

    #[test]
    fn unknown_provider_resolves_to_none() {
        let resolver = ConfigCredentials::new(ProvidersConfig::default());
        assert_eq!(resolver.credential_for("midjourney"), None);
    }
}
