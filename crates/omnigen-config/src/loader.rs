// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./omnigen.toml` > `~/.config/omnigen/omnigen.toml`
//! > `/etc/omnigen/omnigen.toml` with environment variable overrides via the
//! `OMNIGEN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::OmnigenConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/omnigen/omnigen.toml` (system-wide)
/// 3. `~/.config/omnigen/omnigen.toml` (user XDG config)
/// 4. `./omnigen.toml` (local directory)
/// 5. `OMNIGEN_*` environment variables
pub fn load_config() -> Result<OmnigenConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used by tests and callers that carry their own TOML.
pub fn load_config_from_str(toml_content: &str) -> Result<OmnigenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OmnigenConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OmnigenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OmnigenConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for
/// diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(OmnigenConfig::default()))
        .merge(Toml::file("/etc/omnigen/omnigen.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("omnigen/omnigen.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("omnigen.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` so underscore-containing key
/// names stay intact: `OMNIGEN_PROVIDERS_OPENAI_API_KEY` must map to
/// `providers.openai.api_key`, not `providers.openai.api.key`.
fn env_provider() -> Env {
    Env::prefixed("OMNIGEN_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: OMNIGEN_PROVIDERS_KLING_API_KEY -> "providers_kling_api_key"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("providers_openai_", "providers.openai.", 1)
            .replacen("providers_anthropic_", "providers.anthropic.", 1)
            .replacen("providers_kling_", "providers.kling.", 1)
            .replacen("providers_replicate_", "providers.replicate.", 1)
            .replacen("service_", "service.", 1)
            .replacen("server_", "server.", 1)
            .replacen("store_", "store.", 1)
            .replacen("billing_", "billing.", 1)
            .replacen("poll_", "poll.", 1);
        mapped.into()
    })
}
