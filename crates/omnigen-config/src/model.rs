// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Omnigen provider aggregator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Omnigen configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OmnigenConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Task store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Credit conversion settings.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Poll worker and scheduling settings.
    #[serde(default)]
    pub poll: PollConfig,

    /// Per-provider credentials and endpoint overrides.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging filter (a level like `info`, or a full tracing directive
    /// string such as `omnigen=debug,hyper=warn`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "omnigen".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Task store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("omnigen").join("omnigen.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("omnigen.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Credit conversion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// Markup multiplying provider cost (USD) into user credits.
    /// Must be at least 1.0: credits never undercut provider cost.
    #[serde(default = "default_credit_markup")]
    pub credit_markup: f64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            credit_markup: default_credit_markup(),
        }
    }
}

fn default_credit_markup() -> f64 {
    2.0
}

/// Poll worker and scheduling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Seconds between queue sweeps by the poll worker.
    #[serde(default = "default_worker_interval_secs")]
    pub worker_interval_secs: u64,

    /// Maximum queue entries claimed per sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Seconds a claimed queue entry stays locked before it is considered
    /// abandoned and becomes claimable again.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,

    /// Consecutive failed status probes tolerated before a task is failed
    /// with a transport error. Kept below any attempt budget so an
    /// unreachable provider fails fast.
    #[serde(default = "default_max_consecutive_transport_errors")]
    pub max_consecutive_transport_errors: u32,

    /// Override every adapter's poll interval, in seconds. Unset uses each
    /// adapter's own profile.
    #[serde(default)]
    pub interval_secs: Option<u64>,

    /// Override every adapter's poll attempt budget. Unset uses each
    /// adapter's own profile.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            worker_interval_secs: default_worker_interval_secs(),
            batch_size: default_batch_size(),
            lock_timeout_secs: default_lock_timeout_secs(),
            max_consecutive_transport_errors: default_max_consecutive_transport_errors(),
            interval_secs: None,
            max_attempts: None,
        }
    }
}

fn default_worker_interval_secs() -> u64 {
    1
}

fn default_batch_size() -> u32 {
    10
}

fn default_lock_timeout_secs() -> u64 {
    300
}

fn default_max_consecutive_transport_errors() -> u32 {
    10
}

/// Per-provider credential and endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,

    #[serde(default)]
    pub anthropic: ProviderConfig,

    #[serde(default)]
    pub kling: ProviderConfig,

    #[serde(default)]
    pub replicate: ProviderConfig,
}

/// One provider's credential and endpoint override.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key. `None` falls back to the provider's conventional
    /// environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL override for self-hosted gateways or regional endpoints.
    #[serde(default)]
    pub base_url: Option<String>,
}
