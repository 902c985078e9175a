// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and markup
//! bounds.

use crate::diagnostic::ConfigError;
use crate::model::OmnigenConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &OmnigenConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // server.host must be a plausible IP or hostname
    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.server.port == 0 {
        errors.push(ConfigError::Validation {
            message: "server.port must not be 0".to_string(),
        });
    }

    if config.store.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "store.database_path must not be empty".to_string(),
        });
    }

    // Credits must never undercut provider cost.
    let markup = config.billing.credit_markup;
    if !markup.is_finite() || markup < 1.0 {
        errors.push(ConfigError::Validation {
            message: format!("billing.credit_markup must be at least 1.0, got {markup}"),
        });
    }

    if config.poll.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "poll.batch_size must be at least 1".to_string(),
        });
    }

    if config.poll.worker_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "poll.worker_interval_secs must be at least 1".to_string(),
        });
    }

    if config.poll.lock_timeout_secs < 10 {
        errors.push(ConfigError::Validation {
            message: format!(
                "poll.lock_timeout_secs must be at least 10 so a slow provider call cannot be double-claimed, got {}",
                config.poll.lock_timeout_secs
            ),
        });
    }

    if config.poll.max_consecutive_transport_errors == 0 {
        errors.push(ConfigError::Validation {
            message: "poll.max_consecutive_transport_errors must be at least 1".to_string(),
        });
    }

    if let Some(max_attempts) = config.poll.max_attempts
        && max_attempts == 0
    {
        errors.push(ConfigError::Validation {
            message: "poll.max_attempts must be at least 1 when set".to_string(),
        });
    }

    if let Some(interval) = config.poll.interval_secs
        && interval == 0
    {
        errors.push(ConfigError::Validation {
            message: "poll.interval_secs must be at least 1 when set".to_string(),
        });
    }

    // Base URL overrides must be http(s) so a typo'd scheme fails at boot,
    // not at first poll.
    for (name, provider) in [
        ("openai", &config.providers.openai),
        ("anthropic", &config.providers.anthropic),
        ("kling", &config.providers.kling),
        ("replicate", &config.providers.replicate),
    ] {
        if let Some(url) = &provider.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            errors.push(ConfigError::Validation {
                message: format!(
                    "providers.{name}.base_url must start with http:// or https://, got `{url}`"
                ),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = OmnigenConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = OmnigenConfig::default();
        config.store.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn markup_below_one_fails_validation() {
        let mut config = OmnigenConfig::default();
        config.billing.credit_markup = 0.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("credit_markup"))
        ));
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = OmnigenConfig::default();
        config.server.port = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("server.port"))
        ));
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let mut config = OmnigenConfig::default();
        config.poll.batch_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("batch_size"))
        ));
    }

    #[test]
    fn bad_base_url_scheme_fails_validation() {
        let mut config = OmnigenConfig::default();
        config.providers.kling.base_url = Some("ftp://example.com".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("providers.kling.base_url"))
        ));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = OmnigenConfig::default();
        config.server.port = 0;
        config.poll.batch_size = 0;
        config.billing.credit_markup = 0.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3, "expected all errors, got {errors:?}");
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = OmnigenConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.server.port = 9090;
        config.store.database_path = "/tmp/test.db".to_string();
        config.billing.credit_markup = 3.0;
        config.poll.max_attempts = Some(5);
        assert!(validate_config(&config).is_ok());
    }
}
