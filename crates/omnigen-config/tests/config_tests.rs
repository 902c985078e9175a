// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Omnigen configuration system.

use omnigen_config::diagnostic::{suggest_key, ConfigError};
use omnigen_config::model::OmnigenConfig;
use omnigen_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_omnigen_config() {
    let toml = r#"
[service]
name = "test-service"
log_level = "debug"

[server]
host = "0.0.0.0"
port = 9000

[store]
database_path = "/tmp/test.db"
wal_mode = false

[billing]
credit_markup = 3.0

[poll]
worker_interval_secs = 2
batch_size = 25
lock_timeout_secs = 60
max_consecutive_transport_errors = 5
interval_secs = 3
max_attempts = 40

[providers.openai]
api_key = "sk-test-123"

[providers.anthropic]
api_key = "sk-ant-456"

[providers.kling]
api_key = "kl-789"
base_url = "https://api.kling.example.com"

[providers.replicate]
api_key = "r8-abc"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "test-service");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.store.database_path, "/tmp/test.db");
    assert!(!config.store.wal_mode);
    assert_eq!(config.billing.credit_markup, 3.0);
    assert_eq!(config.poll.worker_interval_secs, 2);
    assert_eq!(config.poll.batch_size, 25);
    assert_eq!(config.poll.lock_timeout_secs, 60);
    assert_eq!(config.poll.max_consecutive_transport_errors, 5);
    assert_eq!(config.poll.interval_secs, Some(3));
    assert_eq!(config.poll.max_attempts, Some(40));
    assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-test-123"));
    assert_eq!(config.providers.anthropic.api_key.as_deref(), Some("sk-ant-456"));
    assert_eq!(config.providers.kling.api_key.as_deref(), Some("kl-789"));
    assert_eq!(
        config.providers.kling.base_url.as_deref(),
        Some("https://api.kling.example.com")
    );
    assert_eq!(config.providers.replicate.api_key.as_deref(), Some("r8-abc"));
}

/// Unknown field in [service] section produces an UnknownField error.
#[test]
fn unknown_field_in_service_produces_error() {
    let toml = r#"
[service]
naem = "test"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    // Figment wraps serde's deny_unknown_fields error
    assert!(
        err_str.contains("unknown field") || err_str.contains("naem"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown field in a nested [providers.kling] section produces an error.
#[test]
fn unknown_field_in_nested_provider_produces_error() {
    let toml = r#"
[providers.kling]
api_ky = "abc"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("api_ky"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let toml = "";
    let config = load_config_from_str(toml).expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "omnigen");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert!(config.store.database_path.ends_with("omnigen.db"));
    assert!(config.store.wal_mode);
    assert_eq!(config.billing.credit_markup, 2.0);
    assert_eq!(config.poll.worker_interval_secs, 1);
    assert_eq!(config.poll.batch_size, 10);
    assert_eq!(config.poll.lock_timeout_secs, 300);
    assert_eq!(config.poll.max_consecutive_transport_errors, 10);
    assert!(config.poll.interval_secs.is_none());
    assert!(config.poll.max_attempts.is_none());
    assert!(config.providers.openai.api_key.is_none());
    assert!(config.providers.anthropic.api_key.is_none());
    assert!(config.providers.kling.api_key.is_none());
    assert!(config.providers.replicate.api_key.is_none());
}

/// Environment variable OMNIGEN_SERVER_PORT overrides server.port in TOML.
#[test]
fn env_var_overrides_server_port() {
    // We test this via the Figment builder directly to control env vars in test
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[server]
port = 8080
"#;

    // Simulate OMNIGEN_SERVER_PORT env var by building figment with test env
    let config: OmnigenConfig = Figment::new()
        .merge(Serialized::defaults(OmnigenConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("server.port", 9090))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.server.port, 9090);
}

/// Environment variable OMNIGEN_PROVIDERS_OPENAI_API_KEY maps to
/// providers.openai.api_key (NOT providers.openai.api.key).
#[test]
fn env_var_overrides_provider_api_key() {
    use figment::{providers::Serialized, Figment};

    let config: OmnigenConfig = Figment::new()
        .merge(Serialized::defaults(OmnigenConfig::default()))
        .merge(("providers.openai.api_key", "sk-from-env"))
        .extract()
        .expect("should set api_key via dot notation");

    assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-from-env"));
}

/// Serialized defaults provide sensible values for all required fields.
#[test]
fn serialized_defaults_are_sensible() {
    let config = OmnigenConfig::default();

    assert_eq!(config.service.name, "omnigen");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert!(config.store.database_path.ends_with("omnigen.db"));
    assert!(config.store.wal_mode);
    assert_eq!(config.billing.credit_markup, 2.0);
    assert_eq!(config.poll.batch_size, 10);
    assert!(config.providers.openai.base_url.is_none());
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: OmnigenConfig = Figment::new()
        .merge(Serialized::defaults(OmnigenConfig::default()))
        .merge(Toml::file("/nonexistent/path/omnigen.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    // Should just get defaults
    assert_eq!(config.service.name, "omnigen");
}

/// All expected config sections parse: service, server, store, billing, poll, providers.
#[test]
fn config_sections_all_present() {
    let toml = r#"
[service]
name = "a"

[server]
host = "127.0.0.1"

[store]
database_path = "d"

[billing]
credit_markup = 2.5

[poll]
batch_size = 1

[providers.openai]
api_key = "k"
"#;

    let config = load_config_from_str(toml).expect("all expected sections should parse");
    assert_eq!(config.service.name, "a");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.store.database_path, "d");
    assert_eq!(config.billing.credit_markup, 2.5);
    assert_eq!(config.poll.batch_size, 1);
    assert_eq!(config.providers.openai.api_key.as_deref(), Some("k"));
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

// ============================================================================
// Diagnostic tests
// ============================================================================

/// Unknown key "naem" in [service] produces suggestion "did you mean `name`?"
#[test]
fn diagnostic_naem_suggests_name() {
    let valid_keys = &["name", "log_level"];
    let suggestion = suggest_key("naem", valid_keys);
    assert_eq!(suggestion, Some("name".to_string()));
}

/// Unknown key "databse_path" produces suggestion "did you mean `database_path`?"
#[test]
fn diagnostic_databse_path_suggests_database_path() {
    let valid_keys = &["database_path", "wal_mode"];
    let suggestion = suggest_key("databse_path", valid_keys);
    assert_eq!(suggestion, Some("database_path".to_string()));
}

/// Unknown key "zzzzzz" with no close match does NOT produce a suggestion.
#[test]
fn diagnostic_no_suggestion_for_distant_typo() {
    let valid_keys = &["name", "log_level"];
    let suggestion = suggest_key("zzzzzz", valid_keys);
    assert!(suggestion.is_none(), "should not suggest for distant typo");
}

/// Error output from load_and_validate_str includes the unknown key name.
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[service]
naem = "test"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(!errors.is_empty(), "should have at least one error");

    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "naem"
                && suggestion.as_deref() == Some("name")
                && valid_keys.contains("name")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'naem' with suggestion 'name', got: {errors:?}"
    );
}

/// Error output includes the list of valid keys for the section.
#[test]
fn diagnostic_error_includes_valid_keys() {
    let toml = r#"
[server]
prot = 9000
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_valid_keys = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { valid_keys, .. } if {
            valid_keys.contains("host") && valid_keys.contains("port")
        })
    });
    assert!(
        has_valid_keys,
        "error should list valid keys for [server] section"
    );
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[server]
port = "not_a_number"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("port"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError implements miette::Diagnostic (can be rendered).
#[test]
fn config_error_implements_diagnostic() {
    use miette::Diagnostic;

    let error = ConfigError::UnknownKey {
        key: "naem".to_string(),
        suggestion: Some("name".to_string()),
        valid_keys: "name, log_level".to_string(),
        span: None,
        src: None,
    };

    // Verify it implements Diagnostic
    let code = error.code();
    assert!(code.is_some(), "should have diagnostic code");

    let help = error.help();
    assert!(help.is_some(), "should have help text");
    let help_str = help.unwrap().to_string();
    assert!(
        help_str.contains("did you mean `name`"),
        "help should contain suggestion, got: {help_str}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::UnknownKey {
        key: "naem".to_string(),
        suggestion: Some("name".to_string()),
        valid_keys: "name, log_level".to_string(),
        span: None,
        src: None,
    };

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(
        !buf.is_empty(),
        "rendered report should not be empty"
    );
    assert!(
        buf.contains("naem"),
        "rendered report should mention the key"
    );
}

/// load_and_validate_str with valid TOML returns Ok config.
#[test]
fn load_and_validate_valid_toml() {
    let toml = r#"
[service]
name = "test"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.service.name, "test");
}

/// Validation catches a credit markup below 1.0.
#[test]
fn validation_catches_low_credit_markup() {
    let toml = r#"
[billing]
credit_markup = 0.5
"#;

    let errors = load_and_validate_str(toml).expect_err("low markup should fail");
    let has_validation_error = errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("credit_markup"))
    });
    assert!(has_validation_error, "should have validation error for low markup");
}

/// Validation catches a provider base_url without an http(s) scheme.
#[test]
fn validation_catches_bad_base_url() {
    let toml = r#"
[providers.replicate]
base_url = "ftp://example.com"
"#;

    let errors = load_and_validate_str(toml).expect_err("bad base_url should fail");
    let has_validation_error = errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("base_url"))
    });
    assert!(has_validation_error, "should have validation error for bad base_url");
}

/// Validation catches a zero poll attempt budget override.
#[test]
fn validation_catches_zero_max_attempts() {
    let toml = r#"
[poll]
max_attempts = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero max_attempts should fail");
    let has_validation_error = errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("max_attempts"))
    });
    assert!(has_validation_error, "should have validation error for zero max_attempts");
}
