// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Omnigen provider aggregator.
//!
//! Two distinct kinds of failure flow through the system and they must not
//! be conflated:
//!
//! - [`OmnigenError`] is returned when the *caller* did something wrong or a
//!   local subsystem broke: unknown provider, missing credential, database
//!   failure. These cross `Result` boundaries.
//! - [`ErrorCode`] values travel *inside* outcome structs
//!   ([`crate::types::GenerationOutcome`], [`crate::types::TaskStatusProbe`])
//!   when a remote provider call fails. A provider being down is a normal
//!   runtime condition, not an `Err`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::TaskState;

/// The primary error type used across Omnigen traits and core operations.
#[derive(Debug, Error)]
pub enum OmnigenError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Store errors (database connection, query failure, serialization).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Requested provider is not registered.
    #[error("provider not found: {name}")]
    ProviderNotFound { name: String },

    /// No API credential is configured for the provider.
    #[error("no credential configured for provider: {provider}")]
    MissingCredential { provider: String },

    /// The model is not present in the provider's pricing table.
    ///
    /// Cost computation fails closed: an unpriced model must never be
    /// silently billed at zero or at some other model's rate.
    #[error("unknown model {model} for provider {provider}")]
    UnknownModel { provider: String, model: String },

    /// A task status transition that the lifecycle state machine forbids.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: TaskState, to: TaskState },

    /// Referenced task does not exist.
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Well-known error codes carried inside outcome values.
///
/// Provider-native codes (HTTP statuses, aggregator envelope codes) pass
/// through verbatim as strings; these variants cover the conditions Omnigen
/// itself detects. The serialized form is stable and part of the API surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Network-level failure: connect, TLS, timeout on the wire.
    Transport,
    /// Provider rejected the request at creation time.
    ProviderRejected,
    /// Provider accepted the task and later reported it failed.
    ProviderTaskFailed,
    /// Response arrived but could not be decoded.
    ParseError,
    /// Poll attempt budget exhausted before a terminal state.
    Timeout,
    /// Adapter could not be constructed (bad credential, bad config).
    Misconfigured,
    /// Task was canceled by the caller.
    Canceled,
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl ErrorCode {
    /// The stable string form, identical to the `Display`/serde rendering.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::ProviderRejected => "PROVIDER_REJECTED",
            ErrorCode::ProviderTaskFailed => "PROVIDER_TASK_FAILED",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Misconfigured => "MISCONFIGURED",
            ErrorCode::Canceled => "CANCELED",
        }
    }
}

/// A classified provider-call failure, not yet folded into an outcome.
///
/// Adapter HTTP clients return this from their request helpers; the adapter
/// converts it with the outcome constructors
/// ([`crate::types::GenerationOutcome::failure`],
/// [`crate::types::TaskCreation::rejected`],
/// [`crate::types::TaskStatusProbe::probe_error`]) at the trait boundary.
/// Provider-native codes (an HTTP status, an envelope code) are preserved
/// verbatim in `error_code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub error_code: String,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }

    /// Network-level failure before any response arrived.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, message)
    }

    /// A delivered response that could not be decoded.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    /// Non-2xx response; the status itself is the provider-native code.
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(status.to_string(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn error_code_string_forms_are_stable() {
        assert_eq!(ErrorCode::Transport.as_str(), "TRANSPORT");
        assert_eq!(ErrorCode::ProviderRejected.as_str(), "PROVIDER_REJECTED");
        assert_eq!(
            ErrorCode::ProviderTaskFailed.as_str(),
            "PROVIDER_TASK_FAILED"
        );
        assert_eq!(ErrorCode::ParseError.as_str(), "PARSE_ERROR");
        assert_eq!(ErrorCode::Timeout.as_str(), "TIMEOUT");
        assert_eq!(ErrorCode::Misconfigured.as_str(), "MISCONFIGURED");
        assert_eq!(ErrorCode::Canceled.as_str(), "CANCELED");
    }

    #[test]
    fn error_code_display_matches_as_str() {
        for code in [
            ErrorCode::Transport,
            ErrorCode::ProviderRejected,
            ErrorCode::ProviderTaskFailed,
            ErrorCode::ParseError,
            ErrorCode::Timeout,
            ErrorCode::Misconfigured,
            ErrorCode::Canceled,
        ] {
            assert_eq!(code.to_string(), code.as_str());
            let parsed = ErrorCode::from_str(code.as_str()).expect("should parse back");
            assert_eq!(parsed, code);
        }
    }

    #[test]
    fn omnigen_error_has_all_variants() {
        // Verify all 8 error variants exist and can be constructed.
        let _config = OmnigenError::Config("test".into());
        let _store = OmnigenError::Store {
            source: Box::new(std::io::Error::other("test")),
        };
        let _not_found = OmnigenError::ProviderNotFound {
            name: "test".into(),
        };
        let _credential = OmnigenError::MissingCredential {
            provider: "test".into(),
        };
        let _model = OmnigenError::UnknownModel {
            provider: "test".into(),
            model: "test".into(),
        };
        let _transition = OmnigenError::InvalidTransition {
            from: TaskState::Completed,
            to: TaskState::Processing,
        };
        let _task = OmnigenError::TaskNotFound { id: "test".into() };
        let _internal = OmnigenError::Internal("test".into());
    }

    #[test]
    fn invalid_transition_message_uses_lowercase_states() {
        let err = OmnigenError::InvalidTransition {
            from: TaskState::Completed,
            to: TaskState::Processing,
        };
        assert_eq!(
            err.to_string(),
            "invalid status transition from completed to processing"
        );
    }

    #[test]
    fn provider_failure_preserves_native_codes() {
        let failure = ProviderFailure::http_status(429, "rate limited");
        assert_eq!(failure.error_code, "429");
        assert_eq!(failure.message, "rate limited");

        assert_eq!(
            ProviderFailure::transport("connect refused").error_code,
            "TRANSPORT"
        );
        assert_eq!(ProviderFailure::parse("bad json").error_code, "PARSE_ERROR");
    }
}
