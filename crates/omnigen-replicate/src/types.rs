// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Replicate predictions API.
//!
//! Replicate speaks plain REST: creation and status calls both return a
//! prediction object, real errors use real HTTP statuses, and `output`
//! arrives directly on the resource — a bare URL string for single-output
//! models, a list for batch models.

use serde::{Deserialize, Serialize};

/// Body of a prediction creation request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePredictionRequest {
    pub model: String,
    pub input: PredictionInput,
}

/// Model input block. Field names follow the common schema shared by the
/// models Omnigen fronts; absent options are omitted entirely.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PredictionInput {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_outputs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A prediction resource, as returned by both creation and status calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
    /// `starting | processing | succeeded | failed | canceled`.
    pub status: String,
    #[serde(default)]
    pub output: Option<PredictionOutput>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The `output` field: a URL string for single-output models, a list of
/// URLs for batch models.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutput {
    One(String),
    Many(Vec<String>),
}

impl PredictionOutput {
    pub fn into_urls(self) -> Vec<String> {
        match self {
            PredictionOutput::One(url) => vec![url],
            PredictionOutput::Many(urls) => urls,
        }
    }
}

/// Error body shape for non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub detail: String,
}

/// Account resource, used as a health probe.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub username: String,
}
