// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pricing descriptor types.
//!
//! Every adapter owns a [`PricingTable`] mapping its model identifiers to
//! price descriptors; the cost engine consumes these tables. Prices are in
//! USD. The table is the single source of truth: a model absent from it
//! cannot be billed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::Modality;

/// Billing unit for flat-priced models.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PriceUnit {
    Image,
    Video,
    Request,
    Second,
}

/// How per-unit models bill when a single request yields several outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MultiOutputPolicy {
    /// Each returned output bills one unit (batch image models).
    PerOutput,
    /// One unit regardless of output count.
    #[default]
    FirstOnly,
}

/// Price of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceDescriptor {
    /// Token-metered text models: USD per 1 000 input and output tokens.
    PerThousandTokens { input_per_1k: f64, output_per_1k: f64 },
    /// Flat-priced media models, optionally keyed by a variant string such
    /// as `"5s"` or `"10s_audio"` (duration plus audio flag). When no
    /// variant matches, `price` applies.
    PerUnit {
        unit: PriceUnit,
        price: f64,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        variants: BTreeMap<String, f64>,
        #[serde(default)]
        multi_output: MultiOutputPolicy,
    },
}

impl PriceDescriptor {
    pub fn tokens(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self::PerThousandTokens {
            input_per_1k,
            output_per_1k,
        }
    }

    pub fn per_unit(unit: PriceUnit, price: f64) -> Self {
        Self::PerUnit {
            unit,
            price,
            variants: BTreeMap::new(),
            multi_output: MultiOutputPolicy::FirstOnly,
        }
    }

    /// Adds a variant price. No-op on token descriptors.
    pub fn with_variant(mut self, key: impl Into<String>, variant_price: f64) -> Self {
        if let Self::PerUnit { variants, .. } = &mut self {
            variants.insert(key.into(), variant_price);
        }
        self
    }

    /// Marks the descriptor as billing each returned output separately.
    pub fn billed_per_output(mut self) -> Self {
        if let Self::PerUnit { multi_output, .. } = &mut self {
            *multi_output = MultiOutputPolicy::PerOutput;
        }
        self
    }
}

/// Variant key for duration/audio priced video models: `"5s"`, `"5s_audio"`.
pub fn duration_variant_key(duration_secs: u32, with_audio: bool) -> String {
    if with_audio {
        format!("{duration_secs}s_audio")
    } else {
        format!("{duration_secs}s")
    }
}

/// Model-id → price map owned by one adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    pub models: BTreeMap<String, PriceDescriptor>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>, price: PriceDescriptor) -> Self {
        self.models.insert(model.into(), price);
        self
    }

    pub fn price_for(&self, model: &str) -> Option<&PriceDescriptor> {
        self.models.get(model)
    }

    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

/// Static identity of an adapter: name, display name, modality, prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    /// Registry key, lowercase, stable (`"openai"`, `"kling"`).
    pub name: String,
    pub display_name: String,
    pub modality: Modality,
    pub pricing: PricingTable,
}

impl AdapterDescriptor {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        modality: Modality,
        pricing: PricingTable,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            modality,
            pricing,
        }
    }
}
