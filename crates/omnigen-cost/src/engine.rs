// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost computation over pricing tables and credit conversion.
//!
//! Two currencies flow through finalization: provider cost (USD actually
//! owed to the provider) and user credits (provider cost times a
//! configurable markup). Both are computed here and only here.

use omnigen_core::pricing::{MultiOutputPolicy, PriceDescriptor, PriceUnit, PricingTable};
use omnigen_core::{OmnigenError, UsageMetrics, duration_variant_key};
use tracing::warn;

/// Markup applied by default when converting provider cost to credits.
pub const DEFAULT_CREDIT_MARKUP: f64 = 2.0;

/// Provider cost in USD for one finished generation.
///
/// Fails closed: a model absent from the table is an error, never a free
/// or guessed-price generation.
pub fn compute_provider_cost(
    provider: &str,
    pricing: &PricingTable,
    model: &str,
    usage: &UsageMetrics,
) -> Result<f64, OmnigenError> {
    let descriptor = pricing
        .price_for(model)
        .ok_or_else(|| OmnigenError::UnknownModel {
            provider: provider.to_string(),
            model: model.to_string(),
        })?;

    match descriptor {
        PriceDescriptor::PerThousandTokens {
            input_per_1k,
            output_per_1k,
        } => {
            let input = usage.input_tokens.unwrap_or(0) as f64 / 1_000.0 * input_per_1k;
            let output = usage.output_tokens.unwrap_or(0) as f64 / 1_000.0 * output_per_1k;
            Ok(input + output)
        }
        PriceDescriptor::PerUnit {
            unit,
            price,
            variants,
            multi_output,
        } => {
            let unit_price = usage
                .duration_secs
                .map(|d| duration_variant_key(d, usage.with_audio))
                .and_then(|key| variants.get(&key).copied())
                .unwrap_or(*price);

            let single = match unit {
                PriceUnit::Second => {
                    let seconds = usage.duration_secs.unwrap_or(0);
                    if seconds == 0 {
                        warn!(provider, model, "per-second model billed without a duration");
                    }
                    unit_price * f64::from(seconds)
                }
                PriceUnit::Image | PriceUnit::Video | PriceUnit::Request => unit_price,
            };

            let billed_units = match multi_output {
                MultiOutputPolicy::PerOutput => usage.output_count.max(1),
                MultiOutputPolicy::FirstOnly => 1,
            };
            Ok(single * f64::from(billed_units))
        }
    }
}

/// Result of charging one generation: both currencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Charge {
    pub provider_cost: f64,
    pub credits: f64,
}

/// Converts provider cost into user credits at a fixed markup.
#[derive(Debug, Clone, Copy)]
pub struct CostEngine {
    markup: f64,
}

impl CostEngine {
    pub fn new(markup: f64) -> Self {
        Self { markup }
    }

    pub fn markup(&self) -> f64 {
        self.markup
    }

    pub fn credits_for_cost(&self, provider_cost: f64) -> f64 {
        provider_cost * self.markup
    }

    /// Computes provider cost from the table and converts it in one step.
    pub fn charge(
        &self,
        provider: &str,
        pricing: &PricingTable,
        model: &str,
        usage: &UsageMetrics,
    ) -> Result<Charge, OmnigenError> {
        let provider_cost = compute_provider_cost(provider, pricing, model, usage)?;
        Ok(Charge {
            provider_cost,
            credits: self.credits_for_cost(provider_cost),
        })
    }
}

impl Default for CostEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CREDIT_MARKUP)
    }
}
