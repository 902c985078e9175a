// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `omnigen models` command implementation.
//!
//! Lists registered providers and their priced models straight from the
//! local adapter registry. No provider calls are made; availability only
//! reflects whether a credential is configured.

use std::str::FromStr;

use omnigen_config::model::OmnigenConfig;
use omnigen_core::{Modality, OmnigenError, PriceDescriptor};
use omnigen_registry::builtin_registry;

/// Run the `omnigen models` command.
pub fn run_models(
    config: &OmnigenConfig,
    modality: Option<&str>,
    json: bool,
) -> Result<(), OmnigenError> {
    let modality = modality.map(parse_modality).transpose()?;
    let registry = builtin_registry(config);
    let catalog = registry.catalog(modality, true);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&catalog).unwrap_or_else(|_| "[]".to_string())
        );
        return Ok(());
    }

    println!();
    println!("  omnigen models");
    println!("  {}", "-".repeat(44));

    if catalog.is_empty() {
        println!("    no providers match");
        println!();
        return Ok(());
    }

    for entry in &catalog {
        let marker = if entry.available {
            ""
        } else {
            "  (no key configured)"
        };
        println!();
        println!("    {} [{}]{marker}", entry.display_name, entry.modality);
        for model in &entry.models {
            println!("      {:<28} {}", model.id, render_price(&model.price));
        }
    }

    println!();
    Ok(())
}

fn parse_modality(value: &str) -> Result<Modality, OmnigenError> {
    Modality::from_str(&value.to_lowercase()).map_err(|_| {
        OmnigenError::Config(format!(
            "unknown modality {value} (expected text, image, video, or audio)"
        ))
    })
}

/// One-line price summary for a model listing.
fn render_price(price: &PriceDescriptor) -> String {
    match price {
        PriceDescriptor::PerThousandTokens {
            input_per_1k,
            output_per_1k,
        } => format!("${input_per_1k}/1k in, ${output_per_1k}/1k out"),
        PriceDescriptor::PerUnit {
            unit,
            price,
            variants,
            ..
        } => {
            let base = format!("${price}/{unit}");
            if variants.is_empty() {
                base
            } else {
                let detail = variants
                    .iter()
                    .map(|(key, value)| format!("{key} ${value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{base} ({detail})")
            }
        }
    }
}
