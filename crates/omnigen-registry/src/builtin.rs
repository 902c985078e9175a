// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the compiled-in provider adapters.

use std::sync::Arc;

use omnigen_anthropic::AnthropicAdapter;
use omnigen_config::model::OmnigenConfig;
use omnigen_core::traits::{ProviderAdapter, TaskProviderAdapter};
use omnigen_kling::KlingAdapter;
use omnigen_openai::OpenAiAdapter;
use omnigen_replicate::ReplicateAdapter;

use crate::credentials::ConfigCredentials;
use crate::registry::AdapterRegistry;

/// A registry populated with every compiled-in provider, resolving
/// credentials from `config` and honoring its `base_url` overrides.
pub fn builtin_registry(config: &OmnigenConfig) -> AdapterRegistry {
    let credentials = Arc::new(ConfigCredentials::new(config.providers.clone()));
    let mut registry = AdapterRegistry::new(credentials);

    let base_url = config.providers.openai.base_url.clone();
    registry.register_sync(omnigen_openai::descriptor(), move |api_key| {
        let mut adapter = OpenAiAdapter::new(api_key)?;
        if let Some(url) = &base_url {
            adapter = adapter.with_base_url(url.clone());
        }
        Ok(Arc::new(adapter) as Arc<dyn ProviderAdapter>)
    });

    let base_url = config.providers.anthropic.base_url.clone();
    registry.register_sync(omnigen_anthropic::descriptor(), move |api_key| {
        let mut adapter = AnthropicAdapter::new(api_key)?;
        if let Some(url) = &base_url {
            adapter = adapter.with_base_url(url.clone());
        }
        Ok(Arc::new(adapter) as Arc<dyn ProviderAdapter>)
    });

    let base_url = config.providers.kling.base_url.clone();
    registry.register_task(omnigen_kling::descriptor(), move |api_key| {
        let mut adapter = KlingAdapter::new(api_key)?;
        if let Some(url) = &base_url {
            adapter = adapter.with_base_url(url.clone());
        }
        Ok(Arc::new(adapter) as Arc<dyn TaskProviderAdapter>)
    });

    let base_url = config.providers.replicate.base_url.clone();
    registry.register_task(omnigen_replicate::descriptor(), move |api_key| {
        let mut adapter = ReplicateAdapter::new(api_key)?;
        if let Some(url) = &base_url {
            adapter = adapter.with_base_url(url.clone());
        }
        Ok(Arc::new(adapter) as Arc<dyn TaskProviderAdapter>)
    });

    registry
}

#[cfg(test)]
mod tests {
    use omnigen_core::Modality;

    use super::*;

    #[test]
    fn all_builtin_providers_are_registered() {
        let registry = builtin_registry(&OmnigenConfig::default());
        assert_eq!(
            registry.provider_names(),
            vec!["anthropic", "kling", "openai", "replicate"]
        );
    }

    #[test]
    fn descriptors_carry_modalities_and_models() {
        let registry = builtin_registry(&OmnigenConfig::default());

        let kling = registry.descriptor("kling").expect("registered");
        assert_eq!(kling.modality, Modality::Video);
        assert!(kling.pricing.price_for("kling-2.6/text-to-video").is_some());

        let openai = registry.descriptor("openai").expect("registered");
        assert_eq!(openai.modality, Modality::Text);
        assert!(!openai.pricing.models.is_empty());
    }

    #[test]
    fn catalog_covers_every_builtin() {
        let registry = builtin_registry(&OmnigenConfig::default());
        let catalog = registry.catalog(None, true);
        assert_eq!(catalog.len(), 4);
        assert!(catalog.iter().all(|entry| !entry.models.is_empty()));
    }
}
