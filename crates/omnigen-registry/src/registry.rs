// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter registry: descriptors, factories, and credentialed instances.
//!
//! The registry stores one [`RegistryEntry`] per provider name. Entries
//! carry the provider's static descriptor (always listable, no credential
//! needed) and a factory that builds a live adapter from an API key.
//! Built instances are cached per `(provider, credential)` pair so a key
//! rotation yields a fresh instance while the old one serves in-flight
//! work until dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use omnigen_core::pricing::{AdapterDescriptor, PriceDescriptor};
use omnigen_core::traits::{CredentialResolver, ProviderAdapter, TaskProviderAdapter};
use omnigen_core::{
    Capabilities, GenerationOutcome, GenerationRequest, HealthReport, Modality, OmnigenError,
    UsageMetrics,
};

/// Characters of the credential included in the instance cache key.
/// Enough to distinguish rotated keys without holding the full secret in
/// a second place.
const CACHE_KEY_PREFIX_LEN: usize = 8;

/// Factory building a synchronous adapter from an API key.
pub type SyncFactory =
    Box<dyn Fn(&str) -> Result<Arc<dyn ProviderAdapter>, OmnigenError> + Send + Sync>;

/// Factory building a task-based adapter from an API key.
pub type TaskFactory =
    Box<dyn Fn(&str) -> Result<Arc<dyn TaskProviderAdapter>, OmnigenError> + Send + Sync>;

/// The two adapter families a registry entry can produce.
enum AdapterFactory {
    Sync(SyncFactory),
    Task(TaskFactory),
}

impl AdapterFactory {
    fn build(&self, api_key: &str) -> Result<ResolvedAdapter, OmnigenError> {
        match self {
            AdapterFactory::Sync(factory) => Ok(ResolvedAdapter::Sync(factory(api_key)?)),
            AdapterFactory::Task(factory) => Ok(ResolvedAdapter::Task(factory(api_key)?)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AdapterFactory::Sync(_) => "sync",
            AdapterFactory::Task(_) => "task",
        }
    }
}

/// A live adapter instance, dispatched by family.
///
/// `Sync` adapters finish a generation within one call; `Task` adapters
/// additionally expose the create-and-poll surface the orchestrator
/// drives step by step. Common `ProviderAdapter` operations are available
/// on either variant through the inherent methods.
#[derive(Clone)]
pub enum ResolvedAdapter {
    Sync(Arc<dyn ProviderAdapter>),
    Task(Arc<dyn TaskProviderAdapter>),
}

impl ResolvedAdapter {
    pub fn descriptor(&self) -> &AdapterDescriptor {
        match self {
            ResolvedAdapter::Sync(a) => a.descriptor(),
            ResolvedAdapter::Task(a) => a.descriptor(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ResolvedAdapter::Sync(a) => a.name(),
            ResolvedAdapter::Task(a) => a.name(),
        }
    }

    pub fn modality(&self) -> Modality {
        self.descriptor().modality
    }

    pub fn is_task(&self) -> bool {
        matches!(self, ResolvedAdapter::Task(_))
    }

    /// The task-based surface, when this adapter has one.
    pub fn as_task(&self) -> Option<Arc<dyn TaskProviderAdapter>> {
        match self {
            ResolvedAdapter::Sync(_) => None,
            ResolvedAdapter::Task(a) => Some(Arc::clone(a)),
        }
    }

    pub async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        match self {
            ResolvedAdapter::Sync(a) => a.generate(request).await,
            ResolvedAdapter::Task(a) => a.generate(request).await,
        }
    }

    pub fn calculate_cost(&self, model: &str, usage: &UsageMetrics) -> Result<f64, OmnigenError> {
        match self {
            ResolvedAdapter::Sync(a) => a.calculate_cost(model, usage),
            ResolvedAdapter::Task(a) => a.calculate_cost(model, usage),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            ResolvedAdapter::Sync(a) => a.capabilities(),
            ResolvedAdapter::Task(a) => a.capabilities(),
        }
    }

    pub async fn health_check(&self) -> HealthReport {
        match self {
            ResolvedAdapter::Sync(a) => a.health_check().await,
            ResolvedAdapter::Task(a) => a.health_check().await,
        }
    }

    pub async fn shutdown(&self) -> Result<(), OmnigenError> {
        match self {
            ResolvedAdapter::Sync(a) => a.shutdown().await,
            ResolvedAdapter::Task(a) => a.shutdown().await,
        }
    }
}

/// A single entry in the adapter registry.
pub struct RegistryEntry {
    /// Static identity: name, display name, modality, pricing.
    pub descriptor: AdapterDescriptor,
    factory: AdapterFactory,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("descriptor", &self.descriptor)
            .field("factory", &self.factory.kind())
            .finish()
    }
}

/// One model row in a catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogModel {
    pub id: String,
    pub price: PriceDescriptor,
}

/// One provider row in a catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub provider: String,
    pub display_name: String,
    pub modality: Modality,
    /// Whether a credential is currently configured for this provider.
    pub available: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<CatalogModel>,
}

/// Registry of provider adapters keyed by name.
///
/// Registration stores a descriptor and a factory; `resolve` turns a name
/// into a live instance by looking up the credential and building (or
/// reusing) the adapter for it. Providers without credentials stay
/// listable through `catalog` but fail resolution.
pub struct AdapterRegistry {
    entries: BTreeMap<String, RegistryEntry>,
    instances: DashMap<(String, String), ResolvedAdapter>,
    credentials: Arc<dyn CredentialResolver>,
}

impl AdapterRegistry {
    /// Create an empty registry using the given credential source.
    pub fn new(credentials: Arc<dyn CredentialResolver>) -> Self {
        Self {
            entries: BTreeMap::new(),
            instances: DashMap::new(),
            credentials,
        }
    }

    /// Register a synchronous provider under its descriptor's name.
    pub fn register_sync<F>(&mut self, descriptor: AdapterDescriptor, factory: F)
    where
        F: Fn(&str) -> Result<Arc<dyn ProviderAdapter>, OmnigenError> + Send + Sync + 'static,
    {
        self.insert(descriptor, AdapterFactory::Sync(Box::new(factory)));
    }

    /// Register a task-based provider under its descriptor's name.
    pub fn register_task<F>(&mut self, descriptor: AdapterDescriptor, factory: F)
    where
        F: Fn(&str) -> Result<Arc<dyn TaskProviderAdapter>, OmnigenError> + Send + Sync + 'static,
    {
        self.insert(descriptor, AdapterFactory::Task(Box::new(factory)));
    }

    fn insert(&mut self, descriptor: AdapterDescriptor, factory: AdapterFactory) {
        debug!(
            provider = %descriptor.name,
            kind = factory.kind(),
            models = descriptor.pricing.models.len(),
            "adapter registered"
        );
        self.entries
            .insert(descriptor.name.clone(), RegistryEntry { descriptor, factory });
    }

    /// Whether a provider with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The static descriptor for `name`, credential or not.
    pub fn descriptor(&self, name: &str) -> Option<&AdapterDescriptor> {
        self.entries.get(name).map(|entry| &entry.descriptor)
    }

    /// Registered provider names, sorted.
    pub fn provider_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Resolve a provider name to a live adapter instance.
    ///
    /// Instances are cached per `(name, credential)`; under concurrent
    /// resolution of the same pair the first build wins and the rest
    /// reuse it.
    pub fn resolve(&self, name: &str) -> Result<ResolvedAdapter, OmnigenError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| OmnigenError::ProviderNotFound {
                name: name.to_string(),
            })?;
        let api_key =
            self.credentials
                .credential_for(name)
                .ok_or_else(|| OmnigenError::MissingCredential {
                    provider: name.to_string(),
                })?;

        let cache_key = (name.to_string(), key_prefix(&api_key));
        match self.instances.entry(cache_key) {
            Entry::Occupied(hit) => Ok(hit.get().clone()),
            Entry::Vacant(slot) => {
                let adapter = entry.factory.build(&api_key)?;
                info!(provider = name, kind = entry.factory.kind(), "adapter instance created");
                slot.insert(adapter.clone());
                Ok(adapter)
            }
        }
    }

    /// Catalog of registered providers in name order, flagged by
    /// credential availability. `modality` narrows the listing; with
    /// `with_models`, each entry carries its priced model list.
    pub fn catalog(&self, modality: Option<Modality>, with_models: bool) -> Vec<CatalogEntry> {
        self.entries
            .values()
            .filter(|entry| modality.is_none_or(|m| entry.descriptor.modality == m))
            .map(|entry| {
                let descriptor = &entry.descriptor;
                let models = if with_models {
                    descriptor
                        .pricing
                        .models
                        .iter()
                        .map(|(id, price)| CatalogModel {
                            id: id.clone(),
                            price: price.clone(),
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                CatalogEntry {
                    provider: descriptor.name.clone(),
                    display_name: descriptor.display_name.clone(),
                    modality: descriptor.modality,
                    available: self.credentials.credential_for(&descriptor.name).is_some(),
                    models,
                }
            })
            .collect()
    }

    /// Probe every registered provider concurrently.
    ///
    /// Providers without a credential report `no_key` without being
    /// contacted; providers whose factory fails report `down`.
    pub async fn health_check_all(&self) -> BTreeMap<String, HealthReport> {
        let checks = self.entries.keys().map(|name| async move {
            let report = match self.credentials.credential_for(name) {
                None => HealthReport::no_key(),
                Some(_) => match self.resolve(name) {
                    Ok(adapter) => adapter.health_check().await,
                    Err(error) => HealthReport::down(error.to_string()),
                },
            };
            (name.clone(), report)
        });
        join_all(checks).await.into_iter().collect()
    }

    /// Shut down every built instance and drop the cache.
    pub async fn shutdown_all(&self) {
        // Drain under the lock, await outside it.
        let instances: Vec<((String, String), ResolvedAdapter)> = self
            .instances
            .iter()
            .map(|item| (item.key().clone(), item.value().clone()))
            .collect();
        self.instances.clear();
        for ((name, _), adapter) in instances {
            if let Err(error) = adapter.shutdown().await {
                warn!(provider = %name, %error, "adapter shutdown failed");
            }
        }
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("entries", &self.entries)
            .field("instances", &self.instances.len())
            .finish()
    }
}

/// Cache-key fragment of a credential: its first characters, never the
/// whole secret.
fn key_prefix(api_key: &str) -> String {
    api_key.chars().take(CACHE_KEY_PREFIX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use omnigen_test_utils::mock_adapters::{MOCK_SYNC_NAME, MOCK_TASK_NAME};
    use omnigen_test_utils::{MockSyncAdapter, MockTaskAdapter, StaticCredentials};

    use super::*;

    /// Credential source tests can re-key at runtime.
    struct SwappableCredentials {
        keys: Mutex<BTreeMap<String, String>>,
    }

    impl SwappableCredentials {
        fn new(provider: &str, key: &str) -> Self {
            let mut keys = BTreeMap::new();
            keys.insert(provider.to_string(), key.to_string());
            Self {
                keys: Mutex::new(keys),
            }
        }

        fn set(&self, provider: &str, key: &str) {
            self.keys
                .lock()
                .expect("credential lock")
                .insert(provider.to_string(), key.to_string());
        }
    }

    impl CredentialResolver for SwappableCredentials {
        fn credential_for(&self, provider: &str) -> Option<String> {
            self.keys.lock().expect("credential lock").get(provider).cloned()
        }
    }

    fn sync_registry(credentials: Arc<dyn CredentialResolver>) -> (AdapterRegistry, Arc<AtomicUsize>) {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let mut registry = AdapterRegistry::new(credentials);
        let adapter = Arc::new(MockSyncAdapter::new());
        registry.register_sync(adapter.descriptor().clone(), move |_key| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::clone(&adapter) as Arc<dyn ProviderAdapter>)
        });
        (registry, builds)
    }

    #[tokio::test]
    async fn resolve_builds_and_reuses_instances() {
        let credentials = Arc::new(StaticCredentials::new().with(MOCK_SYNC_NAME, "sk-test-1"));
        let (registry, builds) = sync_registry(credentials);

        let first = registry.resolve(MOCK_SYNC_NAME).expect("resolvable");
        let second = registry.resolve(MOCK_SYNC_NAME).expect("resolvable");
        assert_eq!(first.name(), MOCK_SYNC_NAME);
        assert_eq!(second.name(), MOCK_SYNC_NAME);
        assert_eq!(builds.load(Ordering::SeqCst), 1, "second resolve must hit the cache");
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let credentials = Arc::new(StaticCredentials::new());
        let registry = AdapterRegistry::new(credentials);
        let err = registry.resolve("nope").expect_err("must fail");
        assert!(matches!(err, OmnigenError::ProviderNotFound { name } if name == "nope"));
    }

    #[tokio::test]
    async fn missing_credential_fails_resolution_but_not_listing() {
        let credentials = Arc::new(StaticCredentials::new());
        let (registry, builds) = sync_registry(credentials);

        let err = registry.resolve(MOCK_SYNC_NAME).expect_err("no key configured");
        assert!(matches!(err, OmnigenError::MissingCredential { provider } if provider == MOCK_SYNC_NAME));
        assert_eq!(builds.load(Ordering::SeqCst), 0, "factory must not run without a key");
        assert!(registry.contains(MOCK_SYNC_NAME));
        assert!(registry.descriptor(MOCK_SYNC_NAME).is_some());
    }

    #[tokio::test]
    async fn rotated_credential_builds_fresh_instance() {
        let swappable = Arc::new(SwappableCredentials::new(MOCK_SYNC_NAME, "sk-first-key"));
        let (registry, builds) = sync_registry(Arc::clone(&swappable) as Arc<dyn CredentialResolver>);

        registry.resolve(MOCK_SYNC_NAME).expect("resolvable");
        swappable.set(MOCK_SYNC_NAME, "sk-other-key");
        registry.resolve(MOCK_SYNC_NAME).expect("resolvable");
        assert_eq!(builds.load(Ordering::SeqCst), 2, "new key must not reuse the old instance");
    }

    #[tokio::test]
    async fn task_adapter_resolves_with_task_surface() {
        let credentials = Arc::new(StaticCredentials::new().with(MOCK_TASK_NAME, "sk-task-1"));
        let mut registry = AdapterRegistry::new(credentials);
        let adapter = Arc::new(MockTaskAdapter::new());
        registry.register_task(adapter.descriptor().clone(), move |_key| {
            Ok(Arc::clone(&adapter) as Arc<dyn TaskProviderAdapter>)
        });

        let resolved = registry.resolve(MOCK_TASK_NAME).expect("resolvable");
        assert!(resolved.is_task());
        let task = resolved.as_task().expect("task surface");
        let creation = task
            .create_task(&GenerationRequest::new("mock-video-1", "a fox"))
            .await;
        assert!(creation.success);
    }

    #[tokio::test]
    async fn sync_adapter_has_no_task_surface() {
        let credentials = Arc::new(StaticCredentials::new().with(MOCK_SYNC_NAME, "sk-test-1"));
        let (registry, _) = sync_registry(credentials);
        let resolved = registry.resolve(MOCK_SYNC_NAME).expect("resolvable");
        assert!(!resolved.is_task());
        assert!(resolved.as_task().is_none());
    }

    #[tokio::test]
    async fn catalog_lists_all_entries_sorted_with_availability() {
        let credentials = Arc::new(StaticCredentials::new().with(MOCK_SYNC_NAME, "sk-test-1"));
        let mut registry = AdapterRegistry::new(credentials);
        let task = Arc::new(MockTaskAdapter::new());
        let sync = Arc::new(MockSyncAdapter::new());
        registry.register_task(task.descriptor().clone(), move |_key| {
            Ok(Arc::clone(&task) as Arc<dyn TaskProviderAdapter>)
        });
        registry.register_sync(sync.descriptor().clone(), move |_key| {
            Ok(Arc::clone(&sync) as Arc<dyn ProviderAdapter>)
        });

        let catalog = registry.catalog(None, false);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].provider, MOCK_SYNC_NAME);
        assert_eq!(catalog[1].provider, MOCK_TASK_NAME);
        assert!(catalog[0].available, "configured key");
        assert!(!catalog[1].available, "no key configured");
        assert!(catalog[0].models.is_empty());

        let videos = registry.catalog(Some(Modality::Video), false);
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].provider, MOCK_TASK_NAME);
    }

    #[tokio::test]
    async fn catalog_with_models_carries_prices() {
        let credentials = Arc::new(StaticCredentials::new());
        let mut registry = AdapterRegistry::new(credentials);
        let adapter = Arc::new(MockTaskAdapter::new());
        registry.register_task(adapter.descriptor().clone(), move |_key| {
            Ok(Arc::clone(&adapter) as Arc<dyn TaskProviderAdapter>)
        });

        let catalog = registry.catalog(None, true);
        let models: Vec<&str> = catalog[0].models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(models, vec!["mock-image-1", "mock-video-1"]);
        assert!(matches!(
            catalog[0].models[1].price,
            PriceDescriptor::PerUnit { .. }
        ));
    }

    #[tokio::test]
    async fn health_check_all_reports_no_key_without_contacting() {
        let credentials = Arc::new(StaticCredentials::new().with(MOCK_SYNC_NAME, "sk-test-1"));
        let mut registry = AdapterRegistry::new(credentials);
        let sync = Arc::new(MockSyncAdapter::new());
        let task = Arc::new(MockTaskAdapter::new());
        registry.register_sync(sync.descriptor().clone(), move |_key| {
            Ok(Arc::clone(&sync) as Arc<dyn ProviderAdapter>)
        });
        let task_builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&task_builds);
        registry.register_task(task.descriptor().clone(), move |_key| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::clone(&task) as Arc<dyn TaskProviderAdapter>)
        });

        let reports = registry.health_check_all().await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[MOCK_SYNC_NAME].status, omnigen_core::HealthState::Healthy);
        assert_eq!(reports[MOCK_TASK_NAME].status, omnigen_core::HealthState::NoKey);
        assert_eq!(task_builds.load(Ordering::SeqCst), 0, "keyless providers are not built");
    }

    #[tokio::test]
    async fn failing_factory_reports_down_health() {
        let credentials = Arc::new(StaticCredentials::new().with("broken", "sk-test-1"));
        let mut registry = AdapterRegistry::new(credentials);
        let descriptor = AdapterDescriptor::new(
            "broken",
            "Broken",
            Modality::Text,
            omnigen_core::PricingTable::new(),
        );
        registry.register_sync(descriptor, |_key| {
            Err(OmnigenError::Config("header rejected".into()))
        });

        let reports = registry.health_check_all().await;
        assert_eq!(reports["broken"].status, omnigen_core::HealthState::Down);
        assert!(reports["broken"].error.as_deref().unwrap_or("").contains("header rejected"));
    }

    #[tokio::test]
    async fn shutdown_all_drains_instances() {
        let credentials = Arc::new(StaticCredentials::new().with(MOCK_SYNC_NAME, "sk-test-1"));
        let mut registry = AdapterRegistry::new(credentials);
        let adapter = Arc::new(MockSyncAdapter::new());
        let shared = Arc::clone(&adapter);
        registry.register_sync(adapter.descriptor().clone(), move |_key| {
            Ok(Arc::clone(&shared) as Arc<dyn ProviderAdapter>)
        });

        registry.resolve(MOCK_SYNC_NAME).expect("resolvable");
        registry.shutdown_all().await;
        assert_eq!(adapter.shutdown_calls(), 1);
        assert_eq!(registry.instances.len(), 0);
    }

    #[test]
    fn key_prefix_truncates_without_exposing_secret() {
        assert_eq!(key_prefix("sk-abcdef123456"), "sk-abcde");
        assert_eq!(key_prefix("short"), "short");
    }
}
