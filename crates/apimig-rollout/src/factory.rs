//! Migration client factory
//!
//! # Core Concepts
//!
//! - **Decision per call**: every `get_client` asks the controller, so
//!   path-sensitive rules and live config changes apply immediately
//! - **Client cache**: constructed clients are cached per (variant, preset)
//!   when the preset is cacheable; decisions are never cached
//! - **Base URL**: the unified client embeds `/api/<version>`; the legacy
//!   client uses the bare host and its call sites carry the prefix
//! - **Pipeline**: each client carries its interceptor order, computed by
//!   the optimizer and registered once per client
//!
//! # Example
//!
//! ```rust
//! use apimig_core::{ClientVariant, Preset};
//! use apimig_rollout::{FactoryConfig, MemoryStore, MigrationClientFactory, RolloutConfig, RolloutController};
//! use std::sync::Arc;
//!
//! let controller = RolloutController::with_store(
//!     RolloutConfig::new().with_enabled(true).with_percentage(100),
//!     Arc::new(MemoryStore::new()),
//! );
//! let factory = MigrationClientFactory::new(Arc::new(controller), FactoryConfig::default());
//! let client = factory.get_client(Preset::Auth, Some("/me")).unwrap();
//! assert_eq!(client.variant(), ClientVariant::Unified);
//! assert_eq!(client.url("/me"), "http://localhost:8080/api/v1/me");
//! ```

use crate::controller::RolloutController;
use crate::error::FactoryError;
use crate::telemetry::{CounterSink, MetricEvent, MetricSink};
use apimig_core::{ClientVariant, InterceptorType, Preset, PresetSettings};
use apimig_interceptor::{InterceptorOptimizer, InterceptorRegistry, OptimizationConfig};
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Where clients point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Scheme and host, without a trailing slash
    pub base_host: String,
    /// API version embedded by the unified client
    pub api_version: String,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            base_host: "http://localhost:8080".to_string(),
            api_version: "v1".to_string(),
        }
    }
}

impl FactoryConfig {
    /// With a different host
    #[inline]
    #[must_use]
    pub fn with_base_host(mut self, host: impl Into<String>) -> Self {
        self.base_host = host.into();
        self
    }

    /// With a different API version
    #[inline]
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Base URL for `variant`
    #[must_use]
    pub fn base_url(&self, variant: ClientVariant) -> String {
        let host = self.base_host.trim_end_matches('/');
        match variant {
            ClientVariant::Legacy => host.to_string(),
            ClientVariant::Unified => format!("{host}/api/{}", self.api_version),
        }
    }

    /// `path` with the version prefix a legacy call site would write
    #[must_use]
    pub fn versioned_path(&self, path: &str) -> String {
        format!("/api/{}{}", self.api_version, leading_slash(path))
    }
}

fn leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// A constructed client
pub struct ApiClient {
    id: String,
    variant: ClientVariant,
    preset: Preset,
    base_url: String,
    settings: PresetSettings,
    interceptors: Vec<InterceptorType>,
    http: reqwest::Client,
}

impl ApiClient {
    /// `variant:preset`, used as the registry key
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Construction pattern
    #[inline]
    #[must_use]
    pub fn variant(&self) -> ClientVariant {
        self.variant
    }

    /// Preset requested
    #[inline]
    #[must_use]
    pub fn preset(&self) -> Preset {
        self.preset
    }

    /// Base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolved transport settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &PresetSettings {
        &self.settings
    }

    /// Interceptor execution order
    #[inline]
    #[must_use]
    pub fn interceptors(&self) -> &[InterceptorType] {
        &self.interceptors
    }

    /// Underlying transport
    #[inline]
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for `path`
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, leading_slash(path))
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

/// Hands out clients for the variant the controller selects
pub struct MigrationClientFactory {
    controller: Arc<RolloutController>,
    optimizer: Arc<InterceptorOptimizer>,
    registry: InterceptorRegistry,
    config: FactoryConfig,
    cache: DashMap<(ClientVariant, Preset), Arc<ApiClient>>,
    sink: Arc<dyn MetricSink>,
}

impl MigrationClientFactory {
    /// Factory with a default optimizer and a counter sink
    #[must_use]
    pub fn new(controller: Arc<RolloutController>, config: FactoryConfig) -> Self {
        Self {
            controller,
            optimizer: Arc::new(InterceptorOptimizer::new(OptimizationConfig::default())),
            registry: InterceptorRegistry::new(),
            config,
            cache: DashMap::new(),
            sink: Arc::new(CounterSink),
        }
    }

    /// With a shared optimizer
    #[inline]
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Arc<InterceptorOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// With a different metric sink
    #[inline]
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Decision engine
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &Arc<RolloutController> {
        &self.controller
    }

    /// Interceptor optimizer
    #[inline]
    #[must_use]
    pub fn optimizer(&self) -> &Arc<InterceptorOptimizer> {
        &self.optimizer
    }

    /// Interceptor registrations per client
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &InterceptorRegistry {
        &self.registry
    }

    /// Host and version
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Client for `preset`, variant chosen for `path`
    pub fn get_client(&self, preset: Preset, path: Option<&str>) -> Result<Arc<ApiClient>, FactoryError> {
        let variant = ClientVariant::from_decision(self.controller.should_use_new(path));
        let client = self.client_for(variant, preset)?;

        let mut event = MetricEvent::new("client_resolved", variant).with_tag("preset", preset.as_str());
        if let Some(path) = path {
            event = event.with_tag("path", path);
        }
        self.emit(&event);
        Ok(client)
    }

    /// Client of a fixed `variant`, bypassing the decision
    pub fn client_for(&self, variant: ClientVariant, preset: Preset) -> Result<Arc<ApiClient>, FactoryError> {
        let key = (variant, preset);
        if let Some(client) = self.cache.get(&key) {
            return Ok(Arc::clone(client.value()));
        }

        let client = Arc::new(self.build(variant, preset)?);
        if client.settings.cacheable {
            let cached = self.cache.entry(key).or_insert(client);
            return Ok(Arc::clone(cached.value()));
        }
        Ok(client)
    }

    /// Number of cached clients
    #[must_use]
    pub fn cached_clients(&self) -> usize {
        self.cache.len()
    }

    /// Drop cached clients and their registrations
    pub fn clear_cache(&self) {
        for entry in &self.cache {
            self.registry.remove_all(entry.value().id());
        }
        self.cache.clear();
        tracing::debug!("Client cache cleared");
    }

    /// Record an event tagged with `variant`; never fails
    pub fn record_metric(&self, event_name: &str, variant: ClientVariant, metadata: BTreeMap<String, String>) {
        let mut event = MetricEvent::new(event_name, variant);
        event.metadata = metadata;
        self.emit(&event);
    }

    fn emit(&self, event: &MetricEvent) {
        if let Err(e) = self.sink.record(event) {
            if self.controller.debug_mode() {
                tracing::warn!("Dropped metric {}: {}", event.name, e);
            }
        }
    }

    fn build(&self, variant: ClientVariant, preset: Preset) -> Result<ApiClient, FactoryError> {
        let settings = match variant {
            ClientVariant::Unified => preset.settings(),
            ClientVariant::Legacy => Preset::Default.settings(),
        };
        let id = format!("{variant}:{preset}");
        let base_url = self.config.base_url(variant);
        let interceptors = self.optimizer.optimize_execution_order(&settings.interceptors());
        for kind in &interceptors {
            self.registry.register_once(&id, *kind);
        }

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .default_headers(header_map(&settings.headers)?)
            .build()?;

        tracing::debug!("Built {} client for {} at {}", variant, preset, base_url);
        Ok(ApiClient {
            id,
            variant,
            preset,
            base_url,
            settings,
            interceptors,
            http,
        })
    }
}

impl fmt::Debug for MigrationClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationClientFactory")
            .field("config", &self.config)
            .field("cached_clients", &self.cache.len())
            .finish_non_exhaustive()
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, FactoryError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let invalid = |reason: String| FactoryError::InvalidHeader {
            name: key.clone(),
            reason,
        };
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RolloutConfig;
    use crate::error::MetricError;
    use crate::store::MemoryStore;
    use crate::telemetry::MockMetricSink;

    fn factory(config: RolloutConfig) -> MigrationClientFactory {
        let controller = RolloutController::with_store(config, Arc::new(MemoryStore::new()));
        MigrationClientFactory::new(Arc::new(controller), FactoryConfig::default())
    }

    #[test]
    fn base_urls() {
        let config = FactoryConfig::default().with_base_host("https://api.example.com/");
        assert_eq!(config.base_url(ClientVariant::Legacy), "https://api.example.com");
        assert_eq!(config.base_url(ClientVariant::Unified), "https://api.example.com/api/v1");
        assert_eq!(config.versioned_path("users"), "/api/v1/users");
    }

    #[test]
    fn decision_is_per_call() {
        let f = factory(RolloutConfig::new().with_enabled(true).with_enabled_paths(["/admin"]));
        assert_eq!(f.get_client(Preset::Admin, Some("/admin/x")).unwrap().variant(), ClientVariant::Unified);
        assert_eq!(f.get_client(Preset::Admin, Some("/billing")).unwrap().variant(), ClientVariant::Legacy);
        f.controller().set_override("/billing", true);
        assert_eq!(f.get_client(Preset::Admin, Some("/billing")).unwrap().variant(), ClientVariant::Unified);
    }

    #[test]
    fn caches_cacheable_presets_only() {
        let f = factory(RolloutConfig::new().with_enabled(true).with_percentage(100));
        let a = f.get_client(Preset::Auth, None).unwrap();
        let b = f.get_client(Preset::Auth, None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let u1 = f.get_client(Preset::Upload, None).unwrap();
        let u2 = f.get_client(Preset::Upload, None).unwrap();
        assert!(!Arc::ptr_eq(&u1, &u2));
        assert_eq!(f.cached_clients(), 1);

        f.clear_cache();
        assert_eq!(f.cached_clients(), 0);
        assert!(f.registry().registered_types("unified:auth").is_empty());
    }

    #[test]
    fn interceptors_follow_optimizer_order() {
        let f = factory(RolloutConfig::new().with_enabled(true).with_percentage(100));
        let admin = f.get_client(Preset::Admin, None).unwrap();
        assert_eq!(
            admin.interceptors(),
            &[InterceptorType::Logging, InterceptorType::Auth, InterceptorType::Retry, InterceptorType::Error]
        );
        assert_eq!(f.registry().registered_types("unified:admin").len(), 4);
        assert_eq!(admin.settings().headers.get("X-Admin-Request").map(String::as_str), Some("true"));
    }

    #[test]
    fn sink_failures_are_swallowed() {
        let mut sink = MockMetricSink::new();
        sink.expect_record()
            .times(2)
            .returning(|_| Err(MetricError::Unavailable));
        let f = factory(RolloutConfig::new().with_debug_mode(true)).with_sink(Arc::new(sink));

        assert!(f.get_client(Preset::Public, Some("/status")).is_ok());
        f.record_metric("probe", ClientVariant::Legacy, BTreeMap::new());
    }

    #[test]
    fn events_are_tagged_with_variant() {
        let mut sink = MockMetricSink::new();
        sink.expect_record()
            .withf(|e| e.variant == ClientVariant::Legacy && e.metadata.get("preset").map(String::as_str) == Some("batch"))
            .times(1)
            .returning(|_| Ok(()));
        let f = factory(RolloutConfig::new()).with_sink(Arc::new(sink));
        f.get_client(Preset::Batch, None).unwrap();
    }
}
