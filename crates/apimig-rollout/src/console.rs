//! Debug console
//!
//! Developer-facing controls over a running factory. Only available when the
//! controller is in debug mode.

use crate::controller::RolloutStatus;
use crate::error::ProbeError;
use crate::factory::{ApiClient, MigrationClientFactory};
use apimig_core::{ClientVariant, Preset};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// One timed call through a client
#[async_trait]
pub trait CallProbe: Send + Sync {
    /// Issue one request to `path` on `client`
    async fn call(&self, client: &ApiClient, path: &str) -> Result<(), ProbeError>;
}

/// GET request through the client's transport
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProbe;

#[async_trait]
impl CallProbe for HttpProbe {
    async fn call(&self, client: &ApiClient, path: &str) -> Result<(), ProbeError> {
        let url = client.url(path);
        client
            .http()
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(|_| ())
            .map_err(|source| ProbeError::Request { url, source })
    }
}

/// Timing of one call through each variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceComparison {
    /// Preset probed
    pub preset: Preset,
    /// Path probed, relative to the unified base URL
    pub path: String,
    /// Legacy call time
    pub legacy_ms: f64,
    /// Unified call time
    pub unified_ms: f64,
    /// `(unified - legacy) / legacy` in percent; 0 when legacy took no time
    pub delta_percent: f64,
}

impl PerformanceComparison {
    /// Comparison from two durations
    #[must_use]
    pub fn new(preset: Preset, path: impl Into<String>, legacy: Duration, unified: Duration) -> Self {
        let legacy_ms = legacy.as_secs_f64() * 1000.0;
        let unified_ms = unified.as_secs_f64() * 1000.0;
        let delta_percent = if legacy_ms > 0.0 {
            (unified_ms - legacy_ms) / legacy_ms * 100.0
        } else {
            0.0
        };
        Self {
            preset,
            path: path.into(),
            legacy_ms,
            unified_ms,
            delta_percent,
        }
    }

    /// Variant that answered first; legacy on a tie
    #[must_use]
    pub fn faster(&self) -> ClientVariant {
        if self.unified_ms < self.legacy_ms {
            ClientVariant::Unified
        } else {
            ClientVariant::Legacy
        }
    }
}

impl fmt::Display for PerformanceComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "preset {} path {}", self.preset, self.path)?;
        writeln!(f, "  legacy:  {:>9.2}ms", self.legacy_ms)?;
        writeln!(f, "  unified: {:>9.2}ms", self.unified_ms)?;
        write!(f, "  delta:   {:>+8.1}% ({} faster)", self.delta_percent, self.faster())
    }
}

/// Debug controls over a factory
#[derive(Debug, Clone, Copy)]
pub struct DebugConsole<'f> {
    factory: &'f MigrationClientFactory,
}

impl<'f> DebugConsole<'f> {
    /// Console for `factory`, or `None` outside debug mode
    #[must_use]
    pub fn attach(factory: &'f MigrationClientFactory) -> Option<Self> {
        if factory.controller().debug_mode() {
            Some(Self { factory })
        } else {
            tracing::debug!("Debug console unavailable outside debug mode");
            None
        }
    }

    /// Send everything to the new client
    ///
    /// Path lists are cleared along with overrides, so no rule can route a
    /// request back to the legacy client.
    pub fn force_new(&self) {
        let controller = self.factory.controller();
        controller.clear_overrides();
        let mut config = controller.config().with_enabled(true).with_percentage(100);
        config.enabled_paths.clear();
        config.disabled_paths.clear();
        controller.update_config(config);
    }

    /// Send everything to the legacy client
    pub fn force_old(&self) {
        let controller = self.factory.controller();
        controller.clear_overrides();
        controller.set_enabled(false);
    }

    /// Enable the rollout at `percentage`, clamped to 0..=100
    pub fn set_percentage(&self, percentage: i64) {
        let controller = self.factory.controller();
        controller.set_enabled(true);
        controller.set_percentage(percentage);
    }

    /// Current rollout status
    #[must_use]
    pub fn show_status(&self) -> RolloutStatus {
        let status = self.factory.controller().status();
        tracing::info!("Rollout status:\n{}", status);
        status
    }

    /// Time one call to `path` through each variant of `preset`
    ///
    /// `path` is relative to the unified base URL; the legacy call gets the
    /// version prefix its call sites would carry.
    pub async fn compare_performance<P>(
        &self,
        probe: &P,
        preset: Preset,
        path: &str,
    ) -> Result<PerformanceComparison, ProbeError>
    where
        P: CallProbe + ?Sized,
    {
        let legacy = self.factory.client_for(ClientVariant::Legacy, preset)?;
        let unified = self.factory.client_for(ClientVariant::Unified, preset)?;

        let started = Instant::now();
        probe.call(&legacy, &self.factory.config().versioned_path(path)).await?;
        let legacy_time = started.elapsed();

        let started = Instant::now();
        probe.call(&unified, path).await?;
        let unified_time = started.elapsed();

        let comparison = PerformanceComparison::new(preset, path, legacy_time, unified_time);
        for (variant, ms) in [
            (ClientVariant::Legacy, comparison.legacy_ms),
            (ClientVariant::Unified, comparison.unified_ms),
        ] {
            let mut metadata = BTreeMap::new();
            metadata.insert("preset".to_string(), preset.as_str().to_string());
            metadata.insert("duration_ms".to_string(), format!("{ms:.2}"));
            self.factory.record_metric("performance_probe", variant, metadata);
        }
        tracing::info!(
            "Performance {} {}: legacy {:.2}ms unified {:.2}ms ({:+.1}%)",
            preset,
            path,
            comparison.legacy_ms,
            comparison.unified_ms,
            comparison.delta_percent
        );
        Ok(comparison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RolloutConfig;
    use crate::controller::RolloutController;
    use crate::factory::FactoryConfig;
    use crate::store::MemoryStore;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingProbe {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CallProbe for RecordingProbe {
        async fn call(&self, client: &ApiClient, path: &str) -> Result<(), ProbeError> {
            self.urls.lock().push(client.url(path));
            Ok(())
        }
    }

    fn factory(debug: bool) -> MigrationClientFactory {
        let controller = RolloutController::with_store(
            RolloutConfig::new().with_debug_mode(debug),
            Arc::new(MemoryStore::new()),
        );
        MigrationClientFactory::new(Arc::new(controller), FactoryConfig::default())
    }

    #[test]
    fn only_in_debug_mode() {
        assert!(DebugConsole::attach(&factory(false)).is_none());
        assert!(DebugConsole::attach(&factory(true)).is_some());
    }

    #[test]
    fn force_new_overrides_path_lists() {
        let controller = RolloutController::with_store(
            RolloutConfig::new()
                .with_debug_mode(true)
                .with_enabled(true)
                .with_percentage(30)
                .with_enabled_paths(["/admin"])
                .with_disabled_paths(["/admin/legacy"]),
            Arc::new(MemoryStore::new()),
        );
        let f = MigrationClientFactory::new(Arc::new(controller), FactoryConfig::default());
        let console = DebugConsole::attach(&f).unwrap();
        assert!(!f.controller().should_use_new(Some("/billing")));

        console.force_new();
        for path in ["/billing", "/admin/legacy/report", "/admin/users"] {
            let decision = f.controller().decide(Some(path));
            assert!(decision.use_new, "{path}: {decision:?}");
        }
        assert!(f.controller().should_use_new(None));
    }

    #[test]
    fn force_and_percentage() {
        let f = factory(true);
        let console = DebugConsole::attach(&f).unwrap();
        f.controller().set_override("/x", false);

        console.force_new();
        assert!(f.controller().should_use_new(Some("/x")));
        assert_eq!(console.show_status().config.rollout_percentage, 100);

        console.force_old();
        assert!(!f.controller().should_use_new(Some("/x")));

        console.set_percentage(150);
        let status = console.show_status();
        assert!(status.config.enabled);
        assert_eq!(status.config.rollout_percentage, 100);
    }

    #[test]
    fn delta_is_relative_to_legacy() {
        let c = PerformanceComparison::new(
            Preset::Auth,
            "/me",
            Duration::from_millis(200),
            Duration::from_millis(150),
        );
        assert!((c.delta_percent + 25.0).abs() < 1e-9);
        assert_eq!(c.faster(), ClientVariant::Unified);
        let zero = PerformanceComparison::new(Preset::Auth, "/me", Duration::ZERO, Duration::ZERO);
        assert!(zero.delta_percent.abs() < f64::EPSILON);
        assert_eq!(zero.faster(), ClientVariant::Legacy);
    }

    #[tokio::test]
    async fn compare_calls_both_variants() {
        let f = factory(true);
        let console = DebugConsole::attach(&f).unwrap();
        let probe = RecordingProbe::default();
        let comparison = console.compare_performance(&probe, Preset::Auth, "/me").await.unwrap();

        assert_eq!(comparison.path, "/me");
        assert_eq!(
            *probe.urls.lock(),
            vec![
                "http://localhost:8080/api/v1/me".to_string(),
                "http://localhost:8080/api/v1/me".to_string(),
            ]
        );
    }
}
