//! Rollout decision engine
//!
//! # Core Concepts
//!
//! `should_use_new(path)` takes the first matching rule:
//!
//! 1. an explicit override for `path`
//! 2. global switch off: legacy
//! 3. `path` under a deny-list prefix: legacy
//! 4. allow-list configured: new only for paths under one of its prefixes
//! 5. partial rollout: `bucket < percentage`
//! 6. otherwise new only at 100%
//!
//! Deny-list prefixes are checked before the allow-list, so a path matching
//! both is denied. The installation bucket is only computed when rule 5 is
//! reached.
//!
//! # Example
//!
//! ```rust
//! use apimig_rollout::{MemoryStore, RolloutConfig, RolloutController};
//! use std::sync::Arc;
//!
//! let config = RolloutConfig::new().with_enabled(true).with_enabled_paths(["/admin"]);
//! let controller = RolloutController::with_store(config, Arc::new(MemoryStore::new()));
//! assert!(controller.should_use_new(Some("/admin/users")));
//! assert!(!controller.should_use_new(Some("/billing")));
//!
//! controller.set_override("/billing", true);
//! assert!(controller.should_use_new(Some("/billing")));
//! ```

use crate::assignment::{BucketHasher, HashAssigner, UserAssignment};
use crate::config::{clamp_percentage, RolloutConfig};
use crate::store::KeyValueStore;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Which rule produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DecisionReason {
    /// Explicit override for the path
    Override,
    /// Global switch is off
    Disabled,
    /// Path is under a deny-list prefix
    DeniedPath,
    /// Path is under an allow-list prefix
    AllowedPath,
    /// Allow-list configured, path not under it
    NotAllowListed,
    /// Partial rollout compared the installation bucket
    Bucket {
        /// Installation bucket
        bucket: u8,
        /// Configured percentage
        percentage: u8,
    },
    /// Percentage is 0 or 100
    Percentage {
        /// Configured percentage
        percentage: u8,
    },
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Override => f.write_str("explicit override"),
            DecisionReason::Disabled => f.write_str("rollout disabled"),
            DecisionReason::DeniedPath => f.write_str("path is deny-listed"),
            DecisionReason::AllowedPath => f.write_str("path is allow-listed"),
            DecisionReason::NotAllowListed => f.write_str("path is not allow-listed"),
            DecisionReason::Bucket { bucket, percentage } => {
                write!(f, "bucket {bucket} against {percentage}% rollout")
            }
            DecisionReason::Percentage { percentage } => write!(f, "{percentage}% rollout"),
        }
    }
}

/// A decision and the rule that made it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether the new client is selected
    pub use_new: bool,
    /// Rule that decided
    pub reason: DecisionReason,
}

impl Decision {
    const fn new(use_new: bool, reason: DecisionReason) -> Self {
        Self { use_new, reason }
    }
}

/// Snapshot for debug tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolloutStatus {
    /// Active configuration
    pub config: RolloutConfig,
    /// Installation assignment
    pub assignment: UserAssignment,
    /// Bucket function
    pub hasher: BucketHasher,
    /// Active overrides
    pub overrides: BTreeMap<String, bool>,
    /// Decision for a request without a path
    pub default_decision: Decision,
}

impl fmt::Display for RolloutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "enabled:            {}", self.config.enabled)?;
        writeln!(f, "rollout percentage: {}%", self.config.rollout_percentage)?;
        writeln!(f, "enabled paths:      {}", join_or_dash(&self.config.enabled_paths))?;
        writeln!(f, "disabled paths:     {}", join_or_dash(&self.config.disabled_paths))?;
        writeln!(f, "debug mode:         {}", self.config.debug_mode)?;
        writeln!(
            f,
            "bucket:             {} ({}{})",
            self.assignment.bucket,
            self.hasher,
            if self.assignment.persisted { "" } else { ", session only" }
        )?;
        writeln!(
            f,
            "default decision:   {} ({})",
            if self.default_decision.use_new { "new" } else { "old" },
            self.default_decision.reason
        )?;
        if self.overrides.is_empty() {
            writeln!(f, "overrides:          -")?;
        } else {
            writeln!(f, "overrides:")?;
            for (path, value) in &self.overrides {
                writeln!(f, "  {path} -> {}", if *value { "new" } else { "old" })?;
            }
        }
        Ok(())
    }
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

/// Rollout decision engine
#[derive(Debug)]
pub struct RolloutController {
    config: RwLock<RolloutConfig>,
    overrides: DashMap<String, bool>,
    assigner: HashAssigner,
}

impl RolloutController {
    /// Controller over an explicit assigner
    #[must_use]
    pub fn new(config: RolloutConfig, assigner: HashAssigner) -> Self {
        Self {
            config: RwLock::new(config.normalized()),
            overrides: DashMap::new(),
            assigner,
        }
    }

    /// Controller with a default assigner over `store`
    #[must_use]
    pub fn with_store(config: RolloutConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(config, HashAssigner::new(store))
    }

    /// Whether the new client should serve `path`
    #[must_use]
    pub fn should_use_new(&self, path: Option<&str>) -> bool {
        self.decide(path).use_new
    }

    /// Decision for `path` with the rule that made it
    #[must_use]
    pub fn decide(&self, path: Option<&str>) -> Decision {
        if let Some(value) = path.and_then(|p| self.overrides.get(p).map(|v| *v)) {
            return Decision::new(value, DecisionReason::Override);
        }

        let config = self.config.read();
        if !config.enabled {
            return Decision::new(false, DecisionReason::Disabled);
        }
        if path.is_some_and(|p| matches_prefix(&config.disabled_paths, p)) {
            return Decision::new(false, DecisionReason::DeniedPath);
        }
        if config.enabled_paths.iter().any(|p| !p.is_empty()) {
            return if path.is_some_and(|p| matches_prefix(&config.enabled_paths, p)) {
                Decision::new(true, DecisionReason::AllowedPath)
            } else {
                Decision::new(false, DecisionReason::NotAllowListed)
            };
        }

        let percentage = config.rollout_percentage;
        drop(config);
        if percentage > 0 && percentage < 100 {
            let bucket = self.assigner.assignment().bucket;
            return Decision::new(bucket < percentage, DecisionReason::Bucket { bucket, percentage });
        }
        Decision::new(percentage >= 100, DecisionReason::Percentage { percentage })
    }

    /// Force the decision for `path`
    pub fn set_override(&self, path: &str, use_new: bool) {
        tracing::debug!("Rollout override {} -> {}", path, use_new);
        self.overrides.insert(path.to_string(), use_new);
    }

    /// Drop the override for `path`, returning it
    pub fn clear_override(&self, path: &str) -> Option<bool> {
        self.overrides.remove(path).map(|(_, v)| v)
    }

    /// Drop every override
    pub fn clear_overrides(&self) {
        self.overrides.clear();
    }

    /// Replace the configuration
    pub fn update_config(&self, config: RolloutConfig) {
        let config = config.normalized();
        tracing::info!(
            "Rollout config updated: enabled={} percentage={}",
            config.enabled,
            config.rollout_percentage
        );
        *self.config.write() = config;
    }

    /// Change the percentage, clamped to 0..=100
    pub fn set_percentage(&self, percentage: i64) {
        let percentage = clamp_percentage(percentage);
        self.config.write().rollout_percentage = percentage;
        tracing::info!("Rollout percentage set to {}%", percentage);
    }

    /// Turn the global switch on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.config.write().enabled = enabled;
        tracing::info!("Rollout {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Copy of the active configuration
    #[must_use]
    pub fn config(&self) -> RolloutConfig {
        self.config.read().clone()
    }

    /// Whether debug tooling is allowed
    #[must_use]
    pub fn debug_mode(&self) -> bool {
        self.config.read().debug_mode
    }

    /// Installation assignment, created on first call
    pub fn assignment(&self) -> &UserAssignment {
        self.assigner.assignment()
    }

    /// Snapshot of config, assignment and overrides
    #[must_use]
    pub fn status(&self) -> RolloutStatus {
        let overrides = self
            .overrides
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        RolloutStatus {
            config: self.config(),
            assignment: self.assigner.assignment().clone(),
            hasher: self.assigner.hasher(),
            overrides,
            default_decision: self.decide(None),
        }
    }
}

fn matches_prefix(prefixes: &[String], path: &str) -> bool {
    prefixes.iter().any(|p| !p.is_empty() && path.starts_with(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, USER_HASH_KEY};

    fn controller(config: RolloutConfig) -> RolloutController {
        RolloutController::with_store(config, Arc::new(MemoryStore::new()))
    }

    fn controller_with_token(config: RolloutConfig, token: &str) -> RolloutController {
        let store = MemoryStore::new();
        store.set(USER_HASH_KEY, token).unwrap();
        RolloutController::with_store(config, Arc::new(store))
    }

    #[test]
    fn disabled_means_legacy_except_override() {
        let c = controller(RolloutConfig::new().with_percentage(100));
        assert!(!c.should_use_new(Some("/anything")));
        assert!(!c.should_use_new(None));
        c.set_override("/anything", true);
        assert!(c.should_use_new(Some("/anything")));
        assert_eq!(c.clear_override("/anything"), Some(true));
        assert!(!c.should_use_new(Some("/anything")));
    }

    #[test]
    fn override_false_beats_full_rollout() {
        let c = controller(RolloutConfig::new().with_enabled(true).with_percentage(100));
        c.set_override("/reports", false);
        assert!(!c.should_use_new(Some("/reports")));
        assert!(c.should_use_new(Some("/reports/weekly")));
    }

    #[test]
    fn deny_before_allow() {
        let c = controller(
            RolloutConfig::new()
                .with_enabled(true)
                .with_enabled_paths(["/admin"])
                .with_disabled_paths(["/admin/legacy"]),
        );
        assert!(c.should_use_new(Some("/admin/users")));
        assert_eq!(c.decide(Some("/admin/legacy/x")).reason, DecisionReason::DeniedPath);
        assert_eq!(c.decide(None).reason, DecisionReason::NotAllowListed);
    }

    #[test]
    fn allow_list_ignores_percentage() {
        let c = controller(
            RolloutConfig::new()
                .with_enabled(true)
                .with_percentage(0)
                .with_enabled_paths(["/admin"]),
        );
        assert!(c.should_use_new(Some("/admin/x")));
        assert!(!c.should_use_new(Some("/billing")));
    }

    #[test]
    fn bucket_rule_uses_assignment() {
        // FNV-1a("a") = 0xe40c292c, bucket 20
        let c = controller_with_token(RolloutConfig::new().with_enabled(true).with_percentage(21), "a");
        assert_eq!(
            c.decide(None),
            Decision::new(true, DecisionReason::Bucket { bucket: 20, percentage: 21 })
        );
        c.set_percentage(20);
        assert!(!c.should_use_new(None));
    }

    #[test]
    fn edge_percentages_do_not_touch_the_store() {
        let c = controller(RolloutConfig::new().with_enabled(true));
        assert!(!c.should_use_new(None));
        c.set_percentage(100);
        assert!(c.should_use_new(None));
        assert!(!c.assigner.is_initialized());
    }

    #[test]
    fn set_percentage_clamps() {
        let c = controller(RolloutConfig::new());
        c.set_percentage(-3);
        assert_eq!(c.config().rollout_percentage, 0);
        c.set_percentage(300);
        assert_eq!(c.config().rollout_percentage, 100);
    }

    #[test]
    fn status_reports_overrides() {
        let c = controller(RolloutConfig::new().with_enabled(true).with_percentage(100));
        c.set_override("/a", false);
        let status = c.status();
        assert_eq!(status.overrides.get("/a"), Some(&false));
        assert!(status.default_decision.use_new);
        let text = status.to_string();
        assert!(text.contains("rollout percentage: 100%"));
        assert!(text.contains("/a -> old"));
        c.clear_overrides();
        assert!(c.status().overrides.is_empty());
    }
}
