//! Toolkit configuration file
//!
//! ```toml
//! [rollout]
//! enabled = true
//! rollout_percentage = 25
//! disabled_paths = ["/legacy"]
//!
//! [rewrite]
//! default_preset = "auth"
//!
//! [interceptors]
//! max_execution_time_ms = 250
//!
//! [client]
//! base_host = "https://api.example.com"
//!
//! [store]
//! path = ".apimig/rollout.json"
//! ```
//!
//! Every section is optional. Rollout settings are overlaid with the
//! `APIMIG_*` environment variables after the file is read.

use anyhow::Context;
use apimig_codemod::RewriteConfig;
use apimig_interceptor::OptimizationConfig;
use apimig_rollout::{FactoryConfig, FileStore, KeyValueStore, MemoryStore, RolloutConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Durable rollout store location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// JSON file holding the rollout token; in-memory when unset
    pub path: Option<PathBuf>,
}

impl StoreSection {
    /// Open the configured store
    #[must_use]
    pub fn open(&self) -> Arc<dyn KeyValueStore> {
        match &self.path {
            Some(path) => Arc::new(FileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        }
    }
}

/// Whole-toolkit configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Decision engine
    pub rollout: RolloutConfig,
    /// Codemod
    pub rewrite: RewriteConfig,
    /// Interceptor optimizer
    pub interceptors: OptimizationConfig,
    /// Client host and version
    pub client: FactoryConfig,
    /// Rollout token store
    pub store: StoreSection,
}

impl ToolkitConfig {
    /// Read `path` (defaults when `None`) and overlay the environment
    ///
    /// # Errors
    /// Fails if the file cannot be read or is not valid TOML
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Parse a TOML file
    ///
    /// # Errors
    /// Fails if the file cannot be read or is not valid TOML
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Overlay rollout variables read through `lookup`
    #[must_use]
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.rollout = self.rollout.merge_env(lookup);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apimig_core::Preset;
    use tempfile::TempDir;

    #[test]
    fn reads_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apimig.toml");
        std::fs::write(
            &path,
            r#"
[rollout]
enabled = true
rollout_percentage = 25

[rewrite]
default_preset = "auth"

[interceptors]
max_execution_time_ms = 250

[store]
path = "state/rollout.json"
"#,
        )
        .unwrap();

        let config = ToolkitConfig::from_file(&path).unwrap();
        assert!(config.rollout.enabled);
        assert_eq!(config.rollout.rollout_percentage, 25);
        assert_eq!(config.rewrite.default_preset, Preset::Auth);
        assert_eq!(config.interceptors.max_execution_time_ms, 250);
        assert!(config.interceptors.conditional_execution);
        assert_eq!(config.client, FactoryConfig::default());
        assert_eq!(config.store.path, Some(PathBuf::from("state/rollout.json")));
    }

    #[test]
    fn environment_wins_over_file() {
        let config = ToolkitConfig::default().with_env(|key| {
            (key == apimig_rollout::config::ENV_ROLLOUT_PERCENTAGE).then(|| "-4".to_string())
        });
        assert_eq!(config.rollout.rollout_percentage, 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ToolkitConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
