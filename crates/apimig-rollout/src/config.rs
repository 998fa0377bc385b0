//! Rollout configuration
//!
//! Loaded once at process start from defaults, a TOML section or the
//! environment, then owned by the controller and live-updatable through the
//! debug console. An out-of-range percentage is clamped, never rejected.
//!
//! # Environment
//!
//! | variable | meaning |
//! |---|---|
//! | `APIMIG_USE_NEW_CLIENT` | global switch |
//! | `APIMIG_ROLLOUT_PERCENTAGE` | integer, clamped to 0..=100 |
//! | `APIMIG_ENABLED_PATHS` | comma-separated allow-list prefixes |
//! | `APIMIG_DISABLED_PATHS` | comma-separated deny-list prefixes |
//! | `APIMIG_DEBUG` | debug console, defaults to on in debug builds |

use serde::{Deserialize, Deserializer, Serialize};

/// Global switch variable
pub const ENV_USE_NEW_CLIENT: &str = "APIMIG_USE_NEW_CLIENT";
/// Percentage variable
pub const ENV_ROLLOUT_PERCENTAGE: &str = "APIMIG_ROLLOUT_PERCENTAGE";
/// Allow-list variable
pub const ENV_ENABLED_PATHS: &str = "APIMIG_ENABLED_PATHS";
/// Deny-list variable
pub const ENV_DISABLED_PATHS: &str = "APIMIG_DISABLED_PATHS";
/// Debug-mode variable
pub const ENV_DEBUG: &str = "APIMIG_DEBUG";

/// Rollout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Global switch; when off only overrides select the new client
    pub enabled: bool,
    /// Share of installations on the new client, 0..=100
    #[serde(deserialize_with = "deserialize_percentage")]
    pub rollout_percentage: u8,
    /// Allow-list path prefixes
    pub enabled_paths: Vec<String>,
    /// Deny-list path prefixes, checked before the allow-list
    pub disabled_paths: Vec<String>,
    /// Debug console and debug-only logging
    pub debug_mode: bool,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rollout_percentage: 0,
            enabled_paths: Vec::new(),
            disabled_paths: Vec::new(),
            debug_mode: cfg!(debug_assertions),
        }
    }
}

impl RolloutConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With the global switch set
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// With a percentage, clamped to 0..=100
    #[inline]
    #[must_use]
    pub fn with_percentage(mut self, percentage: i64) -> Self {
        self.rollout_percentage = clamp_percentage(percentage);
        self
    }

    /// With allow-list prefixes
    #[must_use]
    pub fn with_enabled_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// With deny-list prefixes
    #[must_use]
    pub fn with_disabled_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// With debug mode set
    #[inline]
    #[must_use]
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Copy with the percentage forced into range
    ///
    /// Only needed for values assembled by hand; every constructor and
    /// deserializer already clamps.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.rollout_percentage = clamp_percentage(i64::from(self.rollout_percentage));
        self
    }

    /// Defaults overlaid with the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    /// Overlay variables read through `lookup`
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn merge_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_USE_NEW_CLIENT) {
            match parse_bool(&raw) {
                Some(v) => self.enabled = v,
                None => tracing::warn!("Ignoring {}={}: not a boolean", ENV_USE_NEW_CLIENT, raw),
            }
        }
        if let Some(raw) = lookup(ENV_ROLLOUT_PERCENTAGE) {
            match raw.trim().parse::<i64>() {
                Ok(v) => self.rollout_percentage = clamp_percentage(v),
                Err(_) => tracing::warn!("Ignoring {}={}: not an integer", ENV_ROLLOUT_PERCENTAGE, raw),
            }
        }
        if let Some(raw) = lookup(ENV_ENABLED_PATHS) {
            self.enabled_paths = split_paths(&raw);
        }
        if let Some(raw) = lookup(ENV_DISABLED_PATHS) {
            self.disabled_paths = split_paths(&raw);
        }
        if let Some(raw) = lookup(ENV_DEBUG) {
            match parse_bool(&raw) {
                Some(v) => self.debug_mode = v,
                None => tracing::warn!("Ignoring {}={}: not a boolean", ENV_DEBUG, raw),
            }
        }
        self
    }
}

/// Force `value` into 0..=100, warning when it was outside
#[must_use]
pub fn clamp_percentage(value: i64) -> u8 {
    let clamped = value.clamp(0, 100);
    if clamped != value {
        tracing::warn!("Rollout percentage {} out of range, clamped to {}", value, clamped);
    }
    u8::try_from(clamped).unwrap_or(100)
}

fn deserialize_percentage<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    i64::deserialize(deserializer).map(clamp_percentage)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn split_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .collect()
}
