//! Client presets
//!
//! A preset names a base path, credential policy and payload/timeout profile.
//! Settings start from the shared defaults and each preset overrides a few
//! fields.

use crate::error::VocabularyError;
use crate::interceptor::InterceptorType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Closed set of client presets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// General purpose
    #[default]
    Default,
    /// Authenticated user APIs
    Auth,
    /// Administrator APIs
    Admin,
    /// Unauthenticated APIs
    Public,
    /// File uploads
    Upload,
    /// Long-running batch calls
    Batch,
    /// Latency-sensitive calls
    Realtime,
}

impl Preset {
    /// Every preset
    pub const ALL: [Preset; 7] = [
        Preset::Default,
        Preset::Auth,
        Preset::Admin,
        Preset::Public,
        Preset::Upload,
        Preset::Batch,
        Preset::Realtime,
    ];

    /// Lowercase name, as written in source (`createPresetApiClient('auth')`)
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::Auth => "auth",
            Preset::Admin => "admin",
            Preset::Public => "public",
            Preset::Upload => "upload",
            Preset::Batch => "batch",
            Preset::Realtime => "realtime",
        }
    }

    /// Resolve the transport settings for this preset
    #[must_use]
    pub fn settings(self) -> PresetSettings {
        let base = PresetSettings::default();
        match self {
            Preset::Default => base,
            Preset::Auth => PresetSettings {
                enable_auth: true,
                enable_error_handling: true,
                with_credentials: true,
                ..base
            },
            Preset::Admin => base
                .with_header("X-Admin-Request", "true")
                .with_logging(true),
            Preset::Public => PresetSettings {
                enable_auth: false,
                enable_retry: true,
                with_credentials: false,
                timeout: Duration::from_secs(10),
                ..base
            },
            Preset::Upload => PresetSettings {
                cacheable: false,
                timeout: Duration::from_secs(120),
                ..base
            }
            .with_header("Content-Type", "multipart/form-data"),
            Preset::Batch => PresetSettings {
                cacheable: false,
                enable_retry: true,
                timeout: Duration::from_secs(300),
                max_retries: 5,
                retry_delay: Duration::from_secs(2),
                ..base
            },
            Preset::Realtime => PresetSettings {
                enable_retry: false,
                timeout: Duration::from_secs(5),
                ..base
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VocabularyError::UnknownPreset(s.to_string()))
    }
}

/// Transport and pipeline settings resolved from a [`Preset`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSettings {
    /// Request timeout
    pub timeout: Duration,
    /// Send cookies/credentials
    pub with_credentials: bool,
    /// Default headers
    pub headers: BTreeMap<String, String>,
    /// Install the auth interceptor
    pub enable_auth: bool,
    /// Install the retry interceptor
    pub enable_retry: bool,
    /// Install the logging interceptor
    pub enable_logging: bool,
    /// Install the error interceptor
    pub enable_error_handling: bool,
    /// Retry budget
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_delay: Duration,
    /// Whether constructed clients may be reused across calls
    pub cacheable: bool,
}

impl PresetSettings {
    /// Add or replace a default header
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Toggle the logging interceptor
    #[inline]
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Interceptor categories installed for these settings, in declaration order
    #[must_use]
    pub fn interceptors(&self) -> Vec<InterceptorType> {
        let mut types = Vec::with_capacity(InterceptorType::COUNT);
        if self.enable_auth {
            types.push(InterceptorType::Auth);
        }
        if self.enable_logging {
            types.push(InterceptorType::Logging);
        }
        if self.enable_retry {
            types.push(InterceptorType::Retry);
        }
        if self.enable_error_handling {
            types.push(InterceptorType::Error);
        }
        types
    }
}

impl Default for PresetSettings {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            timeout: Duration::from_secs(30),
            with_credentials: true,
            headers,
            enable_auth: true,
            enable_retry: true,
            enable_logging: false,
            enable_error_handling: true,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            cacheable: true,
        }
    }
}
