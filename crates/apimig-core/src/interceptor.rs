//! Interceptor categories
//!
//! The category set is closed so per-category tables can be fixed-size arrays
//! indexed by [`InterceptorType::index`].

use crate::error::VocabularyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Request-pipeline stage category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterceptorType {
    /// Request/response instrumentation
    Logging,
    /// Credential injection and 401 handling
    Auth,
    /// Application-specific stage
    Custom,
    /// Retry with exponential backoff
    Retry,
    /// Unified error mapping
    Error,
}

impl InterceptorType {
    /// Number of categories
    pub const COUNT: usize = 5;

    /// Every category, in default rank order
    pub const ALL: [InterceptorType; Self::COUNT] = [
        InterceptorType::Logging,
        InterceptorType::Auth,
        InterceptorType::Custom,
        InterceptorType::Retry,
        InterceptorType::Error,
    ];

    /// Dense index into per-category tables
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            InterceptorType::Logging => 0,
            InterceptorType::Auth => 1,
            InterceptorType::Custom => 2,
            InterceptorType::Retry => 3,
            InterceptorType::Error => 4,
        }
    }

    /// Lowercase name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            InterceptorType::Logging => "logging",
            InterceptorType::Auth => "auth",
            InterceptorType::Custom => "custom",
            InterceptorType::Retry => "retry",
            InterceptorType::Error => "error",
        }
    }
}

impl fmt::Display for InterceptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterceptorType {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VocabularyError::UnknownInterceptor(s.to_string()))
    }
}
