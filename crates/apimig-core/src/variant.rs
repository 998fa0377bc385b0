//! Client variants

use crate::error::VocabularyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which construction pattern produced a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientVariant {
    /// The shared legacy client; call sites carry the version prefix themselves
    Legacy,
    /// Preset-based client with the version prefix embedded in its base URL
    Unified,
}

impl ClientVariant {
    /// Short name used in metrics and status output
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ClientVariant::Legacy => "legacy",
            ClientVariant::Unified => "unified",
        }
    }

    /// Variant chosen for a rollout decision
    #[inline]
    #[must_use]
    pub const fn from_decision(use_new: bool) -> Self {
        if use_new {
            ClientVariant::Unified
        } else {
            ClientVariant::Legacy
        }
    }
}

impl fmt::Display for ClientVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientVariant {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "old" => Ok(ClientVariant::Legacy),
            "unified" | "new" => Ok(ClientVariant::Unified),
            _ => Err(VocabularyError::UnknownVariant(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_maps_to_variant() {
        assert_eq!(ClientVariant::from_decision(true), ClientVariant::Unified);
        assert_eq!(ClientVariant::from_decision(false), ClientVariant::Legacy);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("new".parse::<ClientVariant>(), Ok(ClientVariant::Unified));
        assert_eq!("OLD".parse::<ClientVariant>(), Ok(ClientVariant::Legacy));
        assert!("both".parse::<ClientVariant>().is_err());
    }
}
