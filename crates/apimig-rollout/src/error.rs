//! Error types for rollout and client construction
//!
//! None of these reach business code on the decision path: store failures
//! fall back to a process-local token and metric failures are swallowed.

use std::path::PathBuf;

/// Durable store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// Backing file
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Backing file is not a JSON string map
    #[error("store at {path} is corrupt: {source}")]
    Corrupt {
        /// Backing file
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: serde_json::Error,
    },

    /// Store cannot be reached at all
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Client construction failures
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// Preset header cannot be sent
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Transport could not be built
    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Metric sink failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    /// Sink refused the event
    #[error("metric {event} rejected: {reason}")]
    Rejected {
        /// Event name
        event: String,
        /// Why it was rejected
        reason: String,
    },

    /// Sink is not reachable
    #[error("metric sink unavailable")]
    Unavailable,
}

/// Performance probe failures
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Request failed in transport or returned an error status
    #[error("probe request to {url} failed: {source}")]
    Request {
        /// Target URL
        url: String,
        /// Underlying cause
        #[source]
        source: reqwest::Error,
    },

    /// Client could not be constructed
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
