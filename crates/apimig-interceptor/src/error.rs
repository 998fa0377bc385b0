//! Error types for interceptor ordering and execution
//!
//! Neither error ever reaches callers of the optimizer's public ordering
//! entry point: [`OptimizerError`] degrades to the static order, and
//! [`StageError`] is counted in the statistics table.

use apimig_core::InterceptorType;
use serde::Serialize;

/// Internal optimizer faults
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimizerError {
    /// Statistics violate `execution_count >= errors`
    #[error("inconsistent statistics for {kind}: {errors} errors in {executions} executions")]
    InconsistentStats {
        /// Offending category
        kind: InterceptorType,
        /// Recorded executions
        executions: u64,
        /// Recorded failures
        errors: u64,
    },

    /// A derived metric is NaN or infinite
    #[error("non-finite {metric} for {kind}")]
    NonFiniteMetric {
        /// Offending category
        kind: InterceptorType,
        /// Metric name
        metric: &'static str,
    },
}

/// A pipeline stage failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} stage failed: {message}")]
pub struct StageError {
    /// Failing stage
    pub kind: InterceptorType,
    /// Rendered cause
    pub message: String,
}

impl StageError {
    /// Create a stage failure
    pub fn new(kind: InterceptorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
