//! Optimizer configuration

use serde::{Deserialize, Serialize};

/// Static optimizer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Skip retry and error stages for successful calls
    pub skip_on_success: bool,
    /// Skip logging and error stages for cached responses
    pub skip_on_cached_response: bool,
    /// Master switch for every skip rule
    pub conditional_execution: bool,
    /// Stage duration above which a warning is logged
    pub max_execution_time_ms: u64,
    /// Advisory: stages may run concurrently
    ///
    /// Carried into [`OptimizationReport`](crate::OptimizationReport) only;
    /// [`Pipeline`](crate::Pipeline) always runs stages in sequence.
    pub parallel_execution: bool,
    /// Advisory: stages may be installed on first use
    ///
    /// Reported, not acted on.
    pub lazy_loading: bool,
}

impl OptimizationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable every skip rule
    #[inline]
    #[must_use]
    pub fn unconditional() -> Self {
        Self {
            conditional_execution: false,
            ..Self::default()
        }
    }

    /// With a different slow-stage threshold
    #[inline]
    #[must_use]
    pub fn with_max_execution_time_ms(mut self, ms: u64) -> Self {
        self.max_execution_time_ms = ms;
        self
    }
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            skip_on_success: true,
            skip_on_cached_response: true,
            conditional_execution: true,
            max_execution_time_ms: 100,
            parallel_execution: false,
            lazy_loading: true,
        }
    }
}
