//! Stage pipeline
//!
//! Runs stages in the optimizer's order, skipping those the optimizer says
//! have nothing to do, timing each one and feeding the result back into the
//! statistics. A failing stage is recorded and the pipeline moves on.

use crate::context::RequestContext;
use crate::error::StageError;
use crate::optimizer::InterceptorOptimizer;
use apimig_core::InterceptorType;
use serde::Serialize;
use std::time::Instant;

/// What happened to each stage of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    /// Stages that ran, in order
    pub executed: Vec<InterceptorType>,
    /// Stages skipped by conditional execution
    pub skipped: Vec<InterceptorType>,
    /// Stages that failed (also present in `executed`)
    pub failures: Vec<StageError>,
}

impl PipelineOutcome {
    /// Whether every executed stage succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Stage runner bound to an optimizer
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'o> {
    optimizer: &'o InterceptorOptimizer,
}

impl<'o> Pipeline<'o> {
    /// Create a pipeline reporting to `optimizer`
    #[inline]
    #[must_use]
    pub fn new(optimizer: &'o InterceptorOptimizer) -> Self {
        Self { optimizer }
    }

    /// Run `stage` for each of `types`
    pub fn run<F>(&self, types: &[InterceptorType], context: &RequestContext, mut stage: F) -> PipelineOutcome
    where
        F: FnMut(InterceptorType) -> Result<(), StageError>,
    {
        let mut outcome = PipelineOutcome::default();
        for kind in self.optimizer.optimize_execution_order(types) {
            if !self.optimizer.should_execute(kind, context) {
                outcome.skipped.push(kind);
                continue;
            }
            let started = Instant::now();
            let result = stage(kind);
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

            self.optimizer.record_execution(kind, elapsed_ms, result.is_ok());
            outcome.executed.push(kind);
            if let Err(e) = result {
                tracing::debug!("Stage {} failed for {}: {}", kind, context.url, e);
                outcome.failures.push(e);
            }
        }
        outcome
    }
}
