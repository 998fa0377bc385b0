//! Interceptor optimizer
//!
//! Orders pipeline stages from the static [`PriorityTable`], refined by live
//! statistics, and decides per request which stages can be skipped.
//!
//! # Core Concepts
//!
//! - **Static order**: rank from the priority table, always a valid fallback
//! - **Adaptive order**: once two or more requested categories have data,
//!   categories failing more than 10% of the time move behind the rest;
//!   within each side, faster measured stages run first and unmeasured ones
//!   follow in rank order
//! - **Conditional execution**: cached and successful responses skip stages
//!   that have nothing to do
//!
//! # Example
//!
//! ```rust
//! use apimig_core::InterceptorType::{Auth, Error, Logging, Retry};
//! use apimig_interceptor::{InterceptorOptimizer, OptimizationConfig};
//!
//! let optimizer = InterceptorOptimizer::new(OptimizationConfig::default());
//! let order = optimizer.optimize_execution_order(&[Error, Retry, Logging, Auth]);
//! assert_eq!(order, vec![Logging, Auth, Retry, Error]);
//! ```

use crate::config::OptimizationConfig;
use crate::context::{HttpMethod, RequestContext};
use crate::error::OptimizerError;
use crate::priority::PriorityTable;
use crate::stats::{InterceptorStats, StatsTable};
use apimig_core::InterceptorType;
use serde::Serialize;
use std::fmt;

/// Error rate above which a category is deprioritized
pub const ERROR_RATE_THRESHOLD: f64 = 0.10;

/// Statistics-driven stage orderer
#[derive(Debug, Default)]
pub struct InterceptorOptimizer {
    config: OptimizationConfig,
    priorities: PriorityTable,
    stats: StatsTable,
}

impl InterceptorOptimizer {
    /// Create optimizer with default priorities
    #[must_use]
    pub fn new(config: OptimizationConfig) -> Self {
        Self {
            config,
            priorities: PriorityTable::new(),
            stats: StatsTable::new(),
        }
    }

    /// With a custom priority table
    #[inline]
    #[must_use]
    pub fn with_priorities(mut self, priorities: PriorityTable) -> Self {
        self.priorities = priorities;
        self
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    /// Priority table in use
    #[inline]
    #[must_use]
    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    /// Current stats for `kind`
    #[must_use]
    pub fn stats(&self, kind: InterceptorType) -> InterceptorStats {
        self.stats.get(kind)
    }

    /// Execution order for `types`
    ///
    /// Never fails: any inconsistency in the statistics falls back to the
    /// static order.
    #[must_use]
    pub fn optimize_execution_order(&self, types: &[InterceptorType]) -> Vec<InterceptorType> {
        let base = self.priorities.sort(types);
        match self.adaptive_order(&base) {
            Ok(Some(order)) => order,
            Ok(None) => base,
            Err(e) => {
                tracing::warn!("Adaptive interceptor ordering failed, using static order: {}", e);
                base
            }
        }
    }

    fn adaptive_order(
        &self,
        base: &[InterceptorType],
    ) -> Result<Option<Vec<InterceptorType>>, OptimizerError> {
        let stats: Vec<InterceptorStats> = base.iter().map(|t| self.stats.get(*t)).collect();
        if stats.iter().filter(|s| s.has_data()).count() < 2 {
            return Ok(None);
        }

        let mut keyed = Vec::with_capacity(base.len());
        for s in &stats {
            if s.errors > s.execution_count {
                return Err(OptimizerError::InconsistentStats {
                    kind: s.kind,
                    executions: s.execution_count,
                    errors: s.errors,
                });
            }
            let average = s.average_time_ms();
            if !average.is_finite() {
                return Err(OptimizerError::NonFiniteMetric {
                    kind: s.kind,
                    metric: "average time",
                });
            }
            let failing = s.error_rate() > ERROR_RATE_THRESHOLD;
            keyed.push((failing, !s.has_data(), average, self.priorities.rank(s.kind), s.kind));
        }

        keyed.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then_with(|| a.2.total_cmp(&b.2))
                .then(a.3.cmp(&b.3))
        });
        Ok(Some(keyed.into_iter().map(|(_, _, _, _, kind)| kind).collect()))
    }

    /// Whether stage `kind` should run for `context`
    ///
    /// Rules, first match wins:
    /// 1. conditional execution disabled: run
    /// 2. retry on GET: run
    /// 3. health/liveness probe: only logging and error run
    /// 4. cached response: logging and error are skipped
    /// 5. successful call: retry and error are skipped
    #[must_use]
    pub fn should_execute(&self, kind: InterceptorType, context: &RequestContext) -> bool {
        use InterceptorType::{Error, Logging, Retry};

        if !self.config.conditional_execution {
            return true;
        }
        if kind == Retry && context.method == HttpMethod::Get {
            return true;
        }
        if context.is_health_check() {
            return matches!(kind, Logging | Error);
        }
        if context.is_cached && self.config.skip_on_cached_response && matches!(kind, Logging | Error) {
            return false;
        }
        if context.is_success && self.config.skip_on_success && matches!(kind, Retry | Error) {
            return false;
        }
        true
    }

    /// Record one execution of stage `kind`
    pub fn record_execution(&self, kind: InterceptorType, time_ms: f64, success: bool) {
        self.stats.record(kind, time_ms, success);
        #[allow(clippy::cast_precision_loss)]
        let threshold = self.config.max_execution_time_ms as f64;
        if time_ms > threshold {
            tracing::warn!(
                "Slow {} interceptor: {:.1}ms exceeds {}ms threshold",
                kind,
                time_ms,
                self.config.max_execution_time_ms
            );
        }
    }

    /// Clear all statistics
    pub fn reset(&self) {
        self.stats.reset();
        tracing::debug!("Interceptor statistics reset");
    }

    /// Current order, statistics and advisory suggestions
    #[must_use]
    pub fn generate_optimization_report(&self) -> OptimizationReport {
        let order = self.optimize_execution_order(&InterceptorType::ALL);
        let stats: Vec<StatsSummary> = self.stats.snapshot().iter().map(StatsSummary::from).collect();

        let mut suggestions = Vec::new();
        if stats.iter().all(|s| s.executions == 0) {
            suggestions.push("no statistics recorded yet".to_string());
        }
        #[allow(clippy::cast_precision_loss)]
        let threshold = self.config.max_execution_time_ms as f64;
        for s in stats.iter().filter(|s| s.executions > 0) {
            if s.error_rate > ERROR_RATE_THRESHOLD {
                suggestions.push(format!(
                    "{}: error rate {:.1}% exceeds {:.0}%, investigate failures",
                    s.kind,
                    s.error_rate * 100.0,
                    ERROR_RATE_THRESHOLD * 100.0
                ));
            }
            if s.average_time_ms > threshold {
                suggestions.push(format!(
                    "{}: average {:.1}ms exceeds the {}ms threshold",
                    s.kind, s.average_time_ms, self.config.max_execution_time_ms
                ));
            }
        }
        if !self.config.conditional_execution {
            suggestions.push("enable conditional execution to skip redundant stages".to_string());
        }

        OptimizationReport {
            order,
            settings: self.config.clone(),
            stats,
            suggestions,
        }
    }
}

/// Per-category line of an [`OptimizationReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    /// Category
    pub kind: InterceptorType,
    /// Recorded executions
    pub executions: u64,
    /// Failed executions
    pub errors: u64,
    /// `errors / executions`
    pub error_rate: f64,
    /// Mean execution time
    pub average_time_ms: f64,
    /// Fastest execution
    pub min_time_ms: f64,
    /// Slowest execution
    pub max_time_ms: f64,
}

impl From<&InterceptorStats> for StatsSummary {
    fn from(s: &InterceptorStats) -> Self {
        Self {
            kind: s.kind,
            executions: s.execution_count,
            errors: s.errors,
            error_rate: s.error_rate(),
            average_time_ms: s.average_time_ms(),
            min_time_ms: s.min_time_ms,
            max_time_ms: s.max_time_ms,
        }
    }
}

/// Snapshot of the optimizer's view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    /// Current execution order of every category
    pub order: Vec<InterceptorType>,
    /// Settings the optimizer runs with, advisory flags included
    pub settings: OptimizationConfig,
    /// Per-category statistics
    pub stats: Vec<StatsSummary>,
    /// Advisory only
    pub suggestions: Vec<String>,
}

impl fmt::Display for OptimizationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order: Vec<&str> = self.order.iter().map(|t| t.as_str()).collect();
        writeln!(f, "Execution order: {}", order.join(" -> "))?;
        let flag = |on: bool| if on { "on" } else { "off" };
        writeln!(
            f,
            "Settings: conditional={} parallel={} lazy={} slow={}ms",
            flag(self.settings.conditional_execution),
            flag(self.settings.parallel_execution),
            flag(self.settings.lazy_loading),
            self.settings.max_execution_time_ms
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<8} {:>8} {:>7} {:>8} {:>9} {:>9} {:>9}",
            "stage", "runs", "errors", "err %", "avg ms", "min ms", "max ms"
        )?;
        for s in &self.stats {
            writeln!(
                f,
                "{:<8} {:>8} {:>7} {:>7.1}% {:>9.2} {:>9.2} {:>9.2}",
                s.kind.as_str(),
                s.executions,
                s.errors,
                s.error_rate * 100.0,
                s.average_time_ms,
                s.min_time_ms,
                s.max_time_ms
            )?;
        }
        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Suggestions:")?;
            for suggestion in &self.suggestions {
                writeln!(f, "  - {suggestion}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InterceptorType::{Auth, Custom, Error, Logging, Retry};

    fn optimizer() -> InterceptorOptimizer {
        InterceptorOptimizer::new(OptimizationConfig::default())
    }

    #[test]
    fn static_order_without_stats() {
        assert_eq!(
            optimizer().optimize_execution_order(&[Error, Retry, Logging, Auth]),
            vec![Logging, Auth, Retry, Error]
        );
    }

    #[test]
    fn single_category_with_stats_keeps_static_order() {
        let opt = optimizer();
        for _ in 0..10 {
            opt.record_execution(Auth, 1.0, false);
        }
        assert_eq!(opt.optimize_execution_order(&[Auth, Retry]), vec![Auth, Retry]);
    }

    #[test]
    fn faster_stage_runs_first_among_healthy() {
        let opt = optimizer();
        for _ in 0..10 {
            opt.record_execution(Logging, 80.0, true);
            opt.record_execution(Auth, 1.0, true);
        }
        assert_eq!(opt.optimize_execution_order(&[Logging, Auth]), vec![Auth, Logging]);
        assert_eq!(
            opt.optimize_execution_order(&[Error, Logging, Auth, Retry]),
            vec![Auth, Logging, Retry, Error]
        );
    }

    #[test]
    fn equal_latency_falls_back_to_rank() {
        let opt = optimizer();
        for _ in 0..10 {
            opt.record_execution(Retry, 5.0, true);
            opt.record_execution(Auth, 5.0, true);
        }
        assert_eq!(opt.optimize_execution_order(&[Retry, Auth]), vec![Auth, Retry]);
    }

    #[test]
    fn failing_category_moves_back() {
        let opt = optimizer();
        for i in 0..10 {
            opt.record_execution(Logging, 1.0, i != 0 && i != 1);
            opt.record_execution(Auth, 1.0, true);
        }
        assert_eq!(
            opt.optimize_execution_order(&[Logging, Auth, Custom]),
            vec![Auth, Custom, Logging]
        );
    }

    #[test]
    fn conditional_rules() {
        let opt = optimizer();
        let cached = RequestContext::new(HttpMethod::Post, "/users").cached();
        assert!(!opt.should_execute(Error, &cached));
        assert!(!opt.should_execute(Logging, &cached));
        assert!(opt.should_execute(Auth, &cached));

        let ok_get = RequestContext::new(HttpMethod::Get, "/users").succeeded();
        assert!(opt.should_execute(Retry, &ok_get));
        assert!(!opt.should_execute(Error, &ok_get));

        let ok_post = RequestContext::new(HttpMethod::Post, "/users").succeeded();
        assert!(!opt.should_execute(Retry, &ok_post));

        let probe = RequestContext::new(HttpMethod::Post, "/health");
        assert!(opt.should_execute(Logging, &probe));
        assert!(opt.should_execute(Error, &probe));
        assert!(!opt.should_execute(Auth, &probe));
        assert!(!opt.should_execute(Retry, &probe));
    }

    #[test]
    fn unconditional_runs_everything() {
        let opt = InterceptorOptimizer::new(OptimizationConfig::unconditional());
        let cached = RequestContext::new(HttpMethod::Post, "/health").cached().succeeded();
        assert!(InterceptorType::ALL.iter().all(|t| opt.should_execute(*t, &cached)));
    }

    #[test]
    fn report_lists_suggestions() {
        let opt = InterceptorOptimizer::new(OptimizationConfig::default().with_max_execution_time_ms(5));
        opt.record_execution(Retry, 50.0, false);
        opt.record_execution(Retry, 10.0, true);
        let report = opt.generate_optimization_report();
        assert_eq!(report.order.len(), InterceptorType::COUNT);
        assert_eq!(report.suggestions.len(), 2);
        let text = report.to_string();
        assert!(text.starts_with("Execution order: logging -> auth -> custom -> retry -> error"));
        assert!(text.contains("retry: error rate 50.0% exceeds 10%"));
        assert!(text.contains("Settings: conditional=on parallel=off lazy=on slow=5ms"));
    }

    #[test]
    fn empty_report() {
        let report = optimizer().generate_optimization_report();
        assert_eq!(report.suggestions, vec!["no statistics recorded yet".to_string()]);
    }

    #[test]
    fn reset_restores_static_order() {
        let opt = optimizer();
        for _ in 0..5 {
            opt.record_execution(Logging, 1.0, false);
            opt.record_execution(Auth, 1.0, true);
        }
        assert_eq!(opt.optimize_execution_order(&[Logging, Auth]), vec![Auth, Logging]);
        opt.reset();
        assert_eq!(opt.optimize_execution_order(&[Logging, Auth]), vec![Logging, Auth]);
    }
}
