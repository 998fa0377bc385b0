//! Statistics collector
//!
//! One slot per interceptor category. The category set is closed, so the
//! table is a fixed array and can never grow.

use apimig_core::InterceptorType;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Accumulated measurements for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptorStats {
    /// Category
    pub kind: InterceptorType,
    /// Recorded executions
    pub execution_count: u64,
    /// Sum of execution times
    pub total_time_ms: f64,
    /// Slowest execution
    pub max_time_ms: f64,
    /// Fastest execution
    pub min_time_ms: f64,
    /// Failed executions
    pub errors: u64,
}

impl InterceptorStats {
    /// Empty stats for `kind`
    #[inline]
    #[must_use]
    pub fn new(kind: InterceptorType) -> Self {
        Self {
            kind,
            execution_count: 0,
            total_time_ms: 0.0,
            max_time_ms: 0.0,
            min_time_ms: 0.0,
            errors: 0,
        }
    }

    /// Add one execution
    pub fn record(&mut self, time_ms: f64, success: bool) {
        let time_ms = if time_ms.is_finite() { time_ms.max(0.0) } else { 0.0 };
        if self.execution_count == 0 {
            self.min_time_ms = time_ms;
            self.max_time_ms = time_ms;
        } else {
            self.min_time_ms = self.min_time_ms.min(time_ms);
            self.max_time_ms = self.max_time_ms.max(time_ms);
        }
        self.execution_count += 1;
        self.total_time_ms += time_ms;
        if !success {
            self.errors += 1;
        }
    }

    /// Whether anything was recorded
    #[inline]
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.execution_count > 0
    }

    /// Mean execution time (0 without data)
    #[must_use]
    pub fn average_time_ms(&self) -> f64 {
        if self.execution_count == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let count = self.execution_count as f64;
            self.total_time_ms / count
        }
    }

    /// Fraction of failed executions (0 without data)
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        if self.execution_count == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.errors as f64 / self.execution_count as f64;
            rate
        }
    }
}

/// Fixed-size, per-category statistics table
#[derive(Debug)]
pub struct StatsTable {
    slots: [Mutex<InterceptorStats>; InterceptorType::COUNT],
}

impl StatsTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: InterceptorType::ALL.map(|kind| Mutex::new(InterceptorStats::new(kind))),
        }
    }

    /// Record one execution of `kind`
    pub fn record(&self, kind: InterceptorType, time_ms: f64, success: bool) {
        self.slots[kind.index()].lock().record(time_ms, success);
    }

    /// Copy of the stats for `kind`
    #[must_use]
    pub fn get(&self, kind: InterceptorType) -> InterceptorStats {
        self.slots[kind.index()].lock().clone()
    }

    /// Copy of every slot in category order
    #[must_use]
    pub fn snapshot(&self) -> Vec<InterceptorStats> {
        self.slots.iter().map(|slot| slot.lock().clone()).collect()
    }

    /// Clear every slot
    pub fn reset(&self) {
        for (slot, kind) in self.slots.iter().zip(InterceptorType::ALL) {
            *slot.lock() = InterceptorStats::new(kind);
        }
    }
}

impl Default for StatsTable {
    fn default() -> Self {
        Self::new()
    }
}
