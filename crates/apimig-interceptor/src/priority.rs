//! Static priority table
//!
//! Instrumentation wraps everything, authentication precedes the call, retry
//! and error handling run last. Lower rank runs first.

use apimig_core::InterceptorType;
use serde::{Deserialize, Serialize};

/// Rank per interceptor category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTable {
    ranks: [u8; InterceptorType::COUNT],
}

impl PriorityTable {
    /// Default ranks: logging=1, auth=2, custom=3, retry=4, error=5
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ranks: [1, 2, 3, 4, 5],
        }
    }

    /// Override one category's rank
    #[inline]
    #[must_use]
    pub fn with_rank(mut self, kind: InterceptorType, rank: u8) -> Self {
        self.ranks[kind.index()] = rank;
        self
    }

    /// Rank of `kind`
    #[inline]
    #[must_use]
    pub fn rank(&self, kind: InterceptorType) -> u8 {
        self.ranks[kind.index()]
    }

    /// `types` sorted by rank, ties kept in input order
    #[must_use]
    pub fn sort(&self, types: &[InterceptorType]) -> Vec<InterceptorType> {
        let mut sorted = types.to_vec();
        sorted.sort_by_key(|t| self.rank(*t));
        sorted
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new()
    }
}
