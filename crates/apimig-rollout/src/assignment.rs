//! Per-installation rollout assignment
//!
//! # Core Concepts
//!
//! - **Token**: random UUID v4, generated on first use and persisted under
//!   [`USER_HASH_KEY`]; never regenerated while the store keeps it
//! - **Bucket**: `hash(token) % 100`, stable for a given token
//! - **Fallback**: if the store fails, a fresh process-local token is used and
//!   the assignment is marked not persisted
//!
//! # Example
//!
//! ```rust
//! use apimig_rollout::{HashAssigner, MemoryStore};
//! use std::sync::Arc;
//!
//! let assigner = HashAssigner::new(Arc::new(MemoryStore::new()));
//! let first = assigner.assignment().clone();
//! assert!(first.bucket < 100);
//! assert!(first.persisted);
//! assert_eq!(assigner.assignment(), &first);
//! ```

use crate::store::{KeyValueStore, USER_HASH_KEY};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Token-to-bucket function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketHasher {
    /// Sum of UTF-16 code units modulo 100
    CharSum,
    /// 32-bit FNV-1a over the UTF-8 bytes, modulo 100
    #[default]
    Fnv1a,
}

impl BucketHasher {
    /// Bucket in `0..100` for `token`
    #[must_use]
    pub fn bucket(self, token: &str) -> u8 {
        let hash = match self {
            BucketHasher::CharSum => token
                .encode_utf16()
                .fold(0u32, |acc, unit| acc.wrapping_add(u32::from(unit))),
            BucketHasher::Fnv1a => token.bytes().fold(FNV_OFFSET_BASIS, |acc, byte| {
                (acc ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
            }),
        };
        // < 100, always fits
        u8::try_from(hash % 100).unwrap_or(0)
    }

    /// Short name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            BucketHasher::CharSum => "char_sum",
            BucketHasher::Fnv1a => "fnv1a",
        }
    }
}

impl fmt::Display for BucketHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// This installation's token and bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssignment {
    /// Opaque token
    pub token: String,
    /// Bucket in `0..100`
    pub bucket: u8,
    /// Whether the token is stored durably
    pub persisted: bool,
}

/// Lazily creates and caches the [`UserAssignment`]
pub struct HashAssigner {
    store: Arc<dyn KeyValueStore>,
    hasher: BucketHasher,
    cell: OnceCell<UserAssignment>,
}

impl HashAssigner {
    /// Assigner backed by `store`, FNV-1a buckets
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            hasher: BucketHasher::default(),
            cell: OnceCell::new(),
        }
    }

    /// With a different bucket function
    #[inline]
    #[must_use]
    pub fn with_hasher(mut self, hasher: BucketHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Bucket function in use
    #[inline]
    #[must_use]
    pub fn hasher(&self) -> BucketHasher {
        self.hasher
    }

    /// Whether the assignment was already created
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The assignment, created on first call
    pub fn assignment(&self) -> &UserAssignment {
        self.cell.get_or_init(|| self.load_or_create())
    }

    fn load_or_create(&self) -> UserAssignment {
        match self.store.get(USER_HASH_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => {
                tracing::debug!("Loaded rollout token from store");
                return self.assign(token, true);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Rollout store unavailable, using a session token: {}", e);
                return self.assign(Uuid::new_v4().to_string(), false);
            }
        }

        let token = Uuid::new_v4().to_string();
        match self.store.set(USER_HASH_KEY, &token) {
            Ok(()) => {
                tracing::info!("Generated new rollout token");
                self.assign(token, true)
            }
            Err(e) => {
                tracing::warn!("Failed to persist rollout token, using a session token: {}", e);
                self.assign(token, false)
            }
        }
    }

    fn assign(&self, token: String, persisted: bool) -> UserAssignment {
        let bucket = self.hasher.bucket(&token);
        UserAssignment {
            token,
            bucket,
            persisted,
        }
    }
}

impl fmt::Debug for HashAssigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashAssigner")
            .field("hasher", &self.hasher)
            .field("assignment", &self.cell.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{MemoryStore, MockKeyValueStore};
    use proptest::prelude::*;

    #[test]
    fn char_sum_matches_code_unit_sum() {
        // 'a' + 'b' = 97 + 98
        assert_eq!(BucketHasher::CharSum.bucket("ab"), 95);
        assert_eq!(BucketHasher::CharSum.bucket(""), 0);
    }

    #[test]
    fn fnv1a_known_values() {
        // FNV-1a("") = 0x811c9dc5, FNV-1a("a") = 0xe40c292c
        assert_eq!(BucketHasher::Fnv1a.bucket(""), (0x811c_9dc5u32 % 100) as u8);
        assert_eq!(BucketHasher::Fnv1a.bucket("a"), (0xe40c_292cu32 % 100) as u8);
    }

    #[test]
    fn persists_once_and_reloads() {
        let store = Arc::new(MemoryStore::new());
        let first = HashAssigner::new(store.clone()).assignment().clone();
        assert!(first.persisted);
        assert_eq!(store.get(USER_HASH_KEY).unwrap().as_deref(), Some(first.token.as_str()));

        let second = HashAssigner::new(store).assignment().clone();
        assert_eq!(second, first);
    }

    #[test]
    fn read_failure_falls_back_without_writing() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("disk gone".into())));
        store.expect_set().never();

        let assigner = HashAssigner::new(Arc::new(store));
        let assignment = assigner.assignment();
        assert!(!assignment.persisted);
        assert!(assignment.bucket < 100);
        // cached: the store is not consulted again
        assert_eq!(assigner.assignment().token, assignment.token);
    }

    #[test]
    fn write_failure_falls_back() {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|_| Ok(None));
        store
            .expect_set()
            .times(1)
            .returning(|_, _| Err(StoreError::Unavailable("read-only".into())));

        let assignment = HashAssigner::new(Arc::new(store)).assignment().clone();
        assert!(!assignment.persisted);
    }

    #[test]
    fn blank_token_is_replaced() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_HASH_KEY, "  ").unwrap();
        let assignment = HashAssigner::new(store.clone()).assignment().clone();
        assert!(Uuid::parse_str(&assignment.token).is_ok());
        assert_eq!(store.get(USER_HASH_KEY).unwrap(), Some(assignment.token));
    }

    proptest! {
        #[test]
        fn buckets_are_deterministic_and_in_range(token in ".{0,64}") {
            for hasher in [BucketHasher::CharSum, BucketHasher::Fnv1a] {
                let bucket = hasher.bucket(&token);
                prop_assert!(bucket < 100);
                prop_assert_eq!(bucket, hasher.bucket(&token));
            }
        }
    }
}
