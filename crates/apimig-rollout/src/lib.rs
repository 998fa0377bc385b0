//! apimig Rollout
//!
//! Run-time half of the migration: decides per installation and per path
//! whether the legacy or the unified client serves a call, and hands out
//! clients accordingly.
//!
//! # Overview
//!
//! - **RolloutConfig**: global switch, percentage, allow/deny path prefixes
//! - **HashAssigner**: persisted per-installation token and bucket
//! - **RolloutController**: override > switch > deny > allow > percentage
//! - **MigrationClientFactory**: variant-aware, cached client construction
//! - **DebugConsole**: force-new, force-old, percentage, status, comparison
//!
//! # Example
//!
//! ```rust
//! use apimig_core::{ClientVariant, Preset};
//! use apimig_rollout::prelude::*;
//! use std::sync::Arc;
//!
//! let controller = Arc::new(RolloutController::with_store(
//!     RolloutConfig::new().with_enabled(true).with_disabled_paths(["/legacy"]).with_percentage(100),
//!     Arc::new(MemoryStore::new()),
//! ));
//! let factory = MigrationClientFactory::new(controller, FactoryConfig::default());
//!
//! let legacy = factory.get_client(Preset::Default, Some("/legacy/report")).unwrap();
//! assert_eq!(legacy.variant(), ClientVariant::Legacy);
//! assert_eq!(legacy.base_url(), "http://localhost:8080");
//! ```

#![warn(unreachable_pub)]

pub mod assignment;
pub mod config;
pub mod console;
pub mod controller;
pub mod error;
pub mod factory;
pub mod store;
pub mod telemetry;

// Re-exports
pub use assignment::{BucketHasher, HashAssigner, UserAssignment};
pub use config::{clamp_percentage, RolloutConfig};
pub use console::{CallProbe, DebugConsole, HttpProbe, PerformanceComparison};
pub use controller::{Decision, DecisionReason, RolloutController, RolloutStatus};
pub use error::{FactoryError, MetricError, ProbeError, StoreError, StoreResult};
pub use factory::{ApiClient, FactoryConfig, MigrationClientFactory};
pub use store::{FileStore, KeyValueStore, MemoryStore, USER_HASH_KEY};
pub use telemetry::{
    CounterSink, MetricEvent, MetricSink, TracingSink, CLIENT_EVENTS_COUNTER, COUNTER_LABEL_KEYS,
};

/// Prelude for common imports
pub mod prelude {
    pub use crate::assignment::{BucketHasher, HashAssigner};
    pub use crate::config::RolloutConfig;
    pub use crate::controller::RolloutController;
    pub use crate::factory::{FactoryConfig, MigrationClientFactory};
    pub use crate::store::{FileStore, KeyValueStore, MemoryStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
