//! apimig Interceptor
//!
//! Priority table, statistics collector and optimizer for request-pipeline
//! stages.
//!
//! # Overview
//!
//! - **PriorityTable**: static rank per [`InterceptorType`]
//! - **StatsTable**: fixed-size, per-category execution statistics
//! - **InterceptorOptimizer**: adaptive ordering and conditional execution
//! - **InterceptorRegistry**: one registration per category per client
//! - **Pipeline**: runs stages in order and reports timings back
//!
//! # Example
//!
//! ```rust
//! use apimig_core::InterceptorType::{Error, Retry};
//! use apimig_interceptor::{HttpMethod, InterceptorOptimizer, OptimizationConfig, RequestContext};
//!
//! let optimizer = InterceptorOptimizer::new(OptimizationConfig::default());
//! let cached = RequestContext::new(HttpMethod::Post, "/orders").cached();
//! assert!(!optimizer.should_execute(Error, &cached));
//!
//! let read = RequestContext::new(HttpMethod::Get, "/orders").succeeded();
//! assert!(optimizer.should_execute(Retry, &read));
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod error;
pub mod optimizer;
pub mod pipeline;
pub mod priority;
pub mod registry;
pub mod stats;

// Re-exports
pub use apimig_core::InterceptorType;
pub use config::OptimizationConfig;
pub use context::{HttpMethod, RequestContext, HEALTH_PATHS};
pub use error::{OptimizerError, StageError};
pub use optimizer::{InterceptorOptimizer, OptimizationReport, StatsSummary, ERROR_RATE_THRESHOLD};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use priority::PriorityTable;
pub use registry::InterceptorRegistry;
pub use stats::{InterceptorStats, StatsTable};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
