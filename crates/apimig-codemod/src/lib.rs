//! apimig Codemod
//!
//! Scope-aware, idempotent rewriter moving TypeScript/JavaScript call sites
//! from the shared legacy API client to preset-based clients.
//!
//! # Overview
//!
//! - **Rewriter**: fixed, ordered rule set over a tree-sitter syntax tree
//! - **Analysis**: read-only usage inventory of the legacy client
//! - **Verification**: post-migration health check per file
//! - **Batch**: parallel driver isolating per-file failures
//!
//! # Example
//!
//! ```rust
//! use apimig_codemod::rewrite;
//!
//! let source = "\
//! import apiClient from '@/lib/api';
//! export async function me() {
//!   return apiClient.get('/api/v1/auth/me');
//! }
//! ";
//! let outcome = rewrite("src/lib/api/auth/me.ts", source).unwrap();
//! assert!(outcome.changed);
//! assert!(outcome.source.contains("const client = createPresetApiClient('auth');"));
//! assert!(outcome.source.contains("client.get('/auth/me')"));
//!
//! // A second pass finds nothing left to do
//! assert!(!rewrite("src/lib/api/auth/me.ts", &outcome.source).unwrap().changed);
//! ```

#![warn(unreachable_pub)]

pub mod analysis;
pub mod batch;
pub mod bindings;
pub mod config;
pub mod error;
pub mod rewriter;
pub mod rules;
pub mod syntax;
pub mod unit;
pub mod verify;

// Re-exports
pub use analysis::{analyze, analyze_with, UsageReport};
pub use batch::{discover, BatchFailure, BatchMode, BatchRunner, BatchSummary, FileResult};
pub use config::{PrefixScope, RewriteConfig};
pub use error::{BatchError, RewriteError, RewriteResult};
pub use rewriter::{rewrite, RewriteOutcome, Rewriter};
pub use unit::{FileRole, TransformUnit};
pub use verify::{verify, verify_with, MigrationStatus, VerificationReport, MIGRATION_MARKER};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for codemod operations
    pub use crate::{
        analyze, rewrite, verify, BatchMode, BatchRunner, MigrationStatus, RewriteConfig,
        RewriteError, RewriteOutcome, Rewriter,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
