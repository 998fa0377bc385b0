//! apimig Core
//!
//! Vocabulary shared by every crate of the migration toolkit.
//!
//! # Core Concepts
//!
//! - [`Preset`]: closed set of client configurations (`auth`, `admin`, ...)
//! - [`PresetSettings`]: transport and interceptor settings a preset stands for
//! - [`ClientVariant`]: which client construction pattern served a call
//! - [`InterceptorType`]: closed set of request-pipeline stage categories
//!
//! # Example
//!
//! ```rust
//! use apimig_core::{InterceptorType, Preset};
//!
//! let preset: Preset = "admin".parse().unwrap();
//! let settings = preset.settings();
//! assert!(settings.interceptors().contains(&InterceptorType::Logging));
//! ```

#![warn(unreachable_pub)]

mod error;
mod interceptor;
mod preset;
mod variant;

pub use error::VocabularyError;
pub use interceptor::InterceptorType;
pub use preset::{Preset, PresetSettings};
pub use variant::ClientVariant;

/// Identifier of the unified construction function emitted by the codemod
pub const FACTORY_FUNCTION: &str = "createPresetApiClient";

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
