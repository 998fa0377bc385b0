//! Rewriter configuration
//!
//! Names the legacy patterns to match and the unified pattern to emit.
//! Defaults describe the `@/lib/api` code base the toolkit was built for.

use apimig_core::{Preset, FACTORY_FUNCTION};
use serde::{Deserialize, Serialize};

/// Which files get versioned-prefix stripping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixScope {
    /// Only files importing the unified construction function
    #[default]
    MigratedFiles,
    /// Every non-test file
    AllFiles,
}

/// Rewriter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Module specifiers that export the legacy client
    pub legacy_modules: Vec<String>,
    /// Named export of the legacy client
    pub client_export: String,
    /// Named export of the "current auth client" accessor
    pub accessor_export: String,
    /// Module the unified construction function is imported from
    pub unified_module: String,
    /// Unified construction function
    pub factory_function: String,
    /// Deprecated error-helper modules merged into the unified import
    pub deprecated_error_modules: Vec<String>,
    /// HTTP-verb methods recognised on the legacy client
    pub http_methods: Vec<String>,
    /// Preferred local name for synthesized construction statements
    pub local_client_name: String,
    /// Preset used when neither path nor content decides
    pub default_preset: Preset,
    /// Where versioned prefixes are stripped
    pub prefix_scope: PrefixScope,
}

impl RewriteConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a different default preset
    #[inline]
    #[must_use]
    pub fn with_default_preset(mut self, preset: Preset) -> Self {
        self.default_preset = preset;
        self
    }

    /// With an additional legacy module specifier
    #[inline]
    #[must_use]
    pub fn with_legacy_module(mut self, module: impl Into<String>) -> Self {
        self.legacy_modules.push(module.into());
        self
    }

    /// With a different prefix scope
    #[inline]
    #[must_use]
    pub fn with_prefix_scope(mut self, scope: PrefixScope) -> Self {
        self.prefix_scope = scope;
        self
    }

    /// Whether `module` exports the legacy client
    #[inline]
    #[must_use]
    pub fn is_legacy_module(&self, module: &str) -> bool {
        self.legacy_modules.iter().any(|m| m == module)
    }

    /// Whether `module` is a deprecated error helper
    #[inline]
    #[must_use]
    pub fn is_deprecated_error_module(&self, module: &str) -> bool {
        self.deprecated_error_modules.iter().any(|m| m == module)
    }

    /// Whether `method` is an HTTP-verb method of the legacy client
    #[inline]
    #[must_use]
    pub fn is_http_method(&self, method: &str) -> bool {
        self.http_methods.iter().any(|m| m == method)
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            legacy_modules: vec!["@/lib/api".to_string(), "@/lib/api/index".to_string()],
            client_export: "apiClient".to_string(),
            accessor_export: "getAuthClient".to_string(),
            unified_module: "@/lib/api".to_string(),
            factory_function: FACTORY_FUNCTION.to_string(),
            deprecated_error_modules: vec!["@/lib/api/error".to_string()],
            http_methods: ["get", "post", "put", "patch", "delete", "head", "options", "request"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            local_client_name: "client".to_string(),
            default_preset: Preset::Default,
            prefix_scope: PrefixScope::MigratedFiles,
        }
    }
}
