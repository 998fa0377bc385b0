//! Rewrite rules
//!
//! The rule set is closed and applied in a fixed order. Each rule only
//! produces [`Edit`]s against the current text; the rewriter applies them
//! and re-parses before the next rule runs.
//!
//! | order | rule | effect |
//! |---|---|---|
//! | 1 | [`DefaultImportRule`] | `import apiClient from ...` |
//! | 2 | [`NamedImportRule`] | `import { apiClient, getAuthClient } from ...` |
//! | 3 | [`CallSiteRule`] | `apiClient.get(...)` → scoped `client.get(...)` |
//! | 4 | [`AccessorRule`] | `getAuthClient()` → `createPresetApiClient('auth')` |
//! | 5 | [`VersionPrefixRule`] | `'/api/v1/x'` → `'/x'` |
//! | 6 | [`ErrorImportRule`] | merge `@/lib/api/error` into the unified import |
//!
//! Every rule is idempotent on its own output.

mod accessor;
mod call_sites;
mod imports;
pub mod prefix;

pub use accessor::AccessorRule;
pub use call_sites::CallSiteRule;
pub use imports::{DefaultImportRule, ErrorImportRule, NamedImportRule};
pub use prefix::VersionPrefixRule;

use crate::config::RewriteConfig;
use crate::syntax::Edit;
use crate::unit::TransformUnit;
use tree_sitter::Tree;

/// One rewrite rule
pub trait RewriteRule: Send + Sync {
    /// Stable name used in outcomes and errors
    fn name(&self) -> &'static str;

    /// Edits for the current text of the file
    fn apply(
        &self,
        unit: &TransformUnit<'_>,
        config: &RewriteConfig,
        tree: &Tree,
        source: &str,
    ) -> Vec<Edit>;
}

/// The fixed rule set in application order
#[must_use]
pub fn default_rules() -> Vec<Box<dyn RewriteRule>> {
    vec![
        Box::new(DefaultImportRule),
        Box::new(NamedImportRule),
        Box::new(CallSiteRule),
        Box::new(AccessorRule),
        Box::new(VersionPrefixRule),
        Box::new(ErrorImportRule),
    ]
}

/// Local name of the construction function
pub(crate) fn factory_name<'a>(unit: &'a TransformUnit<'_>, config: &'a RewriteConfig) -> &'a str {
    unit.bindings()
        .factory_local()
        .unwrap_or(config.factory_function.as_str())
}

/// `factory('preset')` in the file's quote style
pub(crate) fn factory_call(unit: &TransformUnit<'_>, config: &RewriteConfig, preset: &str) -> String {
    let q = unit.quote();
    format!("{}({q}{preset}{q})", factory_name(unit, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_order_is_fixed() {
        let names: Vec<_> = default_rules().iter().map(|r| r.name()).collect();
        assert_eq!(
            names,
            [
                "default-import",
                "named-import",
                "call-sites",
                "auth-accessor",
                "version-prefix",
                "error-import"
            ]
        );
    }
}
