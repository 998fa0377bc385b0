//! Rule 5: versioned API prefix stripping
//!
//! Unified clients carry `/api/<version>` in their base URL, so literal paths
//! handed to them must not repeat it.

use super::imports::factory_imported;
use super::RewriteRule;
use crate::config::{PrefixScope, RewriteConfig};
use crate::syntax::{self, is_field_of, text, Edit, VisitFlow, Visitor};
use crate::unit::TransformUnit;
use tree_sitter::{Node, Tree};

/// Length of a leading `/api/v<digits>`, if `value` starts with one
#[must_use]
pub fn versioned_prefix_len(value: &str) -> Option<usize> {
    const HEAD: &str = "/api/v";
    let rest = value.strip_prefix(HEAD)?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    (digits > 0).then_some(HEAD.len() + digits)
}

/// Path with every leading `/api/v<digits>` removed
///
/// Returns `None` when nothing is stripped. A prefix directly followed by
/// anything other than `/`, `?`, `#` or the end of the string is left alone.
#[must_use]
pub fn strip_version_prefix(value: &str) -> Option<String> {
    let mut current = value;
    let mut stripped = false;
    while let Some(len) = versioned_prefix_len(current) {
        let rest = &current[len..];
        if rest.is_empty() {
            return Some("/".to_string());
        }
        if rest.starts_with('/') {
            current = rest;
            stripped = true;
            continue;
        }
        if rest.starts_with(['?', '#']) {
            return Some(format!("/{rest}"));
        }
        break;
    }
    stripped.then(|| current.to_string())
}

/// Rule 5: `'/api/v1/widgets'` → `'/widgets'`
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionPrefixRule;

impl RewriteRule for VersionPrefixRule {
    fn name(&self) -> &'static str {
        "version-prefix"
    }

    fn apply(
        &self,
        _unit: &TransformUnit<'_>,
        config: &RewriteConfig,
        tree: &Tree,
        source: &str,
    ) -> Vec<Edit> {
        let in_scope = match config.prefix_scope {
            PrefixScope::AllFiles => true,
            PrefixScope::MigratedFiles => factory_imported(tree, source, config),
        };
        if !in_scope {
            return Vec::new();
        }

        let mut visitor = PrefixVisitor {
            source,
            edits: Vec::new(),
        };
        syntax::walk(tree, &mut visitor);
        visitor.edits
    }
}

struct PrefixVisitor<'s> {
    source: &'s str,
    edits: Vec<Edit>,
}

impl<'tree> Visitor<'tree> for PrefixVisitor<'_> {
    fn enter(&mut self, node: Node<'tree>) -> VisitFlow {
        match node.kind() {
            "import_statement" | "jsx_attribute" => VisitFlow::Skip,
            "string" | "template_string" => {
                let is_module_source = node
                    .parent()
                    .is_some_and(|p| p.kind() == "export_statement" && is_field_of(node, p, "source"));
                if !is_module_source {
                    if let Some(edit) = strip_literal(node, self.source) {
                        self.edits.push(edit);
                    }
                }
                VisitFlow::Skip
            }
            _ => VisitFlow::Descend,
        }
    }
}

fn strip_literal(node: Node<'_>, source: &str) -> Option<Edit> {
    let raw = text(node, source);
    let quote = raw.chars().next()?;
    if raw.len() < 2 || !raw.ends_with(quote) {
        return None;
    }
    let inner = &raw[1..raw.len() - 1];
    let stripped = strip_version_prefix(inner)?;
    Some(Edit::replace(node, format!("{quote}{stripped}{quote}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn prefix_len() {
        assert_eq!(versioned_prefix_len("/api/v1/x"), Some(7));
        assert_eq!(versioned_prefix_len("/api/v12"), Some(8));
        assert_eq!(versioned_prefix_len("/api/vx"), None);
        assert_eq!(versioned_prefix_len("/api/"), None);
        assert_eq!(versioned_prefix_len("api/v1"), None);
    }

    #[test]
    fn stripping() {
        assert_eq!(strip_version_prefix("/api/v1/widgets").as_deref(), Some("/widgets"));
        assert_eq!(strip_version_prefix("/api/v1").as_deref(), Some("/"));
        assert_eq!(strip_version_prefix("/api/v1/").as_deref(), Some("/"));
        assert_eq!(strip_version_prefix("/api/v2?page=1").as_deref(), Some("/?page=1"));
        assert_eq!(strip_version_prefix("/api/v1/api/v2/x").as_deref(), Some("/x"));
        assert_eq!(strip_version_prefix("/api/v1beta/x"), None);
        assert_eq!(strip_version_prefix("/api/v1${id}"), None);
        assert_eq!(strip_version_prefix("/widgets"), None);
        assert_eq!(strip_version_prefix("/api/v1/${id}").as_deref(), Some("/${id}"));
    }

    proptest! {
        #[test]
        fn stripping_is_idempotent(path in "(/api/v[0-9]{1,2}){0,2}(/[a-z]{1,6}){0,3}") {
            let once = strip_version_prefix(&path).unwrap_or_else(|| path.clone());
            prop_assert_eq!(strip_version_prefix(&once), None);
        }
    }
}
