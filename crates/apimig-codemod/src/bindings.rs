//! Legacy binding collection
//!
//! Finds the local names under which the legacy client and the auth accessor
//! are imported, and classifies every reference to them. A binding may only be
//! dropped from its import when every reference is one the rules rewrite.

use crate::config::RewriteConfig;
use crate::syntax::{self, text, VisitFlow, Visitor};
use tree_sitter::{Node, Tree};

/// What a legacy binding refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// The shared legacy client instance
    Client,
    /// The "current auth client" accessor function
    Accessor,
}

/// One imported legacy name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyBinding {
    /// Name in this file
    pub local: String,
    /// What it refers to
    pub kind: BindingKind,
    /// References outside imports
    pub references: usize,
    /// References a rule will rewrite
    pub rewritable: usize,
}

impl LegacyBinding {
    /// Every reference is rewritten, so the import can go
    #[inline]
    #[must_use]
    pub fn is_droppable(&self) -> bool {
        self.references > 0 && self.references == self.rewritable
    }
}

/// Legacy bindings of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyBindings {
    bindings: Vec<LegacyBinding>,
    factory_local: Option<String>,
    quote: char,
}

impl Default for LegacyBindings {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            factory_local: None,
            quote: '\'',
        }
    }
}

impl LegacyBindings {
    /// Collect bindings and reference counts from `tree`
    #[must_use]
    pub fn collect(tree: &Tree, source: &str, config: &RewriteConfig) -> Self {
        let mut imports = ImportCollector {
            source,
            config,
            out: LegacyBindings::default(),
            quote_seen: false,
        };
        syntax::walk(tree, &mut imports);
        let mut out = imports.out;

        if !out.bindings.is_empty() {
            let mut refs = ReferenceCounter {
                source,
                config,
                bindings: &mut out.bindings,
            };
            syntax::walk(tree, &mut refs);
        }
        out
    }

    /// All bindings
    #[inline]
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &LegacyBinding> {
        self.bindings.iter()
    }

    /// Whether the file imports anything legacy
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Binding by local name
    #[must_use]
    pub fn get(&self, local: &str) -> Option<&LegacyBinding> {
        self.bindings.iter().find(|b| b.local == local)
    }

    /// Binding by local name and kind
    #[must_use]
    pub fn get_kind(&self, local: &str, kind: BindingKind) -> Option<&LegacyBinding> {
        self.get(local).filter(|b| b.kind == kind)
    }

    /// Whether the import of `local` can be removed
    #[must_use]
    pub fn is_droppable(&self, local: &str) -> bool {
        self.get(local).is_some_and(LegacyBinding::is_droppable)
    }

    /// Whether some reference will be rewritten to the construction function
    #[must_use]
    pub fn needs_factory(&self) -> bool {
        self.bindings.iter().any(|b| b.rewritable > 0)
    }

    /// Local name of the construction function, if already imported
    #[inline]
    #[must_use]
    pub fn factory_local(&self) -> Option<&str> {
        self.factory_local.as_deref()
    }

    /// Quote character of the file's first import
    #[inline]
    #[must_use]
    pub fn quote(&self) -> char {
        self.quote
    }
}

/// Whether the statement or specifier is `type`-only
pub(crate) fn is_type_only(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == "type");
    found
}

/// Module specifier of an import statement
pub(crate) fn import_source<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name("source")
        .map(|s| syntax::string_value(s, source))
}

/// `import_clause` child of an import statement
pub(crate) fn import_clause(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "import_clause");
    found
}

/// `import x, * as ns from ...` is left alone entirely
pub(crate) fn has_namespace_import(clause: Node<'_>) -> bool {
    let mut cursor = clause.walk();
    let found = clause
        .named_children(&mut cursor)
        .any(|c| c.kind() == "namespace_import");
    found
}

/// Imported name and local name of an `import_specifier`
pub(crate) fn specifier_names<'s>(spec: Node<'_>, source: &'s str) -> Option<(&'s str, &'s str)> {
    let name = text(spec.child_by_field_name("name")?, source);
    let local = spec
        .child_by_field_name("alias")
        .map_or(name, |a| text(a, source));
    Some((name, local))
}

struct ImportCollector<'c, 's> {
    source: &'s str,
    config: &'c RewriteConfig,
    out: LegacyBindings,
    quote_seen: bool,
}

impl ImportCollector<'_, '_> {
    fn push(&mut self, local: &str, kind: BindingKind) {
        if self.out.get(local).is_none() {
            self.out.bindings.push(LegacyBinding {
                local: local.to_string(),
                kind,
                references: 0,
                rewritable: 0,
            });
        }
    }
}

impl<'tree> Visitor<'tree> for ImportCollector<'_, '_> {
    fn enter(&mut self, node: Node<'tree>) -> VisitFlow {
        match node.kind() {
            "program" => return VisitFlow::Descend,
            "import_statement" => {}
            _ => return VisitFlow::Skip,
        }

        if !self.quote_seen {
            if let Some(src) = node.child_by_field_name("source") {
                if let Some(q) = text(src, self.source).chars().next() {
                    self.out.quote = q;
                    self.quote_seen = true;
                }
            }
        }

        if is_type_only(node) {
            return VisitFlow::Skip;
        }
        let Some(module) = import_source(node, self.source) else {
            return VisitFlow::Skip;
        };
        let Some(clause) = import_clause(node) else {
            return VisitFlow::Skip;
        };
        let legacy = self.config.is_legacy_module(module);
        if legacy && has_namespace_import(clause) {
            return VisitFlow::Skip;
        }

        let mut cursor = clause.walk();
        for part in clause.named_children(&mut cursor) {
            match part.kind() {
                "identifier" if legacy => {
                    self.push(text(part, self.source), BindingKind::Client);
                }
                "named_imports" => {
                    let mut inner = part.walk();
                    for spec in part.named_children(&mut inner) {
                        if spec.kind() != "import_specifier" || is_type_only(spec) {
                            continue;
                        }
                        let Some((name, local)) = specifier_names(spec, self.source) else {
                            continue;
                        };
                        if name == self.config.factory_function {
                            self.out.factory_local = Some(local.to_string());
                        } else if legacy && name == self.config.client_export {
                            self.push(local, BindingKind::Client);
                        } else if legacy && name == self.config.accessor_export {
                            self.push(local, BindingKind::Accessor);
                        }
                    }
                }
                _ => {}
            }
        }
        VisitFlow::Skip
    }
}

struct ReferenceCounter<'c, 's, 'b> {
    source: &'s str,
    config: &'c RewriteConfig,
    bindings: &'b mut Vec<LegacyBinding>,
}

impl<'tree> Visitor<'tree> for ReferenceCounter<'_, '_, '_> {
    fn enter(&mut self, node: Node<'tree>) -> VisitFlow {
        match node.kind() {
            "import_statement" => VisitFlow::Skip,
            "identifier" | "shorthand_property_identifier" => {
                let source = self.source;
                let name = text(node, source);
                let binding = self.bindings.iter_mut().find(|b| b.local == name);
                if let Some(binding) = binding.filter(|_| !is_shadowed(node, source)) {
                    binding.references += 1;
                    let rewritable = node.kind() == "identifier"
                        && match binding.kind {
                            BindingKind::Client => {
                                is_rewritable_client_ref(node, self.source, self.config)
                            }
                            BindingKind::Accessor => is_rewritable_accessor_ref(node),
                        };
                    if rewritable {
                        binding.rewritable += 1;
                    }
                }
                VisitFlow::Skip
            }
            _ => VisitFlow::Descend,
        }
    }
}

/// `client.<verb>(...)` with `node` as `client`
pub(crate) fn is_rewritable_client_ref(node: Node<'_>, source: &str, config: &RewriteConfig) -> bool {
    let Some(member) = node.parent() else {
        return false;
    };
    if member.kind() != "member_expression" || !syntax::is_field_of(node, member, "object") {
        return false;
    }
    let is_verb = member
        .child_by_field_name("property")
        .is_some_and(|p| config.is_http_method(text(p, source)));
    if !is_verb {
        return false;
    }
    member
        .parent()
        .is_some_and(|call| call.kind() == "call_expression" && syntax::is_field_of(member, call, "function"))
}

/// `accessor()` with `node` as `accessor` and no arguments
pub(crate) fn is_rewritable_accessor_ref(node: Node<'_>) -> bool {
    let Some(call) = node.parent() else {
        return false;
    };
    if call.kind() != "call_expression" || !syntax::is_field_of(node, call, "function") {
        return false;
    }
    call.child_by_field_name("arguments")
        .is_some_and(|args| args.kind() == "arguments" && args.named_child_count() == 0)
}

/// Whether a local declaration between `node` and module scope rebinds its
/// name
///
/// Covers parameters, catch parameters, block-scoped declarations and loop
/// heads. `var` hoisting out of nested blocks is not tracked.
pub(crate) fn is_shadowed(node: Node<'_>, source: &str) -> bool {
    let name = text(node, source);
    let mut current = node.parent();
    while let Some(scope) = current {
        if declares(scope, name, source) {
            return true;
        }
        current = scope.parent();
    }
    false
}

fn declares(scope: Node<'_>, name: &str, source: &str) -> bool {
    match scope.kind() {
        kind if syntax::FUNCTION_KINDS.contains(&kind) => {
            let params = scope
                .child_by_field_name("parameters")
                .or_else(|| scope.child_by_field_name("parameter"));
            let own_name = matches!(kind, "function_expression" | "function" | "generator_function")
                && scope
                    .child_by_field_name("name")
                    .is_some_and(|n| text(n, source) == name);
            own_name || params.is_some_and(|p| binds(p, name, source))
        }
        "statement_block" => {
            let mut cursor = scope.walk();
            let found = scope
                .named_children(&mut cursor)
                .any(|stmt| statement_declares(stmt, name, source));
            found
        }
        "catch_clause" => scope
            .child_by_field_name("parameter")
            .is_some_and(|p| binds(p, name, source)),
        "for_statement" => scope
            .child_by_field_name("initializer")
            .is_some_and(|init| statement_declares(init, name, source)),
        "for_in_statement" => {
            let mut cursor = scope.walk();
            let declared = scope
                .children(&mut cursor)
                .any(|c| matches!(c.kind(), "const" | "let" | "var"));
            declared
                && scope
                    .child_by_field_name("left")
                    .is_some_and(|l| binds(l, name, source))
        }
        _ => false,
    }
}

fn statement_declares(stmt: Node<'_>, name: &str, source: &str) -> bool {
    match stmt.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = stmt.walk();
            let found = stmt.named_children(&mut cursor).any(|decl| {
                decl.kind() == "variable_declarator"
                    && decl
                        .child_by_field_name("name")
                        .is_some_and(|n| binds(n, name, source))
            });
            found
        }
        "function_declaration" | "generator_function_declaration" | "class_declaration" => stmt
            .child_by_field_name("name")
            .is_some_and(|n| text(n, source) == name),
        _ => false,
    }
}

/// Whether binding pattern `pattern` introduces `name`
fn binds(pattern: Node<'_>, name: &str, source: &str) -> bool {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => text(pattern, source) == name,
        "required_parameter" | "optional_parameter" => pattern
            .child_by_field_name("pattern")
            .is_some_and(|p| binds(p, name, source)),
        "pair_pattern" => pattern
            .child_by_field_name("value")
            .is_some_and(|p| binds(p, name, source)),
        "assignment_pattern" | "object_assignment_pattern" => pattern
            .child_by_field_name("left")
            .is_some_and(|p| binds(p, name, source)),
        "formal_parameters" | "object_pattern" | "array_pattern" | "rest_pattern" => {
            let mut cursor = pattern.walk();
            let found = pattern
                .named_children(&mut cursor)
                .any(|p| binds(p, name, source));
            found
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, Dialect};
    use std::path::Path;

    fn collect(source: &str) -> LegacyBindings {
        let tree = parse(Path::new("a.ts"), source, Dialect::TypeScript).unwrap();
        LegacyBindings::collect(&tree, source, &RewriteConfig::default())
    }

    #[test]
    fn default_import_is_client() {
        let b = collect("import api from '@/lib/api';\nexport const f = () => api.get('/x');\n");
        let binding = b.get("api").unwrap();
        assert_eq!(binding.kind, BindingKind::Client);
        assert_eq!(binding.references, 1);
        assert!(binding.is_droppable());
        assert!(b.needs_factory());
    }

    #[test]
    fn aliased_named_imports() {
        let b = collect(
            "import { apiClient as http, getAuthClient as current } from \"@/lib/api\";\n\
             http.post('/a', {});\n\
             current();\n",
        );
        assert_eq!(b.get_kind("http", BindingKind::Client).map(|x| x.rewritable), Some(1));
        assert_eq!(b.get_kind("current", BindingKind::Accessor).map(|x| x.rewritable), Some(1));
        assert_eq!(b.quote(), '"');
    }

    #[test]
    fn non_call_reference_blocks_drop() {
        let b = collect(
            "import apiClient from '@/lib/api';\n\
             apiClient.get('/x');\n\
             export { apiClient };\n",
        );
        let binding = b.get("apiClient").unwrap();
        assert_eq!(binding.references, 2);
        assert_eq!(binding.rewritable, 1);
        assert!(!binding.is_droppable());
        assert!(b.needs_factory());
    }

    #[test]
    fn defaults_access_is_not_rewritable() {
        let b = collect("import apiClient from '@/lib/api';\napiClient.defaults.timeout = 5;\n");
        assert!(!b.is_droppable("apiClient"));
        assert!(!b.needs_factory());
    }

    #[test]
    fn type_imports_ignored() {
        let b = collect("import type { apiClient } from '@/lib/api';\nlet x: typeof apiClient;\n");
        assert!(b.is_empty());
    }

    #[test]
    fn other_modules_ignored() {
        let b = collect("import apiClient from './local';\napiClient.get('/x');\n");
        assert!(b.is_empty());
    }

    #[test]
    fn factory_alias_recorded() {
        let b = collect("import { createPresetApiClient as make } from '@/lib/api';\n");
        assert_eq!(b.factory_local(), Some("make"));
    }

    #[test]
    fn shadowing_declarations_are_not_references() {
        let b = collect(
            "import { apiClient, getAuthClient } from '@/lib/api';\n\
             export function withMock(apiClient: any) { return apiClient.get('/a'); }\n\
             export const g = ({ apiClient }) => apiClient.get('/b');\n\
             export function h() { const getAuthClient = () => null; return getAuthClient(); }\n\
             export function k() { try { return 1; } catch (apiClient) { return apiClient.get('/c'); } }\n\
             export function m() { return apiClient.get('/d'); }\n",
        );
        assert_eq!(b.get("apiClient").map(|x| (x.references, x.rewritable)), Some((1, 1)));
        assert_eq!(b.get("getAuthClient").map(|x| x.references), Some(0));
        assert!(!b.is_droppable("getAuthClient"));
    }

    #[test]
    fn accessor_with_args_not_rewritable() {
        let b = collect("import { getAuthClient } from '@/lib/api';\ngetAuthClient(true);\n");
        assert!(!b.is_droppable("getAuthClient"));
    }
}
