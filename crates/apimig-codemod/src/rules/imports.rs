//! Import rules: legacy default import, legacy named imports, and the
//! deprecated error-helper import

use super::{factory_name, RewriteRule};
use crate::bindings::{
    has_namespace_import, import_clause, import_source, is_type_only, specifier_names,
};
use crate::config::RewriteConfig;
use crate::syntax::{range_with_newline, text, Edit};
use crate::unit::TransformUnit;
use tree_sitter::{Node, Tree};

/// Top-level `import` statements of the current tree
fn import_statements(tree: &Tree) -> Vec<Node<'_>> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    let found = root
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "import_statement")
        .collect();
    found
}

fn named_imports(clause: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = clause.walk();
    let found = clause
        .named_children(&mut cursor)
        .find(|c| c.kind() == "named_imports");
    found
}

fn default_identifier(clause: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = clause.walk();
    let found = clause
        .named_children(&mut cursor)
        .find(|c| c.kind() == "identifier");
    found
}

fn specifiers(named: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = named.walk();
    let found = named
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "import_specifier")
        .collect();
    found
}

/// Whether the construction function is imported anywhere in `tree`
pub(crate) fn factory_imported(tree: &Tree, source: &str, config: &RewriteConfig) -> bool {
    import_statements(tree).into_iter().any(|stmt| {
        !is_type_only(stmt)
            && import_clause(stmt)
                .and_then(named_imports)
                .is_some_and(|named| {
                    specifiers(named).into_iter().any(|spec| {
                        !is_type_only(spec)
                            && specifier_names(spec, source)
                                .is_some_and(|(name, _)| name == config.factory_function)
                    })
                })
    })
}

fn render_clause(default: Option<&str>, named: &[String]) -> Option<String> {
    match (default, named.is_empty()) {
        (None, true) => None,
        (Some(d), true) => Some(d.to_string()),
        (None, false) => Some(format!("{{ {} }}", named.join(", "))),
        (Some(d), false) => Some(format!("{d}, {{ {} }}", named.join(", "))),
    }
}

/// A standalone import of the construction function
fn factory_import_line(unit: &TransformUnit<'_>, config: &RewriteConfig) -> String {
    let q = unit.quote();
    format!(
        "import {{ {} }} from {q}{}{q};\n",
        config.factory_function, config.unified_module
    )
}

/// How the construction function gets into an import statement
enum FactoryPlacement {
    None,
    /// Into this statement's specifier list
    Inline,
    /// As a new statement in front of this one
    Separate,
}

fn placement(
    needed: bool,
    module: &str,
    unit: &TransformUnit<'_>,
    config: &RewriteConfig,
    tree: &Tree,
    source: &str,
) -> FactoryPlacement {
    if !needed || !unit.bindings().needs_factory() || factory_imported(tree, source, config) {
        FactoryPlacement::None
    } else if module == config.unified_module {
        FactoryPlacement::Inline
    } else {
        FactoryPlacement::Separate
    }
}

/// Replace or delete an import clause's statement
fn rewrite_statement(
    stmt: Node<'_>,
    clause: Node<'_>,
    rendered: Option<String>,
    source: &str,
    edits: &mut Vec<Edit>,
) {
    match rendered {
        Some(clause_text) => edits.push(Edit::replace(clause, clause_text)),
        None => edits.push(Edit::delete(range_with_newline(stmt, source))),
    }
}

/// Rule 1: `import apiClient from '@/lib/api'`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultImportRule;

impl RewriteRule for DefaultImportRule {
    fn name(&self) -> &'static str {
        "default-import"
    }

    fn apply(
        &self,
        unit: &TransformUnit<'_>,
        config: &RewriteConfig,
        tree: &Tree,
        source: &str,
    ) -> Vec<Edit> {
        let mut edits = Vec::new();
        let mut factory_pending = true;

        for stmt in import_statements(tree) {
            if is_type_only(stmt) {
                continue;
            }
            let Some(module) = import_source(stmt, source) else {
                continue;
            };
            if !config.is_legacy_module(module) {
                continue;
            }
            let Some(clause) = import_clause(stmt) else {
                continue;
            };
            if has_namespace_import(clause) {
                continue;
            }
            let Some(default) = default_identifier(clause) else {
                continue;
            };

            let default_name = text(default, source);
            let drop_default = unit.bindings().is_droppable(default_name);
            let factory =
                placement(factory_pending, module, unit, config, tree, source);
            if !drop_default && matches!(factory, FactoryPlacement::None) {
                continue;
            }

            let mut named: Vec<String> = named_imports(clause)
                .map(|n| specifiers(n).into_iter().map(|s| text(s, source).to_string()).collect())
                .unwrap_or_default();
            match factory {
                FactoryPlacement::Inline => {
                    named.insert(0, factory_name(unit, config).to_string());
                    factory_pending = false;
                }
                FactoryPlacement::Separate => {
                    edits.push(Edit::insert(stmt.start_byte(), factory_import_line(unit, config)));
                    factory_pending = false;
                }
                FactoryPlacement::None => {}
            }

            let keep = (!drop_default).then_some(default_name);
            rewrite_statement(stmt, clause, render_clause(keep, &named), source, &mut edits);
        }
        edits
    }
}

/// Rule 2: `import { apiClient, getAuthClient as x } from '@/lib/api'`
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedImportRule;

impl RewriteRule for NamedImportRule {
    fn name(&self) -> &'static str {
        "named-import"
    }

    fn apply(
        &self,
        unit: &TransformUnit<'_>,
        config: &RewriteConfig,
        tree: &Tree,
        source: &str,
    ) -> Vec<Edit> {
        let mut edits = Vec::new();
        let mut factory_pending = true;

        for stmt in import_statements(tree) {
            if is_type_only(stmt) {
                continue;
            }
            let Some(module) = import_source(stmt, source) else {
                continue;
            };
            if !config.is_legacy_module(module) {
                continue;
            }
            let Some(clause) = import_clause(stmt) else {
                continue;
            };
            let Some(list) = named_imports(clause) else {
                continue;
            };

            let mut kept = Vec::new();
            let mut first_dropped = None;
            for spec in specifiers(list) {
                let droppable = !is_type_only(spec)
                    && specifier_names(spec, source)
                        .is_some_and(|(_, local)| unit.bindings().is_droppable(local));
                if droppable {
                    first_dropped.get_or_insert(kept.len());
                } else {
                    kept.push(text(spec, source).to_string());
                }
            }

            let factory = placement(factory_pending, module, unit, config, tree, source);
            if first_dropped.is_none() && matches!(factory, FactoryPlacement::None) {
                continue;
            }
            match factory {
                FactoryPlacement::Inline => {
                    let at = first_dropped.unwrap_or(kept.len());
                    kept.insert(at, factory_name(unit, config).to_string());
                    factory_pending = false;
                }
                FactoryPlacement::Separate => {
                    edits.push(Edit::insert(stmt.start_byte(), factory_import_line(unit, config)));
                    factory_pending = false;
                }
                FactoryPlacement::None => {}
            }

            let default = default_identifier(clause).map(|d| text(d, source));
            rewrite_statement(stmt, clause, render_clause(default, &kept), source, &mut edits);
        }
        edits
    }
}

/// Rule 6: fold `import { ApiError } from '@/lib/api/error'` into the
/// unified import
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorImportRule;

impl RewriteRule for ErrorImportRule {
    fn name(&self) -> &'static str {
        "error-import"
    }

    fn apply(
        &self,
        _unit: &TransformUnit<'_>,
        config: &RewriteConfig,
        tree: &Tree,
        source: &str,
    ) -> Vec<Edit> {
        let statements = import_statements(tree);

        let target = statements.iter().copied().find_map(|stmt| {
            if is_type_only(stmt) || import_source(stmt, source) != Some(config.unified_module.as_str()) {
                return None;
            }
            import_clause(stmt).and_then(named_imports)
        });
        let Some(target) = target else {
            return Vec::new();
        };

        let mut present: Vec<String> = specifiers(target)
            .into_iter()
            .filter_map(|s| specifier_names(s, source).map(|(_, local)| local.to_string()))
            .collect();
        let mut merged = Vec::new();
        let mut edits = Vec::new();

        for stmt in statements {
            if is_type_only(stmt) {
                continue;
            }
            let Some(module) = import_source(stmt, source) else {
                continue;
            };
            if !config.is_deprecated_error_module(module) {
                continue;
            }
            let Some(clause) = import_clause(stmt) else {
                continue;
            };
            if default_identifier(clause).is_some() || has_namespace_import(clause) {
                continue;
            }
            let Some(list) = named_imports(clause) else {
                continue;
            };

            for spec in specifiers(list) {
                let Some((_, local)) = specifier_names(spec, source) else {
                    continue;
                };
                if !present.iter().any(|p| p == local) {
                    present.push(local.to_string());
                    merged.push(text(spec, source).to_string());
                }
            }
            edits.push(Edit::delete(range_with_newline(stmt, source)));
        }

        if edits.is_empty() {
            return edits;
        }
        if !merged.is_empty() {
            let existing = specifiers(target);
            match existing.last() {
                Some(last) => {
                    let after = &source[last.end_byte()..];
                    let gap = after.len() - after.trim_start().len();
                    let edit = if after.trim_start().starts_with(',') {
                        Edit::insert(last.end_byte() + gap + 1, format!(" {}", merged.join(", ")))
                    } else {
                        Edit::insert(last.end_byte(), format!(", {}", merged.join(", ")))
                    };
                    edits.push(edit);
                }
                None => edits.push(Edit::replace(target, format!("{{ {} }}", merged.join(", ")))),
            }
        }
        edits
    }
}
