//! Usage analysis
//!
//! Read-only inventory of how a file uses the legacy client: which import
//! forms appear, which HTTP verbs are called through legacy bindings, which
//! preset a migration would pick, and patterns the rewriter cannot handle.

use crate::bindings::{
    import_clause, import_source, is_shadowed, is_type_only, specifier_names, BindingKind, LegacyBindings,
};
use crate::config::RewriteConfig;
use crate::error::RewriteResult;
use crate::syntax::{self, text, VisitFlow, Visitor};
use crate::unit::{FileRole, TransformUnit};
use apimig_core::Preset;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Usage inventory of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    /// Analyzed file
    pub path: PathBuf,
    /// Test files are reported but not inspected
    pub is_test: bool,
    /// Detected role
    pub role: FileRole,
    /// `import apiClient from '@/lib/api'`
    pub default_imports: usize,
    /// `import { apiClient } from '@/lib/api'`
    pub named_imports: usize,
    /// `import { getAuthClient } from '@/lib/api'`
    pub accessor_imports: usize,
    /// Imports from `@/lib/api/<sub>`
    pub submodule_imports: usize,
    /// Imports of the construction function
    pub factory_imports: usize,
    /// HTTP verb calls through legacy bindings, by verb
    pub verb_calls: BTreeMap<String, usize>,
    /// Preset a migration would use
    pub preset: Preset,
    /// Whether the rewriter has work to do
    pub needs_migration: bool,
    /// Patterns that need manual attention
    pub warnings: Vec<String>,
}

impl UsageReport {
    fn empty(unit: &TransformUnit<'_>) -> Self {
        Self {
            path: unit.path().to_path_buf(),
            is_test: unit.is_test(),
            role: unit.role(),
            default_imports: 0,
            named_imports: 0,
            accessor_imports: 0,
            submodule_imports: 0,
            factory_imports: 0,
            verb_calls: BTreeMap::new(),
            preset: unit.preset(),
            needs_migration: false,
            warnings: Vec::new(),
        }
    }

    /// Total verb calls through legacy bindings
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.verb_calls.values().sum()
    }

    /// CSV header matching [`UsageReport::to_csv_row`]
    #[must_use]
    pub fn csv_header() -> &'static str {
        "path,role,preset,default_imports,named_imports,accessor_imports,submodule_imports,factory_imports,calls,needs_migration,warnings"
    }

    /// One CSV row
    #[must_use]
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&self.path.display().to_string()),
            self.role,
            self.preset,
            self.default_imports,
            self.named_imports,
            self.accessor_imports,
            self.submodule_imports,
            self.factory_imports,
            self.total_calls(),
            self.needs_migration,
            csv_field(&self.warnings.join("; ")),
        )
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Analyze one file with the default configuration
///
/// # Errors
/// Returns [`RewriteError::Parse`](crate::RewriteError::Parse) for invalid syntax
pub fn analyze(path: impl AsRef<Path>, source: &str) -> RewriteResult<UsageReport> {
    analyze_with(&RewriteConfig::default(), path.as_ref(), source)
}

/// Analyze one file
///
/// # Errors
/// Returns [`RewriteError::Parse`](crate::RewriteError::Parse) for invalid syntax
pub fn analyze_with(config: &RewriteConfig, path: &Path, source: &str) -> RewriteResult<UsageReport> {
    let unit = TransformUnit::new(path, source, config);
    let mut report = UsageReport::empty(&unit);
    if unit.is_test() {
        return Ok(report);
    }

    let tree = syntax::parse(path, source, unit.dialect())?;
    let bindings = LegacyBindings::collect(&tree, source, config);

    let mut visitor = UsageVisitor {
        config,
        source,
        bindings: &bindings,
        report: &mut report,
        deprecated_imports: 0,
    };
    syntax::walk(&tree, &mut visitor);
    let deprecated = visitor.deprecated_imports;

    report.needs_migration = report.default_imports
        + report.named_imports
        + report.accessor_imports
        + deprecated
        > 0;
    Ok(report)
}

struct UsageVisitor<'c, 's, 'r> {
    config: &'c RewriteConfig,
    source: &'s str,
    bindings: &'r LegacyBindings,
    report: &'r mut UsageReport,
    deprecated_imports: usize,
}

impl UsageVisitor<'_, '_, '_> {
    fn count_import(&mut self, stmt: Node<'_>) {
        if is_type_only(stmt) {
            return;
        }
        let Some(module) = import_source(stmt, self.source) else {
            return;
        };
        let legacy = self.config.is_legacy_module(module);
        if self.config.is_deprecated_error_module(module) {
            self.deprecated_imports += 1;
        }
        if !legacy && module.starts_with(&format!("{}/", self.config.unified_module)) {
            self.report.submodule_imports += 1;
        }

        let Some(clause) = import_clause(stmt) else {
            return;
        };
        let mut cursor = clause.walk();
        for part in clause.named_children(&mut cursor) {
            match part.kind() {
                "identifier" if legacy => self.report.default_imports += 1,
                "named_imports" => {
                    let mut inner = part.walk();
                    for spec in part.named_children(&mut inner) {
                        let Some((name, _)) = specifier_names(spec, self.source) else {
                            continue;
                        };
                        if name == self.config.factory_function {
                            self.report.factory_imports += 1;
                        } else if legacy && name == self.config.client_export {
                            self.report.named_imports += 1;
                        } else if legacy && name == self.config.accessor_export {
                            self.report.accessor_imports += 1;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn inspect_member(&mut self, member: Node<'_>) {
        let (Some(object), Some(property)) = (
            member.child_by_field_name("object"),
            member.child_by_field_name("property"),
        ) else {
            return;
        };
        let property = text(property, self.source);
        let object_text = text(object, self.source);

        if object_text == "axios" && property == "create" {
            self.warn("constructs a transport directly with axios.create");
            return;
        }

        let through_client = object.kind() == "identifier"
            && self.bindings.get_kind(object_text, BindingKind::Client).is_some()
            && !is_shadowed(object, self.source);
        let through_accessor = object.kind() == "call_expression"
            && object
                .child_by_field_name("function")
                .is_some_and(|f| {
                    self.bindings
                        .get_kind(text(f, self.source), BindingKind::Accessor)
                        .is_some()
                        && !is_shadowed(f, self.source)
                });

        if through_client && property == "defaults" {
            self.warn("mutates legacy client defaults");
            return;
        }
        let is_call = member
            .parent()
            .is_some_and(|p| p.kind() == "call_expression" && syntax::is_field_of(member, p, "function"));
        if is_call && (through_client || through_accessor) && self.config.is_http_method(property) {
            *self.report.verb_calls.entry(property.to_string()).or_default() += 1;
        }
    }

    fn warn(&mut self, message: &str) {
        if !self.report.warnings.iter().any(|w| w == message) {
            self.report.warnings.push(message.to_string());
        }
    }
}

impl<'tree> Visitor<'tree> for UsageVisitor<'_, '_, '_> {
    fn enter(&mut self, node: Node<'tree>) -> VisitFlow {
        match node.kind() {
            "import_statement" => {
                self.count_import(node);
                VisitFlow::Skip
            }
            "member_expression" => {
                self.inspect_member(node);
                VisitFlow::Descend
            }
            _ => VisitFlow::Descend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = "\
import apiClient from '@/lib/api';
import { getAuthClient } from '@/lib/api';
import { ApiError } from '@/lib/api/error';
import axios from 'axios';

const raw = axios.create({ baseURL: '/x' });
apiClient.defaults.timeout = 1000;

export async function list() {
  await apiClient.get('/api/v1/admin/users');
  await apiClient.get('/api/v1/admin/roles');
  return getAuthClient().post('/api/v1/admin/audit', {});
}
";

    #[test]
    fn counts_patterns_and_calls() {
        let report = analyze("src/lib/api/users.ts", LEGACY).unwrap();
        assert_eq!(report.default_imports, 1);
        assert_eq!(report.accessor_imports, 1);
        assert_eq!(report.submodule_imports, 1);
        assert_eq!(report.verb_calls.get("get"), Some(&2));
        assert_eq!(report.verb_calls.get("post"), Some(&1));
        assert_eq!(report.total_calls(), 3);
        assert_eq!(report.preset, Preset::Admin);
        assert!(report.needs_migration);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn migrated_file_needs_nothing() {
        let source = "import { createPresetApiClient } from '@/lib/api';\n\
                      export const f = () => createPresetApiClient('auth').get('/me');\n";
        let report = analyze("src/lib/me.ts", source).unwrap();
        assert_eq!(report.factory_imports, 1);
        assert!(!report.needs_migration);
        assert_eq!(report.total_calls(), 0);
    }

    #[test]
    fn tests_are_not_inspected() {
        let report = analyze("src/__tests__/x.ts", "this is not typescript (").unwrap();
        assert!(report.is_test);
        assert!(!report.needs_migration);
    }

    #[test]
    fn csv_quotes_fields() {
        let mut report = analyze("src/a.ts", "export {};\n").unwrap();
        report.warnings = vec!["a, b".into()];
        let row = report.to_csv_row();
        assert!(row.starts_with("src/a.ts,api_module,default,"));
        assert!(row.ends_with(",false,\"a, b\""));
        assert_eq!(
            UsageReport::csv_header().split(',').count(),
            row.matches(',').count()
        );
    }
}
