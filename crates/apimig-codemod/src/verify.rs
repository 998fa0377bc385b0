//! Migration verification
//!
//! Post-migration health check of one file. Successes are signs of the unified
//! pattern, issues are leftovers of the legacy one; the status follows from
//! which of the two are present.

use crate::bindings::{BindingKind, LegacyBindings};
use crate::config::RewriteConfig;
use crate::error::RewriteResult;
use crate::rules::prefix::versioned_prefix_len;
use crate::syntax::{self, text, VisitFlow, Visitor};
use crate::unit::TransformUnit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tree_sitter::Node;

/// Comment left on hand-migrated files
pub const MIGRATION_MARKER: &str = "// Migrated to new API client system";

/// Migration state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// No legacy leftovers
    Migrated,
    /// Unified pattern present alongside legacy leftovers
    Partial,
    /// Legacy leftovers only
    Failed,
    /// Mentions the API layer but shows neither pattern
    Unknown,
}

impl MigrationStatus {
    /// Derive status from the findings
    #[must_use]
    pub fn derive(has_issues: bool, has_successes: bool, mentions_api: bool) -> Self {
        match (has_issues, has_successes) {
            (true, true) => MigrationStatus::Partial,
            (true, false) => MigrationStatus::Failed,
            (false, false) if mentions_api => MigrationStatus::Unknown,
            _ => MigrationStatus::Migrated,
        }
    }

    /// Lowercase name
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MigrationStatus::Migrated => "migrated",
            MigrationStatus::Partial => "partial",
            MigrationStatus::Failed => "failed",
            MigrationStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification result of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Verified file
    pub path: PathBuf,
    /// Derived status
    pub status: MigrationStatus,
    /// Legacy leftovers
    pub issues: Vec<String>,
    /// Unified-pattern evidence
    pub successes: Vec<String>,
}

/// Verify one file with the default configuration
///
/// # Errors
/// Returns [`RewriteError::Parse`](crate::RewriteError::Parse) for invalid syntax
pub fn verify(path: impl AsRef<Path>, source: &str) -> RewriteResult<VerificationReport> {
    verify_with(&RewriteConfig::default(), path.as_ref(), source)
}

/// Verify one file
///
/// # Errors
/// Returns [`RewriteError::Parse`](crate::RewriteError::Parse) for invalid syntax
pub fn verify_with(
    config: &RewriteConfig,
    path: &Path,
    source: &str,
) -> RewriteResult<VerificationReport> {
    let unit = TransformUnit::new(path, source, config);
    let tree = syntax::parse(path, source, unit.dialect())?;
    let bindings = LegacyBindings::collect(&tree, source, config);

    let mut findings = Findings {
        config,
        source,
        bindings: &bindings,
        factory_calls: 0,
        accessor_calls: 0,
        hardcoded_prefixes: 0,
        module_level_constructions: 0,
    };
    syntax::walk(&tree, &mut findings);

    let mut issues = Vec::new();
    let mut successes = Vec::new();

    if findings.factory_calls > 0 || bindings.factory_local().is_some() {
        successes.push(format!("uses {}", config.factory_function));
    }
    if source.contains(MIGRATION_MARKER) {
        successes.push("carries migration marker".to_string());
    }

    if findings.accessor_calls > 0 {
        issues.push(format!(
            "{}() still called {} time(s)",
            config.accessor_export, findings.accessor_calls
        ));
    }
    let legacy_clients = bindings
        .iter()
        .filter(|b| b.kind == BindingKind::Client)
        .count();
    if legacy_clients > 0 {
        issues.push("legacy client import remains".to_string());
    }
    if findings.hardcoded_prefixes > 0 {
        issues.push(format!(
            "{} literal(s) hard-code a versioned /api prefix",
            findings.hardcoded_prefixes
        ));
    }
    if findings.module_level_constructions > 0 {
        issues.push("client constructed at module level".to_string());
    }

    let status = MigrationStatus::derive(!issues.is_empty(), !successes.is_empty(), source.contains("api"));
    tracing::debug!("Verified {}: {}", path.display(), status);

    Ok(VerificationReport {
        path: path.to_path_buf(),
        status,
        issues,
        successes,
    })
}

struct Findings<'c, 's, 'b> {
    config: &'c RewriteConfig,
    source: &'s str,
    bindings: &'b LegacyBindings,
    factory_calls: usize,
    accessor_calls: usize,
    hardcoded_prefixes: usize,
    module_level_constructions: usize,
}

impl Findings<'_, '_, '_> {
    fn factory_name(&self) -> &str {
        self.bindings
            .factory_local()
            .unwrap_or(self.config.factory_function.as_str())
    }

    fn is_factory_call(&self, node: Node<'_>) -> bool {
        node.kind() == "call_expression"
            && node
                .child_by_field_name("function")
                .is_some_and(|f| text(f, self.source) == self.factory_name())
    }

    /// `const apiClient = createPresetApiClient(...)` directly under `program`
    fn check_module_level(&mut self, decl: Node<'_>) {
        let mut cursor = decl.walk();
        let constructs = decl.named_children(&mut cursor).any(|declarator| {
            declarator
                .child_by_field_name("value")
                .is_some_and(|v| self.is_factory_call(v))
        });
        if constructs {
            self.module_level_constructions += 1;
        }
    }
}

impl<'tree> Visitor<'tree> for Findings<'_, '_, '_> {
    fn enter(&mut self, node: Node<'tree>) -> VisitFlow {
        match node.kind() {
            "import_statement" => return VisitFlow::Skip,
            "lexical_declaration" | "variable_declaration"
                if node.parent().is_some_and(|p| p.kind() == "program") =>
            {
                self.check_module_level(node);
            }
            "call_expression" => {
                if self.is_factory_call(node) {
                    self.factory_calls += 1;
                }
                let calls_accessor = node.child_by_field_name("function").is_some_and(|f| {
                    f.kind() == "identifier"
                        && (text(f, self.source) == self.config.accessor_export
                            || self
                                .bindings
                                .get_kind(text(f, self.source), BindingKind::Accessor)
                                .is_some())
                });
                if calls_accessor {
                    self.accessor_calls += 1;
                }
            }
            "string" | "template_string" => {
                let raw = text(node, self.source);
                let prefixed = raw
                    .get(1..)
                    .and_then(versioned_prefix_len)
                    .is_some_and(|len| raw[1 + len..].starts_with('/'));
                if prefixed {
                    self.hardcoded_prefixes += 1;
                }
                return VisitFlow::Skip;
            }
            _ => {}
        }
        VisitFlow::Descend
    }
}
