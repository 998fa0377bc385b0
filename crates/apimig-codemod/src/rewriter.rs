//! Rewriter driver
//!
//! Classifies the file, parses it once to collect legacy bindings, then runs
//! the fixed rule set, re-parsing after every rule that changed the text.

use crate::bindings::LegacyBindings;
use crate::config::RewriteConfig;
use crate::error::{RewriteError, RewriteResult};
use crate::rules::{default_rules, RewriteRule};
use crate::syntax::{self, apply_edits};
use crate::unit::{FileRole, TransformUnit};
use apimig_core::Preset;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Result of rewriting one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteOutcome {
    /// Whether `source` differs from the input
    pub changed: bool,
    /// Rewritten source (the input when unchanged)
    pub source: String,
    /// Rules that changed the text, in application order
    pub applied_rules: Vec<&'static str>,
    /// Preset synthesized constructions use
    pub preset: Preset,
    /// Detected role of the file
    pub role: FileRole,
}

/// Source-rewriting transformer
pub struct Rewriter {
    config: RewriteConfig,
    rules: Vec<Box<dyn RewriteRule>>,
}

impl Rewriter {
    /// Create a rewriter with the fixed rule set
    #[must_use]
    pub fn new(config: RewriteConfig) -> Self {
        Self {
            config,
            rules: default_rules(),
        }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Rewrite one file
    ///
    /// Test files are returned unchanged without being parsed.
    ///
    /// # Errors
    /// - [`RewriteError::Parse`] if `source` is not valid syntax
    /// - [`RewriteError::InvalidOutput`] / [`RewriteError::OverlappingEdits`]
    ///   if a rule misbehaves
    pub fn rewrite(&self, path: &Path, source: &str) -> RewriteResult<RewriteOutcome> {
        let unit = TransformUnit::new(path, source, &self.config);
        if unit.is_test() {
            tracing::trace!("Skipping test file {}", path.display());
            return Ok(RewriteOutcome {
                changed: false,
                source: source.to_string(),
                applied_rules: Vec::new(),
                preset: unit.preset(),
                role: unit.role(),
            });
        }

        let mut tree = syntax::parse(path, source, unit.dialect())?;
        let bindings = LegacyBindings::collect(&tree, source, &self.config);
        let unit = unit.with_bindings(bindings);

        let mut current = source.to_string();
        let mut applied = Vec::new();
        for rule in &self.rules {
            let edits = rule.apply(&unit, &self.config, &tree, &current);
            if edits.is_empty() {
                continue;
            }
            let next = apply_edits(&current, rule.name(), edits)?;
            if next == current {
                continue;
            }
            tree = syntax::parse(path, &next, unit.dialect()).map_err(|_| {
                RewriteError::InvalidOutput {
                    rule: rule.name(),
                    path: path.to_path_buf(),
                }
            })?;
            tracing::trace!("Applied rule {} to {}", rule.name(), path.display());
            current = next;
            applied.push(rule.name());
        }

        let changed = current != source;
        if changed {
            tracing::debug!(
                "Rewrote {} with preset {}: {:?}",
                path.display(),
                unit.preset(),
                applied
            );
        }
        Ok(RewriteOutcome {
            changed,
            source: current,
            applied_rules: applied,
            preset: unit.preset(),
            role: unit.role(),
        })
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new(RewriteConfig::default())
    }
}

impl fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rewriter")
            .field("config", &self.config)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Rewrite one file with the default configuration
///
/// # Errors
/// See [`Rewriter::rewrite`]
pub fn rewrite(path: impl AsRef<Path>, source: &str) -> RewriteResult<RewriteOutcome> {
    Rewriter::default().rewrite(path.as_ref(), source)
}
