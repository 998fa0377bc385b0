//! Batch driver
//!
//! Discovers candidate files under a set of roots and runs the rewriter (or
//! the analyzer/verifier) over them in parallel. One file failing never stops
//! the others; failures are collected in the summary.

use crate::analysis::{analyze_with, UsageReport};
use crate::error::{BatchError, RewriteError};
use crate::rewriter::Rewriter;
use crate::syntax::Dialect;
use crate::unit::{is_test_path, FileRole};
use crate::verify::{verify_with, VerificationReport};
use apimig_core::Preset;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never descended into
pub const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "build", ".next", ".git"];

/// Whether rewritten files are written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Report only
    #[default]
    DryRun,
    /// Write changed files in place
    Write,
}

/// A file the rewriter changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    /// Changed file
    pub path: PathBuf,
    /// Rules that fired
    pub applied_rules: Vec<&'static str>,
    /// Preset used for synthesized constructions
    pub preset: Preset,
    /// Detected role
    pub role: FileRole,
}

/// A file that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Failing file
    pub path: PathBuf,
    /// Rendered error
    pub message: String,
    /// Whether the input was syntactically invalid
    pub parse_failure: bool,
}

impl BatchFailure {
    fn io(path: &Path, err: &std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            message: err.to_string(),
            parse_failure: false,
        }
    }

    fn rewrite(path: &Path, err: &RewriteError) -> Self {
        Self {
            path: path.to_path_buf(),
            message: err.to_string(),
            parse_failure: err.is_parse_failure(),
        }
    }
}

/// Result of a batch rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Mode the batch ran in
    pub mode: BatchMode,
    /// Candidate files found
    pub scanned: usize,
    /// Files the rewriter changed (written back in [`BatchMode::Write`])
    pub changed: Vec<FileResult>,
    /// Files left as they were
    pub unchanged: usize,
    /// Test files skipped
    pub skipped_tests: usize,
    /// Per-file failures
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    /// Whether every file was processed
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum FileOutcome {
    Changed(FileResult),
    Unchanged,
    SkippedTest,
    Failed(BatchFailure),
}

/// Candidate source files under `roots`, sorted
///
/// # Errors
/// - [`BatchError::RootNotFound`] if a root does not exist
/// - [`BatchError::Walk`] if traversal fails
pub fn discover(roots: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    let mut files = Vec::new();
    for root in roots {
        if !root.exists() {
            return Err(BatchError::RootNotFound(root.clone()));
        }
        let walker = WalkDir::new(root).follow_links(false).into_iter().filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && e.file_name().to_str().is_some_and(|n| SKIPPED_DIRS.contains(&n)))
        });
        for entry in walker {
            let entry = entry.map_err(|source| BatchError::Walk {
                path: root.clone(),
                source,
            })?;
            if entry.file_type().is_file() && Dialect::is_candidate(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Parallel driver over many files
#[derive(Debug, Default)]
pub struct BatchRunner {
    rewriter: Rewriter,
}

impl BatchRunner {
    /// Create a runner around `rewriter`
    #[inline]
    #[must_use]
    pub fn new(rewriter: Rewriter) -> Self {
        Self { rewriter }
    }

    /// Rewrite every candidate under `roots`
    ///
    /// # Errors
    /// Only discovery errors abort the batch
    pub fn run(&self, roots: &[PathBuf], mode: BatchMode) -> Result<BatchSummary, BatchError> {
        let files = discover(roots)?;
        tracing::info!("Rewriting {} candidate files ({:?})", files.len(), mode);

        let outcomes: Vec<FileOutcome> = files
            .par_iter()
            .map(|path| self.process(path, mode))
            .collect();

        let mut summary = BatchSummary {
            mode,
            scanned: files.len(),
            ..BatchSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                FileOutcome::Changed(result) => summary.changed.push(result),
                FileOutcome::Unchanged => summary.unchanged += 1,
                FileOutcome::SkippedTest => summary.skipped_tests += 1,
                FileOutcome::Failed(failure) => summary.failures.push(failure),
            }
        }

        tracing::info!(
            "Batch done: {} changed, {} unchanged, {} tests skipped, {} failed",
            summary.changed.len(),
            summary.unchanged,
            summary.skipped_tests,
            summary.failures.len()
        );
        Ok(summary)
    }

    fn process(&self, path: &Path, mode: BatchMode) -> FileOutcome {
        if is_test_path(path) {
            return FileOutcome::SkippedTest;
        }
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => return FileOutcome::Failed(BatchFailure::io(path, &e)),
        };
        let outcome = match self.rewriter.rewrite(path, &source) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Failed to rewrite {}: {}", path.display(), e);
                return FileOutcome::Failed(BatchFailure::rewrite(path, &e));
            }
        };
        if !outcome.changed {
            return FileOutcome::Unchanged;
        }
        if mode == BatchMode::Write {
            if let Err(e) = std::fs::write(path, &outcome.source) {
                return FileOutcome::Failed(BatchFailure::io(path, &e));
            }
        }
        FileOutcome::Changed(FileResult {
            path: path.to_path_buf(),
            applied_rules: outcome.applied_rules,
            preset: outcome.preset,
            role: outcome.role,
        })
    }

    /// Usage reports for every candidate under `roots`
    ///
    /// # Errors
    /// Only discovery errors abort the batch
    pub fn analyze(
        &self,
        roots: &[PathBuf],
    ) -> Result<(Vec<UsageReport>, Vec<BatchFailure>), BatchError> {
        let config = self.rewriter.config();
        Ok(split(discover(roots)?.par_iter().map(|path| {
            let source = std::fs::read_to_string(path).map_err(|e| BatchFailure::io(path, &e))?;
            analyze_with(config, path, &source).map_err(|e| BatchFailure::rewrite(path, &e))
        })))
    }

    /// Verification reports for every non-test candidate under `roots`
    ///
    /// # Errors
    /// Only discovery errors abort the batch
    pub fn verify(
        &self,
        roots: &[PathBuf],
    ) -> Result<(Vec<VerificationReport>, Vec<BatchFailure>), BatchError> {
        let config = self.rewriter.config();
        let files: Vec<PathBuf> = discover(roots)?
            .into_iter()
            .filter(|p| !is_test_path(p))
            .collect();
        Ok(split(files.par_iter().map(|path| {
            let source = std::fs::read_to_string(path).map_err(|e| BatchFailure::io(path, &e))?;
            verify_with(config, path, &source).map_err(|e| BatchFailure::rewrite(path, &e))
        })))
    }
}

fn split<T: Send>(
    results: impl IndexedParallelIterator<Item = Result<T, BatchFailure>>,
) -> (Vec<T>, Vec<BatchFailure>) {
    let collected: Vec<_> = results.collect();
    let mut ok = Vec::with_capacity(collected.len());
    let mut failed = Vec::new();
    for result in collected {
        match result {
            Ok(value) => ok.push(value),
            Err(failure) => failed.push(failure),
        }
    }
    (ok, failed)
}
