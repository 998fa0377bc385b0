//! Error types for the codemod
//!
//! Provides error handling for:
//! - Parse operations (source text → syntax tree)
//! - Rule application (edit composition)
//! - Batch runs (file discovery and write-back)

use std::path::PathBuf;

/// Errors raised while rewriting a single file
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// Source text is not syntactically valid
    #[error("syntax error in {path} at {line}:{column}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Grammar could not be loaded into the parser
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// Two edits produced by one rule overlap
    #[error("rule '{rule}' produced overlapping edits at byte {at}")]
    OverlappingEdits { rule: &'static str, at: usize },

    /// A rule produced output that no longer parses
    #[error("rule '{rule}' produced invalid syntax in {path}")]
    InvalidOutput { rule: &'static str, path: PathBuf },
}

impl RewriteError {
    /// Create a parse failure for path
    pub fn parse(
        path: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Whether the input itself was at fault (as opposed to a rule)
    #[inline]
    #[must_use]
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Errors that abort a whole batch run
///
/// Per-file failures are never raised here; they are collected in
/// [`BatchSummary::failures`](crate::batch::BatchSummary).
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A root path given to the batch does not exist
    #[error("path not found: {0}")]
    RootNotFound(PathBuf),

    /// Directory traversal failed
    #[error("io error walking {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Result type alias for rewrite operations
pub type RewriteResult<T> = Result<T, RewriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = RewriteError::parse("src/a.ts", 3, 7, "unexpected token");
        assert_eq!(
            err.to_string(),
            "syntax error in src/a.ts at 3:7: unexpected token"
        );
        assert!(err.is_parse_failure());
    }

    #[test]
    fn rule_errors_are_not_parse_failures() {
        let err = RewriteError::OverlappingEdits {
            rule: "call-sites",
            at: 10,
        };
        assert!(!err.is_parse_failure());
        assert!(err.to_string().contains("call-sites"));
    }
}
