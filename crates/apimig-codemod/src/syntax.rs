//! Syntax-tree access
//!
//! Thin layer over tree-sitter: grammar selection, parse-failure reporting, a
//! depth-first [`Visitor`] walk, and byte-range [`Edit`]s applied to the
//! original text so untouched code keeps its exact formatting.

use crate::error::{RewriteError, RewriteResult};
use std::ops::Range;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Grammar flavour selected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `.ts`, `.mts`, `.cts`
    TypeScript,
    /// `.tsx` and the JavaScript family, which may carry JSX
    Tsx,
}

impl Dialect {
    /// Detect dialect from path
    #[inline]
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsx" | "jsx" | "js" | "mjs" | "cjs") => Dialect::Tsx,
            _ => Dialect::TypeScript,
        }
    }

    /// Whether the extension is one the codemod handles
    #[inline]
    #[must_use]
    pub fn is_candidate(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("ts" | "tsx" | "js" | "jsx" | "mts" | "cts" | "mjs" | "cjs")
        )
    }

    fn language(self) -> tree_sitter::Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }
}

/// Parse `source`, failing on any syntax error
///
/// # Errors
/// Returns [`RewriteError::Parse`] with the position of the first error node
pub fn parse(path: &Path, source: &str, dialect: Dialect) -> RewriteResult<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&dialect.language())
        .map_err(|e| RewriteError::ParserInit(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| RewriteError::parse(path, 1, 1, "parser produced no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let (node, message) = first_error(root)
            .map(|n| {
                let msg = if n.is_missing() {
                    format!("missing {}", n.kind())
                } else {
                    "unexpected token".to_string()
                };
                (n, msg)
            })
            .unwrap_or((root, "unexpected token".to_string()));
        let pos = node.start_position();
        return Err(RewriteError::parse(path, pos.row + 1, pos.column + 1, message));
    }

    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find_map(first_error);
    found
}

/// Whether a visitor wants the children of the node it just entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFlow {
    /// Visit children
    Descend,
    /// Skip the subtree
    Skip,
}

/// Depth-first syntax-tree visitor
pub trait Visitor<'tree> {
    /// Called on every node in pre-order
    fn enter(&mut self, node: Node<'tree>) -> VisitFlow;
}

/// Walk `tree` depth-first, pre-order
pub fn walk<'tree, V: Visitor<'tree>>(tree: &'tree Tree, visitor: &mut V) {
    let mut cursor = tree.walk();
    loop {
        let flow = visitor.enter(cursor.node());
        if flow == VisitFlow::Descend && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Text of a node
#[inline]
#[must_use]
pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// Whether `node` sits in `field` of its parent
#[inline]
#[must_use]
pub fn is_field_of(node: Node<'_>, parent: Node<'_>, field: &str) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|n| n.id() == node.id())
}

/// Unquoted value of a `string` node
#[must_use]
pub fn string_value<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    let raw = text(node, source);
    if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Node kinds that open an executable scope
pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "generator_function_declaration",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// Nearest enclosing function-like node
#[must_use]
pub fn enclosing_function(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if FUNCTION_KINDS.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// A replacement of a byte range in the current source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Replaced range (empty for insertions)
    pub range: Range<usize>,
    /// Replacement text
    pub replacement: String,
}

impl Edit {
    /// Replace `node` with `replacement`
    #[inline]
    #[must_use]
    pub fn replace(node: Node<'_>, replacement: impl Into<String>) -> Self {
        Self {
            range: node.byte_range(),
            replacement: replacement.into(),
        }
    }

    /// Insert `text` at byte offset `at`
    #[inline]
    #[must_use]
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            replacement: text.into(),
        }
    }

    /// Delete `range`
    #[inline]
    #[must_use]
    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            replacement: String::new(),
        }
    }
}

/// Apply non-overlapping edits to `source`
///
/// # Errors
/// Returns [`RewriteError::OverlappingEdits`] if two edits overlap
pub fn apply_edits(source: &str, rule: &'static str, mut edits: Vec<Edit>) -> RewriteResult<String> {
    edits.sort_by_key(|e| (e.range.start, e.range.end));

    let mut out = String::with_capacity(source.len() + 64);
    let mut cursor = 0;
    for edit in &edits {
        if edit.range.start < cursor {
            return Err(RewriteError::OverlappingEdits {
                rule,
                at: edit.range.start,
            });
        }
        out.push_str(&source[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Leading whitespace of the line containing `offset`
#[must_use]
pub fn line_indent(source: &str, offset: usize) -> &str {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &source[line_start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// Byte range of `node` extended over one trailing line break
#[must_use]
pub fn range_with_newline(node: Node<'_>, source: &str) -> Range<usize> {
    let range = node.byte_range();
    let rest = &source[range.end..];
    let extra = if rest.starts_with("\r\n") {
        2
    } else if rest.starts_with('\n') {
        1
    } else {
        0
    };
    range.start..range.end + extra
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(source: &str) -> Tree {
        parse(Path::new("a.ts"), source, Dialect::TypeScript).unwrap()
    }

    #[test]
    fn dialect_from_extension() {
        assert_eq!(Dialect::from_path(Path::new("a/Widget.tsx")), Dialect::Tsx);
        assert_eq!(Dialect::from_path(Path::new("a/api.ts")), Dialect::TypeScript);
        assert_eq!(Dialect::from_path(Path::new("a/Button.js")), Dialect::Tsx);
        assert_eq!(Dialect::from_path(Path::new("a/server.cjs")), Dialect::Tsx);
        assert!(Dialect::is_candidate(Path::new("x.jsx")));
        assert!(!Dialect::is_candidate(Path::new("x.css")));
    }

    #[test]
    fn parse_failure_reports_position() {
        let err = parse(
            Path::new("bad.ts"),
            "const a = ;\n",
            Dialect::TypeScript,
        )
        .unwrap_err();
        match err {
            RewriteError::Parse { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tsx_parses_jsx() {
        let source = "export const A = () => <div className=\"x\">hi</div>;\n";
        assert!(parse(Path::new("A.tsx"), source, Dialect::Tsx).is_ok());
    }

    struct KindCounter {
        kind: &'static str,
        count: usize,
    }

    impl<'tree> Visitor<'tree> for KindCounter {
        fn enter(&mut self, node: Node<'tree>) -> VisitFlow {
            if node.kind() == self.kind {
                self.count += 1;
            }
            VisitFlow::Descend
        }
    }

    #[test]
    fn walk_visits_every_node() {
        let tree = ts("function a() { return 1; }\nfunction b() { return 2; }\n");
        let mut counter = KindCounter {
            kind: "return_statement",
            count: 0,
        };
        walk(&tree, &mut counter);
        assert_eq!(counter.count, 2);
    }

    #[test]
    fn edits_apply_in_order() {
        let source = "abc def ghi";
        let edits = vec![
            Edit {
                range: 8..11,
                replacement: "GHI".to_string(),
            },
            Edit::insert(0, ">"),
            Edit {
                range: 4..7,
                replacement: "D".to_string(),
            },
        ];
        assert_eq!(apply_edits(source, "t", edits).unwrap(), ">abc D GHI");
    }

    #[test]
    fn overlapping_edits_rejected() {
        let edits = vec![
            Edit {
                range: 0..5,
                replacement: String::new(),
            },
            Edit {
                range: 3..6,
                replacement: String::new(),
            },
        ];
        assert!(matches!(
            apply_edits("0123456789", "t", edits),
            Err(RewriteError::OverlappingEdits { at: 3, .. })
        ));
    }

    #[test]
    fn indent_of_line() {
        let source = "a\n    b\n";
        assert_eq!(line_indent(source, 6), "    ");
        assert_eq!(line_indent(source, 0), "");
    }
}
