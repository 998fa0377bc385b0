//! Rule 3: scope-aware call-site rewriting
//!
//! Every `apiClient.<verb>(...)` is redirected to a client constructed in the
//! nearest enclosing function body. The first call site in a body either
//! reuses an earlier `const x = createPresetApiClient(...)` or plans one
//! inserted right after the opening brace and any directive prologue
//! (`'use server';`); later call sites in the same body
//! share that plan. Plans are keyed by the body's node id.
//!
//! Call sites with no block-bodied function around them (module level,
//! expression-bodied arrows) get the construction call inlined.

use super::{factory_call, factory_name, RewriteRule};
use crate::bindings::{is_rewritable_client_ref, is_shadowed, BindingKind};
use crate::config::RewriteConfig;
use crate::syntax::{self, enclosing_function, line_indent, text, Edit, VisitFlow, Visitor};
use crate::unit::TransformUnit;
use std::collections::{HashMap, HashSet};
use tree_sitter::{Node, Tree};

/// Fallback name after the configured one
const SECONDARY_NAME: &str = "presetClient";

/// Rule 3: `apiClient.get(...)` → `client.get(...)`
#[derive(Debug, Clone, Copy, Default)]
pub struct CallSiteRule;

impl RewriteRule for CallSiteRule {
    fn name(&self) -> &'static str {
        "call-sites"
    }

    fn apply(
        &self,
        unit: &TransformUnit<'_>,
        config: &RewriteConfig,
        tree: &Tree,
        source: &str,
    ) -> Vec<Edit> {
        let has_clients = unit
            .bindings()
            .iter()
            .any(|b| b.kind == BindingKind::Client && b.rewritable > 0);
        if !has_clients {
            return Vec::new();
        }

        let mut visitor = CallSiteVisitor {
            unit,
            config,
            source,
            scopes: HashMap::new(),
            edits: Vec::new(),
        };
        syntax::walk(tree, &mut visitor);
        visitor.edits
    }
}

struct CallSiteVisitor<'u, 'a, 's> {
    unit: &'u TransformUnit<'a>,
    config: &'u RewriteConfig,
    source: &'s str,
    /// Planned local name per function body, keyed by node id
    scopes: HashMap<usize, String>,
    edits: Vec<Edit>,
}

impl<'tree> Visitor<'tree> for CallSiteVisitor<'_, '_, '_> {
    fn enter(&mut self, node: Node<'tree>) -> VisitFlow {
        match node.kind() {
            "import_statement" => return VisitFlow::Skip,
            "identifier" => {}
            _ => return VisitFlow::Descend,
        }

        let name = text(node, self.source);
        let is_client = self
            .unit
            .bindings()
            .get_kind(name, BindingKind::Client)
            .is_some();
        if !is_client
            || !is_rewritable_client_ref(node, self.source, self.config)
            || is_shadowed(node, self.source)
        {
            return VisitFlow::Skip;
        }

        let body = enclosing_function(node)
            .and_then(|f| f.child_by_field_name("body"))
            .filter(|b| b.kind() == "statement_block" && b.byte_range().contains(&node.start_byte()));

        let replacement = match body {
            Some(block) => self.local_for(block, node),
            None => factory_call(self.unit, self.config, self.unit.preset().as_str()),
        };
        self.edits.push(Edit::replace(node, replacement));
        VisitFlow::Skip
    }
}

impl CallSiteVisitor<'_, '_, '_> {
    /// Local client name for a call site inside `block`
    fn local_for(&mut self, block: Node<'_>, call_site: Node<'_>) -> String {
        if let Some(existing) = self.existing_construction(block, call_site) {
            return existing;
        }
        if let Some(planned) = self.scopes.get(&block.id()) {
            return planned.clone();
        }

        let local = self.fresh_name(block);
        if !self.plan_insertion(block, &local) {
            return factory_call(self.unit, self.config, self.unit.preset().as_str());
        }
        tracing::trace!("Planned {} construction in scope {}", local, block.id());
        self.scopes.insert(block.id(), local.clone());
        local
    }

    /// `const x = createPresetApiClient(...)` directly in `block`, ending
    /// before `call_site`
    fn existing_construction(&self, block: Node<'_>, call_site: Node<'_>) -> Option<String> {
        let factory = factory_name(self.unit, self.config);
        let mut cursor = block.walk();
        let found = block
            .named_children(&mut cursor)
            .filter(|stmt| {
                matches!(stmt.kind(), "lexical_declaration" | "variable_declaration")
                    && stmt.end_byte() <= call_site.start_byte()
            })
            .find_map(|stmt| {
                let mut inner = stmt.walk();
                let name = stmt.named_children(&mut inner).find_map(|decl| {
                    let name = decl.child_by_field_name("name")?;
                    let value = decl.child_by_field_name("value")?;
                    let callee = value.child_by_field_name("function")?;
                    (decl.kind() == "variable_declarator"
                        && name.kind() == "identifier"
                        && value.kind() == "call_expression"
                        && text(callee, self.source) == factory)
                        .then(|| text(name, self.source).to_string())
                });
                name
            });
        found
    }

    /// First candidate name not used anywhere in `block`
    fn fresh_name(&self, block: Node<'_>) -> String {
        let mut used = HashSet::new();
        collect_identifiers(block, self.source, &mut used);

        let preferred = self.config.local_client_name.as_str();
        [preferred, SECONDARY_NAME]
            .into_iter()
            .map(str::to_string)
            .chain((2..).map(|n| format!("{preferred}{n}")))
            .find(|candidate| !used.contains(candidate.as_str()))
            .unwrap_or_else(|| preferred.to_string())
    }

    fn plan_insertion(&mut self, block: Node<'_>, local: &str) -> bool {
        let Some(brace) = block.child(0).filter(|c| c.kind() == "{") else {
            return false;
        };
        let declaration = format!(
            "const {local} = {};",
            factory_call(self.unit, self.config, self.unit.preset().as_str())
        );

        // Directives only count while they lead the body
        let prologue = directive_prologue_end(block);
        let anchor = prologue.unwrap_or(brace);
        let insertion = match anchor.next_named_sibling() {
            Some(next) if next.start_position().row > anchor.end_position().row => {
                let indent = line_indent(self.source, next.start_byte());
                format!("\n{indent}{declaration}")
            }
            None if prologue.is_some() => {
                let indent = line_indent(self.source, anchor.start_byte());
                format!("\n{indent}{declaration}")
            }
            _ => format!(" {declaration}"),
        };
        self.edits.push(Edit::insert(anchor.end_byte(), insertion));
        true
    }
}

/// Last statement of the leading `'use ...';` directives of `block`
fn directive_prologue_end(block: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = block.walk();
    let mut last = None;
    for stmt in block.named_children(&mut cursor) {
        match stmt.kind() {
            "comment" => {}
            "expression_statement"
                if stmt.named_child_count() == 1 && stmt.named_child(0).is_some_and(|e| e.kind() == "string") =>
            {
                last = Some(stmt);
            }
            _ => break,
        }
    }
    last
}

fn collect_identifiers<'s>(node: Node<'_>, source: &'s str, out: &mut HashSet<&'s str>) {
    if matches!(
        node.kind(),
        "identifier" | "shorthand_property_identifier" | "shorthand_property_identifier_pattern"
    ) {
        out.insert(text(node, source));
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_identifiers(child, source, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::LegacyBindings;
    use crate::syntax::{apply_edits, parse, Dialect};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn run(path: &str, source: &str) -> String {
        let config = RewriteConfig::default();
        let path = Path::new(path);
        let tree = parse(path, source, Dialect::from_path(path)).unwrap();
        let unit = TransformUnit::new(path, source, &config)
            .with_bindings(LegacyBindings::collect(&tree, source, &config));
        let edits = CallSiteRule.apply(&unit, &config, &tree, source);
        apply_edits(source, "call-sites", edits).unwrap()
    }

    #[test]
    fn inserts_once_per_scope() {
        let source = "\
import apiClient from '@/lib/api';
export async function load() {
  const a = await apiClient.get('/a');
  const b = await apiClient.post('/b', {});
  return [a, b];
}
";
        let expected = "\
import apiClient from '@/lib/api';
export async function load() {
  const client = createPresetApiClient('default');
  const a = await client.get('/a');
  const b = await client.post('/b', {});
  return [a, b];
}
";
        assert_eq!(run("lib/load.ts", source), expected);
    }

    #[test]
    fn separate_scopes_get_separate_constructions() {
        let source = "\
import apiClient from '@/lib/api';
export const a = async () => {
  return apiClient.get('/a');
};
export const b = async () => {
  return apiClient.get('/b');
};
";
        let out = run("app/auth/x.ts", source);
        assert_eq!(out.matches("const client = createPresetApiClient('auth');").count(), 2);
    }

    #[test]
    fn reuses_existing_construction() {
        let source = "\
import { apiClient, createPresetApiClient } from '@/lib/api';
export async function f() {
  const http = createPresetApiClient('admin');
  return apiClient.get('/x');
}
";
        let out = run("lib/f.ts", source);
        assert!(out.contains("return http.get('/x');"));
        assert_eq!(out.matches("createPresetApiClient(").count(), 1);
    }

    #[test]
    fn avoids_name_collisions() {
        let source = "\
import apiClient from '@/lib/api';
export function f(client: string) {
  return apiClient.get(client);
}
";
        let out = run("lib/f.ts", source);
        assert!(out.contains("const presetClient = createPresetApiClient('default');"));
        assert!(out.contains("return presetClient.get(client);"));
    }

    #[test]
    fn expression_bodied_arrow_is_inlined() {
        let source = "import apiClient from '@/lib/api';\nexport const f = () => apiClient.get('/x');\n";
        let out = run("lib/f.ts", source);
        assert!(out.contains("export const f = () => createPresetApiClient('default').get('/x');"));
    }

    #[test]
    fn construction_follows_directive_prologue() {
        let source = "\
import apiClient from '@/lib/api';
export async function save(x: number) {
  'use server';
  // persisted
  return apiClient.post('/items', { x });
}
";
        let expected = "\
import apiClient from '@/lib/api';
export async function save(x: number) {
  'use server';
  const client = createPresetApiClient('default');
  // persisted
  return client.post('/items', { x });
}
";
        assert_eq!(run("app/actions.ts", source), expected);

        let inline = "import apiClient from '@/lib/api';\nfunction f() { 'use strict'; return apiClient.get('/x'); }\n";
        assert!(run("lib/f.ts", inline).contains(
            "function f() { 'use strict'; const client = createPresetApiClient('default'); return client.get('/x'); }"
        ));
    }

    #[test]
    fn shadowed_client_is_left_alone() {
        let source = "\
import apiClient from '@/lib/api';
export function withMock(apiClient: any) {
  return apiClient.get('/b');
}
export function inner() {
  const apiClient = makeStub();
  return apiClient.get('/c');
}
export function real() {
  return apiClient.get('/d');
}
";
        let expected = "\
import apiClient from '@/lib/api';
export function withMock(apiClient: any) {
  return apiClient.get('/b');
}
export function inner() {
  const apiClient = makeStub();
  return apiClient.get('/c');
}
export function real() {
  const client = createPresetApiClient('default');
  return client.get('/d');
}
";
        assert_eq!(run("lib/mock.ts", source), expected);
    }

    #[test]
    fn single_line_block() {
        let source = "import apiClient from '@/lib/api';\nfunction f() { return apiClient.get('/x'); }\n";
        let out = run("lib/f.ts", source);
        assert!(out.contains(
            "function f() { const client = createPresetApiClient('default'); return client.get('/x'); }"
        ));
    }
}
