//! Rule 4: `getAuthClient()` → `createPresetApiClient('auth')`

use super::{factory_call, RewriteRule};
use crate::bindings::{is_rewritable_accessor_ref, is_shadowed, BindingKind};
use crate::config::RewriteConfig;
use crate::syntax::{self, text, Edit, VisitFlow, Visitor};
use crate::unit::TransformUnit;
use apimig_core::Preset;
use tree_sitter::{Node, Tree};

/// Rule 4: bare accessor calls become auth-preset constructions
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessorRule;

impl RewriteRule for AccessorRule {
    fn name(&self) -> &'static str {
        "auth-accessor"
    }

    fn apply(
        &self,
        unit: &TransformUnit<'_>,
        config: &RewriteConfig,
        tree: &Tree,
        source: &str,
    ) -> Vec<Edit> {
        let has_accessor = unit
            .bindings()
            .iter()
            .any(|b| b.kind == BindingKind::Accessor && b.rewritable > 0);
        if !has_accessor {
            return Vec::new();
        }

        let mut visitor = AccessorVisitor {
            unit,
            source,
            replacement: factory_call(unit, config, Preset::Auth.as_str()),
            edits: Vec::new(),
        };
        syntax::walk(tree, &mut visitor);
        visitor.edits
    }
}

struct AccessorVisitor<'u, 'a, 's> {
    unit: &'u TransformUnit<'a>,
    source: &'s str,
    replacement: String,
    edits: Vec<Edit>,
}

impl<'tree> Visitor<'tree> for AccessorVisitor<'_, '_, '_> {
    fn enter(&mut self, node: Node<'tree>) -> VisitFlow {
        match node.kind() {
            "import_statement" => VisitFlow::Skip,
            "identifier" => {
                let is_accessor = self
                    .unit
                    .bindings()
                    .get_kind(text(node, self.source), BindingKind::Accessor)
                    .is_some();
                if is_accessor && is_rewritable_accessor_ref(node) && !is_shadowed(node, self.source) {
                    if let Some(call) = node.parent() {
                        self.edits.push(Edit::replace(call, self.replacement.clone()));
                    }
                }
                VisitFlow::Skip
            }
            _ => VisitFlow::Descend,
        }
    }
}
