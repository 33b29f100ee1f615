//! Path-join folding for code generation.
//!
//! `fileJoinSegments(base, [a, b])` becomes the string constant `base/a/b`,
//! with parameters and references rendered as `${name}` expansions. Joins
//! whose operands cannot be rendered are left in place.

use std::collections::HashMap;

use crate::ast::{Arena, Builtin, ExprId, Expression};
use crate::visit::rewrite::{rewrite_children, Rewriter};

fn expand(name: &str) -> String {
    format!("${{{}}}", name)
}

#[derive(Debug, Default)]
pub struct FoldJoinedPaths {
    memo: HashMap<ExprId, ExprId>,
}

impl FoldJoinedPaths {

    fn render(&self, arena: &Arena, id: ExprId) -> Option<String> {
        match arena.get(id) {
            Expression::Constant(constant) => Some(constant.to_string()),
            Expression::Parameter { name } | Expression::Assignment { name, .. } => {
                Some(expand(name))
            }
            Expression::AssignmentReference { assignment } => {
                arena.assignment_name(*assignment).map(expand)
            }
            Expression::Array(elements) => elements
                .iter()
                .map(|element| self.render(arena, *element))
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join("/")),
            Expression::InvokeBuiltin {
                function: Builtin::FileJoinSegments,
                args,
            } => self.render_join(arena, args),
            _ => None,
        }
    }

    fn render_join(&self, arena: &Arena, args: &[ExprId]) -> Option<String> {
        let [base, segments] = args else {
            return None;
        };
        let base = self.render(arena, *base)?;
        let segments = self.render(arena, *segments)?;
        if segments.is_empty() {
            Some(base)
        } else {
            Some(format!("{}/{}", base, segments))
        }
    }
}

impl Rewriter for FoldJoinedPaths {
    fn memo(&mut self) -> &mut HashMap<ExprId, ExprId> {
        &mut self.memo
    }

    fn rewrite_invoke(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        if let Expression::InvokeBuiltin {
            function: Builtin::FileJoinSegments,
            args,
        } = arena.get(id)
        {
            if let Some(folded) = self.render_join(arena, args) {
                return arena.string(folded);
            }
        }
        rewrite_children(self, arena, id)
    }
}
