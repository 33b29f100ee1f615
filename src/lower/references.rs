//! Reference hoisting.
//!
//! The builder places an `Assignment` node directly wherever its value is
//! used. This pass turns every such use into an `AssignmentReference` to one
//! shared definition, which is what scope lifting counts.

use std::collections::HashMap;

use crate::ast::{Arena, ExprId};
use crate::visit::rewrite::{rewrite_children, Rewriter};

#[derive(Debug, Default)]
pub struct HoistReferences {
    memo: HashMap<ExprId, ExprId>,
    definitions: HashMap<ExprId, ExprId>,
}

impl Rewriter for HoistReferences {
    fn memo(&mut self) -> &mut HashMap<ExprId, ExprId> {
        &mut self.memo
    }

    fn rewrite_assignment(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        let definition = self.rewrite_assignment_definition(arena, id);
        arena.reference(definition)
    }

    fn rewrite_assignment_definition(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        if let Some(&done) = self.definitions.get(&id) {
            return done;
        }
        let definition = rewrite_children(self, arena, id);
        self.definitions.insert(id, definition);
        definition
    }
}
