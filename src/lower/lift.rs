//! Scope lifting.
//!
//! Within one find-module, every assignment is bound by an
//! `AssignmentBlock` around the lowest `IfSwitch`, `Module` or body scope
//! whose references to it account for all of the find-module's references.
//! Scopes are visited bottom-up, so an assignment used only under one branch
//! is computed only on that branch.

use std::collections::{HashMap, HashSet};

use crate::ast::{Arena, ExprId, Expression, FindModule};
use crate::visit::readonly::{contained_references, walk, Visitor};
use crate::visit::rewrite::{rewrite_children, Rewriter};

#[derive(Debug, Default)]
pub struct LiftAssignments {
    memo: HashMap<ExprId, ExprId>,
    /// Assignments already bound by some block.
    captured: HashSet<ExprId>,
    /// Reference counts over the current find-module body.
    function_counts: HashMap<ExprId, usize>,
}

impl LiftAssignments {
    /// Wrap `id` in a block of the assignments it now fully covers.
    fn wrap(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        let block = self.extract_block(arena, id);
        if block.is_empty() {
            id
        } else {
            arena.assignment_block(block, id)
        }
    }

    fn extract_block(&mut self, arena: &Arena, id: ExprId) -> Vec<ExprId> {
        let (order, counts) = reference_counts(arena, id);
        let mut block = Vec::new();
        for assignment in order {
            if self.captured.contains(&assignment) {
                continue;
            }
            let in_function = self.function_counts.get(&assignment).copied().unwrap_or(0);
            let in_scope = counts[&assignment];
            debug_assert!(in_scope <= in_function);
            if in_scope == in_function {
                self.captured.insert(assignment);
                block.push(assignment);
            }
        }
        block
    }
}

impl Rewriter for LiftAssignments {
    fn memo(&mut self) -> &mut HashMap<ExprId, ExprId> {
        &mut self.memo
    }

    fn rewrite_find_module(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        let Expression::FindModule(find) = arena.get(id).clone() else {
            return id;
        };
        self.function_counts = reference_counts(arena, find.body).1;
        self.captured.extend(bound_assignments(arena, find.body));

        let body = self.rewrite(arena, find.body);
        let body = self.wrap(arena, body);
        if body == find.body {
            return id;
        }
        arena.alloc(Expression::FindModule(FindModule { body, ..find }))
    }

    fn rewrite_if_switch(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        let result = rewrite_children(self, arena, id);
        self.wrap(arena, result)
    }

    fn rewrite_module(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        let result = rewrite_children(self, arena, id);
        self.wrap(arena, result)
    }
}

/// Referenced assignments in first-use order, and how often each is referenced.
fn reference_counts(arena: &Arena, id: ExprId) -> (Vec<ExprId>, HashMap<ExprId, usize>) {
    let mut order = Vec::new();
    let mut counts: HashMap<ExprId, usize> = HashMap::new();
    for assignment in contained_references(arena, id) {
        let count = counts.entry(assignment).or_insert(0);
        if *count == 0 {
            order.push(assignment);
        }
        *count += 1;
    }
    (order, counts)
}

/// Assignments bound by any block under `id`.
fn bound_assignments(arena: &Arena, id: ExprId) -> Vec<ExprId> {
    struct Bound(Vec<ExprId>);

    impl Visitor for Bound {
        fn visit_assignment_block(
            &mut self,
            arena: &Arena,
            id: ExprId,
            assignments: &[ExprId],
            _body: ExprId,
        ) {
            self.0.extend_from_slice(assignments);
            walk(self, arena, id);
        }
    }

    let mut bound = Bound(Vec::new());
    bound.visit(arena, id);
    bound.0
}
