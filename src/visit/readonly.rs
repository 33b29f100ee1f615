//! Read-only traversal.
//!
//! Each `visit_*` method defaults to [`walk`], which recurses into the
//! node's children. Implementors override the variants they care about and
//! call [`walk`] themselves when they still want the children visited.
//! References are not followed into their assignment by default, so a shared
//! assignment is seen once at its definition.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{Arena, ExprId, Expression, FindModule, FunctionTable, ModuleArchive};
use crate::core::Coordinate;

pub trait Visitor {
    /// Dispatch on the node's variant.
    fn visit(&mut self, arena: &Arena, id: ExprId) {
        match arena.get(id) {
            Expression::FunctionTable(table) => self.visit_function_table(arena, id, table),
            Expression::FindModule(find) => self.visit_find_module(arena, id, find),
            Expression::IfSwitch {
                conditions,
                branches,
                otherwise,
            } => self.visit_if_switch(arena, id, conditions, branches, *otherwise),
            Expression::Module {
                archive,
                dependencies,
            } => self.visit_module(arena, id, *archive, dependencies),
            Expression::ModuleArchive(archive) => self.visit_module_archive(arena, id, archive),
            Expression::Assignment { name, value } => {
                self.visit_assignment(arena, id, name, *value)
            }
            Expression::AssignmentReference { assignment } => {
                self.visit_assignment_reference(arena, id, *assignment)
            }
            Expression::AssignmentBlock { assignments, body } => {
                self.visit_assignment_block(arena, id, assignments, *body)
            }
            Expression::Abort { message, args } => self.visit_abort(arena, id, message, args),
            Expression::Example { source } => self.visit_example(arena, id, source),
            _ => self.visit_other(arena, id),
        }
    }

    fn visit_function_table(&mut self, arena: &Arena, id: ExprId, _table: &FunctionTable) {
        walk(self, arena, id);
    }

    fn visit_find_module(&mut self, arena: &Arena, id: ExprId, _find: &FindModule) {
        walk(self, arena, id);
    }

    fn visit_if_switch(
        &mut self,
        arena: &Arena,
        id: ExprId,
        _conditions: &[ExprId],
        _branches: &[ExprId],
        _otherwise: ExprId,
    ) {
        walk(self, arena, id);
    }

    fn visit_module(
        &mut self,
        arena: &Arena,
        id: ExprId,
        _archive: ExprId,
        _dependencies: &BTreeSet<Coordinate>,
    ) {
        walk(self, arena, id);
    }

    fn visit_module_archive(&mut self, arena: &Arena, id: ExprId, _archive: &ModuleArchive) {
        walk(self, arena, id);
    }

    fn visit_assignment(&mut self, arena: &Arena, id: ExprId, _name: &str, _value: ExprId) {
        walk(self, arena, id);
    }

    fn visit_assignment_reference(&mut self, _arena: &Arena, _id: ExprId, _assignment: ExprId) {}

    fn visit_assignment_block(
        &mut self,
        arena: &Arena,
        id: ExprId,
        _assignments: &[ExprId],
        _body: ExprId,
    ) {
        walk(self, arena, id);
    }

    fn visit_abort(&mut self, arena: &Arena, id: ExprId, _message: &str, _args: &[ExprId]) {
        walk(self, arena, id);
    }

    fn visit_example(&mut self, _arena: &Arena, _id: ExprId, _source: &str) {}

    /// Constants, parameters, invocations, arrays, statement lists, nops
    /// and the global environment.
    fn visit_other(&mut self, arena: &Arena, id: ExprId) {
        walk(self, arena, id);
    }
}

/// Visit the children of `id`, without following references.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, arena: &Arena, id: ExprId) {
    let expression = arena.get(id);
    if let Expression::AssignmentReference { .. } = expression {
        return;
    }
    for child in expression.children() {
        visitor.visit(arena, child);
    }
}

/// Assignments referenced under `id`, one entry per reference, in use order.
///
/// A referenced assignment's own references are recorded before it, so the
/// list is always dependency ordered. Assignment lists of existing blocks are
/// skipped; only the block body counts as use.
pub fn contained_references(arena: &Arena, id: ExprId) -> Vec<ExprId> {
    struct Collector {
        list: Vec<ExprId>,
    }

    impl Visitor for Collector {
        fn visit_assignment_reference(&mut self, arena: &Arena, _id: ExprId, assignment: ExprId) {
            self.visit(arena, assignment);
            self.list.push(assignment);
        }

        fn visit_assignment_block(
            &mut self,
            arena: &Arena,
            _id: ExprId,
            _assignments: &[ExprId],
            body: ExprId,
        ) {
            self.visit(arena, body);
        }
    }

    let mut collector = Collector { list: Vec::new() };
    collector.visit(arena, id);
    collector.list
}

/// Every `Module` node in the table, grouped by the coordinate whose
/// find-module contains it.
pub fn found_modules(arena: &Arena, table: ExprId) -> BTreeMap<Coordinate, Vec<ExprId>> {
    struct Collector {
        current: Option<Coordinate>,
        found: BTreeMap<Coordinate, Vec<ExprId>>,
    }

    impl Visitor for Collector {
        fn visit_find_module(&mut self, arena: &Arena, id: ExprId, find: &FindModule) {
            self.current = Some(find.coordinate);
            self.found.entry(find.coordinate).or_default();
            walk(self, arena, id);
            self.current = None;
        }

        fn visit_module(
            &mut self,
            arena: &Arena,
            id: ExprId,
            _archive: ExprId,
            _dependencies: &BTreeSet<Coordinate>,
        ) {
            if let Some(coordinate) = self.current {
                self.found.entry(coordinate).or_default().push(id);
            }
            walk(self, arena, id);
        }
    }

    let mut collector = Collector {
        current: None,
        found: BTreeMap::new(),
    };
    collector.visit(arena, table);
    collector.found
}

/// The file names of every library any archive in the tree links.
pub fn referenced_library_names(arena: &Arena, root: ExprId) -> BTreeSet<String> {
    struct Collector {
        names: BTreeSet<String>,
    }

    impl Visitor for Collector {
        fn visit_module_archive(&mut self, _arena: &Arena, _id: ExprId, archive: &ModuleArchive) {
            for lib in &archive.libs {
                let name = lib.rsplit('/').next().unwrap_or(lib);
                self.names.insert(name.to_string());
            }
        }
    }

    let mut collector = Collector {
        names: BTreeSet::new(),
    };
    collector.visit(arena, root);
    collector.names
}
