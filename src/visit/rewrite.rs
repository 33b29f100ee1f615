//! Identity-preserving rewrites.
//!
//! A [`Rewriter`] maps each source node id to a result id at most once; a
//! node reached again through another path gets the memoized result. A node
//! whose children all rewrite to themselves is returned as is, so untouched
//! subtrees keep their identity across passes.

use std::collections::HashMap;

use crate::ast::{Arena, ExprId, Expression, FindModule, FunctionTable, GlobalEnv, ModuleArchive};

pub trait Rewriter {
    /// Memo table from source id to rewritten id.
    fn memo(&mut self) -> &mut HashMap<ExprId, ExprId>;

    fn rewrite(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        if let Some(&done) = self.memo().get(&id) {
            return done;
        }
        let result = self.rewrite_node(arena, id);
        self.memo().insert(id, result);
        result
    }

    /// Dispatch on the node's variant. Not memoized; call [`Rewriter::rewrite`].
    fn rewrite_node(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        match arena.get(id) {
            Expression::FindModule(_) => self.rewrite_find_module(arena, id),
            Expression::IfSwitch { .. } => self.rewrite_if_switch(arena, id),
            Expression::Module { .. } => self.rewrite_module(arena, id),
            Expression::InvokeBuiltin { .. } => self.rewrite_invoke(arena, id),
            Expression::Assignment { .. } => self.rewrite_assignment(arena, id),
            Expression::AssignmentReference { assignment } => {
                let assignment = *assignment;
                let target = self.rewrite_assignment_definition(arena, assignment);
                if target == assignment {
                    id
                } else {
                    arena.reference(target)
                }
            }
            Expression::AssignmentBlock { .. } => {
                let Expression::AssignmentBlock { assignments, body } = arena.get(id).clone()
                else {
                    return id;
                };
                let rewritten: Vec<ExprId> = assignments
                    .iter()
                    .map(|a| self.rewrite_assignment_definition(arena, *a))
                    .collect();
                let new_body = self.rewrite(arena, body);
                if rewritten == assignments && new_body == body {
                    id
                } else {
                    arena.assignment_block(rewritten, new_body)
                }
            }
            _ => rewrite_children(self, arena, id),
        }
    }

    fn rewrite_find_module(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        rewrite_children(self, arena, id)
    }

    fn rewrite_if_switch(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        rewrite_children(self, arena, id)
    }

    fn rewrite_module(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        rewrite_children(self, arena, id)
    }

    fn rewrite_invoke(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        rewrite_children(self, arena, id)
    }

    /// An assignment met in expression position.
    fn rewrite_assignment(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        rewrite_children(self, arena, id)
    }

    /// The assignment a reference or block points at.
    fn rewrite_assignment_definition(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        self.rewrite(arena, id)
    }
}

/// Rebuild `id` from its rewritten children, or return `id` if none changed.
pub fn rewrite_children<R: Rewriter + ?Sized>(
    rewriter: &mut R,
    arena: &mut Arena,
    id: ExprId,
) -> ExprId {
    let node = arena.get(id).clone();
    let rebuilt = map_children(&node, &mut |child| rewriter.rewrite(arena, child));
    if rebuilt == node {
        id
    } else {
        arena.alloc(rebuilt)
    }
}

/// Copy of `expression` with every child id passed through `f`.
pub fn map_children(expression: &Expression, f: &mut dyn FnMut(ExprId) -> ExprId) -> Expression {
    let mut all = |ids: &[ExprId]| -> Vec<ExprId> { ids.iter().map(|id| f(*id)).collect() };
    match expression {
        Expression::Constant(_)
        | Expression::Parameter { .. }
        | Expression::Nop
        | Expression::Example { .. } => expression.clone(),
        Expression::Assignment { name, value } => Expression::Assignment {
            name: name.clone(),
            value: all(&[*value])[0],
        },
        Expression::AssignmentReference { assignment } => Expression::AssignmentReference {
            assignment: all(&[*assignment])[0],
        },
        Expression::InvokeBuiltin { function, args } => Expression::InvokeBuiltin {
            function: *function,
            args: all(args),
        },
        Expression::IfSwitch {
            conditions,
            branches,
            otherwise,
        } => {
            let conditions = all(conditions);
            let branches = all(branches);
            Expression::IfSwitch {
                conditions,
                branches,
                otherwise: all(&[*otherwise])[0],
            }
        }
        Expression::MultiStatement(statements) => Expression::MultiStatement(all(statements)),
        Expression::Abort { message, args } => Expression::Abort {
            message: message.clone(),
            args: all(args),
        },
        Expression::Array(elements) => Expression::Array(all(elements)),
        Expression::ModuleArchive(archive) => {
            let include_path = archive.include_path.map(|p| all(&[p])[0]);
            Expression::ModuleArchive(ModuleArchive {
                include_path,
                library_paths: all(&archive.library_paths),
                ..archive.clone()
            })
        }
        Expression::Module {
            archive,
            dependencies,
        } => Expression::Module {
            archive: all(&[*archive])[0],
            dependencies: dependencies.clone(),
        },
        Expression::AssignmentBlock { assignments, body } => {
            let assignments = all(assignments);
            Expression::AssignmentBlock {
                assignments,
                body: all(&[*body])[0],
            }
        }
        Expression::FindModule(find) => {
            let globals = all(&[find.globals])[0];
            Expression::FindModule(FindModule {
                globals,
                body: all(&[find.body])[0],
                ..find.clone()
            })
        }
        Expression::FunctionTable(table) => {
            let globals = all(&[table.globals])[0];
            let find_functions = table
                .find_functions
                .iter()
                .map(|(coordinate, id)| (*coordinate, all(&[*id])[0]))
                .collect();
            let examples = table
                .examples
                .iter()
                .map(|(coordinate, id)| (*coordinate, all(&[*id])[0]))
                .collect();
            Expression::FunctionTable(FunctionTable {
                globals,
                find_functions,
                examples,
            })
        }
        Expression::GlobalEnv(globals) => {
            let p = all(&globals.parameters());
            Expression::GlobalEnv(GlobalEnv {
                exploded_root: p[0],
                target_system: p[1],
                target_platform: p[2],
                android_abi: p[3],
                android_runtime: p[4],
                osx_sysroot: p[5],
                osx_architectures: p[6],
                cxx_standard: p[7],
                none_runtime: p[8],
            })
        }
    }
}
