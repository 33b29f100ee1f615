//! C++ language-standard lowering.
//!
//! A module whose archive requires language features becomes
//!
//! ```text
//! module
//!   if(supportsCompilerFeatures()) requiresCompilerFeatures([features])
//!   else requireMinimumCxxCompilerStandard(level)
//!   archive without requires
//! end_module
//! ```
//!
//! where `level` is the lowest standard providing every feature.

use std::collections::HashMap;

use crate::ast::{Arena, ExprId, Expression, ModuleArchive};
use crate::core::cxx::minimum_standard;
use crate::visit::rewrite::{rewrite_children, Rewriter};

#[derive(Debug, Default)]
pub struct LowerCxxStandard {
    memo: HashMap<ExprId, ExprId>,
}

impl Rewriter for LowerCxxStandard {
    fn memo(&mut self) -> &mut HashMap<ExprId, ExprId> {
        &mut self.memo
    }

    fn rewrite_module(&mut self, arena: &mut Arena, id: ExprId) -> ExprId {
        let Expression::Module {
            archive,
            dependencies,
        } = arena.get(id).clone()
        else {
            return id;
        };
        let Expression::ModuleArchive(module_archive) = arena.get(archive).clone() else {
            return rewrite_children(self, arena, id);
        };
        if module_archive.requires.is_empty() {
            return id;
        }

        let standard = minimum_standard(&module_archive.requires);
        let features = module_archive
            .requires
            .iter()
            .map(|feature| arena.feature(*feature))
            .collect();
        let features = arena.array(features);
        let supports = arena.supports_compiler_features();
        let request = arena.requires_compiler_features(features);
        let level = arena.integer(standard.level());
        let minimum = arena.require_minimum_cxx_standard(level);
        let choice = arena.if_switch(vec![supports], vec![request], minimum);

        let stripped = arena.alloc(Expression::ModuleArchive(ModuleArchive {
            requires: Vec::new(),
            ..module_archive
        }));
        let body = arena.multi(vec![choice, stripped]);
        arena.module(body, dependencies)
    }
}
