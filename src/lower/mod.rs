//! Tree-to-tree passes.
//!
//! The builder runs [`hoist_references`] then [`lift_assignments`]. Code
//! generators additionally run [`lower_cxx_standard`] and
//! [`fold_joined_paths`] on their own copy of the table. Every pass appends
//! to the arena and returns a new root, so the previous root stays valid.

pub mod cxx_standard;
pub mod join_paths;
pub mod lift;
pub mod references;

use crate::ast::Ast;
use crate::visit::Rewriter;

fn apply<R: Rewriter>(mut ast: Ast, mut pass: R) -> Ast {
    ast.root = pass.rewrite(&mut ast.arena, ast.root);
    ast
}

/// Replace inline assignments with references to a single definition.
pub fn hoist_references(ast: Ast) -> Ast {
    apply(ast, references::HoistReferences::default())
}

/// Bind each assignment in the lowest scope that covers all of its uses.
pub fn lift_assignments(ast: Ast) -> Ast {
    apply(ast, lift::LiftAssignments::default())
}

/// Replace archive feature lists with a feature-request or minimum-standard branch.
pub fn lower_cxx_standard(ast: Ast) -> Ast {
    apply(ast, cxx_standard::LowerCxxStandard::default())
}

/// Collapse path joins into string templates with `${name}` placeholders.
pub fn fold_joined_paths(ast: Ast) -> Ast {
    apply(ast, join_paths::FoldJoinedPaths::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Coordinate, ResolvedManifest};
    use crate::finder::FunctionTableBuilder;
    use crate::test_support::fixtures;
    use crate::visit::{interpret, Bindings, Environment, InterpretError, ResolvedArchive, Value};

    fn bindings(ast: &Ast) -> Vec<Bindings> {
        let g = *ast.globals().unwrap();
        let mut all = Vec::new();
        for runtime in ["c++_shared", "gnustl_static", "none", "stlport_shared"] {
            for level in [9, 12, 16, 21, 28] {
                for abi in ["x86", "x86_64", "mips"] {
                    all.push(Bindings::android(g, level, runtime, abi));
                }
            }
        }
        for sdk in ["iPhoneOS9.3", "iPhoneOS10.2", "iPhoneSimulator10.0", "MacOSX10.12"] {
            for arches in [&["armv7"][..], &["arm64"], &["armv7", "arm64"]] {
                let sysroot = format!("/SDKs/{}.sdk", sdk);
                all.push(Bindings::darwin(g, &sysroot, arches));
            }
        }
        all.push(Bindings::linux(g));
        all.push(Bindings::system(g, "Windows"));
        all.into_iter()
            .map(|b| b.with_exploded_root("/exploded"))
            .collect()
    }

    fn outcome<E: Environment>(
        ast: &Ast,
        coordinate: Coordinate,
        env: &E,
    ) -> Result<Value, InterpretError> {
        let (id, _) = ast.find_module(coordinate).unwrap();
        interpret(&ast.arena, env, id)
    }

    fn selected(result: Result<Value, InterpretError>) -> Result<Vec<ResolvedArchive>, InterpretError> {
        let value = result?;
        Ok(value.archives().into_iter().cloned().collect())
    }

    fn all_manifests() -> Vec<Vec<ResolvedManifest>> {
        vec![
            vec![fixtures::android_manifest()],
            vec![fixtures::ios_manifest()],
            vec![fixtures::header_only_manifest()],
            vec![fixtures::linux_manifest()],
            vec![fixtures::header_only_manifest(), fixtures::dependent_manifest()],
        ]
    }

    #[test]
    fn test_lowering_preserves_interpretation() {
        for manifests in all_manifests() {
            let coordinates: Vec<Coordinate> = manifests.iter().map(|m| m.coordinate()).collect();
            let mut builder = FunctionTableBuilder::new();
            for manifest in manifests {
                builder.add_manifest(manifest);
            }
            let raw = builder.build_unlowered();
            let lifted = lift_assignments(hoist_references(raw.clone()));

            for env in bindings(&raw) {
                for coordinate in &coordinates {
                    assert_eq!(
                        outcome(&lifted, *coordinate, &env),
                        outcome(&raw, *coordinate, &env),
                        "{}",
                        coordinate
                    );
                }
            }
        }
    }

    #[test]
    fn test_cxx_lowering_preserves_selected_archives() {
        let manifest = fixtures::requires_manifest();
        let coordinate = manifest.coordinate();
        let mut builder = FunctionTableBuilder::new();
        builder.add_manifest(manifest);
        let ast = builder.build().unwrap();
        let lowered = lower_cxx_standard(ast.clone());

        for env in bindings(&ast) {
            assert_eq!(
                selected(outcome(&lowered, coordinate, &env)),
                selected(outcome(&ast, coordinate, &env))
            );
        }
    }
}
