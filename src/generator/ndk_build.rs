//! ndk-build generator.
//!
//! ndk-build has no function bodies to carry the decision tree, so the
//! fragment is a flat list of Makefile rules: one per library file any
//! archive can produce, each fetching that archive when make needs the file.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::ast::{Arena, Ast, Builtin, ExprId, Expression, FindModule, GlobalEnv, ModuleArchive};
use crate::core::Coordinate;
use crate::generator::{script_path, GenerateError, GeneratedFile, GeneratorEnvironment};
use crate::visit::readonly::{walk, Visitor};

/// Module name the example projects import.
pub const MODULE_NAME: &str = "cdep-dependencies";

pub struct NdkBuildGenerator<'a> {
    environment: &'a GeneratorEnvironment,
}

impl<'a> NdkBuildGenerator<'a> {
    pub fn new(environment: &'a GeneratorEnvironment) -> Self {
        NdkBuildGenerator { environment }
    }

    /// `<modules>/ndk-build/cdep-dependencies/Android.mk`
    pub fn fragment_file(&self) -> PathBuf {
        self.environment
            .modules_folder
            .join("ndk-build")
            .join(MODULE_NAME)
            .join("Android.mk")
    }

    pub fn create(&self, ast: &Ast) -> Result<String, GenerateError> {
        let globals = *ast
            .globals()
            .ok_or_else(|| GenerateError::unsupported("a tree without globals"))?;

        let mut rules = LibraryRules {
            environment: self.environment,
            globals,
            coordinate: Coordinate::empty(),
            seen: BTreeSet::new(),
            out: String::from("# GENERATED FILE. DO NOT EDIT.\n"),
            error: None,
        };
        rules.visit(&ast.arena, ast.root);
        if let Some(error) = rules.error {
            return Err(error);
        }

        debug!("generated {} ndk-build file rules", rules.seen.len());
        Ok(rules.out)
    }

    pub fn generate(&self, ast: &Ast) -> Result<GeneratedFile, GenerateError> {
        Ok(GeneratedFile::new(self.fragment_file(), self.create(ast)?))
    }
}

struct LibraryRules<'a> {
    environment: &'a GeneratorEnvironment,
    globals: GlobalEnv,
    coordinate: Coordinate,
    seen: BTreeSet<String>,
    out: String,
    error: Option<GenerateError>,
}

impl LibraryRules<'_> {
    /// Expand a library path expression down to a literal path.
    fn resolve(&self, arena: &Arena, id: ExprId) -> Result<String, GenerateError> {
        match arena.get(id) {
            Expression::Constant(constant) => Ok(constant.to_string()),
            Expression::Parameter { .. } if id == self.globals.exploded_root => {
                Ok(script_path(&self.environment.exploded_folder))
            }
            Expression::Parameter { name } => Err(GenerateError::unsupported(format!(
                "a library path depending on {}",
                name
            ))),
            Expression::AssignmentReference { assignment } => self.resolve(arena, *assignment),
            Expression::Assignment { value, .. } => self.resolve(arena, *value),
            Expression::Array(elements) => Ok(elements
                .iter()
                .map(|element| self.resolve(arena, *element))
                .collect::<Result<Vec<_>, _>>()?
                .join("/")),
            Expression::InvokeBuiltin {
                function: Builtin::FileJoinSegments,
                args,
            } => {
                let [base, segments] = args.as_slice() else {
                    return Err(GenerateError::unsupported("joinFileSegments arity"));
                };
                let base = self.resolve(arena, *base)?;
                let segments = self.resolve(arena, *segments)?;
                if segments.is_empty() {
                    Ok(base)
                } else {
                    Ok(format!("{}/{}", base, segments))
                }
            }
            other => Err(GenerateError::unsupported(format!(
                "{} in a library path",
                other.kind()
            ))),
        }
    }
}

impl Visitor for LibraryRules<'_> {
    fn visit_find_module(&mut self, arena: &Arena, id: ExprId, find: &FindModule) {
        self.coordinate = find.coordinate;
        walk(self, arena, id);
    }

    fn visit_module_archive(&mut self, arena: &Arena, _id: ExprId, archive: &ModuleArchive) {
        if self.error.is_some() {
            return;
        }
        for library in &archive.library_paths {
            let path = match self.resolve(arena, *library) {
                Ok(path) => path,
                Err(error) => {
                    self.error = Some(error);
                    return;
                }
            };
            if !self.seen.insert(path.clone()) {
                continue;
            }
            let call = self.environment.fetch_archive_call(self.coordinate, archive);
            self.out.push_str(&format!("\n{}:\n\t$(shell {})\n", path, call));
        }
    }

    // Assignment definitions are reached through references.
    fn visit_assignment(&mut self, _arena: &Arena, _id: ExprId, _name: &str, _value: ExprId) {}
}
