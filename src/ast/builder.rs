//! Node constructors.
//!
//! Every constructor allocates exactly one node (plus constant leaves where
//! a helper takes plain Rust values) and returns its id.

use std::collections::BTreeSet;

use url::Url;

use crate::ast::{Arena, Builtin, Constant, ExprId, Expression, ModuleArchive};
use crate::core::{Coordinate, CxxLanguageFeature};

impl Arena {
    pub fn constant(&mut self, value: Constant) -> ExprId {
        self.alloc(Expression::Constant(value))
    }

    pub fn string(&mut self, value: impl Into<String>) -> ExprId {
        self.constant(Constant::String(value.into()))
    }

    pub fn integer(&mut self, value: i64) -> ExprId {
        self.constant(Constant::Integer(value))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.constant(Constant::Boolean(value))
    }

    pub fn feature(&mut self, value: CxxLanguageFeature) -> ExprId {
        self.constant(Constant::Feature(value))
    }

    pub fn assign(&mut self, name: impl Into<String>, value: ExprId) -> ExprId {
        self.alloc(Expression::Assignment {
            name: name.into(),
            value,
        })
    }

    pub fn reference(&mut self, assignment: ExprId) -> ExprId {
        self.alloc(Expression::AssignmentReference { assignment })
    }

    pub fn invoke(&mut self, function: Builtin, args: Vec<ExprId>) -> ExprId {
        debug_assert_eq!(function.arity(), args.len(), "{}", function.name());
        self.alloc(Expression::InvokeBuiltin { function, args })
    }

    pub fn if_switch(
        &mut self,
        conditions: Vec<ExprId>,
        branches: Vec<ExprId>,
        otherwise: ExprId,
    ) -> ExprId {
        debug_assert_eq!(conditions.len(), branches.len());
        self.alloc(Expression::IfSwitch {
            conditions,
            branches,
            otherwise,
        })
    }

    pub fn multi(&mut self, statements: Vec<ExprId>) -> ExprId {
        self.alloc(Expression::MultiStatement(statements))
    }

    pub fn nop(&mut self) -> ExprId {
        self.alloc(Expression::Nop)
    }

    pub fn abort(&mut self, message: impl Into<String>, args: Vec<ExprId>) -> ExprId {
        self.alloc(Expression::Abort {
            message: message.into(),
            args,
        })
    }

    pub fn array(&mut self, elements: Vec<ExprId>) -> ExprId {
        self.alloc(Expression::Array(elements))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn archive(
        &mut self,
        remote: Url,
        sha256: impl Into<String>,
        size: u64,
        include: Option<String>,
        include_path: Option<ExprId>,
        libs: Vec<String>,
        library_paths: Vec<ExprId>,
        requires: Vec<CxxLanguageFeature>,
    ) -> ExprId {
        self.alloc(Expression::ModuleArchive(ModuleArchive {
            remote,
            sha256: sha256.into(),
            size,
            include,
            include_path,
            libs,
            library_paths,
            requires,
        }))
    }

    pub fn module(&mut self, archive: ExprId, dependencies: BTreeSet<Coordinate>) -> ExprId {
        self.alloc(Expression::Module {
            archive,
            dependencies,
        })
    }

    pub fn assignment_block(&mut self, assignments: Vec<ExprId>, body: ExprId) -> ExprId {
        self.alloc(Expression::AssignmentBlock { assignments, body })
    }

    pub fn example(&mut self, source: impl Into<String>) -> ExprId {
        self.alloc(Expression::Example {
            source: source.into(),
        })
    }

    // Builtin shorthands

    pub fn eq(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.invoke(Builtin::StringEquals, vec![left, right])
    }

    pub fn gte(&mut self, left: ExprId, right: i64) -> ExprId {
        let right = self.integer(right);
        self.invoke(Builtin::IntegerGte, vec![left, right])
    }

    pub fn not(&mut self, value: ExprId) -> ExprId {
        self.invoke(Builtin::Not, vec![value])
    }

    pub fn or(&mut self, left: ExprId, right: ExprId) -> ExprId {
        self.invoke(Builtin::Or, vec![left, right])
    }

    pub fn string_starts_with(&mut self, value: ExprId, prefix: ExprId) -> ExprId {
        self.invoke(Builtin::StringStartsWith, vec![value, prefix])
    }

    pub fn array_has_only_element(&mut self, array: ExprId, element: ExprId) -> ExprId {
        self.invoke(Builtin::ArrayHasOnlyElement, vec![array, element])
    }

    pub fn file_get_name(&mut self, path: ExprId) -> ExprId {
        self.invoke(Builtin::FileGetName, vec![path])
    }

    pub fn last_index_of(&mut self, value: ExprId, needle: &str) -> ExprId {
        let needle = self.string(needle);
        self.invoke(Builtin::StringLastIndexOf, vec![value, needle])
    }

    pub fn substring(&mut self, value: ExprId, begin: ExprId, end: ExprId) -> ExprId {
        self.invoke(Builtin::StringSubstring, vec![value, begin, end])
    }

    /// `base/segment/segment/...` where the segments are expressions.
    pub fn join_file_segments(&mut self, base: ExprId, segments: Vec<ExprId>) -> ExprId {
        let segments = self.array(segments);
        self.invoke(Builtin::FileJoinSegments, vec![base, segments])
    }

    /// `base/segment/segment/...` where the segments are literal strings.
    pub fn join_file_strings(&mut self, base: ExprId, segments: &[&str]) -> ExprId {
        let segments = segments.iter().map(|s| self.string(*s)).collect();
        self.join_file_segments(base, segments)
    }

    pub fn supports_compiler_features(&mut self) -> ExprId {
        self.invoke(Builtin::SupportsCompilerFeatures, Vec::new())
    }

    pub fn requires_compiler_features(&mut self, features: ExprId) -> ExprId {
        self.invoke(Builtin::RequiresCompilerFeatures, vec![features])
    }

    pub fn require_minimum_cxx_standard(&mut self, level: ExprId) -> ExprId {
        self.invoke(Builtin::RequireMinimumCxxCompilerStandard, vec![level])
    }
}
