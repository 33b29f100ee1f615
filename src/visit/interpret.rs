//! Direct evaluation of a tree against parameter bindings.
//!
//! Each `AssignmentBlock` opens a frame whose assignments are lazy thunks:
//! an assignment is evaluated at most once per frame, on first reference,
//! in the frame that defined it. Frames form a parent-linked stack kept in
//! a vector owned by one [`Interpreter`], so nothing outlives a call.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::ast::{Arena, Ast, Builtin, Constant, ExprId, Expression};
use crate::core::{Coordinate, CxxLanguageFeature};
use crate::util::text::safe_format;
use crate::visit::environment::Environment;

/// A concrete archive selected for a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArchive {
    pub remote: Url,
    pub sha256: String,
    pub size: u64,
    pub include_path: Option<PathBuf>,
    pub library_paths: Vec<PathBuf>,
}

/// The result of evaluating a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Integer(i64),
    Boolean(bool),
    Path(PathBuf),
    Array(Vec<Value>),
    Feature(CxxLanguageFeature),
    Archive(ResolvedArchive),
    /// One value per statement of a `MultiStatement`.
    Statements(Vec<Value>),
    Nop,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::Path(_) => "path",
            Value::Array(_) => "array",
            Value::Feature(_) => "feature",
            Value::Archive(_) => "archive",
            Value::Statements(_) => "statements",
            Value::Nop => "nop",
        }
    }

    /// Every archive in this value, flattening statement lists and skipping nops.
    pub fn archives(&self) -> Vec<&ResolvedArchive> {
        let mut found = Vec::new();
        self.collect_archives(&mut found);
        found
    }

    fn collect_archives<'a>(&'a self, found: &mut Vec<&'a ResolvedArchive>) {
        match self {
            Value::Archive(archive) => found.push(archive),
            Value::Statements(values) | Value::Array(values) => {
                for value in values {
                    value.collect_archives(found);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(value) => f.write_str(value),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Path(path) => write!(f, "{}", path.display()),
            Value::Array(values) | Value::Statements(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Feature(feature) => f.write_str(feature.as_str()),
            Value::Archive(archive) => write!(f, "{}", archive.remote),
            Value::Nop => f.write_str("nop"),
        }
    }
}

/// Evaluation failure.
///
/// `Abort` is the user-facing outcome of an abort node on the taken path.
/// Every other variant means the tree itself is inconsistent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InterpretError {
    #[error("{message}")]
    Abort { message: String },

    #[error("parameter `{name}` has no binding")]
    UnboundParameter { name: String },

    #[error("could not resolve assignment `{name}` in any enclosing scope")]
    UnresolvedAssignment { name: String },

    #[error("value of type `{found}` was not assignable to boolean")]
    NonBooleanCondition { found: &'static str },

    #[error("`{function}` expected {expected} but got {found}")]
    TypeMismatch {
        function: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("`{function}` failed: {message}")]
    BuiltinFailed {
        function: &'static str,
        message: String,
    },

    #[error("no find module for `{0}`")]
    UnknownCoordinate(Coordinate),

    #[error("no archive was selected for `{coordinate}`")]
    NoArchive { coordinate: Coordinate },

    #[error("expected one archive for `{coordinate}` but {count} were selected")]
    AmbiguousArchive { coordinate: Coordinate, count: usize },

    #[error("root is not a function table")]
    NotAFunctionTable,
}

impl InterpretError {
    /// Whether this is a user-facing abort rather than an internal failure.
    pub fn is_abort(&self) -> bool {
        matches!(self, InterpretError::Abort { .. })
    }
}

#[derive(Debug)]
struct Frame {
    parent: Option<usize>,
    thunks: HashMap<ExprId, Thunk>,
}

#[derive(Debug)]
struct Thunk {
    expression: ExprId,
    value: Option<Value>,
}

/// How `IfSwitch` and `Abort` are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Take the first true branch; aborts fail.
    Selected,
    /// Evaluate every branch without testing conditions; aborts yield nop.
    AllBranches,
}

pub struct Interpreter<'a, E: Environment + ?Sized> {
    arena: &'a Arena,
    env: &'a E,
    frames: Vec<Frame>,
    mode: Mode,
}

impl<'a, E: Environment + ?Sized> Interpreter<'a, E> {
    pub fn new(arena: &'a Arena, env: &'a E) -> Self {
        Interpreter {
            arena,
            env,
            frames: Vec::new(),
            mode: Mode::Selected,
        }
    }

    /// An interpreter that walks every control path.
    ///
    /// Conditions are not evaluated and aborts produce `Nop`, so the result
    /// holds every archive any binding could select.
    pub fn all_branches(arena: &'a Arena, env: &'a E) -> Self {
        Interpreter {
            mode: Mode::AllBranches,
            ..Self::new(arena, env)
        }
    }

    pub fn evaluate(&mut self, id: ExprId) -> Result<Value, InterpretError> {
        self.eval(id, None)
    }

    fn eval(&mut self, id: ExprId, frame: Option<usize>) -> Result<Value, InterpretError> {
        let arena = self.arena;
        match arena.get(id) {
            Expression::Constant(constant) => Ok(match constant {
                Constant::String(value) => Value::String(value.clone()),
                Constant::Integer(value) => Value::Integer(*value),
                Constant::Boolean(value) => Value::Boolean(*value),
                Constant::Feature(feature) => Value::Feature(*feature),
            }),
            Expression::Parameter { name } => self
                .env
                .parameter(id)
                .ok_or_else(|| InterpretError::UnboundParameter { name: name.clone() }),
            Expression::Assignment { value, .. } => self.eval(*value, frame),
            Expression::AssignmentReference { assignment } => self.lookup(*assignment, frame),
            Expression::InvokeBuiltin { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(*arg, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                self.invoke(*function, values)
            }
            Expression::IfSwitch {
                conditions,
                branches,
                otherwise,
            } => {
                if self.mode == Mode::AllBranches {
                    let mut results = Vec::with_capacity(branches.len() + 1);
                    for branch in branches.iter().chain(std::iter::once(otherwise)) {
                        results.push(self.eval(*branch, frame)?);
                    }
                    return Ok(Value::Statements(results));
                }
                for (condition, branch) in conditions.iter().zip(branches) {
                    match self.eval(*condition, frame)? {
                        Value::Boolean(true) => return self.eval(*branch, frame),
                        Value::Boolean(false) => {}
                        other => {
                            return Err(InterpretError::NonBooleanCondition {
                                found: other.type_name(),
                            })
                        }
                    }
                }
                self.eval(*otherwise, frame)
            }
            Expression::MultiStatement(statements) => {
                let values = statements
                    .iter()
                    .map(|s| self.eval(*s, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Statements(values))
            }
            Expression::Nop | Expression::Example { .. } | Expression::GlobalEnv(_) => {
                Ok(Value::Nop)
            }
            Expression::Abort { message, args } => {
                if self.mode == Mode::AllBranches {
                    return Ok(Value::Nop);
                }
                let args = args
                    .iter()
                    .map(|arg| self.eval(*arg, frame).map(|v| v.to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                Err(InterpretError::Abort {
                    message: format!("Abort: {}", safe_format(message, &args)),
                })
            }
            Expression::Array(elements) => {
                let values = elements
                    .iter()
                    .map(|e| self.eval(*e, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(values))
            }
            Expression::ModuleArchive(archive) => {
                let include_path = match archive.include_path {
                    Some(path) => Some(self.eval_path(path, frame, "include path")?),
                    None => None,
                };
                let library_paths = archive
                    .library_paths
                    .iter()
                    .map(|p| self.eval_path(*p, frame, "library path"))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Archive(ResolvedArchive {
                    remote: archive.remote.clone(),
                    sha256: archive.sha256.clone(),
                    size: archive.size,
                    include_path,
                    library_paths,
                }))
            }
            Expression::Module { archive, .. } => self.eval(*archive, frame),
            Expression::AssignmentBlock { assignments, body } => {
                let thunks = assignments
                    .iter()
                    .filter_map(|a| match arena.get(*a) {
                        Expression::Assignment { value, .. } => Some((
                            *a,
                            Thunk {
                                expression: *value,
                                value: None,
                            },
                        )),
                        _ => None,
                    })
                    .collect();
                self.frames.push(Frame {
                    parent: frame,
                    thunks,
                });
                let inner = self.frames.len() - 1;
                self.eval(*body, Some(inner))
            }
            Expression::FindModule(find) => self.eval(find.body, frame),
            Expression::FunctionTable(table) => {
                let values = table
                    .find_functions
                    .values()
                    .map(|f| self.eval(*f, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Statements(values))
            }
        }
    }

    fn eval_path(
        &mut self,
        id: ExprId,
        frame: Option<usize>,
        what: &'static str,
    ) -> Result<PathBuf, InterpretError> {
        match self.eval(id, frame)? {
            Value::Path(path) => Ok(path),
            Value::String(text) => Ok(PathBuf::from(text)),
            other => Err(InterpretError::TypeMismatch {
                function: what,
                expected: "path",
                found: other.type_name(),
            }),
        }
    }

    fn lookup(&mut self, assignment: ExprId, frame: Option<usize>) -> Result<Value, InterpretError> {
        let mut current = frame;
        while let Some(index) = current {
            if let Some(thunk) = self.frames[index].thunks.get(&assignment) {
                if let Some(value) = &thunk.value {
                    return Ok(value.clone());
                }
                let expression = thunk.expression;
                let value = self.eval(expression, Some(index))?;
                if let Some(thunk) = self.frames[index].thunks.get_mut(&assignment) {
                    thunk.value = Some(value.clone());
                }
                return Ok(value);
            }
            current = self.frames[index].parent;
        }
        Err(InterpretError::UnresolvedAssignment {
            name: self
                .arena
                .assignment_name(assignment)
                .unwrap_or("<not an assignment>")
                .to_string(),
        })
    }

    fn invoke(&self, function: Builtin, args: Vec<Value>) -> Result<Value, InterpretError> {
        let name = function.name();
        let mut args = args.into_iter();
        let mut next = || args.next().unwrap_or(Value::Nop);

        match function {
            Builtin::FileGetName => {
                let path = as_path(name, next())?;
                let file = path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(Value::String(file))
            }
            Builtin::StringLastIndexOf => {
                let value = as_text(name, next())?;
                let needle = as_text(name, next())?;
                Ok(Value::Integer(value.rfind(&needle).map_or(-1, |at| at as i64)))
            }
            Builtin::StringSubstring => {
                let value = as_text(name, next())?;
                let begin = as_integer(name, next())?;
                let end = as_integer(name, next())?;
                let slice = usize::try_from(begin)
                    .ok()
                    .zip(usize::try_from(end).ok())
                    .and_then(|(b, e)| value.get(b..e));
                match slice {
                    Some(slice) => Ok(Value::String(slice.to_string())),
                    None => Err(InterpretError::BuiltinFailed {
                        function: name,
                        message: format!("range {}..{} is outside '{}'", begin, end, value),
                    }),
                }
            }
            Builtin::StringStartsWith => {
                let value = as_text(name, next())?;
                let prefix = as_text(name, next())?;
                Ok(Value::Boolean(value.starts_with(&prefix)))
            }
            Builtin::FileJoinSegments => {
                let mut path = as_path(name, next())?;
                match next() {
                    Value::Array(segments) => {
                        for segment in segments {
                            path.push(as_text(name, segment)?);
                        }
                    }
                    other => path.push(as_text(name, other)?),
                }
                Ok(Value::Path(path))
            }
            Builtin::IntegerGte => {
                let left = as_integer(name, next())?;
                let right = as_integer(name, next())?;
                Ok(Value::Boolean(left >= right))
            }
            Builtin::Not => Ok(Value::Boolean(!as_bool(name, next())?)),
            Builtin::Or => {
                let left = as_bool(name, next())?;
                let right = as_bool(name, next())?;
                Ok(Value::Boolean(left || right))
            }
            Builtin::StringEquals => {
                let left = as_text(name, next())?;
                let right = as_text(name, next())?;
                Ok(Value::Boolean(left == right))
            }
            Builtin::ArrayHasOnlyElement => {
                let array = match next() {
                    Value::Array(values) => values,
                    single @ Value::String(_) => vec![single],
                    other => {
                        return Err(InterpretError::TypeMismatch {
                            function: name,
                            expected: "array",
                            found: other.type_name(),
                        })
                    }
                };
                let element = as_text(name, next())?;
                let only = match array.as_slice() {
                    [single] => as_text(name, single.clone())? == element,
                    _ => false,
                };
                Ok(Value::Boolean(only))
            }
            Builtin::RequiresCompilerFeatures | Builtin::RequireMinimumCxxCompilerStandard => {
                Ok(Value::Nop)
            }
            Builtin::SupportsCompilerFeatures => {
                Ok(Value::Boolean(self.env.supports_compiler_features()))
            }
        }
    }
}

fn as_text(function: &'static str, value: Value) -> Result<String, InterpretError> {
    match value {
        Value::String(text) => Ok(text),
        Value::Integer(n) => Ok(n.to_string()),
        Value::Path(path) => Ok(path.to_string_lossy().into_owned()),
        Value::Feature(feature) => Ok(feature.as_str().to_string()),
        other => Err(InterpretError::TypeMismatch {
            function,
            expected: "string",
            found: other.type_name(),
        }),
    }
}

fn as_path(function: &'static str, value: Value) -> Result<PathBuf, InterpretError> {
    match value {
        Value::Path(path) => Ok(path),
        Value::String(text) => Ok(PathBuf::from(text)),
        other => Err(InterpretError::TypeMismatch {
            function,
            expected: "path",
            found: other.type_name(),
        }),
    }
}

fn as_integer(function: &'static str, value: Value) -> Result<i64, InterpretError> {
    match value {
        Value::Integer(n) => Ok(n),
        Value::String(text) => text.trim().parse().map_err(|_| InterpretError::BuiltinFailed {
            function,
            message: format!("'{}' is not an integer", text),
        }),
        other => Err(InterpretError::TypeMismatch {
            function,
            expected: "integer",
            found: other.type_name(),
        }),
    }
}

fn as_bool(function: &'static str, value: Value) -> Result<bool, InterpretError> {
    match value {
        Value::Boolean(b) => Ok(b),
        other => Err(InterpretError::TypeMismatch {
            function,
            expected: "boolean",
            found: other.type_name(),
        }),
    }
}

/// Evaluate `id` under `env`.
pub fn interpret<E: Environment + ?Sized>(
    arena: &Arena,
    env: &E,
    id: ExprId,
) -> Result<Value, InterpretError> {
    Interpreter::new(arena, env).evaluate(id)
}

/// Every archive the find-module for `coordinate` selects under `env`.
///
/// A package with a header archive and a platform archive yields both.
pub fn resolve_archives<E: Environment + ?Sized>(
    ast: &Ast,
    env: &E,
    coordinate: Coordinate,
) -> Result<Vec<ResolvedArchive>, InterpretError> {
    let (id, _) = ast
        .find_module(coordinate)
        .ok_or(InterpretError::UnknownCoordinate(coordinate))?;
    let value = interpret(&ast.arena, env, id)?;
    Ok(value.archives().into_iter().cloned().collect())
}

/// The single archive selected for `coordinate`.
pub fn resolve_archive<E: Environment + ?Sized>(
    ast: &Ast,
    env: &E,
    coordinate: Coordinate,
) -> Result<ResolvedArchive, InterpretError> {
    let mut archives = resolve_archives(ast, env, coordinate)?;
    match archives.len() {
        0 => Err(InterpretError::NoArchive { coordinate }),
        1 => Ok(archives.remove(0)),
        count => Err(InterpretError::AmbiguousArchive { coordinate, count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::GlobalEnv;
    use crate::visit::environment::Bindings;

    fn setup() -> (Arena, GlobalEnv) {
        let mut arena = Arena::new();
        let globals = GlobalEnv::alloc(&mut arena);
        (arena, globals)
    }

    #[test]
    fn test_if_switch_takes_first_true_branch() {
        let (mut arena, globals) = setup();
        let android = arena.string("Android");
        let is_android = arena.eq(globals.target_system, android);
        let linux = arena.string("Linux");
        let is_linux = arena.eq(globals.target_system, linux);
        let a = arena.string("a");
        let b = arena.string("b");
        let otherwise = arena.abort("Target platform %s is not supported", vec![globals.target_system]);
        let switch = arena.if_switch(vec![is_android, is_linux], vec![a, b], otherwise);

        let linux_env = Bindings::linux(globals);
        assert_eq!(
            interpret(&arena, &linux_env, switch).unwrap(),
            Value::String("b".to_string())
        );

        let windows = Bindings::system(globals, "Windows");
        let err = interpret(&arena, &windows, switch).unwrap_err();
        assert!(err.is_abort());
        assert_eq!(err.to_string(), "Abort: Target platform Windows is not supported");
    }

    #[test]
    fn test_non_boolean_condition_is_internal_error() {
        let (mut arena, globals) = setup();
        let condition = arena.string("yes");
        let branch = arena.nop();
        let otherwise = arena.nop();
        let switch = arena.if_switch(vec![condition], vec![branch], otherwise);

        let err = interpret(&arena, &Bindings::new(globals), switch).unwrap_err();
        assert_eq!(err, InterpretError::NonBooleanCondition { found: "string" });
        assert!(!err.is_abort());
    }

    #[test]
    fn test_assignment_is_evaluated_once_per_frame() {
        // A parameter lookup counter proves laziness and memoization.
        use std::cell::Cell;

        struct Counting {
            globals: GlobalEnv,
            hits: Cell<usize>,
        }
        impl Environment for Counting {
            fn parameter(&self, parameter: ExprId) -> Option<Value> {
                if parameter == self.globals.osx_sysroot {
                    self.hits.set(self.hits.get() + 1);
                    return Some(Value::Path(PathBuf::from("/sdks/iPhoneOS10.2.sdk")));
                }
                None
            }
        }

        let (mut arena, globals) = setup();
        let name = arena.file_get_name(globals.osx_sysroot);
        let name = arena.assign("osx_sysroot_sdk_name", name);
        let unused = arena.string("never");
        let unused = arena.assign("unused", unused);
        let r1 = arena.reference(name);
        let r2 = arena.reference(name);
        let body = arena.multi(vec![r1, r2]);
        let block = arena.assignment_block(vec![name, unused], body);

        let env = Counting {
            globals,
            hits: Cell::new(0),
        };
        let value = interpret(&arena, &env, block).unwrap();
        assert_eq!(
            value,
            Value::Statements(vec![
                Value::String("iPhoneOS10.2.sdk".to_string()),
                Value::String("iPhoneOS10.2.sdk".to_string()),
            ])
        );
        assert_eq!(env.hits.get(), 1);
    }

    #[test]
    fn test_reference_resolves_through_enclosing_frames() {
        let (mut arena, globals) = setup();
        let value = arena.string("outer");
        let outer = arena.assign("outer", value);
        let reference = arena.reference(outer);
        let inner = arena.assignment_block(Vec::new(), reference);
        let block = arena.assignment_block(vec![outer], inner);

        assert_eq!(
            interpret(&arena, &Bindings::new(globals), block).unwrap(),
            Value::String("outer".to_string())
        );
    }

    #[test]
    fn test_unbound_reference_is_internal_error() {
        let (mut arena, globals) = setup();
        let value = arena.string("x");
        let assignment = arena.assign("x", value);
        let reference = arena.reference(assignment);

        let err = interpret(&arena, &Bindings::new(globals), reference).unwrap_err();
        assert_eq!(
            err,
            InterpretError::UnresolvedAssignment {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn test_darwin_sdk_name_builtins() {
        let (mut arena, globals) = setup();
        let name = arena.file_get_name(globals.osx_sysroot);
        let dot = arena.last_index_of(name, ".");
        let zero = arena.integer(0);
        let combined = arena.substring(name, zero, dot);

        let env = Bindings::darwin(
            globals,
            "/Applications/Xcode.app/Contents/Developer/Platforms/iPhoneOS.platform/Developer/SDKs/iPhoneOS10.2.sdk",
            &["armv7"],
        );
        assert_eq!(
            interpret(&arena, &env, combined).unwrap(),
            Value::String("iPhoneOS10.2".to_string())
        );
    }

    #[test]
    fn test_gte_and_has_only_element() {
        let (mut arena, globals) = setup();
        let gte = arena.gte(globals.target_platform, 21);
        let arm = arena.string("armv7");
        let only = arena.array_has_only_element(globals.osx_architectures, arm);

        let env = Bindings::android(globals, 21, "c++_shared", "x86")
            .bind(globals.osx_architectures, Value::Array(vec![Value::String("armv7".into())]));
        assert_eq!(interpret(&arena, &env, gte).unwrap(), Value::Boolean(true));
        assert_eq!(interpret(&arena, &env, only).unwrap(), Value::Boolean(true));

        let env = Bindings::android(globals, 19, "c++_shared", "x86").bind(
            globals.osx_architectures,
            Value::Array(vec![Value::String("armv7".into()), Value::String("arm64".into())]),
        );
        assert_eq!(interpret(&arena, &env, gte).unwrap(), Value::Boolean(false));
        assert_eq!(interpret(&arena, &env, only).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_join_file_segments_builds_path() {
        let (mut arena, globals) = setup();
        let joined = arena.join_file_strings(globals.exploded_root, &["com.github.jomof", "zlib"]);
        let env = Bindings::new(globals).with_exploded_root("/exploded");

        assert_eq!(
            interpret(&arena, &env, joined).unwrap(),
            Value::Path(PathBuf::from("/exploded/com.github.jomof/zlib"))
        );
    }

    #[test]
    fn test_all_branches_mode_skips_conditions_and_aborts() {
        let (mut arena, globals) = setup();
        let condition = arena.eq(globals.target_system, globals.android_abi);
        let a = arena.string("a");
        let otherwise = arena.abort("never raised", Vec::new());
        let switch = arena.if_switch(vec![condition], vec![a], otherwise);

        let env = Bindings::new(globals);
        let value = Interpreter::all_branches(&arena, &env).evaluate(switch).unwrap();
        assert_eq!(
            value,
            Value::Statements(vec![Value::String("a".to_string()), Value::Nop])
        );
    }

    #[test]
    fn test_compiler_feature_builtins() {
        let (mut arena, globals) = setup();
        let supports = arena.supports_compiler_features();
        let env = Bindings::new(globals).with_compiler_features(false);
        assert_eq!(interpret(&arena, &env, supports).unwrap(), Value::Boolean(false));

        let level = arena.integer(14);
        let require = arena.require_minimum_cxx_standard(level);
        assert_eq!(interpret(&arena, &env, require).unwrap(), Value::Nop);
    }
}
