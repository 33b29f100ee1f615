//! The expression tree that encodes how a package finds its archive.
//!
//! Nodes live in an [`Arena`] and refer to each other through [`ExprId`]
//! indices. The index is the node's identity: two parameters are the same
//! parameter only if they have the same id, and every pass memoizes by id.
//! Nodes are never mutated after allocation; passes allocate new nodes and
//! return a new root.

pub mod builder;
pub mod printer;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use url::Url;

use crate::core::{Coordinate, CxxLanguageFeature};

/// Index of a node in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprId(u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Append-only node storage.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Expression>,
}

impl Arena {
    pub fn new() -> Self {
        Arena { nodes: Vec::new() }
    }

    /// Store a node and return its identity.
    pub fn alloc(&mut self, expression: Expression) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expression);
        id
    }

    pub fn get(&self, id: ExprId) -> &Expression {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Name of an `Assignment` node, if `id` is one.
    pub fn assignment_name(&self, id: ExprId) -> Option<&str> {
        match self.get(id) {
            Expression::Assignment { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn function_table(&self, id: ExprId) -> Option<&FunctionTable> {
        match self.get(id) {
            Expression::FunctionTable(table) => Some(table),
            _ => None,
        }
    }

    pub fn find_module(&self, id: ExprId) -> Option<&FindModule> {
        match self.get(id) {
            Expression::FindModule(find) => Some(find),
            _ => None,
        }
    }

    pub fn globals(&self, id: ExprId) -> Option<&GlobalEnv> {
        match self.get(id) {
            Expression::GlobalEnv(globals) => Some(globals),
            _ => None,
        }
    }
}

/// A compiled tree: the arena plus the id of its `FunctionTable` root.
#[derive(Debug, Clone)]
pub struct Ast {
    pub arena: Arena,
    pub root: ExprId,
}

impl Ast {
    pub fn new(arena: Arena, root: ExprId) -> Self {
        Ast { arena, root }
    }

    pub fn table(&self) -> Option<&FunctionTable> {
        self.arena.function_table(self.root)
    }

    pub fn globals(&self) -> Option<&GlobalEnv> {
        self.table().and_then(|t| self.arena.globals(t.globals))
    }

    /// The find-module unit for `coordinate`.
    pub fn find_module(&self, coordinate: Coordinate) -> Option<(ExprId, &FindModule)> {
        let id = *self.table()?.find_functions.get(&coordinate)?;
        self.arena.find_module(id).map(|find| (id, find))
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    String(String),
    Integer(i64),
    Boolean(bool),
    Feature(CxxLanguageFeature),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::String(value) => f.write_str(value),
            Constant::Integer(value) => write!(f, "{}", value),
            Constant::Boolean(value) => write!(f, "{}", value),
            Constant::Feature(feature) => f.write_str(feature.as_str()),
        }
    }
}

/// The closed set of operations an `InvokeBuiltin` node may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `(path) -> string`: last path component.
    FileGetName,
    /// `(string, string) -> int`: last index of the needle, or -1.
    StringLastIndexOf,
    /// `(string, begin, end) -> string`
    StringSubstring,
    /// `(string, prefix) -> bool`
    StringStartsWith,
    /// `(base, [segments]) -> path`
    FileJoinSegments,
    /// `(int, int) -> bool`: left >= right.
    IntegerGte,
    /// `(bool) -> bool`
    Not,
    /// `(bool, bool) -> bool`
    Or,
    /// `(string, string) -> bool`
    StringEquals,
    /// `(array, string) -> bool`: the array is exactly `[string]`.
    ArrayHasOnlyElement,
    /// `([features]) -> nop`: ask the build system for exact features.
    RequiresCompilerFeatures,
    /// `() -> bool`: whether the build system accepts fine-grained feature requests.
    SupportsCompilerFeatures,
    /// `(int) -> nop`: raise the compiler standard to at least this level.
    RequireMinimumCxxCompilerStandard,
}

impl Builtin {
    /// Name used by the diagnostic printer.
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::FileGetName => "getName",
            Builtin::StringLastIndexOf => "lastIndexOf",
            Builtin::StringSubstring => "substring",
            Builtin::StringStartsWith => "startsWith",
            Builtin::FileJoinSegments => "fileJoinSegments",
            Builtin::IntegerGte => "gte",
            Builtin::Not => "not",
            Builtin::Or => "or",
            Builtin::StringEquals => "eq",
            Builtin::ArrayHasOnlyElement => "hasOnlyElement",
            Builtin::RequiresCompilerFeatures => "requiresCompilerFeatures",
            Builtin::SupportsCompilerFeatures => "supportsCompilerFeatures",
            Builtin::RequireMinimumCxxCompilerStandard => "requireMinimumCxxCompilerStandard",
        }
    }

    /// Number of arguments the operation takes.
    pub fn arity(&self) -> usize {
        match self {
            Builtin::SupportsCompilerFeatures => 0,
            Builtin::FileGetName
            | Builtin::Not
            | Builtin::RequiresCompilerFeatures
            | Builtin::RequireMinimumCxxCompilerStandard => 1,
            Builtin::StringSubstring => 3,
            _ => 2,
        }
    }
}

/// A downloadable archive chosen by a find-module.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleArchive {
    /// Remote URL of the archive file.
    pub remote: Url,
    pub sha256: String,
    pub size: u64,
    /// Include folder relative to the archive root.
    pub include: Option<String>,
    /// Expression producing the absolute include folder.
    pub include_path: Option<ExprId>,
    /// Library files relative to the archive root, e.g. `lib/x86/libz.a`.
    pub libs: Vec<String>,
    /// Expressions producing absolute library paths, parallel to `libs`.
    pub library_paths: Vec<ExprId>,
    /// Language features consumers must enable. Empty after standard lowering.
    pub requires: Vec<CxxLanguageFeature>,
}

impl ModuleArchive {
    /// The file name part of the remote URL.
    pub fn file_name(&self) -> &str {
        self.remote
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
    }
}

/// The decision tree for one coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct FindModule {
    pub globals: ExprId,
    pub coordinate: Coordinate,
    /// File name of the header-only archive, if the package has one.
    pub header_archive: Option<String>,
    /// Include folder inside the header archive.
    pub include: Option<String>,
    pub body: ExprId,
}

/// The root of a compiled tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTable {
    pub globals: ExprId,
    pub find_functions: BTreeMap<Coordinate, ExprId>,
    pub examples: BTreeMap<Coordinate, ExprId>,
}

/// The well-known symbolic parameters, each held once by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalEnv {
    pub exploded_root: ExprId,
    pub target_system: ExprId,
    pub target_platform: ExprId,
    pub android_abi: ExprId,
    pub android_runtime: ExprId,
    pub osx_sysroot: ExprId,
    pub osx_architectures: ExprId,
    pub cxx_standard: ExprId,
    pub none_runtime: ExprId,
}

impl GlobalEnv {
    pub const EXPLODED_ROOT: &'static str = "cdep_exploded_root";
    pub const TARGET_SYSTEM: &'static str = "build_system_target_system";
    pub const TARGET_PLATFORM: &'static str = "build_system_target_platform";
    pub const ANDROID_ABI: &'static str = "cdep_determined_android_abi";
    pub const ANDROID_RUNTIME: &'static str = "cdep_determined_android_runtime";
    pub const OSX_SYSROOT: &'static str = "CMAKE_OSX_SYSROOT";
    pub const OSX_ARCHITECTURES: &'static str = "CMAKE_OSX_ARCHITECTURES";
    pub const CXX_STANDARD: &'static str = "build_system_cxx_compiler_standard";
    pub const NONE_RUNTIME: &'static str = "build_system_none_runtime";

    /// Allocate fresh parameter nodes.
    pub fn alloc(arena: &mut Arena) -> Self {
        let mut parameter = |name: &str| {
            arena.alloc(Expression::Parameter {
                name: name.to_string(),
            })
        };
        GlobalEnv {
            exploded_root: parameter(Self::EXPLODED_ROOT),
            target_system: parameter(Self::TARGET_SYSTEM),
            target_platform: parameter(Self::TARGET_PLATFORM),
            android_abi: parameter(Self::ANDROID_ABI),
            android_runtime: parameter(Self::ANDROID_RUNTIME),
            osx_sysroot: parameter(Self::OSX_SYSROOT),
            osx_architectures: parameter(Self::OSX_ARCHITECTURES),
            cxx_standard: parameter(Self::CXX_STANDARD),
            none_runtime: parameter(Self::NONE_RUNTIME),
        }
    }

    /// The parameters in declaration order.
    pub fn parameters(&self) -> [ExprId; 9] {
        [
            self.exploded_root,
            self.target_system,
            self.target_platform,
            self.android_abi,
            self.android_runtime,
            self.osx_sysroot,
            self.osx_architectures,
            self.cxx_standard,
            self.none_runtime,
        ]
    }
}

/// One node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Constant),
    /// A value supplied by the build system, identified by node id.
    Parameter { name: String },
    /// A single-assignment binding.
    Assignment { name: String, value: ExprId },
    /// A use of the `Assignment` node it points at.
    AssignmentReference { assignment: ExprId },
    InvokeBuiltin { function: Builtin, args: Vec<ExprId> },
    /// Multi-way switch: the first true condition selects its branch.
    IfSwitch {
        conditions: Vec<ExprId>,
        branches: Vec<ExprId>,
        otherwise: ExprId,
    },
    MultiStatement(Vec<ExprId>),
    Nop,
    /// Terminal failure with a `%s` message template.
    Abort { message: String, args: Vec<ExprId> },
    Array(Vec<ExprId>),
    ModuleArchive(ModuleArchive),
    Module {
        archive: ExprId,
        dependencies: BTreeSet<Coordinate>,
    },
    /// Introduces assignments scoped to `body`.
    AssignmentBlock { assignments: Vec<ExprId>, body: ExprId },
    FindModule(FindModule),
    FunctionTable(FunctionTable),
    Example { source: String },
    GlobalEnv(GlobalEnv),
}

impl Expression {
    /// Short variant name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Constant(_) => "constant",
            Expression::Parameter { .. } => "parameter",
            Expression::Assignment { .. } => "assignment",
            Expression::AssignmentReference { .. } => "assignment reference",
            Expression::InvokeBuiltin { .. } => "builtin invocation",
            Expression::IfSwitch { .. } => "if switch",
            Expression::MultiStatement(_) => "multi statement",
            Expression::Nop => "nop",
            Expression::Abort { .. } => "abort",
            Expression::Array(_) => "array",
            Expression::ModuleArchive(_) => "module archive",
            Expression::Module { .. } => "module",
            Expression::AssignmentBlock { .. } => "assignment block",
            Expression::FindModule(_) => "find module",
            Expression::FunctionTable(_) => "function table",
            Expression::Example { .. } => "example",
            Expression::GlobalEnv(_) => "global environment",
        }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            Expression::Constant(_)
            | Expression::Parameter { .. }
            | Expression::Nop
            | Expression::Example { .. } => Vec::new(),
            Expression::Assignment { value, .. } => vec![*value],
            Expression::AssignmentReference { assignment } => vec![*assignment],
            Expression::InvokeBuiltin { args, .. } => args.clone(),
            Expression::IfSwitch {
                conditions,
                branches,
                otherwise,
            } => {
                let mut children = Vec::with_capacity(conditions.len() * 2 + 1);
                for (condition, branch) in conditions.iter().zip(branches) {
                    children.push(*condition);
                    children.push(*branch);
                }
                children.push(*otherwise);
                children
            }
            Expression::MultiStatement(statements) => statements.clone(),
            Expression::Abort { args, .. } => args.clone(),
            Expression::Array(elements) => elements.clone(),
            Expression::ModuleArchive(archive) => archive
                .include_path
                .iter()
                .chain(archive.library_paths.iter())
                .copied()
                .collect(),
            Expression::Module { archive, .. } => vec![*archive],
            Expression::AssignmentBlock { assignments, body } => {
                let mut children = assignments.clone();
                children.push(*body);
                children
            }
            Expression::FindModule(find) => vec![find.globals, find.body],
            Expression::FunctionTable(table) => std::iter::once(table.globals)
                .chain(table.find_functions.values().copied())
                .chain(table.examples.values().copied())
                .collect(),
            Expression::GlobalEnv(globals) => globals.parameters().to_vec(),
        }
    }
}
