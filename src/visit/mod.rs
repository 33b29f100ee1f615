//! Traversal disciplines over the expression tree.
//!
//! - [`readonly::Visitor`]: observe nodes without building new ones
//! - [`rewrite::Rewriter`]: build a transformed tree, memoized per node id
//! - [`interpret`]: evaluate a tree against parameter bindings

pub mod environment;
pub mod interpret;
pub mod readonly;
pub mod rewrite;

pub use environment::{Bindings, Environment};
pub use interpret::{
    interpret, resolve_archive, resolve_archives, InterpretError, Interpreter, ResolvedArchive,
    Value,
};
pub use readonly::Visitor;
pub use rewrite::Rewriter;
