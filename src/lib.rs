//! cdep - decision-logic compiler for native-library dependencies
//!
//! Resolved package manifests become a small expression tree that decides,
//! per target platform, which prebuilt archive to use. The tree is lowered,
//! checked and then interpreted in-process or rendered as CMake or ndk-build
//! script.

pub mod ast;
pub mod check;
pub mod core;
pub mod finder;
pub mod generator;
pub mod lower;
pub mod util;
pub mod visit;

/// Manifest fixtures and helpers for unit tests.
#[cfg(test)]
pub mod test_support;

pub use ast::{Arena, Ast, ExprId, Expression};
pub use core::{Coordinate, Manifest, ManifestSet, ResolvedManifest};
pub use finder::{CompileError, FunctionTableBuilder};
pub use generator::{CMakeGenerator, GeneratorEnvironment, NdkBuildGenerator};
pub use visit::{Bindings, Interpreter, Value};
