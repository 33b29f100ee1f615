//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod hash;
pub mod text;

pub use config::GeneratorConfig;
pub use diagnostic::Diagnostic;
