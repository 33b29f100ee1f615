//! Checks over a finished function table.
//!
//! - Cross-package consistency, run as a gate by the builder
//! - Local file-system integrity, run by callers once archives are unpacked

pub mod consistency;
pub mod local_files;

pub use consistency::{ConsistencyError, DependencyGraph};
pub use local_files::{check_local_files, LocalFileError};
