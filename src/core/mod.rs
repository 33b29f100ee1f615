//! Core data structures.
//!
//! - Interned package coordinates
//! - Resolved manifests and their per-platform archives
//! - C++ language standards and features

pub mod coordinate;
pub mod cxx;
pub mod manifest;

pub use coordinate::{Coordinate, CoordinateParseError};
pub use cxx::{CxxLanguageFeature, CxxStandard};
pub use manifest::{Manifest, ManifestSet, ResolvedManifest};
