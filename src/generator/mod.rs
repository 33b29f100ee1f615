//! Build-script generators.
//!
//! Each generator takes a checked function table, applies the lowering it
//! needs on its own copy, and renders text. Writing the text to disk is a
//! separate step ([`write_files`]) so generators stay pure.

pub mod cmake;
pub mod examples;
pub mod ndk_build;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use crate::ast::{Arena, Ast, ExprId, ModuleArchive};
use crate::core::Coordinate;
use crate::util::config::{self, GeneratorConfig};
use crate::visit::readonly::{walk, Visitor};

pub use cmake::CMakeGenerator;
pub use ndk_build::NdkBuildGenerator;

/// A tree a generator cannot render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("archive for {coordinate} still lists C++ language features; the standard was not lowered")]
    UnloweredFeatures { coordinate: Coordinate },

    #[error("cannot generate {what}")]
    UnsupportedShape { what: String },
}

impl GenerateError {
    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        GenerateError::UnsupportedShape { what: what.into() }
    }
}

/// Where generated files go and how generated scripts call back for archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorEnvironment {
    pub working_folder: PathBuf,
    /// Where archives are unpacked.
    pub exploded_folder: PathBuf,
    /// Where build-system fragments are written.
    pub modules_folder: PathBuf,
    /// Where example projects are written.
    pub examples_folder: PathBuf,
    /// Command prefix for `fetch-archive`.
    pub callback: Vec<String>,
}

impl GeneratorEnvironment {
    /// Defaults for `working_folder`.
    pub fn new(working_folder: impl Into<PathBuf>) -> Self {
        Self::from_config(&GeneratorConfig::default(), working_folder)
    }

    /// Resolve configured folders against the working folder.
    pub fn from_config(config: &GeneratorConfig, working_folder: impl Into<PathBuf>) -> Self {
        let default_working = working_folder.into();
        let paths = &config.paths;
        let working_folder = match &paths.working_folder {
            Some(folder) => resolve(&default_working, folder),
            None => default_working,
        };

        let exploded_folder = match &paths.exploded_folder {
            Some(folder) => resolve(&working_folder, folder),
            None => config::global_config_dir()
                .unwrap_or_else(|| working_folder.join(".cdep"))
                .join("exploded"),
        };
        let modules_folder = match &paths.modules_folder {
            Some(folder) => resolve(&working_folder, folder),
            None => working_folder.join(".cdep").join("modules"),
        };
        let examples_folder = match &paths.examples_folder {
            Some(folder) => resolve(&working_folder, folder),
            None => working_folder.join(".cdep").join("examples"),
        };

        let callback = if config.callback.command.is_empty() {
            vec![
                "cdep".to_string(),
                "--working-folder".to_string(),
                script_path(&working_folder),
            ]
        } else {
            config.callback.command.clone()
        };

        GeneratorEnvironment {
            working_folder,
            exploded_folder,
            modules_folder,
            examples_folder,
            callback,
        }
    }

    /// The command line that fetches and unpacks one archive.
    pub fn fetch_archive_call(&self, coordinate: Coordinate, archive: &ModuleArchive) -> String {
        let mut parts = self.callback.clone();
        parts.push("fetch-archive".to_string());
        parts.push(coordinate.to_string());
        parts.push(archive.remote.to_string());
        parts.push(archive.size.to_string());
        parts.push(archive.sha256.clone());
        parts.join(" ")
    }
}

fn resolve(base: &Path, folder: &Path) -> PathBuf {
    let folder = config::expand_home(folder);
    if folder.is_absolute() {
        folder
    } else {
        base.join(folder)
    }
}

/// A path as build scripts spell it, with forward slashes.
pub(crate) fn script_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `add_cdep_<artifact>_dependency`, with `-` and `/` mapped to `_`.
pub fn add_dependency_function_name(coordinate: Coordinate) -> String {
    format!("add_cdep_{}_dependency", coordinate.artifact_id()).replace(['-', '/'], "_")
}

/// Where a coordinate's files live below `root`.
pub(crate) fn coordinate_folder(root: &Path, coordinate: Coordinate) -> PathBuf {
    root.join(coordinate.group_id())
        .join(coordinate.artifact_id())
        .join(coordinate.version())
}

/// One file produced by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        GeneratedFile {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Write generated files, creating parent folders.
pub fn write_files(files: &[GeneratedFile]) -> Result<()> {
    for file in files {
        if let Some(parent) = file.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        info!("Generating {}", file.path.display());
        std::fs::write(&file.path, &file.contents)
            .with_context(|| format!("failed to write {}", file.path.display()))?;
    }
    Ok(())
}

/// Fail if any archive still carries a feature list.
pub fn require_lowered(ast: &Ast) -> Result<(), GenerateError> {
    let mut finder = UnloweredArchives::default();
    finder.visit(&ast.arena, ast.root);
    match finder.found {
        Some(coordinate) => Err(GenerateError::UnloweredFeatures { coordinate }),
        None => Ok(()),
    }
}

#[derive(Default)]
struct UnloweredArchives {
    current: Option<Coordinate>,
    found: Option<Coordinate>,
}

impl Visitor for UnloweredArchives {
    fn visit_find_module(&mut self, arena: &Arena, id: ExprId, find: &crate::ast::FindModule) {
        self.current = Some(find.coordinate);
        walk(self, arena, id);
    }

    fn visit_module_archive(&mut self, _arena: &Arena, _id: ExprId, archive: &ModuleArchive) {
        if self.found.is_none() && !archive.requires.is_empty() {
            self.found = Some(self.current.unwrap_or_default());
        }
    }
}
