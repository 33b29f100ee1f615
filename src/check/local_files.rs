//! Verify that unpacked archives contain what their manifests promise.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::ast::Ast;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::visit::{Bindings, InterpretError, Interpreter, ResolvedArchive};

#[derive(Debug, Error)]
pub enum LocalFileError {
    #[error("Expected '{}' folder to be created but it wasn't.", .0.display())]
    MissingFolder(PathBuf),

    #[error(
        "Downloaded '{remote}' did not contain include folder '{name}' at its root.\n\
         Local path: {}\n \
         If you own this package you can add \"include:\" to the archive entry in \
         cdep-manifest.yml to indicate that there is no include folder.",
        path.display()
    )]
    MissingInclude {
        remote: Url,
        name: String,
        path: PathBuf,
    },

    #[error(
        "Downloaded '{remote}' did not contain library '{folder}/{name}' at its root.\nLocal path: {}",
        path.display()
    )]
    MissingLibrary {
        remote: Url,
        folder: String,
        name: String,
        path: PathBuf,
    },

    #[error("could not enumerate archives")]
    Interpret(#[from] InterpretError),
}

impl LocalFileError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string());
        match self {
            LocalFileError::MissingFolder(path)
            | LocalFileError::MissingInclude { path, .. }
            | LocalFileError::MissingLibrary { path, .. } => diagnostic
                .with_location(path)
                .with_suggestion(suggestions::MISSING_DOWNLOAD),
            LocalFileError::Interpret(source) => diagnostic.with_context(source.to_string()),
        }
    }
}

/// Check every archive reachable on any control path against `exploded_root`.
///
/// Stops at the first missing folder or file.
pub fn check_local_files(ast: &Ast, exploded_root: &Path) -> Result<(), LocalFileError> {
    let globals = *ast.globals().ok_or(InterpretError::NotAFunctionTable)?;
    let env = Bindings::new(globals).with_exploded_root(exploded_root);
    let value = Interpreter::all_branches(&ast.arena, &env).evaluate(ast.root)?;

    let mut checked = BTreeSet::new();
    for archive in value.archives() {
        if !checked.insert(archive.sha256.as_str()) {
            continue;
        }
        check_archive(archive)?;
    }
    debug!("verified {} unpacked archives", checked.len());
    Ok(())
}

fn check_archive(archive: &ResolvedArchive) -> Result<(), LocalFileError> {
    if let Some(include) = &archive.include_path {
        require_parent(include)?;
        if !include.is_dir() {
            return Err(LocalFileError::MissingInclude {
                remote: archive.remote.clone(),
                name: file_name(include),
                path: include.clone(),
            });
        }
    }
    for library in &archive.library_paths {
        let parent = require_parent(library)?;
        if !library.is_file() {
            return Err(LocalFileError::MissingLibrary {
                remote: archive.remote.clone(),
                folder: file_name(parent),
                name: file_name(library),
                path: library.clone(),
            });
        }
    }
    Ok(())
}

fn require_parent(path: &Path) -> Result<&Path, LocalFileError> {
    match path.parent() {
        Some(parent) if parent.is_dir() => Ok(parent),
        Some(parent) => Err(LocalFileError::MissingFolder(parent.to_path_buf())),
        None => Err(LocalFileError::MissingFolder(path.to_path_buf())),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::FunctionTableBuilder;
    use crate::test_support::{fixtures, unpack_fake_archives};
    use std::fs;
    use tempfile::TempDir;

    fn linux_ast() -> Ast {
        let mut builder = FunctionTableBuilder::new();
        builder.add_manifest(fixtures::linux_manifest());
        builder.build().unwrap()
    }

    fn archive_folder(root: &Path) -> PathBuf {
        root.join("com.github.jomof/zlib/1.2.11/zlib-linux.zip")
    }

    #[test]
    fn test_missing_archive_folder() {
        let tmp = TempDir::new().unwrap();
        let err = check_local_files(&linux_ast(), tmp.path()).unwrap_err();
        assert!(matches!(err, LocalFileError::MissingFolder(_)));
        assert!(err.to_string().ends_with("folder to be created but it wasn't."));

        let diag = err.to_diagnostic().format(false);
        assert!(diag.contains("  --> "));
        assert!(diag.contains("fetch its archives again"));
    }

    #[test]
    fn test_missing_include_folder() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(archive_folder(tmp.path())).unwrap();

        let err = check_local_files(&linux_ast(), tmp.path()).unwrap_err();
        let LocalFileError::MissingInclude { name, remote, .. } = &err else {
            panic!("expected missing include, got {:?}", err);
        };
        assert_eq!(name, "include");
        assert_eq!(
            remote.as_str(),
            "https://github.com/jomof/zlib/releases/download/1.2.11/zlib-linux.zip"
        );
        assert!(err.to_string().contains("did not contain include folder 'include'"));
    }

    #[test]
    fn test_missing_library_names_folder_and_file() {
        let tmp = TempDir::new().unwrap();
        let folder = archive_folder(tmp.path());
        fs::create_dir_all(folder.join("include")).unwrap();
        fs::create_dir_all(folder.join("lib")).unwrap();

        let err = check_local_files(&linux_ast(), tmp.path()).unwrap_err();
        assert!(
            err.to_string().contains("did not contain library 'lib/libz.a' at its root"),
            "{}",
            err
        );
    }

    #[test]
    fn test_complete_tree_passes() {
        let tmp = TempDir::new().unwrap();
        unpack_fake_archives(tmp.path(), &fixtures::linux_manifest());

        check_local_files(&linux_ast(), tmp.path()).unwrap();
    }

    #[test]
    fn test_every_android_branch_is_checked() {
        let mut builder = FunctionTableBuilder::new();
        builder.add_manifest(fixtures::android_manifest());
        let ast = builder.build().unwrap();

        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("com.github.jomof/sqlite/3.16.2");
        // Only the first ABI is unpacked.
        let first = base.join("sqlite-android-cxx-platform-12-x86_64.zip/lib/x86_64");
        fs::create_dir_all(&first).unwrap();
        fs::write(first.join("libsqlite.a"), b"").unwrap();

        let err = check_local_files(&ast, tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            LocalFileError::MissingFolder(_) | LocalFileError::MissingLibrary { .. }
        ));
    }
}
