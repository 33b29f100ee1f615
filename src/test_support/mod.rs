//! Test utilities for cdep unit tests.
//!
//! - [`fixtures`]: resolved manifests for each platform shape
//! - [`write_manifest_set`]: put manifests on disk the way the resolver hands them over
//! - [`unpack_fake_archives`]: lay out an exploded tree without downloading anything

pub mod fixtures;

use std::path::{Path, PathBuf};

use crate::core::{ManifestSet, ResolvedManifest};

/// Write `manifests` as a JSON manifest set under `dir`.
pub fn write_manifest_set(dir: &Path, manifests: Vec<ResolvedManifest>) -> PathBuf {
    let path = dir.join("manifests.json");
    let set = ManifestSet {
        packages: manifests,
    };
    let json = serde_json::to_string_pretty(&set).unwrap();
    std::fs::write(&path, json).unwrap();
    path
}

/// Create the include folder and empty library files of every Linux
/// and header archive of `resolved` under `exploded_root`.
pub fn unpack_fake_archives(exploded_root: &Path, resolved: &ResolvedManifest) {
    let coordinate = resolved.coordinate();
    let folder = exploded_root
        .join(coordinate.group_id())
        .join(coordinate.artifact_id())
        .join(coordinate.version());

    if let Some(headers) = resolved.manifest.headers() {
        let archive = folder.join(&headers.file);
        if let Some(include) = &headers.include {
            std::fs::create_dir_all(archive.join(include)).unwrap();
        }
    }
    for archive in resolved.manifest.linux.iter().flat_map(|l| &l.archives) {
        let root = folder.join(&archive.file);
        if let Some(include) = &archive.include {
            std::fs::create_dir_all(root.join(include)).unwrap();
        }
        for lib in &archive.libs {
            let path = root.join("lib").join(lib);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"").unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_set_written_to_disk_loads_back() {
        let tmp = TempDir::new().unwrap();
        let path = write_manifest_set(
            tmp.path(),
            vec![fixtures::linux_manifest(), fixtures::header_only_manifest()],
        );

        let set = ManifestSet::load(&path).unwrap();
        assert_eq!(set.packages.len(), 2);
        assert_eq!(set.packages[0], fixtures::linux_manifest());
    }
}
