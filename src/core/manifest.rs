//! Resolved package manifests.
//!
//! A [`ResolvedManifest`] is what the (external) resolver hands to the
//! compiler: the parsed manifest of one coordinate plus the remote location
//! it was fetched from. Archive files are addressed relative to that location.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::coordinate::Coordinate;
use crate::core::cxx::CxxLanguageFeature;

/// A manifest together with the remote location it was resolved from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedManifest {
    /// Location of the manifest file. Archives sit next to it.
    pub remote: Url,

    #[serde(flatten)]
    pub manifest: Manifest,
}

impl ResolvedManifest {
    pub fn new(remote: Url, manifest: Manifest) -> Self {
        ResolvedManifest { remote, manifest }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.manifest.coordinate
    }
}

/// Package manifest schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub coordinate: Coordinate,

    /// Dependencies that are fixed to an exact coordinate.
    #[serde(default)]
    pub dependencies: Vec<HardNameDependency>,

    #[serde(default)]
    pub interfaces: Option<Interfaces>,

    #[serde(default)]
    pub android: Option<Android>,

    #[serde(default, rename = "iOS", alias = "ios")]
    pub ios: Option<Ios>,

    #[serde(default)]
    pub linux: Option<Linux>,

    /// Example source code showing how to use the package.
    #[serde(default)]
    pub example: String,
}

impl Manifest {
    pub fn new(coordinate: Coordinate) -> Self {
        Manifest {
            coordinate,
            ..Manifest::default()
        }
    }

    /// The header-only archive, if the manifest declares one.
    pub fn headers(&self) -> Option<&Archive> {
        self.interfaces.as_ref().and_then(|i| i.headers.as_ref())
    }

    /// Number of iOS archives across the whole manifest.
    pub fn ios_archive_count(&self) -> usize {
        self.ios.as_ref().map_or(0, |ios| ios.archives.len())
    }
}

/// A dependency on an exact coordinate, e.g. `compile: com.github.jomof:boringssl:0.0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardNameDependency {
    /// The coordinate text, parsed when the find-module is built.
    pub compile: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl HardNameDependency {
    pub fn new(compile: impl Into<String>) -> Self {
        HardNameDependency {
            compile: compile.into(),
            sha256: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interfaces {
    #[serde(default)]
    pub headers: Option<Archive>,
}

/// A platform-independent archive (headers).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    /// Include folder relative to the archive root.
    #[serde(default)]
    pub include: Option<String>,
    /// C++ language features consumers must compile with.
    #[serde(default)]
    pub requires: Vec<CxxLanguageFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Android {
    #[serde(default)]
    pub archives: Vec<AndroidArchive>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AndroidArchive {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub ndk: Option<String>,
    #[serde(default)]
    pub compiler: Option<String>,
    /// STL runtime family, e.g. `c++` or `gnustl`. Absent for runtime-neutral archives.
    #[serde(default)]
    pub runtime: Option<String>,
    /// Minimum API level as text, e.g. `21`.
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub builder: Option<String>,
    #[serde(default)]
    pub abi: Option<AndroidAbi>,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub flavor: Option<String>,
}

/// An Android ABI name such as `x86_64` or `armeabi-v7a`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AndroidAbi(String);

impl AndroidAbi {
    pub fn new(name: impl Into<String>) -> Self {
        AndroidAbi(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AndroidAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ios {
    #[serde(default)]
    pub archives: Vec<IosArchive>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IosArchive {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub platform: Option<IosPlatform>,
    #[serde(default)]
    pub architecture: Option<IosArchitecture>,
    /// SDK version, e.g. `9.3`.
    #[serde(default)]
    pub sdk: String,
    #[serde(default)]
    pub include: Option<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub flavor: Option<String>,
}

impl IosArchive {
    /// `platform + sdk`, e.g. `iPhoneOS9.3`, matched against the sysroot SDK name.
    pub fn platform_sdk(&self) -> String {
        match self.platform {
            Some(platform) => format!("{}{}", platform, self.sdk),
            None => self.sdk.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IosPlatform {
    #[serde(rename = "iPhoneOS")]
    IPhoneOs,
    #[serde(rename = "iPhoneSimulator")]
    IPhoneSimulator,
}

impl fmt::Display for IosPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IosPlatform::IPhoneOs => f.write_str("iPhoneOS"),
            IosPlatform::IPhoneSimulator => f.write_str("iPhoneSimulator"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IosArchitecture {
    Armv7,
    Armv7s,
    Arm64,
    I386,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl fmt::Display for IosArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IosArchitecture::Armv7 => "armv7",
            IosArchitecture::Armv7s => "armv7s",
            IosArchitecture::Arm64 => "arm64",
            IosArchitecture::I386 => "i386",
            IosArchitecture::X86_64 => "x86_64",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Linux {
    #[serde(default)]
    pub archives: Vec<LinuxArchive>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinuxArchive {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub sha256: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default)]
    pub include: Option<String>,
}

/// A file holding several resolved manifests, as handed over by the resolver.
///
/// ```toml
/// [[package]]
/// remote = "https://example.com/sqlite/cdep-manifest.yml"
/// coordinate = "com.github.jomof:sqlite:3.16.2"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestSet {
    #[serde(default, rename = "package")]
    pub packages: Vec<ResolvedManifest>,
}

impl ManifestSet {
    /// Load a manifest set from a `.toml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifests: {}", path.display()))?;

        let set: ManifestSet = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse manifests: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .with_context(|| format!("failed to parse manifests: {}", path.display()))?,
        };

        let mut seen = BTreeMap::new();
        for package in &set.packages {
            if let Some(prior) = seen.insert(package.coordinate(), package.remote.clone()) {
                bail!(
                    "coordinate `{}` is resolved twice ({} and {})",
                    package.coordinate(),
                    prior,
                    package.remote
                );
            }
        }

        tracing::debug!(
            "loaded {} resolved manifests from {}",
            set.packages.len(),
            path.display()
        );

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SQLITE: &str = r##"
[[package]]
remote = "https://github.com/jomof/sqlite/releases/download/3.16.2-rev25/cdep-manifest.yml"
coordinate = "com.github.jomof:sqlite:3.16.2-rev25"
example = "#include <sqlite3.h>"

[[package.dependencies]]
compile = "com.github.jomof:boringssl:0.0.0"

[package.interfaces.headers]
file = "sqlite-header.zip"
sha256 = "abcdef"
size = 12
include = "include"
requires = ["cxx_auto_type"]

[[package.android.archives]]
file = "sqlite-android-cxx-platform-12.zip"
sha256 = "45a104d61786eaf163b3006aa989922c5c04b7d4"
size = 440017
runtime = "c++"
platform = "12"
abi = "armeabi"
libs = ["libsqlite.a"]

[[package.iOS.archives]]
file = "sqlite-ios-platform-iPhoneOS.zip"
sha256 = "1234"
size = 10
platform = "iPhoneOS"
architecture = "armv7s"
sdk = "10.2"
libs = ["libsqlite.a"]
"##;

    #[test]
    fn test_load_toml_manifest_set() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifests.toml");
        std::fs::write(&path, SQLITE).unwrap();

        let set = ManifestSet::load(&path).unwrap();
        assert_eq!(set.packages.len(), 1);

        let resolved = &set.packages[0];
        assert_eq!(
            resolved.coordinate(),
            Coordinate::new("com.github.jomof", "sqlite", "3.16.2-rev25")
        );
        assert_eq!(resolved.manifest.dependencies[0].compile, "com.github.jomof:boringssl:0.0.0");

        let headers = resolved.manifest.headers().unwrap();
        assert_eq!(headers.include.as_deref(), Some("include"));
        assert_eq!(headers.requires, vec![CxxLanguageFeature::AutoType]);

        let android = &resolved.manifest.android.as_ref().unwrap().archives[0];
        assert_eq!(android.runtime.as_deref(), Some("c++"));
        assert_eq!(android.abi, Some(AndroidAbi::new("armeabi")));
        assert_eq!(android.size, 440017);

        let ios = &resolved.manifest.ios.as_ref().unwrap().archives[0];
        assert_eq!(ios.platform_sdk(), "iPhoneOS10.2");
        assert_eq!(ios.architecture, Some(IosArchitecture::Armv7s));
    }

    #[test]
    fn test_load_rejects_duplicate_coordinates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifests.toml");
        let twice = format!(
            "{}\n[[package]]\nremote = \"https://example.com/other.yml\"\ncoordinate = \"com.github.jomof:sqlite:3.16.2-rev25\"\n",
            SQLITE
        );
        std::fs::write(&path, twice).unwrap();

        let err = ManifestSet::load(&path).unwrap_err();
        assert!(err.to_string().contains("resolved twice"));
    }

    #[test]
    fn test_load_json_manifest_set() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifests.json");
        std::fs::write(
            &path,
            r#"{"package": [{"remote": "https://example.com/m.yml", "coordinate": "g:a:1",
                "linux": {"archives": [{"file": "a.zip", "sha256": "00", "size": 3}]}}]}"#,
        )
        .unwrap();

        let set = ManifestSet::load(&path).unwrap();
        let linux = set.packages[0].manifest.linux.as_ref().unwrap();
        assert_eq!(linux.archives[0].file, "a.zip");
        assert!(linux.archives[0].include.is_none());
    }
}
