//! Resolved manifests shared by the unit tests.
//!
//! Archive digests are `sha(label)` so tests can tell which archive a
//! binding selected by its label alone.

use sha2::{Digest, Sha256};
use url::Url;

use crate::core::manifest::{
    AndroidAbi, AndroidArchive, Archive, HardNameDependency, Interfaces, IosArchitecture,
    IosArchive, IosPlatform, Linux, LinuxArchive,
};
use crate::core::{Coordinate, CxxLanguageFeature, Manifest, ResolvedManifest};

/// Digest used for the archive labelled `label`.
pub fn sha(label: &str) -> String {
    hex::encode(Sha256::digest(label.as_bytes()))
}

/// A manifest with no archives, resolved from a github-style release URL.
pub fn resolved(coordinate: Coordinate) -> ResolvedManifest {
    let remote = format!(
        "https://github.com/{}/{}/releases/download/{}/cdep-manifest.yml",
        coordinate.group_id().rsplit('.').next().unwrap_or_default(),
        coordinate.artifact_id(),
        coordinate.version()
    );
    ResolvedManifest::new(Url::parse(&remote).unwrap(), Manifest::new(coordinate))
}

fn headers(file: &str, label: &str, requires: Vec<CxxLanguageFeature>) -> Option<Interfaces> {
    Some(Interfaces {
        headers: Some(Archive {
            file: file.to_string(),
            sha256: sha(label),
            size: 1024,
            include: Some("include".to_string()),
            requires,
        }),
    })
}

/// sqlite for Android.
///
/// | runtime | platform | ABIs          |
/// |---------|----------|---------------|
/// | c++     | 12       | x86_64        |
/// | c++     | 21       | x86, x86_64   |
/// | gnustl  | 21       | x86, x86_64   |
pub fn android_manifest() -> ResolvedManifest {
    let mut resolved = resolved(Coordinate::new("com.github.jomof", "sqlite", "3.16.2"));
    let mut archives = Vec::new();
    for (runtime, file_runtime, platform, abi) in [
        ("c++", "cxx", "12", "x86_64"),
        ("c++", "cxx", "21", "x86"),
        ("c++", "cxx", "21", "x86_64"),
        ("gnustl", "gnustl", "21", "x86"),
        ("gnustl", "gnustl", "21", "x86_64"),
    ] {
        archives.push(AndroidArchive {
            file: format!("sqlite-android-{}-platform-{}-{}.zip", file_runtime, platform, abi),
            sha256: sha(&format!("{}-{}-{}", runtime, platform, abi)),
            size: 440017,
            ndk: Some("r13b".to_string()),
            compiler: Some("clang".to_string()),
            runtime: Some(runtime.to_string()),
            platform: Some(platform.to_string()),
            builder: Some("cmake".to_string()),
            abi: Some(AndroidAbi::new(abi)),
            include: Some("include".to_string()),
            libs: vec!["libsqlite.a".to_string()],
            flavor: None,
        });
    }
    resolved.manifest.android = Some(crate::core::manifest::Android { archives });
    resolved
}

/// sqlite for iOS: three armv7 SDKs and one arm64 SDK.
pub fn ios_manifest() -> ResolvedManifest {
    let mut resolved = resolved(Coordinate::new("com.github.jomof", "sqlite", "3.16.2"));
    let mut archives = Vec::new();
    for (platform, sdk, architecture) in [
        (IosPlatform::IPhoneOs, "9.3", IosArchitecture::Armv7),
        (IosPlatform::IPhoneSimulator, "9.3", IosArchitecture::Armv7),
        (IosPlatform::IPhoneSimulator, "10.0", IosArchitecture::Armv7),
        (IosPlatform::IPhoneOs, "9.3", IosArchitecture::Arm64),
    ] {
        let label = format!("{}{}-{}", platform, sdk, architecture);
        archives.push(IosArchive {
            file: format!("sqlite-ios-platform-{}-architecture-{}-sdk-{}.zip", platform, architecture, sdk),
            sha256: sha(&label),
            size: 2048,
            platform: Some(platform),
            architecture: Some(architecture),
            sdk: sdk.to_string(),
            include: Some("include".to_string()),
            libs: vec!["libsqlite.a".to_string()],
            flavor: None,
        });
    }
    resolved.manifest.ios = Some(crate::core::manifest::Ios { archives });
    resolved
}

/// sqlite for iOS with a single iPhoneOS 9.3 armv7 archive.
pub fn single_ios_manifest() -> ResolvedManifest {
    let mut resolved = ios_manifest();
    if let Some(ios) = resolved.manifest.ios.as_mut() {
        ios.archives.truncate(1);
    }
    resolved
}

/// vectorial: headers only.
pub fn header_only_manifest() -> ResolvedManifest {
    let mut resolved = resolved(Coordinate::new("com.github.jomof", "vectorial", "0.0.0"));
    resolved.manifest.interfaces = headers("vectorial.zip", "vectorial", Vec::new());
    resolved
}

/// mathfu: headers only, depending on vectorial.
pub fn dependent_manifest() -> ResolvedManifest {
    let mut resolved = resolved(Coordinate::new("com.github.jomof", "mathfu", "1.0.2"));
    resolved.manifest.interfaces = headers("mathfu.zip", "mathfu", Vec::new());
    resolved.manifest.dependencies = vec![HardNameDependency::new("com.github.jomof:vectorial:0.0.0")];
    resolved
}

/// zlib for Linux.
pub fn linux_manifest() -> ResolvedManifest {
    let mut resolved = resolved(Coordinate::new("com.github.jomof", "zlib", "1.2.11"));
    resolved.manifest.linux = Some(Linux {
        archives: vec![LinuxArchive {
            file: "zlib-linux.zip".to_string(),
            sha256: sha("zlib-linux"),
            size: 4096,
            libs: vec!["libz.a".to_string()],
            include: Some("include".to_string()),
        }],
    });
    resolved
}

/// boost-style headers that need C++14 language features.
pub fn requires_manifest() -> ResolvedManifest {
    let mut resolved = resolved(Coordinate::new("com.github.jomof", "boost", "1.0.63"));
    resolved.manifest.interfaces = headers(
        "boost_1_63_0.zip",
        "boost",
        vec![CxxLanguageFeature::AutoType, CxxLanguageFeature::DecltypeAuto],
    );
    resolved
}

/// Two header packages where `upper` depends on `lower` and both ship the same file.
pub fn duplicate_content_pair() -> (ResolvedManifest, ResolvedManifest) {
    let mut lower = resolved(Coordinate::new("com.example", "lower", "1.0.0"));
    lower.manifest.interfaces = headers("shared-headers.zip", "shared", Vec::new());

    let mut upper = resolved(Coordinate::new("com.example", "upper", "1.0.0"));
    upper.manifest.interfaces = headers("shared-headers.zip", "shared", Vec::new());
    upper.manifest.dependencies = vec![HardNameDependency::new(lower.coordinate().to_string())];
    (lower, upper)
}

/// A header package with its own content that depends on `dependee`.
pub fn middle_manifest(dependee: Coordinate) -> ResolvedManifest {
    let mut middle = resolved(Coordinate::new("com.example", "middle", "1.0.0"));
    middle.manifest.interfaces = headers("middle.zip", "middle", Vec::new());
    middle.manifest.dependencies = vec![HardNameDependency::new(dependee.to_string())];
    middle
}

/// `depth` layers of two header packages, `left<n>` and `right<n>`, each
/// depending on both packages of the layer below.
pub fn diamond_ladder(depth: usize) -> Vec<ResolvedManifest> {
    let coordinate = |layer: usize, side: &str| {
        Coordinate::new("com.example", format!("{}{}", side, layer), "1.0.0")
    };
    let mut manifests = Vec::new();
    for layer in 0..depth {
        for side in ["left", "right"] {
            let label = format!("{}{}", side, layer);
            let mut manifest = resolved(coordinate(layer, side));
            manifest.manifest.interfaces = headers(&format!("{}.zip", label), &label, Vec::new());
            if layer + 1 < depth {
                manifest.manifest.dependencies = ["left", "right"]
                    .iter()
                    .map(|below| HardNameDependency::new(coordinate(layer + 1, below).to_string()))
                    .collect();
            }
            manifests.push(manifest);
        }
    }
    manifests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha_is_sha256_hex() {
        assert_eq!(
            sha("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
