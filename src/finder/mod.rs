//! Construction of find-module decision trees from resolved manifests.
//!
//! One [`FindModule`] is built per coordinate. Its body switches on the
//! target system, then per platform on runtime, API level, ABI,
//! architecture and SDK until it reaches either a `Module` or an `Abort`.
//! Manifest defects discovered here become `Abort` nodes so that every
//! backend reports them identically.

mod android;
mod darwin;

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::ast::{Arena, Ast, ExprId, Expression, FindModule, FunctionTable, GlobalEnv};
use crate::check::consistency::{self, ConsistencyError};
use crate::core::{Coordinate, CxxLanguageFeature, ResolvedManifest};
use crate::lower;
use crate::util::text::join_on;

/// Failure to produce a checked function table.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// Accumulates resolved manifests, then builds the function table.
#[derive(Debug, Default)]
pub struct FunctionTableBuilder {
    manifests: BTreeMap<Coordinate, ResolvedManifest>,
}

impl FunctionTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a manifest. A later manifest for the same coordinate replaces the earlier one.
    pub fn add_manifest(&mut self, resolved: ResolvedManifest) {
        self.manifests.insert(resolved.coordinate(), resolved);
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Build, hoist references, lift assignments and run the consistency gate.
    pub fn build(&self) -> Result<Ast, CompileError> {
        let ast = self.build_unlowered();
        let ast = lower::hoist_references(ast);
        let ast = lower::lift_assignments(ast);
        consistency::check(&ast)?;
        debug!(
            "built function table with {} find modules ({} nodes)",
            self.manifests.len(),
            ast.arena.len()
        );
        Ok(ast)
    }

    /// The tree exactly as constructed, before any pass runs.
    ///
    /// Assignments appear inline wherever they are used. The interpreter
    /// accepts this form, which makes it the reference for lowering.
    pub fn build_unlowered(&self) -> Ast {
        let mut arena = Arena::new();
        let globals = GlobalEnv::alloc(&mut arena);
        let globals_id = arena.alloc(Expression::GlobalEnv(globals));

        let mut find_functions = BTreeMap::new();
        for (coordinate, resolved) in &self.manifests {
            let find = FindModuleBuilder::new(&mut arena, globals, resolved).build(globals_id);
            find_functions.insert(*coordinate, find);
        }

        let mut examples = BTreeMap::new();
        for (coordinate, resolved) in &self.manifests {
            if resolved.manifest.example.is_empty() {
                continue;
            }
            examples.insert(*coordinate, arena.example(resolved.manifest.example.clone()));
        }

        let root = arena.alloc(Expression::FunctionTable(FunctionTable {
            globals: globals_id,
            find_functions,
            examples,
        }));
        Ast::new(arena, root)
    }
}

/// Archive fields common to every platform's archive entries.
pub(crate) struct ArchiveSpec<'m> {
    pub file: &'m str,
    pub sha256: &'m str,
    pub size: u64,
    pub include: Option<&'m str>,
    pub requires: &'m [CxxLanguageFeature],
    /// Library files relative to the archive's `lib` folder.
    pub libs: Vec<String>,
}

/// Builds the find-module for one manifest.
pub(crate) struct FindModuleBuilder<'a> {
    pub arena: &'a mut Arena,
    pub globals: GlobalEnv,
    pub resolved: &'a ResolvedManifest,
    pub dependencies: BTreeSet<Coordinate>,
    /// Assignment holding `{exploded root}/{group}/{artifact}/{version}`.
    pub exploded_folder: ExprId,
    /// Aborts for dependency strings that failed to parse.
    bad_dependencies: Vec<ExprId>,
}

impl<'a> FindModuleBuilder<'a> {
    fn new(arena: &'a mut Arena, globals: GlobalEnv, resolved: &'a ResolvedManifest) -> Self {
        let coordinate = resolved.coordinate();

        let mut dependencies = BTreeSet::new();
        let mut bad_dependencies = Vec::new();
        for dependency in &resolved.manifest.dependencies {
            match Coordinate::parse(&dependency.compile) {
                Ok(parsed) => {
                    dependencies.insert(parsed);
                }
                Err(_) => {
                    let message = format!(
                        "Could not parse dependency coordinate '{}' in {}",
                        dependency.compile, coordinate
                    );
                    bad_dependencies.push(arena.abort(message, Vec::new()));
                }
            }
        }

        // Like {root}/com.github.jomof/vectorial/1.0.0
        let group = arena.string(coordinate.group_id());
        let group = arena.assign("coordinate_group_id", group);
        let artifact = arena.string(coordinate.artifact_id());
        let artifact = arena.assign("coordinate_artifact_id", artifact);
        let version = arena.string(coordinate.version());
        let version = arena.assign("coordinate_version", version);
        let tail = arena.join_file_segments(group, vec![artifact, version]);
        let tail = arena.assign("exploded_archive_tail", tail);
        let folder = arena.join_file_segments(globals.exploded_root, vec![tail]);
        let exploded_folder = arena.assign("exploded_archive_folder", folder);

        FindModuleBuilder {
            arena,
            globals,
            resolved,
            dependencies,
            exploded_folder,
            bad_dependencies,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.resolved.coordinate()
    }

    fn build(mut self, globals_id: ExprId) -> ExprId {
        let resolved = self.resolved;
        let manifest = &resolved.manifest;
        let coordinate = self.coordinate();

        let mut cases: Vec<(&str, ExprId)> = Vec::new();
        if let Some(android) = &manifest.android {
            let case = self.android_runtime_case(&android.archives);
            cases.push(("Android", case));
        }
        if let Some(ios) = &manifest.ios {
            let case = self.darwin_case(&ios.archives);
            cases.push(("Darwin", case));
        }
        if let Some(archive) = manifest.linux.as_ref().and_then(|l| l.archives.first()) {
            let case = self.archive_module(ArchiveSpec {
                file: &archive.file,
                sha256: &archive.sha256,
                size: archive.size,
                include: archive.include.as_deref(),
                requires: &[],
                libs: archive.libs.clone(),
            });
            cases.push(("Linux", case));
        }
        if cases.is_empty() && manifest.headers().is_some() {
            for system in ["Android", "Darwin", "Linux"] {
                let nop = self.arena.nop();
                cases.push((system, nop));
            }
        }

        let supported: Vec<&str> = cases.iter().map(|(system, _)| *system).collect();
        let otherwise = if supported.is_empty() {
            let message = format!("Module '{}' doesn't support any platforms.", coordinate);
            self.arena.abort(message, Vec::new())
        } else {
            let message = format!(
                "Target platform %s is not supported by {}. Supported: {}",
                coordinate,
                join_on(" ", &supported)
            );
            self.arena.abort(message, vec![self.globals.target_system])
        };

        let mut conditions = Vec::with_capacity(cases.len());
        let mut branches = Vec::with_capacity(cases.len());
        for (system, branch) in cases {
            let system = self.arena.string(system);
            conditions.push(self.arena.eq(self.globals.target_system, system));
            branches.push(branch);
        }
        let mut body = self.arena.if_switch(conditions, branches, otherwise);

        if let Some(headers) = manifest.headers() {
            let header_module = self.archive_module(ArchiveSpec {
                file: &headers.file,
                sha256: &headers.sha256,
                size: headers.size,
                include: headers.include.as_deref(),
                requires: &headers.requires,
                libs: Vec::new(),
            });
            body = self.arena.multi(vec![header_module, body]);
        }

        if !self.bad_dependencies.is_empty() {
            let mut statements = std::mem::take(&mut self.bad_dependencies);
            statements.push(body);
            body = self.arena.multi(statements);
        }

        let (header_archive, include) = match manifest.headers() {
            Some(headers) if !headers.file.is_empty() => {
                (Some(headers.file.clone()), headers.include.clone())
            }
            _ => (None, None),
        };

        self.arena.alloc(Expression::FindModule(FindModule {
            globals: globals_id,
            coordinate,
            header_archive,
            include,
            body,
        }))
    }

    /// A `Module` for one archive, or an `Abort` if the entry is malformed.
    pub fn archive_module(&mut self, spec: ArchiveSpec<'_>) -> ExprId {
        if spec.file.is_empty() || spec.sha256.is_empty() || spec.size == 0 {
            let message = format!("Archive in {} was malformed", self.resolved.remote);
            return self.arena.abort(message, Vec::new());
        }
        let remote = match archive_url(&self.resolved.remote, spec.file) {
            Some(remote) => remote,
            None => {
                return self.arena.abort(
                    "Archive file could not be converted to URL. It is likely an illegal path.",
                    Vec::new(),
                )
            }
        };

        let mut libs = Vec::with_capacity(spec.libs.len());
        let mut library_paths = Vec::with_capacity(spec.libs.len());
        for lib in &spec.libs {
            libs.push(format!("lib/{}", lib));
            library_paths.push(self.join_from_folder(&[spec.file, "lib", lib.as_str()]));
        }
        let include_path = spec
            .include
            .map(|include| self.join_from_folder(&[spec.file, include]));

        let archive = self.arena.archive(
            remote,
            spec.sha256,
            spec.size,
            spec.include.map(str::to_string),
            include_path,
            libs,
            library_paths,
            spec.requires.to_vec(),
        );
        self.arena.module(archive, self.dependencies.clone())
    }

    fn join_from_folder(&mut self, segments: &[&str]) -> ExprId {
        self.arena.join_file_strings(self.exploded_folder, segments)
    }
}

/// Resolve an archive file name against the manifest location.
fn archive_url(remote: &Url, file: &str) -> Option<Url> {
    remote.join(file).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::printer::to_pseudo_code;
    use crate::core::manifest::AndroidAbi;
    use crate::test_support::fixtures;
    use crate::visit::{resolve_archive, resolve_archives, Bindings, InterpretError};

    fn build(manifests: Vec<ResolvedManifest>) -> Ast {
        let mut builder = FunctionTableBuilder::new();
        for manifest in manifests {
            builder.add_manifest(manifest);
        }
        builder.build().unwrap()
    }

    fn globals(ast: &Ast) -> GlobalEnv {
        *ast.globals().unwrap()
    }

    #[test]
    fn test_android_runtime_platform_abi_selection() {
        let manifest = fixtures::android_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::android(globals(&ast), 21, "c++_shared", "x86_64")
            .with_exploded_root("/exploded");

        let archive = resolve_archive(&ast, &env, coordinate).unwrap();
        assert_eq!(archive.sha256, fixtures::sha("c++-21-x86_64"));
        assert_eq!(
            archive.library_paths,
            vec![std::path::PathBuf::from(
                "/exploded/com.github.jomof/sqlite/3.16.2/sqlite-android-cxx-platform-21-x86_64.zip/lib/x86_64/libsqlite.a"
            )]
        );
        assert_eq!(
            archive.remote.as_str(),
            "https://github.com/jomof/sqlite/releases/download/3.16.2/sqlite-android-cxx-platform-21-x86_64.zip"
        );
    }

    #[test]
    fn test_android_api_level_selects_nearest_below() {
        let manifest = fixtures::android_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let g = globals(&ast);

        for level in [12, 16, 20] {
            let env = Bindings::android(g, level, "c++_shared", "x86_64").with_exploded_root("/e");
            let archive = resolve_archive(&ast, &env, coordinate).unwrap();
            assert_eq!(archive.sha256, fixtures::sha("c++-12-x86_64"), "level {}", level);
        }
        for level in [21, 24] {
            let env = Bindings::android(g, level, "c++_shared", "x86_64").with_exploded_root("/e");
            let archive = resolve_archive(&ast, &env, coordinate).unwrap();
            assert_eq!(archive.sha256, fixtures::sha("c++-21-x86_64"), "level {}", level);
        }
    }

    #[test]
    fn test_android_api_level_below_all_declared_aborts() {
        let manifest = fixtures::android_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::android(globals(&ast), 9, "c++_shared", "x86_64").with_exploded_root("/e");

        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Abort: Android API level 9 is not supported by com.github.jomof:sqlite:3.16.2. Supported: 21 12"
        );
    }

    #[test]
    fn test_android_runtime_static_gnustl_and_none() {
        let manifest = fixtures::android_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let g = globals(&ast);

        let env = Bindings::android(g, 21, "gnustl_static", "x86").with_exploded_root("/e");
        let archive = resolve_archive(&ast, &env, coordinate).unwrap();
        assert_eq!(archive.sha256, fixtures::sha("gnustl-21-x86"));

        // The none runtime substitutes c++.
        let env = Bindings::android(g, 21, "none", "x86").with_exploded_root("/e");
        let archive = resolve_archive(&ast, &env, coordinate).unwrap();
        assert_eq!(archive.sha256, fixtures::sha("c++-21-x86"));

        let env = Bindings::android(g, 21, "stlport_static", "x86").with_exploded_root("/e");
        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Abort: Android runtime 'stlport_static' is not supported by com.github.jomof:sqlite:3.16.2. Supported: c++ gnustl"
        );
    }

    #[test]
    fn test_android_unknown_abi_aborts_with_platform() {
        let manifest = fixtures::android_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::android(globals(&ast), 21, "c++_shared", "mips").with_exploded_root("/e");

        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Abort: Android ABI mips is not supported by com.github.jomof:sqlite:3.16.2 for platform 21. Supported: x86 x86_64"
        );
    }

    #[test]
    fn test_ios_sdk_prefix_fallback() {
        let manifest = fixtures::ios_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::darwin(
            globals(&ast),
            "/Developer/Platforms/iPhoneOS.platform/Developer/SDKs/iPhoneOS10.2.sdk",
            &["armv7"],
        )
        .with_exploded_root("/e");

        let archive = resolve_archive(&ast, &env, coordinate).unwrap();
        assert_eq!(archive.sha256, fixtures::sha("iPhoneOS9.3-armv7"));
    }

    #[test]
    fn test_ios_exact_sdk_preferred_over_prefix() {
        let manifest = fixtures::ios_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::darwin(
            globals(&ast),
            "/SDKs/iPhoneSimulator10.0.sdk",
            &["armv7"],
        )
        .with_exploded_root("/e");

        // Exact iPhoneSimulator10.0 beats the iPhoneSimulator9.3 prefix match.
        let archive = resolve_archive(&ast, &env, coordinate).unwrap();
        assert_eq!(archive.sha256, fixtures::sha("iPhoneSimulator10.0-armv7"));
    }

    #[test]
    fn test_single_ios_archive_skips_every_switch() {
        let manifest = fixtures::single_ios_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::darwin(globals(&ast), "/SDKs/iPhoneSimulator10.0.sdk", &["x86_64"])
            .with_exploded_root("/e");

        let archive = resolve_archive(&ast, &env, coordinate).unwrap();
        assert_eq!(archive.sha256, fixtures::sha("iPhoneOS9.3-armv7"));
    }

    #[test]
    fn test_ios_unknown_architecture_aborts() {
        let manifest = fixtures::ios_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::darwin(globals(&ast), "/SDKs/iPhoneOS10.2.sdk", &["armv7", "arm64"])
            .with_exploded_root("/e");

        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Abort: OSX architecture [armv7, arm64] is not supported by com.github.jomof:sqlite:3.16.2. Supported: armv7 arm64"
        );
    }

    #[test]
    fn test_header_only_resolves_on_every_platform() {
        let manifest = fixtures::header_only_manifest();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let g = globals(&ast);

        let envs = [
            Bindings::android(g, 21, "c++_shared", "x86"),
            Bindings::darwin(g, "/SDKs/iPhoneOS10.2.sdk", &["armv7"]),
            Bindings::linux(g),
        ];
        for env in envs {
            let env = env.with_exploded_root("/e");
            let archive = resolve_archive(&ast, &env, coordinate).unwrap();
            assert!(archive.library_paths.is_empty());
            assert_eq!(
                archive.include_path,
                Some(std::path::PathBuf::from(
                    "/e/com.github.jomof/vectorial/0.0.0/vectorial.zip/include"
                ))
            );
        }

        let (_, find) = ast.find_module(coordinate).unwrap();
        assert_eq!(find.header_archive.as_deref(), Some("vectorial.zip"));
        assert_eq!(find.include.as_deref(), Some("include"));
    }

    #[test]
    fn test_unsupported_platform_names_supported_set() {
        let mut manifest = fixtures::android_manifest();
        manifest.manifest.ios = fixtures::ios_manifest().manifest.ios;
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::linux(globals(&ast)).with_exploded_root("/e");

        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert!(err.is_abort());
        assert_eq!(
            err.to_string(),
            "Abort: Target platform Linux is not supported by com.github.jomof:sqlite:3.16.2. Supported: Android Darwin"
        );
    }

    #[test]
    fn test_no_platforms_aborts() {
        let manifest = fixtures::resolved(Coordinate::new("com.example", "empty", "1.0.0"));
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::linux(globals(&ast));

        let err = resolve_archives(&ast, &env, coordinate).unwrap_err();
        assert_eq!(
            err,
            InterpretError::Abort {
                message: "Abort: Module 'com.example:empty:1.0.0' doesn't support any platforms."
                    .to_string()
            }
        );
    }

    #[test]
    fn test_malformed_archive_becomes_abort() {
        let mut manifest = fixtures::linux_manifest();
        manifest.manifest.linux.as_mut().unwrap().archives[0].sha256.clear();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::linux(globals(&ast)).with_exploded_root("/e");

        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Abort: Archive in https://github.com/jomof/zlib/releases/download/1.2.11/cdep-manifest.yml was malformed"
        );
    }

    #[test]
    fn test_android_runtime_mixed_with_empty_aborts() {
        let mut manifest = fixtures::android_manifest();
        manifest.manifest.android.as_mut().unwrap().archives[0].runtime = None;
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::android(globals(&ast), 21, "c++_shared", "x86").with_exploded_root("/e");

        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Abort: Runtime is on some android submodules but not other in module 'com.github.jomof:sqlite:3.16.2'"
        );
    }

    #[test]
    fn test_android_abi_mixed_with_empty_aborts() {
        let mut manifest = fixtures::android_manifest();
        manifest.manifest.android.as_mut().unwrap().archives[2].abi = Some(AndroidAbi::new(""));
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let g = globals(&ast);

        for abi in ["", "x86"] {
            let env = Bindings::android(g, 21, "c++_shared", abi).with_exploded_root("/e");
            let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Abort: Android ABI was missing in some archives of module 'com.github.jomof:sqlite:3.16.2'"
            );
        }

        // Other platform buckets are unaffected.
        let env = Bindings::android(g, 12, "c++_shared", "x86_64").with_exploded_root("/e");
        let archive = resolve_archive(&ast, &env, coordinate).unwrap();
        assert_eq!(archive.sha256, fixtures::sha("c++-12-x86_64"));
    }

    #[test]
    fn test_android_duplicate_abi_aborts() {
        let mut manifest = fixtures::android_manifest();
        manifest.manifest.android.as_mut().unwrap().archives[2].abi = Some(AndroidAbi::new("x86"));
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let g = globals(&ast);

        let env = Bindings::android(g, 21, "c++_shared", "x86").with_exploded_root("/e");
        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Abort: Android ABI x86 appears in 2 archives of module 'com.github.jomof:sqlite:3.16.2' for platform 21"
        );

        let env = Bindings::android(g, 21, "gnustl_shared", "x86").with_exploded_root("/e");
        let archive = resolve_archive(&ast, &env, coordinate).unwrap();
        assert_eq!(archive.sha256, fixtures::sha("gnustl-21-x86"));
    }

    #[test]
    fn test_bad_dependency_coordinate_aborts_every_path() {
        let mut manifest = fixtures::linux_manifest();
        manifest
            .manifest
            .dependencies
            .push(crate::core::manifest::HardNameDependency::new("not-a-coordinate"));
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);
        let env = Bindings::linux(globals(&ast)).with_exploded_root("/e");

        let err = resolve_archive(&ast, &env, coordinate).unwrap_err();
        assert!(err.to_string().contains("Could not parse dependency coordinate 'not-a-coordinate'"));
    }

    #[test]
    fn test_examples_are_collected() {
        let mut manifest = fixtures::linux_manifest();
        manifest.manifest.example = "#include <zlib.h>".to_string();
        let coordinate = manifest.coordinate();
        let ast = build(vec![manifest]);

        let table = ast.table().unwrap();
        let example = table.examples[&coordinate];
        assert_eq!(
            ast.arena.get(example),
            &Expression::Example {
                source: "#include <zlib.h>".to_string()
            }
        );
    }

    #[test]
    fn test_darwin_assignments_are_lifted_into_a_block() {
        let manifest = fixtures::ios_manifest();
        let ast = build(vec![manifest]);
        let printed = to_pseudo_code(&ast.arena, ast.root);

        assert!(printed.contains("var osx_sysroot_sdk_name = getName(CMAKE_OSX_SYSROOT)"));
        assert!(printed.contains("var combined_platform_and_sdk = substring(*osx_sysroot_sdk_name, '0', *last_dot_position)"));
        assert_eq!(printed.matches("var exploded_archive_folder").count(), 1);
    }
}
