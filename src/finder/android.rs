//! Android: runtime, then API level, then ABI.

use std::collections::BTreeMap;

use crate::ast::ExprId;
use crate::core::manifest::{AndroidAbi, AndroidArchive};
use crate::finder::{ArchiveSpec, FindModuleBuilder};
use crate::util::text::join_on;

/// Runtimes tried, in order, when the build asks for no runtime at all.
const NONE_RUNTIME_SUBSTITUTES: &[&str] = &["c++", "gnustl"];

impl FindModuleBuilder<'_> {
    /// Switch on `{runtime}_shared` / `{runtime}_static`.
    pub(super) fn android_runtime_case(&mut self, archives: &[AndroidArchive]) -> ExprId {
        let coordinate = self.coordinate();

        let mut by_runtime: BTreeMap<Option<&str>, Vec<&AndroidArchive>> = BTreeMap::new();
        for archive in archives {
            let runtime = archive.runtime.as_deref().filter(|r| !r.is_empty());
            by_runtime.entry(runtime).or_default().push(archive);
        }

        if let Some(runtime_neutral) = by_runtime.get(&None) {
            if by_runtime.len() != 1 {
                let message = format!(
                    "Runtime is on some android submodules but not other in module '{}'",
                    coordinate
                );
                return self.arena.abort(message, Vec::new());
            }
            // No runtime anywhere, so the runtime switch is skipped.
            return self.android_platform_expression(runtime_neutral);
        }

        let runtime = self.globals.android_runtime;
        let mut conditions = Vec::new();
        let mut branches = Vec::new();
        let mut by_name: BTreeMap<&str, ExprId> = BTreeMap::new();
        for (name, group) in &by_runtime {
            let Some(name) = *name else { continue };
            let branch = self.android_platform_expression(group);
            by_name.insert(name, branch);
            for linkage in ["shared", "static"] {
                let key = self.arena.string(format!("{}_{}", name, linkage));
                conditions.push(self.arena.eq(runtime, key));
                branches.push(branch);
            }
        }

        let substitute = NONE_RUNTIME_SUBSTITUTES
            .iter()
            .find_map(|name| by_name.get(name).copied());
        let none_branch = match substitute {
            Some(branch) => branch,
            None => {
                let message = format!(
                    "No suitable runtime found to substitute for '%s' in module {}",
                    coordinate
                );
                self.arena.abort(message, vec![self.globals.none_runtime])
            }
        };
        conditions.push(self.arena.eq(runtime, self.globals.none_runtime));
        branches.push(none_branch);

        let message = format!(
            "Android runtime '%s' is not supported by {}. Supported: {}",
            coordinate,
            join_on(" ", by_name.keys())
        );
        let otherwise = self.arena.abort(message, vec![runtime]);
        self.arena.if_switch(conditions, branches, otherwise)
    }

    /// Switch on API level, highest first, so the nearest level at or below
    /// the requested one wins.
    fn android_platform_expression(&mut self, archives: &[&AndroidArchive]) -> ExprId {
        let coordinate = self.coordinate();

        if let [single] = archives {
            if single.platform.as_deref().map_or(true, str::is_empty) {
                return self.android_abi_expression(archives);
            }
        }

        let mut by_level: BTreeMap<i64, Vec<&AndroidArchive>> = BTreeMap::new();
        for archive in archives {
            let level = match archive.platform.as_deref().filter(|p| !p.is_empty()) {
                None => 0,
                Some(text) => match text.trim().parse::<i64>() {
                    Ok(level) => level,
                    Err(_) => {
                        let message = format!(
                            "Android platform string in {} manifest could not be converted to an integer",
                            coordinate
                        );
                        return self.arena.abort(message, Vec::new());
                    }
                },
            };
            by_level.entry(level).or_default().push(archive);
        }

        let mut conditions = Vec::with_capacity(by_level.len());
        let mut branches = Vec::with_capacity(by_level.len());
        for (level, group) in by_level.iter().rev() {
            conditions.push(self.arena.gte(self.globals.target_platform, *level));
            branches.push(self.android_abi_expression(group));
        }

        let message = format!(
            "Android API level %s is not supported by {}. Supported: {}",
            coordinate,
            join_on(" ", by_level.keys().rev())
        );
        let otherwise = self.arena.abort(message, vec![self.globals.target_platform]);
        self.arena.if_switch(conditions, branches, otherwise)
    }

    /// Switch on the resolved ABI.
    fn android_abi_expression(&mut self, archives: &[&AndroidArchive]) -> ExprId {
        let coordinate = self.coordinate();

        let mut by_abi: BTreeMap<Option<&AndroidAbi>, Vec<&AndroidArchive>> = BTreeMap::new();
        for archive in archives {
            let abi = archive.abi.as_ref().filter(|abi| !abi.as_str().is_empty());
            by_abi.entry(abi).or_default().push(archive);
        }

        if by_abi.len() == 1 && by_abi.contains_key(&None) {
            // Header only: the archive carries no libraries.
            let Some(archive) = archives.first() else {
                return self.arena.nop();
            };
            return self.archive_module(ArchiveSpec {
                file: &archive.file,
                sha256: &archive.sha256,
                size: archive.size,
                include: archive.include.as_deref(),
                requires: &[],
                libs: Vec::new(),
            });
        }

        if by_abi.contains_key(&None) {
            let message = format!(
                "Android ABI was missing in some archives of module '{}'",
                coordinate
            );
            return self.arena.abort(message, Vec::new());
        }

        let abi_parameter = self.globals.android_abi;
        let mut conditions = Vec::with_capacity(by_abi.len());
        let mut branches = Vec::with_capacity(by_abi.len());
        let mut supported = Vec::with_capacity(by_abi.len());
        for (abi, group) in &by_abi {
            let Some(abi) = abi else { continue };
            let name = abi.as_str();
            supported.push(name);

            let key = self.arena.string(name);
            conditions.push(self.arena.eq(abi_parameter, key));
            let [archive] = group.as_slice() else {
                let message = format!(
                    "Android ABI {} appears in {} archives of module '{}' for platform %s",
                    name,
                    group.len(),
                    coordinate
                );
                branches.push(self.arena.abort(message, vec![self.globals.target_platform]));
                continue;
            };
            branches.push(self.archive_module(ArchiveSpec {
                file: &archive.file,
                sha256: &archive.sha256,
                size: archive.size,
                include: archive.include.as_deref(),
                requires: &[],
                libs: archive
                    .libs
                    .iter()
                    .map(|lib| format!("{}/{}", name, lib))
                    .collect(),
            }));
        }

        let message = format!(
            "Android ABI %s is not supported by {} for platform %s. Supported: {}",
            coordinate,
            join_on(" ", &supported)
        );
        let otherwise = self
            .arena
            .abort(message, vec![abi_parameter, self.globals.target_platform]);
        self.arena.if_switch(conditions, branches, otherwise)
    }
}
