//! Darwin: architecture, then SDK name with a platform-prefix fallback.

use std::collections::BTreeMap;

use crate::ast::ExprId;
use crate::core::manifest::{IosArchitecture, IosArchive};
use crate::finder::{ArchiveSpec, FindModuleBuilder};
use crate::util::text::join_on;

impl FindModuleBuilder<'_> {
    pub(super) fn darwin_case(&mut self, archives: &[IosArchive]) -> ExprId {
        // Something like iPhoneOS10.2.sdk
        let sdk_name = self.arena.file_get_name(self.globals.osx_sysroot);
        let sdk_name = self.arena.assign("osx_sysroot_sdk_name", sdk_name);
        let last_dot = self.arena.last_index_of(sdk_name, ".");
        let last_dot = self.arena.assign("last_dot_position", last_dot);
        // Something like iPhoneOS10.2
        let zero = self.arena.integer(0);
        let combined = self.arena.substring(sdk_name, zero, last_dot);
        let combined = self.arena.assign("combined_platform_and_sdk", combined);

        self.ios_architecture_switch(archives, combined)
    }

    fn ios_architecture_switch(&mut self, archives: &[IosArchive], combined: ExprId) -> ExprId {
        let coordinate = self.coordinate();

        let mut by_architecture: BTreeMap<Option<IosArchitecture>, Vec<&IosArchive>> =
            BTreeMap::new();
        for archive in archives {
            by_architecture
                .entry(archive.architecture)
                .or_default()
                .push(archive);
        }

        if by_architecture.len() == 1 {
            if let Some(group) = by_architecture.values().next() {
                return self.ios_sdk_switch(group, combined, None);
            }
        }

        let architectures = self.globals.osx_architectures;
        let mut conditions = Vec::with_capacity(by_architecture.len());
        let mut branches = Vec::with_capacity(by_architecture.len());
        let mut supported = Vec::new();
        for (architecture, group) in &by_architecture {
            match architecture {
                Some(architecture) => {
                    let name = self.arena.string(architecture.to_string());
                    conditions.push(self.arena.array_has_only_element(architectures, name));
                    branches.push(self.ios_sdk_switch(group, combined, Some(*architecture)));
                    supported.push(architecture.to_string());
                }
                None => {
                    conditions.push(self.arena.boolean(false));
                    branches.push(
                        self.arena
                            .abort("iOS architecture in manifest was unknown or missing", Vec::new()),
                    );
                }
            }
        }

        let message = format!(
            "OSX architecture %s is not supported by {}. Supported: {}",
            coordinate,
            join_on(" ", &supported)
        );
        let otherwise = self.arena.abort(message, vec![architectures]);
        self.arena.if_switch(conditions, branches, otherwise)
    }

    /// Exact `platform + sdk` matches first, then platform prefix matches.
    fn ios_sdk_switch(
        &mut self,
        archives: &[&IosArchive],
        combined: ExprId,
        architecture: Option<IosArchitecture>,
    ) -> ExprId {
        let coordinate = self.coordinate();

        if self.resolved.manifest.ios_archive_count() == 1 {
            if let Some(archive) = archives.first() {
                return self.ios_archive(archive);
            }
        }

        let modules: Vec<ExprId> = archives.iter().map(|a| self.ios_archive(a)).collect();
        let mut conditions = Vec::with_capacity(archives.len() * 2);
        let mut branches = Vec::with_capacity(archives.len() * 2);
        let mut supported = Vec::with_capacity(archives.len());
        for (archive, module) in archives.iter().zip(&modules) {
            let platform_sdk = archive.platform_sdk();
            let key = self.arena.string(platform_sdk.clone());
            conditions.push(self.arena.eq(combined, key));
            branches.push(*module);
            supported.push(platform_sdk);
        }

        // A newer SDK than any archive was built against still matches by platform.
        for (archive, module) in archives.iter().zip(&modules) {
            let Some(platform) = archive.platform else {
                return self.arena.abort(
                    "iOS platform was missing in some packages and present in others. It needs to be consistent",
                    Vec::new(),
                );
            };
            let prefix = self.arena.string(platform.to_string());
            conditions.push(self.arena.string_starts_with(combined, prefix));
            branches.push(*module);
        }

        let message = match architecture {
            None => format!(
                "OSX SDK %s is not supported by {}. Supported: {}",
                coordinate,
                join_on(" ", &supported)
            ),
            Some(architecture) => format!(
                "OSX SDK %s is not supported by {} and architecture {}. Supported: {}",
                coordinate,
                architecture,
                join_on(" ", &supported)
            ),
        };
        let otherwise = self.arena.abort(message, vec![combined]);
        self.arena.if_switch(conditions, branches, otherwise)
    }

    fn ios_archive(&mut self, archive: &IosArchive) -> ExprId {
        self.archive_module(ArchiveSpec {
            file: &archive.file,
            sha256: &archive.sha256,
            size: archive.size,
            include: archive.include.as_deref(),
            requires: &[],
            libs: archive.libs.clone(),
        })
    }
}
