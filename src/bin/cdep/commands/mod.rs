//! Command implementations

pub mod check;
pub mod dump;
pub mod generate;
pub mod resolve;

use std::path::Path;

use anyhow::Result;

use cdep::util::config::{global_config_path, load_config, project_config_path};
use cdep::{Ast, FunctionTableBuilder, GeneratorEnvironment, ManifestSet};

/// Load and compile a manifest set.
pub fn compile(manifests: &Path) -> Result<Ast> {
    let set = ManifestSet::load(manifests)?;
    let mut builder = FunctionTableBuilder::new();
    for package in set.packages {
        builder.add_manifest(package);
    }
    Ok(builder.build()?)
}

/// Folders and callback for `working_folder`, honouring global and project config.
pub fn environment(working_folder: &Path) -> GeneratorEnvironment {
    let global = global_config_path();
    let config = load_config(global.as_deref(), &project_config_path(working_folder));
    GeneratorEnvironment::from_config(&config, working_folder)
}
