//! `cdep check` command

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::CheckArgs;
use cdep::check::check_local_files;

pub fn execute(working_folder: &Path, args: CheckArgs) -> Result<()> {
    let ast = super::compile(&args.manifests)?;
    let exploded_folder = match args.exploded_folder {
        Some(folder) => folder,
        None => super::environment(working_folder).exploded_folder,
    };

    check_local_files(&ast, &exploded_folder)?;
    info!("All archives under {} are complete", exploded_folder.display());
    Ok(())
}
