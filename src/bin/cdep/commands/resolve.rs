//! `cdep resolve` command

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::{ResolveArgs, TargetSystem};
use cdep::visit::resolve_archives;
use cdep::{Bindings, Coordinate};

pub fn execute(working_folder: &Path, args: ResolveArgs) -> Result<()> {
    let coordinate = Coordinate::parse(&args.coordinate)
        .with_context(|| format!("invalid coordinate `{}`", args.coordinate))?;
    let ast = super::compile(&args.manifests)?;
    let environment = super::environment(working_folder);
    let globals = *ast
        .globals()
        .context("compiled tree has no global environment")?;

    let bindings = match args.system {
        TargetSystem::Android => Bindings::android(globals, args.api, &args.runtime, &args.abi),
        TargetSystem::Darwin => {
            let architectures: Vec<&str> = args.architectures.iter().map(String::as_str).collect();
            Bindings::darwin(globals, &args.sysroot, &architectures)
        }
        TargetSystem::Linux => Bindings::linux(globals),
    }
    .with_exploded_root(&environment.exploded_folder)
    .with_compiler_features(!args.no_compiler_features);

    let archives = resolve_archives(&ast, &bindings, coordinate)?;
    if archives.is_empty() {
        println!("{} needs no archive on this target", coordinate);
    }
    for archive in archives {
        println!("remote: {}", archive.remote);
        println!("sha256: {}", archive.sha256);
        println!("size: {}", archive.size);
        if let Some(include) = &archive.include_path {
            println!("include: {}", include.display());
        }
        for library in &archive.library_paths {
            println!("library: {}", library.display());
        }
    }
    Ok(())
}
