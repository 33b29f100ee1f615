//! `cdep generate` command

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::{Backend, GenerateArgs};
use cdep::generator::examples::{cmake_examples, ndk_build_examples};
use cdep::generator::{write_files, CMakeGenerator, NdkBuildGenerator};

pub fn execute(working_folder: &Path, args: GenerateArgs) -> Result<()> {
    let ast = super::compile(&args.manifests)?;
    let environment = super::environment(working_folder);

    let cmake = CMakeGenerator::new(&environment);
    let ndk_build = NdkBuildGenerator::new(&environment);
    let files = match args.backend {
        Backend::Cmake => vec![cmake.generate(&ast)?],
        Backend::NdkBuild => vec![ndk_build.generate(&ast)?],
        Backend::Examples => {
            let mut files = vec![cmake.generate(&ast)?, ndk_build.generate(&ast)?];
            files.extend(cmake_examples(&environment, &ast)?);
            files.extend(ndk_build_examples(&environment, &ast)?);
            files
        }
    };

    write_files(&files)?;
    info!("Generated {} file(s)", files.len());
    Ok(())
}
