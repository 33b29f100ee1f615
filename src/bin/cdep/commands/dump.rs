//! `cdep dump` command

use anyhow::Result;

use crate::cli::DumpArgs;
use cdep::ast::printer::to_pseudo_code;
use cdep::{FunctionTableBuilder, ManifestSet};

pub fn execute(args: DumpArgs) -> Result<()> {
    let ast = if args.raw {
        let set = ManifestSet::load(&args.manifests)?;
        let mut builder = FunctionTableBuilder::new();
        for package in set.packages {
            builder.add_manifest(package);
        }
        builder.build_unlowered()
    } else {
        super::compile(&args.manifests)?
    };

    print!("{}", to_pseudo_code(&ast.arena, ast.root));
    Ok(())
}
