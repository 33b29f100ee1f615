//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// cdep - compile native-library manifests into CMake and ndk-build scripts
#[derive(Parser)]
#[command(name = "cdep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Folder generated files and project configuration are relative to
    #[arg(long, global = true, default_value = ".", env = "CDEP_WORKING_FOLDER")]
    pub working_folder: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate build-system scripts for a set of resolved manifests
    Generate(GenerateArgs),

    /// Print the compiled decision tree as pseudo-code
    Dump(DumpArgs),

    /// Pick the archive a coordinate uses on a given target
    Resolve(ResolveArgs),

    /// Verify unpacked archives contain the files their manifests promise
    Check(CheckArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Cmake,
    NdkBuild,
    /// CMake and ndk-build fragments plus example projects for both
    Examples,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Resolved manifest set (`.toml` or `.json`)
    #[arg(long)]
    pub manifests: PathBuf,

    /// Which scripts to write
    #[arg(long, value_enum, default_value = "cmake")]
    pub backend: Backend,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Resolved manifest set (`.toml` or `.json`)
    #[arg(long)]
    pub manifests: PathBuf,

    /// Print the tree before lowering
    #[arg(long)]
    pub raw: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TargetSystem {
    Android,
    Darwin,
    Linux,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Resolved manifest set (`.toml` or `.json`)
    #[arg(long)]
    pub manifests: PathBuf,

    /// Coordinate to resolve, e.g. `com.github.jomof:zlib:1.2.11`
    #[arg(long)]
    pub coordinate: String,

    /// Target system
    #[arg(long, value_enum, ignore_case = true)]
    pub system: TargetSystem,

    /// Android API level
    #[arg(long, default_value_t = 21)]
    pub api: i64,

    /// Android C++ runtime, e.g. `c++_shared`
    #[arg(long, default_value = "c++_shared")]
    pub runtime: String,

    /// Android ABI
    #[arg(long, default_value = "x86_64")]
    pub abi: String,

    /// Darwin sysroot path
    #[arg(long, default_value = "/Applications/Xcode.app/Contents/Developer/Platforms/iPhoneOS.platform/Developer/SDKs/iPhoneOS10.2.sdk")]
    pub sysroot: String,

    /// Darwin architecture (repeatable)
    #[arg(long = "arch", default_value = "arm64")]
    pub architectures: Vec<String>,

    /// Whether the build system supports compile features
    #[arg(long)]
    pub no_compiler_features: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Resolved manifest set (`.toml` or `.json`)
    #[arg(long)]
    pub manifests: PathBuf,

    /// Folder archives were unpacked into (defaults to the configured one)
    #[arg(long)]
    pub exploded_folder: Option<PathBuf>,
}
