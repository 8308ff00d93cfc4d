//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// cppbom -- C/C++ SBOM generation engine.
///
/// Scans a project directory with multiple independent detection strategies
/// (compile_commands.json, linker maps, Conan, vcpkg, CMake, Meson, build
/// logs, binaries, header scan) and merges the findings into a single
/// CycloneDX SBOM with a direct/transitive dependency graph.
///
/// Use `cppbom <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "cppbom", version, about, long_about = None)]
pub struct Cli {
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a C/C++ project and generate an SBOM.
    Scan(ScanArgs),
}

/// Scan a C/C++ project directory for third-party dependencies and produce
/// a CycloneDX 1.4 JSON SBOM file.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Path to the C/C++ project root directory.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Output file path (use '-' for stdout).
    #[arg(short, long, default_value = "sbom.json")]
    pub output: String,

    /// Output format: cyclonedx (alias cdx), or deptree for the bare
    /// recursive dependency tree.
    #[arg(short, long, default_value = "cyclonedx")]
    pub format: String,

    /// Enable verbose per-strategy diagnostics on stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print which strategies found results and which were skipped.
    #[arg(long)]
    pub show_strategies: bool,

    /// Walk the project tree for conanfile.py/txt files and run
    /// 'conan graph info <dir> --format=json' for each one. Conan must be
    /// on PATH. Without this flag any graph.json already present in the
    /// tree is still parsed.
    #[arg(long)]
    pub conan_graph: bool,

    /// Read a pre-generated cmake build directory (compile_commands.json
    /// and CMakeFiles/*/link.txt). Does not run cmake itself; the build
    /// dir is located via SBOM_EXTRA_BUILD_DIR or common candidates.
    #[arg(long)]
    pub cmake_configure: bool,

    /// Read ldd-results.json (location via SBOM_LDD_RESULTS or the
    /// project root) to extract runtime dependency edges from .so files.
    #[arg(long)]
    pub ldd: bool,
}
