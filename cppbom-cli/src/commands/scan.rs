//! `cppbom scan` command handler

use std::io::Write;
use std::path::PathBuf;

use colored::Colorize;
use tracing::info;

use cppbom_engine::sbom::{cyclonedx, deptree, OutputFormat, SbomDocument};
use cppbom_engine::{ScanConfigBuilder, Scanner};

use crate::cli::ScanArgs;
use crate::error::CliError;

const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Execute the `scan` command.
pub async fn execute(args: ScanArgs) -> Result<(), CliError> {
    let abs_dir = resolve_dir(&args.dir)?;

    // Reject unsupported formats before the (potentially long) scan.
    let format = OutputFormat::from_str_loose(&args.format).ok_or_else(|| {
        CliError::Command(format!(
            "unsupported format {:?} (supported: cyclonedx, cdx, deptree)",
            args.format
        ))
    })?;

    eprintln!("{} v{}", "cppbom".bold(), TOOL_VERSION);
    eprintln!("Scanning: {}", abs_dir.display());

    let config = ScanConfigBuilder::new()
        .root(abs_dir)
        .verbose(args.verbose)
        .conan_graph(args.conan_graph)
        .cmake_configure(args.cmake_configure)
        .use_ldd(args.ldd)
        .build()?;

    info!("starting SBOM scan");
    let result = Scanner::new(config).scan().await?;

    eprintln!("Found {} component(s)", result.components.len());

    if args.show_strategies || args.verbose {
        if !result.strategies_used.is_empty() {
            eprintln!(
                "Strategies that found results: {}",
                result.strategies_used.join(", ").green()
            );
        }
        if !result.strategies_skipped.is_empty() {
            eprintln!(
                "Strategies with no results:    {}",
                result.strategies_skipped.join(", ").dimmed()
            );
        }
    }

    let doc = match format {
        OutputFormat::CycloneDx => cyclonedx::generate(&result, TOOL_VERSION)?,
        OutputFormat::DepTree => deptree::generate(&result)?,
    };

    write_document(&doc, &args.output)?;

    if args.output != "-" {
        eprintln!("SBOM written to: {}", args.output.bold());
    }

    Ok(())
}

/// Resolve and validate the scan directory.
fn resolve_dir(dir: &PathBuf) -> Result<PathBuf, CliError> {
    let abs = std::fs::canonicalize(dir)
        .map_err(|e| CliError::Config(format!("directory {:?} does not exist: {e}", dir)))?;

    let meta = std::fs::metadata(&abs)
        .map_err(|e| CliError::Config(format!("cannot stat {:?}: {e}", abs)))?;
    if !meta.is_dir() {
        return Err(CliError::Config(format!("{:?} is not a directory", abs)));
    }

    Ok(abs)
}

/// Write the document to the output path, or stdout when the path is "-".
fn write_document(doc: &SbomDocument, output: &str) -> Result<(), CliError> {
    if output == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(doc.content.as_bytes())?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }

    std::fs::write(output, format!("{}\n", doc.content))?;
    Ok(())
}
