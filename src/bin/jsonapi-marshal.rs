//! JSON:API Marshal CLI
//!
//! Command-line interface for checking JSON:API document files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jsonapi_marshal::{
    lint, lint_file, ErrorDocumentOptions, FileStatus, JsonApiVersion, LintResult, Severity,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jsonapi-marshal")]
#[command(about = "Check JSON:API documents and report problems")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint document files for errors (syntax, structure, member names, duplicates)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Report the problems of one document as a JSON:API error document
    Errors {
        /// Document file to check
        document: PathBuf,

        /// Add a top-level jsonapi member with this version (1.0 or 1.1)
        #[arg(long = "jsonapi-version")]
        jsonapi_version: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),

        Commands::Errors {
            document,
            jsonapi_version,
            pretty,
        } => run_errors(&document, jsonapi_version.as_deref(), pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (warnings only by default).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_errors(document: &Path, version: Option<&str>, pretty: bool) -> Result<(), u8> {
    if !document.exists() {
        eprintln!("Error: path not found: {}", document.display());
        return Err(2);
    }

    let mut options = ErrorDocumentOptions::new();
    if let Some(version) = version {
        let parsed = JsonApiVersion::parse(version).ok_or_else(|| {
            eprintln!("Error: unsupported jsonapi version: {}", version);
            2u8
        })?;
        options = options.version(parsed);
    }

    let base = document.parent().unwrap_or(Path::new("."));
    let result = lint_file(document, base);
    let error_document = result.to_error_document(&options);

    let output = if pretty {
        serde_json::to_string_pretty(&error_document)
    } else {
        serde_json::to_string(&error_document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);

    if error_document.errors.is_empty() {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if passed(&result, strict) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if passed(&result, strict) {
        Ok(())
    } else {
        Err(1)
    }
}

fn passed(result: &LintResult, strict: bool) -> bool {
    result.is_ok() && (!strict || result.warnings == 0)
}
