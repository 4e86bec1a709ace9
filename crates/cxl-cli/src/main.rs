use clap::{Parser, Subcommand};
use colored::Colorize;
use log::debug;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cxl_core::diagnostic::{count, Diagnostic, Severity};
use cxl_core::{LoweredSource, ParserConfig};

const EXIT_OK: i32 = 0;
const EXIT_INVALID: i32 = 1;
const EXIT_IO: i32 = 2;

/// CXL: Contract eXpression Lowering
///
/// Check contract expressions and lower them to legacy contract blocks.
#[derive(Parser)]
#[command(name = "cxl", version, about, long_about = None)]
struct Cli {
    /// Print nothing on success
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Log parser and lowering decisions (overridden by CXL_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Maximum expression and block nesting depth
    #[arg(long, global = true, default_value_t = ParserConfig::default().max_nesting_depth)]
    max_depth: usize,

    /// Reject the deprecated `body` keyword
    #[arg(long, global = true)]
    no_body_keyword: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a source file and report contract diagnostics
    Check {
        /// Path to source file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the source with every contract lowered to legacy blocks
    Lower {
        /// Path to source file
        file: PathBuf,
        /// Output the lowered AST as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the SHA-256 fingerprint of the lowered canonical form
    Hash {
        /// Path to source file
        file: PathBuf,
    },

    /// Report whether two sources lower to the same canonical form
    Diff {
        /// First source file
        file_a: PathBuf,
        /// Second source file
        file_b: PathBuf,
    },

    /// Show version information
    Version,
}

impl Cli {
    fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            max_nesting_depth: self.max_depth,
            accept_body_keyword: !self.no_body_keyword,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.parser_config();

    let exit_code = match &cli.command {
        Commands::Check { file, json } => cmd_check(file, *json, &config, cli.quiet),
        Commands::Lower { file, json } => cmd_lower(file, *json, &config),
        Commands::Hash { file } => cmd_hash(file, &config),
        Commands::Diff { file_a, file_b } => cmd_diff(file_a, file_b, &config, cli.quiet),
        Commands::Version => {
            println!(
                "cxl {} (cxl-core {})",
                env!("CARGO_PKG_VERSION"),
                cxl_core::VERSION
            );
            EXIT_OK
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("CXL_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// ── Commands ──────────────────────────────────────────────

fn cmd_check(file: &Path, json: bool, config: &ParserConfig, quiet: bool) -> i32 {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let valid = cxl_core::parser::parse_with(&source, config, &mut diagnostics).is_ok();

    if json {
        let output = serde_json::json!({
            "valid": valid,
            "errors": count(&diagnostics, Severity::Error),
            "warnings": count(&diagnostics, Severity::Warning),
            "diagnostics": diagnostics,
        });
        println!("{:#}", output);
    } else {
        print_diagnostics(file, &diagnostics);
        if valid && !quiet {
            println!("{} {} is valid", "✓".green().bold(), file.display());
        }
    }

    if valid {
        EXIT_OK
    } else {
        EXIT_INVALID
    }
}

fn cmd_lower(file: &Path, json: bool, config: &ParserConfig) -> i32 {
    let lowered = match lower_file(file, config) {
        Ok(l) => l,
        Err(code) => return code,
    };

    if json {
        match serde_json::to_value(&lowered.file) {
            Ok(value) => println!("{:#}", value),
            Err(e) => {
                eprintln!("{} cannot serialize AST: {}", "error:".red().bold(), e);
                return EXIT_IO;
            }
        }
    } else {
        print!("{}", lowered.canonical);
    }
    EXIT_OK
}

fn cmd_hash(file: &Path, config: &ParserConfig) -> i32 {
    match lower_file(file, config) {
        Ok(lowered) => {
            println!("{}", lowered.fingerprint);
            EXIT_OK
        }
        Err(code) => code,
    }
}

fn cmd_diff(file_a: &Path, file_b: &Path, config: &ParserConfig, quiet: bool) -> i32 {
    let a = match lower_file(file_a, config) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let b = match lower_file(file_b, config) {
        Ok(l) => l,
        Err(code) => return code,
    };

    if a.fingerprint == b.fingerprint {
        if !quiet {
            println!(
                "{} equivalent: both lower to the same canonical form ({})",
                "✓".green().bold(),
                a.fingerprint
            );
        }
        return EXIT_OK;
    }

    println!(
        "{} different: {} and {} lower to different canonical forms",
        "✗".red().bold(),
        file_a.display(),
        file_b.display()
    );
    let lines_a: Vec<&str> = a.canonical.lines().collect();
    let lines_b: Vec<&str> = b.canonical.lines().collect();
    for i in 0..lines_a.len().max(lines_b.len()) {
        let (left, right) = (lines_a.get(i), lines_b.get(i));
        if left == right {
            continue;
        }
        if let Some(line) = left {
            println!("{}", format!("- {}", line).red());
        }
        if let Some(line) = right {
            println!("{}", format!("+ {}", line).green());
        }
    }
    EXIT_INVALID
}

// ── Helpers ───────────────────────────────────────────────

fn read_source(file: &Path) -> Result<String, i32> {
    let source = std::fs::read_to_string(file).map_err(|e| {
        eprintln!(
            "{} cannot read {}: {}",
            "error:".red().bold(),
            file.display(),
            e
        );
        EXIT_IO
    })?;
    debug!("read {} ({} bytes)", file.display(), source.len());
    Ok(source)
}

/// Read and lower a file; on failure, report and return the exit code
fn lower_file(file: &Path, config: &ParserConfig) -> Result<LoweredSource, i32> {
    let source = read_source(file)?;
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let result = cxl_core::lower_source_with(&source, config, &mut diagnostics);
    print_diagnostics(file, &diagnostics);
    result.map_err(|_| EXIT_INVALID)
}

fn print_diagnostics(file: &Path, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let line = format!("{}: {}", file.display(), diagnostic);
        match diagnostic.severity {
            Severity::Error => eprintln!("{}", line.red()),
            Severity::Warning => eprintln!("{}", line.yellow()),
        }
    }
}
