use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod driver;

use driver::{CompileOutcome, compile_file, resolve_imports_file, validate_file};

/// aflow compiles agentic workflow Markdown into runner lock files.
#[derive(Parser)]
#[command(name = "aflow", version, about)]
struct Cli {
    /// Enable verbose output (equivalent to AFLOW_LOG=aflow=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a workflow source into its lock file.
    Compile {
        /// Input Markdown file path.
        input: PathBuf,

        /// Output lock file path (default: `<input-stem>.lock.yml` next to
        /// the input).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Apply the strict-mode policy regardless of the front-matter.
        #[arg(long)]
        strict: bool,

        /// Validate and build the pipeline graph without writing the lock
        /// file.
        #[arg(long)]
        no_emit: bool,
    },

    /// Validate a workflow source and report all findings.
    Validate {
        /// Input Markdown file path.
        input: PathBuf,

        /// Apply the strict-mode policy regardless of the front-matter.
        #[arg(long)]
        strict: bool,
    },

    /// Resolve imports and print the merged front-matter plus prompt body.
    ResolveImports {
        /// Input Markdown file path.
        input: PathBuf,
    },
}

/// Exit conventions: 0 clean, 1 general error, 2 validation error.
const EXIT_GENERAL: u8 = 1;
const EXIT_VALIDATION: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("aflow=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_env("AFLOW_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aflow=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile {
            input,
            output,
            strict,
            no_emit,
        } => match compile_file(&input, output.as_deref(), strict, no_emit) {
            Ok(CompileOutcome { lock_path, warnings }) => {
                for warning in warnings.iter() {
                    eprintln!("{warning}");
                }
                if let Some(path) = lock_path {
                    eprintln!("wrote {}", path.display());
                }
                ExitCode::SUCCESS
            }
            Err(err) => render_failure(err),
        },
        Commands::Validate { input, strict } => match validate_file(&input, strict) {
            Ok(warnings) => {
                for warning in warnings.iter() {
                    eprintln!("{warning}");
                }
                eprintln!("{} is valid", input.display());
                ExitCode::SUCCESS
            }
            Err(err) => render_failure(err),
        },
        Commands::ResolveImports { input } => match resolve_imports_file(&input) {
            Ok(rendered) => {
                print!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(err) => render_failure(err),
        },
    }
}

fn render_failure(failure: driver::Failure) -> ExitCode {
    match failure {
        driver::Failure::Validation(diags) => {
            for diagnostic in diags.iter() {
                eprintln!("{diagnostic}");
            }
            eprintln!("{} error(s)", diags.error_count());
            ExitCode::from(EXIT_VALIDATION)
        }
        driver::Failure::Hard(err) => {
            eprintln!("error: {err}");
            ExitCode::from(EXIT_GENERAL)
        }
    }
}
