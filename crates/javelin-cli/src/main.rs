//! Javelin command-line driver
//!
//! Loads a parsed module (the syntax tree as JSON), then checks, runs or
//! dumps it.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;
mod output;

/// Filter used when `JAVELIN_LOG` is unset
const DEFAULT_FILTER: &str = "javelin=info,javelin_engine=info";

#[derive(Parser)]
#[command(name = "javelin")]
#[command(about = "Javelin language engine driver", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log engine events at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Colored output
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,
}

/// `--color` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Color when stderr is a terminal
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a module and report diagnostics
    Check {
        /// Module syntax tree (JSON)
        module: PathBuf,
        /// Original source text, used to label diagnostics
        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// Compile and execute a module
    Run {
        /// Module syntax tree (JSON)
        module: PathBuf,
        /// Stop after this many steps
        #[arg(long)]
        max_steps: Option<u64>,
        /// Engine configuration (defaults to ./javelin.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Original source text, used to label diagnostics
        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// Print the generated programs as JSON
    Dump {
        /// Module syntax tree (JSON)
        module: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = match std::env::var("JAVELIN_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) if verbose => EnvFilter::new("javelin=debug,javelin_engine=debug"),
        Err(_) => EnvFilter::new(DEFAULT_FILTER),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let color = output::resolve_color_choice(cli.color);

    match cli.command {
        Commands::Check { module, source } => commands::check::execute(&module, source.as_deref(), color),
        Commands::Run {
            module,
            max_steps,
            config,
            source,
        } => commands::run::execute(commands::run::RunArgs {
            module,
            max_steps,
            config,
            source,
            color,
        }),
        Commands::Dump { module } => commands::dump::execute(&module),
    }
}
