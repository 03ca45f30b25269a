//! Orca Control - CLI for the optimization assistant
//!
//! Describe an optimization problem in plain language; orcactl asks a model
//! for OR-Tools code, repairs and runs it, and reports the results.

mod commands;
mod output;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orcactl")]
#[command(about = "Orca - natural-language optimization with OR-Tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: $ORCA_CONFIG or ~/.config/orca/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate, run and summarize a model for a problem
    Solve {
        /// Problem description (words are joined with spaces)
        problem: Vec<String>,

        /// Use a bundled example problem instead (see `orcactl examples`)
        #[arg(long, conflicts_with = "problem")]
        example: Option<String>,

        /// Model id or preset label
        #[arg(long)]
        model: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Show the executed program
        #[arg(long)]
        show_code: bool,

        /// Stream the model's reasoning to stderr
        #[arg(long)]
        thinking: bool,

        /// Skip the plain-language summary
        #[arg(long)]
        no_summary: bool,
    },

    /// Repair a CP-SAT program (reads stdin when FILE is absent or `-`)
    Normalize {
        file: Option<PathBuf>,

        /// Report which rewrites fired on stderr
        #[arg(long)]
        explain: bool,
    },

    /// Extract objective and variables from solver output
    Parse {
        file: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pull the code block out of a model reply
    Extract { file: Option<PathBuf> },

    /// List bundled example problems
    Examples,

    /// List configured model presets
    Models,

    /// Show the effective configuration
    Config {
        /// Write a default config file to the config path
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Solve {
            problem,
            example,
            model,
            json,
            show_code,
            thinking,
            no_summary,
        } => commands::solve(
            config_path,
            commands::SolveArgs {
                problem: problem.join(" "),
                example,
                model,
                json,
                show_code,
                thinking,
                summarize: !no_summary,
            },
        ),
        Commands::Normalize { file, explain } => commands::normalize(file.as_deref(), explain),
        Commands::Parse { file, json } => commands::parse(file.as_deref(), json),
        Commands::Extract { file } => commands::extract(file.as_deref()),
        Commands::Examples => commands::examples(),
        Commands::Models => commands::models(config_path),
        Commands::Config { init, force } => commands::config(config_path, init, force),
    }
}
