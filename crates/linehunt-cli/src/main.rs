use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "linehunt")]
#[command(about = "Count matching lines with a pool of worker threads", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Term to search for (shorthand for `linehunt scan <TERM> [FILE]`)
    pub term: Option<String>,

    /// Input file (default: stdin, or `-`)
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub scan: ScanOptions,

    /// Config file (default: ./.linehunt.toml, then ~/.config/linehunt/config.toml)
    #[arg(long, global = true, env = "LINEHUNT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format: plain, json, pretty
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count lines containing TERM (default command)
    Scan {
        /// Term to search for
        term: String,

        /// Input file (default: stdin, or `-`)
        file: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Scan tuning flags, accepted with or without the `scan` subcommand
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScanOptions {
    /// Queue capacity in lines
    #[arg(short = 'c', long, global = true)]
    pub capacity: Option<usize>,

    /// Number of worker threads
    #[arg(short = 'w', long, global = true)]
    pub workers: Option<usize>,

    /// Match case-insensitively
    #[arg(short = 'i', long, global = true)]
    pub ignore_case: bool,

    /// Print only the total, without the per-worker breakdown
    #[arg(short = 'q', long, global = true)]
    pub total_only: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Total on the first line, then one line per worker (default)
    Plain,
    /// JSON output
    Json,
    /// Human-readable formatted output
    Pretty,
}

impl OutputFormat {
    fn from_config(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Plain,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose || std::env::var("LINEHUNT_DEBUG").is_ok() {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;
    let format = cli
        .format
        .unwrap_or_else(|| OutputFormat::from_config(&config.output.format));

    let code = match cli.command {
        Some(Commands::Scan { term, file }) => {
            commands::scan::run(&config, term, file, &cli.scan, format)?
        }
        Some(Commands::Config) => {
            commands::config::run(&config)?;
            0
        }
        None => match cli.term {
            // Default: treat positional args as TERM [FILE]
            Some(term) => commands::scan::run(&config, term, cli.file, &cli.scan, format)?,
            None => {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                println!();
                0
            }
        },
    };

    std::process::exit(code);
}
