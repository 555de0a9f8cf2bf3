mod category;
mod check;
mod classify;
mod config;
mod discovery;
mod git;
mod measure;
mod outlier;
mod provider;
mod report;
mod stats;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "context-health",
    version,
    about = "Check AI assistant instruction files against provider context budgets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate instruction file sizes and look for outliers
    Check {
        /// Repository root to scan
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Config file (default: <root>/context-health.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Compare changed files against a baseline from this git ref (e.g. origin/main)
        #[arg(long, value_name = "REF")]
        compare_to: Option<String>,
        /// Override OUTLIER_IQR_MULTIPLIER (1.5 = mild, 3 = extreme)
        #[arg(long, value_name = "K")]
        iqr_multiplier: Option<f64>,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List provider profiles and their token limits
    Providers {
        /// Repository root holding context-health.toml
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Config file (default: <root>/context-health.toml, built-in table if absent)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays a clean report.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            root,
            config,
            compare_to,
            iqr_multiplier,
            json,
        } => {
            let options = check::CheckOptions {
                root,
                config,
                compare_to,
                iqr_multiplier,
            };
            let report = check::run(&options)?;
            if json {
                report.print_json()?;
            } else {
                print!("{report}");
            }
            if !report.passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Providers { root, config, json } => {
            let table = check::provider_table(&root, config.as_deref())?;
            report::print_providers(&table, json)
        }
    }
}
