//! `diagnosis`: take timed diagnostic rounds from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod render;

use context::TargetArgs;

#[derive(Parser)]
#[command(name = "diagnosis", version, about = "Timed multi-round diagnostic assessments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the departments found in a catalog
    Departments {
        /// Catalog JSON with departments, rounds and questions
        #[arg(long, env = "DIAGNOSIS_CATALOG")]
        catalog: PathBuf,
    },

    /// Show a department's rounds and which of them are open
    Rounds {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Take rounds interactively, starting from the next open one
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Round to start with instead of the next open round
        #[arg(long)]
        round: Option<u8>,

        /// TOML file with assessment settings
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Departments { catalog } => commands::departments::execute(&catalog),
        Commands::Rounds { target } => commands::rounds::execute(&target).await,
        Commands::Run {
            target,
            round,
            settings,
        } => commands::run::execute(&target, round, settings.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
