//! Atoll CLI — submit, validate, and inspect agent workflows.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "atoll", version, about = "Run declarative agent workflows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file and print the final output
    Run {
        /// Path to the workflow config (.json, .yaml or .yml)
        file: String,

        /// The task the workflow should carry out
        #[arg(long)]
        task: String,

        /// End-user identity tools are resolved for
        #[arg(long, default_value = "anonymous")]
        user_id: String,

        /// Directory for JSONL trace output; tracing is off when unset
        #[arg(long)]
        trace_dir: Option<PathBuf>,

        /// Use the offline echo engine instead of the HTTP backend
        #[arg(long)]
        offline: bool,
    },

    /// Parse and validate a workflow file without running it
    Validate {
        /// Path to the workflow config
        file: String,

        /// Also connect to declared sub-servers and list their tools
        #[arg(long)]
        probe: bool,
    },

    /// List the tool identifiers the built-in catalog can resolve
    Tools,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("atoll_core=warn,atoll=info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            file,
            task,
            user_id,
            trace_dir,
            offline,
        } => commands::run::execute(&file, &task, &user_id, trace_dir.as_deref(), offline).await,
        Commands::Validate { file, probe } => commands::validate::execute(&file, probe).await,
        Commands::Tools => commands::tools::execute().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
