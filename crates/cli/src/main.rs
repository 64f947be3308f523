//! deliberate CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Run the agent described by the config file
//! - `check`   — Validate config, rule conditions and reflexes
//! - `init`    — Write a starter config
//! - `demo`    — Built-in traffic-light agent
//! - `status`  — Show resolved settings

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "deliberate",
    about = "deliberate — reactive-deliberative agent runtime",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "DELIBERATE_JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent until Ctrl-C or a cycle limit
    Run {
        /// Config file (defaults to ~/.deliberate/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many deliberation cycles
        #[arg(long)]
        cycles: Option<u64>,
    },

    /// Validate configuration, rules and reflexes
    Check {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a starter config to the config directory
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Run the built-in traffic-light agent
    Demo {
        /// Deliberation cycles to run
        #[arg(long, default_value_t = 8)]
        cycles: u64,

        /// Idle delay between cycles, in milliseconds
        #[arg(long, default_value_t = 250)]
        idle_ms: u64,
    },

    /// Show resolved settings
    Status {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    fn config_path(&self) -> Option<&std::path::Path> {
        match self {
            Commands::Run { config, .. }
            | Commands::Check { config }
            | Commands::Status { config } => config.as_deref(),
            Commands::Init { .. } | Commands::Demo { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logging settings come from the config when it loads; errors surface
    // again from the command itself.
    let logging = commands::load_config(cli.command.config_path())
        .map(|c| c.logging)
        .unwrap_or_default();

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        logging.level
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs || logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Run { config, cycles } => commands::run::run(config, cycles).await?,
        Commands::Check { config } => commands::check::run(config).await?,
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Demo { cycles, idle_ms } => commands::demo::run(cycles, idle_ms).await?,
        Commands::Status { config } => commands::status::run(config).await?,
    }

    Ok(())
}
