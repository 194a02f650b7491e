//! Statecraft CLI — the main entry point.
//!
//! Exit codes: 0 clean shutdown, 1 configuration error, 2 unreachable
//! dependency (bind failure).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use statecraft_config::ServerConfig;
use statecraft_gateway::RuntimeBackend;
use statecraft_stats::TokenLedger;

#[derive(Parser)]
#[command(
    name = "statecraft",
    about = "Statecraft — an FSM-driven conversational agent runtime",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { config, port } => serve(config, port).await,
    }
}

async fn serve(config_path: Option<PathBuf>, port_override: Option<u16>) -> ExitCode {
    let mut config = match ServerConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::from(1);
        }
    };
    if let Some(port) = port_override {
        config.port = port;
    }

    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    let ledger = Arc::new(TokenLedger::new());
    let backend = Arc::new(RuntimeBackend::new(ledger).with_budget(config.budget));

    match statecraft_gateway::serve(addr, backend).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Gateway failed to serve on {addr}: {e}");
            ExitCode::from(2)
        }
    }
}
