use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use synergy_agent::pipeline::scheduler::loop_sync;
use synergy_agent::server::server::{self, AppState};
use synergy_agent::utils::config_loader;
use synergy_agent::utils::logging::{self, LogLevel};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "synergy-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the token, proxy, sync and dataset routes
    Serve,
    /// Run one dataset sync and print the report
    Sync,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level).await?;

    // -------------------------------
    // 2. Shared request client and state
    // -------------------------------

    let client = Client::builder()
        .user_agent(service_config.upstream.user_agent.as_str())
        .build()?;
    let state = AppState::from_config(&service_config, client).await;

    match args.command {
        // -------------------------------
        // 3a. One-shot sync
        // -------------------------------
        Command::Sync => {
            let report = state.sync().await.map_err(|e| anyhow!("sync failed: {}", e))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        // -------------------------------
        // 3b. HTTP server + scheduled sync
        // -------------------------------
        Command::Serve => {
            let scheduled = loop_sync(Arc::clone(&state.orchestrator), service_config.sync.interval_seconds);
            let http_server = server::start(&service_config.settings, state);
            info!("Service starting...");
            tokio::try_join!(http_server, scheduled)?;
            Ok(())
        }
    }
}
