mod config;
mod logging;
mod signals;

use std::path::PathBuf;

use anyhow::{Result, bail};
use axum::http::StatusCode;
use clap::{Parser, Subcommand};
use gate_access::GateAccessModule;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

use crate::config::AppConfig;

/// Gate access server - ANPR access decisions over HTTP
#[derive(Parser)]
#[command(name = "gate-server")]
#[command(about = "Gate access server - ANPR access decisions over HTTP")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config
        && !path.is_file()
    {
        bail!("config file does not exist: {}", path.display());
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(cli.port, cli.verbose);

    if cli.print_config {
        println!("{}", config.to_pretty_json()?);
        return Ok(());
    }

    logging::init(&config.logging, cli.verbose)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    // Building the module also validates the recognizer client settings.
    GateAccessModule::new(&config.gate_access)?;
    println!("Configuration is valid");
    println!("{}", config.to_pretty_json()?);
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Gate server starting");

    let module = GateAccessModule::new(&config.gate_access)?;
    let cancel = CancellationToken::new();
    let sweeper = module.spawn_sweeper(cancel.child_token());

    let app = module.router().layer(TimeoutLayer::with_status_code(
        StatusCode::GATEWAY_TIMEOUT,
        config.server.request_timeout,
    ));

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Gate server listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = signals::wait_for_shutdown().await {
                tracing::error!(error = %e, "Signal handling failed, shutting down");
            }
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    if let Some(handle) = sweeper
        && let Err(e) = handle.await
    {
        tracing::warn!(error = %e, "Sweeper task ended abnormally");
    }

    tracing::info!("Gate server stopped");
    Ok(())
}
