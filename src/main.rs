use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use cdripd::core::probe::check_access;
use cdripd::web::WebServer;
use cdripd::{adapters, config, context, logging};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "cdripd")]
#[command(about = "HTTP service for ripping audio CDs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the drive API
    Daemon(ServerArgs),
    /// Print the drive catalog as JSON and exit
    Drives,
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    http_bind: Option<SocketAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    cdrom_device: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    log_level: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    log_json: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    simulation: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Daemon(args) => config::AppConfig::new(Some(args))?,
        _ => config::AppConfig::new(None::<&ServerArgs>)?,
    };

    logging::init(logging::LogConfig {
        level: config.log_level.clone(),
        json: config.log_json,
    });

    match &cli.command {
        Commands::Daemon(_) => run_daemon(config).await.context("Failed to start daemon")?,
        Commands::Drives => run_drives(config).await.context("Failed to list drives")?,
    }

    Ok(())
}

async fn run_daemon(config: config::AppConfig) -> Result<()> {
    if !config.simulation {
        let device = Path::new(&config.cdrom_device);
        if let Err(e) = check_access(device) {
            bail!("{} is not readable and writable: {e}", device.display());
        }
    }

    let runner = adapters::get_runner(config.simulation, &config.tmp_dir);
    let bind_addr = config.http_bind;
    let ctx = context::AppContext::new(config, runner);

    match ctx.catalog.refresh().await {
        Ok(drives) => tracing::info!(count = drives.len(), "Drive catalog loaded"),
        Err(e) => tracing::warn!(error = %e, "Initial drive scan failed, starting with no drives"),
    }

    let server = Arc::new(WebServer::new(ctx, bind_addr));
    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_server.shutdown();
        }
    });

    server.start().await
}

async fn run_drives(config: config::AppConfig) -> Result<()> {
    let runner = adapters::get_runner(config.simulation, &config.tmp_dir);
    let ctx = context::AppContext::new(config, runner);
    let drives = ctx.catalog.refresh().await?;
    println!("{}", serde_json::to_string_pretty(drives.as_ref())?);
    Ok(())
}
