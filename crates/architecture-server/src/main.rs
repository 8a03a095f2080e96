//! Architecture MCP Server
//!
//! Usage:
//!   architecture-server [--config <path>] [--log-level <directive>]
//!
//! The server communicates over stdio using JSON-RPC 2.0, one message per line.

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use architecture_server::build_server;
use architecture_server::config::Config;

#[derive(Parser)]
#[command(name = "architecture-server", version, about = "Architecture MCP server over stdio")]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr (stdout is for MCP protocol)
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };

    // Exit here: the runtime would otherwise wait on the blocking stdin read
    // until the client closes the pipe.
    process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let name = config.server_name.clone();
    let version = config.server_version.clone();
    let mut server = build_server(config)?;

    info!(
        name = %name,
        version = %version,
        tools = server.dispatcher().tools().len(),
        "Architecture MCP server starting"
    );

    server.serve_stdio().await?;
    info!("Architecture MCP server stopped");
    Ok(())
}
