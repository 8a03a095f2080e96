//! Architecture MCP Server
//!
//! Exposes architecture status, pattern and preference tools plus component
//! configuration resources to AI assistants via the Model Context Protocol.

pub mod config;
pub mod handler;
pub mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use mcp_engine::{Dispatcher, Server};

use crate::config::Config;

/// Register every tool and resource and wrap them in a ready-to-serve server.
pub fn build_server(config: Config) -> Result<Server> {
    let config = Arc::new(config);
    let tools = tools::tool_registry(&config).context("Failed to register tools")?;
    let resources = tools::resource_registry(&config).context("Failed to register resources")?;

    let dispatcher = Dispatcher::with_resources(config.server_config(), tools, resources);
    Ok(Server::new(dispatcher))
}
