//! Architecture Tool Definitions
//!
//! Declares the tools and resources this server exposes and wires them to
//! their handlers. Everything is registered once, at startup.

use std::sync::Arc;

use mcp_engine::protocol::{ResourceTemplate, ToolDescriptor};
use mcp_engine::{RegistryError, ResourceRegistry, ToolRegistry};
use serde_json::json;

use crate::config::Config;
use crate::handler::{AddPattern, ArchitectureStatus, ComponentConfig, UserPreferences};

fn architecture_status() -> ToolDescriptor {
    ToolDescriptor::new(
        "architecture_status",
        "Get current architecture status",
        json!({}),
        &[],
    )
}

fn add_pattern() -> ToolDescriptor {
    ToolDescriptor::new(
        "add_pattern",
        "Add new architectural pattern",
        json!({
            "pattern_type": {
                "type": "string",
                "description": "Kind of pattern, e.g. layered or event-driven"
            },
            "pattern_data": {"type": "string", "description": "Pattern body"}
        }),
        &["pattern_type", "pattern_data"],
    )
}

fn get_user_preferences() -> ToolDescriptor {
    ToolDescriptor::new(
        "get_user_preferences",
        "Get stored user preferences",
        json!({}),
        &[],
    )
}

/// Build the tool registry backed by `config`. Registration order is listing order.
pub fn tool_registry(config: &Arc<Config>) -> Result<ToolRegistry, RegistryError> {
    ToolRegistry::new()
        .with_tool(
            architecture_status(),
            ArchitectureStatus {
                config: Arc::clone(config),
            },
        )?
        .with_tool(add_pattern(), AddPattern)?
        .with_tool(
            get_user_preferences(),
            UserPreferences {
                config: Arc::clone(config),
            },
        )
}

/// Build the resource registry serving `config://{component}`.
pub fn resource_registry(config: &Arc<Config>) -> Result<ResourceRegistry, RegistryError> {
    let mut registry = ResourceRegistry::new();
    registry.register_template(
        ResourceTemplate {
            uri_template: "config://{component}".to_string(),
            name: "Component configuration".to_string(),
            description: Some(format!(
                "Architecture component configuration. Known components: {}",
                config.components.keys().cloned().collect::<Vec<_>>().join(", ")
            )),
            mime_type: Some("text/plain".to_string()),
        },
        ComponentConfig {
            config: Arc::clone(config),
        },
    )?;
    Ok(registry)
}
