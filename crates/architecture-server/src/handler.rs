//! Tool Handlers
//!
//! Bodies of the architecture tools. Each handler reads from the shared
//! [`Config`] and returns plain text.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mcp_engine::protocol::Content;
use mcp_engine::{ResourceHandler, ToolHandler};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Config;

/// Helper to get a text argument. Non-string values are rendered as JSON
/// rather than rejected.
fn get_text(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

pub struct ArchitectureStatus {
    pub config: Arc<Config>,
}

#[async_trait]
impl ToolHandler for ArchitectureStatus {
    async fn call(&self, _arguments: Map<String, Value>) -> anyhow::Result<Vec<Content>> {
        Ok(vec![Content::text(self.config.status.clone())])
    }
}

pub struct AddPattern;

#[async_trait]
impl ToolHandler for AddPattern {
    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Vec<Content>> {
        let pattern_type =
            get_text(&arguments, "pattern_type").unwrap_or_else(|| "unknown".to_string());
        let pattern_data = get_text(&arguments, "pattern_data").unwrap_or_default();

        debug!(pattern_type = %pattern_type, "Adding pattern");
        Ok(vec![Content::text(format!(
            "Pattern {} added: {}",
            pattern_type, pattern_data
        ))])
    }
}

pub struct UserPreferences {
    pub config: Arc<Config>,
}

#[async_trait]
impl ToolHandler for UserPreferences {
    async fn call(&self, _arguments: Map<String, Value>) -> anyhow::Result<Vec<Content>> {
        Ok(vec![Content::text(self.config.preferences.clone())])
    }
}

/// Reader behind `config://{component}`.
pub struct ComponentConfig {
    pub config: Arc<Config>,
}

#[async_trait]
impl ResourceHandler for ComponentConfig {
    async fn read(
        &self,
        _uri: &str,
        variables: &HashMap<String, String>,
    ) -> anyhow::Result<String> {
        let component = variables
            .get("component")
            .ok_or_else(|| anyhow::anyhow!("template has no component variable"))?;
        Ok(self.config.component(component))
    }
}
