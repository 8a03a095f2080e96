//! Configuration loading for architecture-server

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use mcp_engine::ServerConfig;

/// Server configuration. Read once at startup and shared read-only with the
/// tool and resource handlers.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name reported in `serverInfo`
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Version reported in `serverInfo`
    #[serde(default = "default_server_version")]
    pub server_version: String,

    /// Optional usage hint sent with the initialize result
    #[serde(default)]
    pub instructions: Option<String>,

    /// Text returned by `architecture_status`
    #[serde(default = "default_status")]
    pub status: String,

    /// Text returned by `get_user_preferences`
    #[serde(default = "default_preferences")]
    pub preferences: String,

    /// Component settings served as `config://{component}`
    #[serde(default = "default_components")]
    pub components: BTreeMap<String, String>,
}

fn default_server_name() -> String {
    "architecture-server".to_string()
}

fn default_server_version() -> String {
    "1.0.0".to_string()
}

fn default_status() -> String {
    "Architecture v10.8 operational with professional accuracy enforcement".to_string()
}

fn default_preferences() -> String {
    "Brief professional communication, D: drive preference, && command chains".to_string()
}

fn default_components() -> BTreeMap<String, String> {
    [
        ("accuracy", "Professional accuracy protocol active"),
        ("tools", "Tool safety enforcement - read_multiple_files prohibited"),
        ("memory", "User preference pattern storage operational"),
        (
            "mcp",
            "MCP servers: filesystem, brave-search, puppeteer, memory, architecture",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            server_version: default_server_version(),
            instructions: None,
            status: default_status(),
            preferences: default_preferences(),
            components: default_components(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, or use defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Parse TOML. User components are merged over the defaults.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;

        for (name, value) in default_components() {
            config.components.entry(name).or_insert(value);
        }

        Ok(config)
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("architecture-server")
            .join("config.toml")
    }

    /// Look up a component's configuration text.
    pub fn component(&self, name: &str) -> String {
        self.components
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("Config for {} not found", name))
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            name: self.server_name.clone(),
            version: self.server_version.clone(),
            instructions: self.instructions.clone(),
        }
    }
}
