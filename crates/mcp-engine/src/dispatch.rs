//! Method routing
//!
//! Turns a decoded request into at most one response. Handlers never see the
//! transport and never mutate the session directly.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::McpError;
use crate::protocol::{
    CallToolParams, Implementation, InitializeParams, InitializeResult, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, ReadResourceParams, Request, ResourcesCapability,
    Response, ServerCapabilities, ToolsCapability, PROTOCOL_VERSION,
};
use crate::resources::ResourceRegistry;
use crate::session::{Session, Transition};
use crate::tools::ToolRegistry;

/// Methods this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Initialized,
    Cancelled,
    Ping,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourceTemplatesList,
    ResourcesRead,
}

impl Method {
    pub fn parse(name: &str) -> Option<Self> {
        let method = match name {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "notifications/cancelled" => Self::Cancelled,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "resources/list" => Self::ResourcesList,
            "resources/templates/list" => Self::ResourceTemplatesList,
            "resources/read" => Self::ResourcesRead,
            _ => return None,
        };
        Some(method)
    }

    /// Whether the handshake must have completed first.
    pub fn requires_ready(&self) -> bool {
        !matches!(self, Self::Initialize | Self::Initialized | Self::Cancelled)
    }
}

/// Static server identity handed to the engine at construction.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub instructions: Option<String>,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instructions: None,
        }
    }
}

/// Outcome of dispatching one request.
#[derive(Debug, Default)]
pub struct Dispatched {
    /// `None` for notifications.
    pub response: Option<Response>,
    pub transition: Option<Transition>,
}

struct Routed {
    value: Value,
    transition: Option<Transition>,
}

impl Routed {
    fn value(value: Value) -> Self {
        Self {
            value,
            transition: None,
        }
    }
}

pub struct Dispatcher {
    config: ServerConfig,
    capabilities: ServerCapabilities,
    tools: ToolRegistry,
    resources: ResourceRegistry,
}

impl Dispatcher {
    pub fn new(config: ServerConfig, tools: ToolRegistry) -> Self {
        Self::with_resources(config, tools, ResourceRegistry::new())
    }

    pub fn with_resources(
        config: ServerConfig,
        tools: ToolRegistry,
        resources: ResourceRegistry,
    ) -> Self {
        let capabilities = ServerCapabilities {
            tools: Some(ToolsCapability {}),
            resources: (!resources.is_empty()).then_some(ResourcesCapability { subscribe: false }),
        };

        Self {
            config,
            capabilities,
            tools,
            resources,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub async fn dispatch(&self, request: Request, session: &Session) -> Dispatched {
        let Request { id, method, params } = request;
        let outcome = self.route(&method, params, session).await;

        match (id, outcome) {
            (Some(id), Ok(routed)) => {
                info!(method = %method, id = %id, outcome = "success", "Handled request");
                Dispatched {
                    response: Some(Response::success(id, routed.value)),
                    transition: routed.transition,
                }
            }
            (Some(id), Err(e)) => {
                warn!(method = %method, id = %id, code = e.code(), error = %e, "Request failed");
                Dispatched {
                    response: Some(e.into_response(id)),
                    transition: None,
                }
            }
            (None, Ok(routed)) => {
                debug!(method = %method, "Handled notification");
                Dispatched {
                    response: None,
                    transition: routed.transition,
                }
            }
            (None, Err(e)) => {
                warn!(method = %method, error = %e, "Notification failed");
                Dispatched::default()
            }
        }
    }

    async fn route(
        &self,
        name: &str,
        params: Map<String, Value>,
        session: &Session,
    ) -> Result<Routed, McpError> {
        let method = Method::parse(name);

        // Before the handshake even unknown methods are refused as not initialized.
        if !session.is_ready() && method.map_or(true, |m| m.requires_ready()) {
            return Err(McpError::NotInitialized);
        }
        let method = method.ok_or_else(|| McpError::MethodNotFound(name.to_string()))?;

        match method {
            Method::Initialize => self.initialize(params, session),
            Method::Initialized => {
                info!("Client initialized");
                Ok(Routed::value(Value::Null))
            }
            Method::Cancelled => {
                debug!("Request cancelled; in-flight requests are not interruptible");
                Ok(Routed::value(Value::Null))
            }
            Method::Ping => Ok(Routed::value(json!({}))),
            Method::ToolsList => to_routed(ListToolsResult {
                tools: self.tools.descriptors(),
            }),
            Method::ToolsCall => {
                let params: CallToolParams = parse_params(params)?;
                info!("Calling tool: {}", params.name);
                let result = self.tools.invoke(&params.name, params.arguments).await?;
                to_routed(result)
            }
            Method::ResourcesList => to_routed(ListResourcesResult {
                resources: self.resources.resources(),
            }),
            Method::ResourceTemplatesList => to_routed(ListResourceTemplatesResult {
                resource_templates: self.resources.templates(),
            }),
            Method::ResourcesRead => {
                let params: ReadResourceParams = parse_params(params)?;
                let result = self.resources.read(&params.uri).await?;
                to_routed(result)
            }
        }
    }

    fn initialize(
        &self,
        params: Map<String, Value>,
        session: &Session,
    ) -> Result<Routed, McpError> {
        if let Some(negotiated) = session.negotiated() {
            info!(
                client = session.client().map(|c| c.name.as_str()).unwrap_or("unknown"),
                "Repeated initialize; returning the negotiated session"
            );
            return to_routed(negotiated);
        }

        let params: InitializeParams = parse_params(params)?;
        match params.protocol_version.as_deref() {
            Some(PROTOCOL_VERSION) | None => {}
            Some(requested) => warn!(
                requested,
                supported = PROTOCOL_VERSION,
                "Client requested another protocol version; offering ours"
            ),
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: Implementation {
                name: self.config.name.clone(),
                version: self.config.version.clone(),
            },
            instructions: self.config.instructions.clone(),
        };

        info!("Initializing MCP server");
        Ok(Routed {
            value: serialize(&result)?,
            transition: Some(Transition::Ready {
                result,
                client: params.client_info,
            }),
        })
    }
}

fn parse_params<T: DeserializeOwned>(params: Map<String, Value>) -> Result<T, McpError> {
    serde_json::from_value(Value::Object(params))
        .map_err(|e| McpError::InvalidParams(e.to_string()))
}

fn serialize<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value)
        .map_err(|e| McpError::Internal(format!("Serialization error: {}", e)))
}

fn to_routed<T: Serialize>(value: T) -> Result<Routed, McpError> {
    serialize(&value).map(Routed::value)
}
