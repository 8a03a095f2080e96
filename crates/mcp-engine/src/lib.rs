//! MCP Engine
//!
//! A Model Context Protocol server core speaking JSON-RPC 2.0 as one JSON
//! object per line. Tool providers register their tools up front; the engine
//! owns framing, the `initialize` handshake, method routing and error shaping.

pub mod dispatch;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod resources;
pub mod server;
pub mod session;
pub mod tools;
pub mod writer;

pub use dispatch::{Dispatcher, ServerConfig};
pub use error::{McpError, RegistryError};
pub use resources::{fn_resource, ResourceHandler, ResourceRegistry};
pub use server::Server;
pub use session::SessionState;
pub use tools::{fn_tool, ToolHandler, ToolRegistry};
