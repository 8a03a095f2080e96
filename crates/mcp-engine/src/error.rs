//! Engine error types

use serde_json::json;
use thiserror::Error;

use crate::protocol::{
    ErrorObject, RequestId, Response, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    METHOD_NOT_FOUND, PARSE_ERROR, SERVER_NOT_INITIALIZED,
};

/// Every failure a single request can produce. None of these end the session.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Server not initialized")]
    NotInitialized,

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Missing required arguments for {tool}: {}", missing.join(", "))]
    InvalidArguments { tool: String, missing: Vec<String> },

    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),

    /// The message is what the client sees; causes are logged where they occur.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => PARSE_ERROR,
            Self::InvalidRequest(_) => INVALID_REQUEST,
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::NotInitialized => SERVER_NOT_INITIALIZED,
            Self::InvalidParams(_)
            | Self::ToolNotFound(_)
            | Self::InvalidArguments { .. }
            | Self::ResourceNotFound(_) => INVALID_PARAMS,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    pub fn to_error_object(&self) -> ErrorObject {
        let data = match self {
            Self::ToolNotFound(name) => Some(json!({ "tool": name })),
            Self::InvalidArguments { tool, missing } => {
                Some(json!({ "tool": tool, "missing": missing }))
            }
            Self::ResourceNotFound(uri) => Some(json!({ "uri": uri })),
            _ => None,
        };

        ErrorObject {
            code: self.code(),
            message: self.to_string(),
            data,
        }
    }

    pub fn into_response(self, id: RequestId) -> Response {
        Response::error(id, self.to_error_object())
    }
}

/// Startup-time registration failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("resource '{0}' is already registered")]
    DuplicateResource(String),

    #[error("invalid resource template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
}
