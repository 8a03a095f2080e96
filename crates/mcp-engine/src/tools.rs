//! Tool registry
//!
//! Tools are registered once at startup, before the registry is handed to the
//! dispatcher. After that the registry is only read.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{McpError, RegistryError};
use crate::protocol::{CallToolResult, Content, ToolDescriptor};

/// Body of a tool. Errors become `internal error` responses.
#[async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Vec<Content>>;
}

/// Adapter for synchronous closures. Build with [`fn_tool`].
pub struct FnTool<F>(F);

pub fn fn_tool<F>(f: F) -> FnTool<F>
where
    F: Fn(Map<String, Value>) -> anyhow::Result<Vec<Content>> + Send + Sync + 'static,
{
    FnTool(f)
}

#[async_trait]
impl<F> ToolHandler for FnTool<F>
where
    F: Fn(Map<String, Value>) -> anyhow::Result<Vec<Content>> + Send + Sync + 'static,
{
    async fn call(&self, arguments: Map<String, Value>) -> anyhow::Result<Vec<Content>> {
        (self.0)(arguments)
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: impl ToolHandler,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }

        debug!("Registered tool: {}", descriptor.name);
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool(
        mut self,
        descriptor: ToolDescriptor,
        handler: impl ToolHandler,
    ) -> Result<Self, RegistryError> {
        self.register(descriptor, handler)?;
        Ok(self)
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate arguments against the tool's required properties, then run it
    /// to completion.
    ///
    /// The handler runs on its own task so a panic is contained and reported
    /// as an internal error. The caller still waits for it, so invocations
    /// never overlap.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self
            .index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        let arguments = match arguments {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(McpError::InvalidParams(
                    "arguments must be an object".to_string(),
                ))
            }
        };

        let missing = tool.descriptor.input_schema.missing_required(arguments.as_ref());
        if !missing.is_empty() {
            return Err(McpError::InvalidArguments {
                tool: name.to_string(),
                missing,
            });
        }

        let handler = Arc::clone(&tool.handler);
        let arguments = arguments.unwrap_or_default();
        let task = tokio::spawn(async move { handler.call(arguments).await });

        match task.await {
            Ok(Ok(content)) => Ok(CallToolResult { content }),
            Ok(Err(e)) => {
                error!(tool = %name, error = %format!("{:#}", e), "Tool failed");
                Err(McpError::Internal(format!("tool '{}' failed: {}", name, e)))
            }
            Err(e) if e.is_panic() => {
                error!(tool = %name, "Tool panicked");
                Err(McpError::Internal(format!("tool '{}' panicked", name)))
            }
            Err(e) => {
                error!(tool = %name, error = %e, "Tool task was cancelled");
                Err(McpError::Internal(format!("tool '{}' was cancelled", name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use serde_json::json;

    fn echo_tool() -> ToolDescriptor {
        ToolDescriptor::new(
            "echo",
            "Echo the given text",
            json!({"text": {"type": "string"}}),
            &["text"],
        )
    }

    fn echo(arguments: Map<String, Value>) -> anyhow::Result<Vec<Content>> {
        let text = arguments.get("text").and_then(Value::as_str).unwrap_or_default();
        Ok(vec![Content::text(text)])
    }

    struct Slow;

    #[async_trait]
    impl ToolHandler for Slow {
        async fn call(&self, _arguments: Map<String, Value>) -> anyhow::Result<Vec<Content>> {
            tokio::task::yield_now().await;
            Ok(vec![Content::text("done")])
        }
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = ToolRegistry::new()
            .with_tool(ToolDescriptor::new("zeta", "", json!({}), &[]), fn_tool(echo))
            .unwrap()
            .with_tool(ToolDescriptor::new("alpha", "", json!({}), &[]), fn_tool(echo))
            .unwrap()
            .with_tool(ToolDescriptor::new("mid", "", json!({}), &[]), Slow)
            .unwrap();

        let names: Vec<String> = registry.descriptors().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool(), fn_tool(echo)).unwrap();

        let err = registry.register(echo_tool(), fn_tool(echo)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_invoke_returns_content() {
        let registry = ToolRegistry::new().with_tool(echo_tool(), fn_tool(echo)).unwrap();

        let result = registry
            .invoke("echo", Some(json!({"text": "hi"})))
            .await
            .unwrap();
        assert_eq!(result.content, vec![Content::text("hi")]);

        let result = ToolRegistry::new()
            .with_tool(ToolDescriptor::new("slow", "", json!({}), &[]), Slow)
            .unwrap()
            .invoke("slow", None)
            .await
            .unwrap();
        assert_eq!(result.content, vec![Content::text("done")]);
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("nope", None).await.unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_invoke_missing_arguments() {
        let registry = ToolRegistry::new().with_tool(echo_tool(), fn_tool(echo)).unwrap();

        let err = registry.invoke("echo", None).await.unwrap_err();
        assert!(
            matches!(err, McpError::InvalidArguments { ref missing, .. } if missing == &["text"])
        );

        let err = registry.invoke("echo", Some(json!({"other": 1}))).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidArguments { .. }));

        let err = registry.invoke("echo", Some(json!("text"))).await.unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_no_type_coercion() {
        let registry = ToolRegistry::new()
            .with_tool(
                echo_tool(),
                fn_tool(|arguments| Ok(vec![Content::text(arguments["text"].to_string())])),
            )
            .unwrap();

        let result = registry.invoke("echo", Some(json!({"text": 5}))).await.unwrap();
        assert_eq!(result.content, vec![Content::text("5")]);
    }

    #[tokio::test]
    async fn test_handler_error_is_internal() {
        let registry = ToolRegistry::new()
            .with_tool(
                ToolDescriptor::new("broken", "", json!({}), &[]),
                fn_tool(|_| bail!("disk on fire")),
            )
            .unwrap();

        let err = registry.invoke("broken", None).await.unwrap_err();
        assert_eq!(err.code(), crate::protocol::INTERNAL_ERROR);
        assert!(err.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let registry = ToolRegistry::new()
            .with_tool(
                ToolDescriptor::new("panics", "", json!({}), &[]),
                fn_tool(|_| panic!("boom")),
            )
            .unwrap();

        let err = registry.invoke("panics", None).await.unwrap_err();
        assert!(matches!(err, McpError::Internal(ref msg) if msg.contains("panicked")));

        // The registry is still usable afterwards.
        assert!(registry.invoke("panics", None).await.is_err());
    }
}
