//! Resource registry
//!
//! Readable resources addressed by URI. Fixed resources show up in
//! `resources/list`; templates such as `config://{component}` show up in
//! `resources/templates/list` and bind their `{variables}` on read.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::{McpError, RegistryError};
use crate::protocol::{ReadResourceResult, Resource, ResourceTemplate, TextResourceContents};

#[async_trait]
pub trait ResourceHandler: Send + Sync + 'static {
    async fn read(&self, uri: &str, variables: &HashMap<String, String>) -> anyhow::Result<String>;
}

/// Adapter for synchronous closures. Build with [`fn_resource`].
pub struct FnResource<F>(F);

pub fn fn_resource<F>(f: F) -> FnResource<F>
where
    F: Fn(&str, &HashMap<String, String>) -> anyhow::Result<String> + Send + Sync + 'static,
{
    FnResource(f)
}

#[async_trait]
impl<F> ResourceHandler for FnResource<F>
where
    F: Fn(&str, &HashMap<String, String>) -> anyhow::Result<String> + Send + Sync + 'static,
{
    async fn read(&self, uri: &str, variables: &HashMap<String, String>) -> anyhow::Result<String> {
        (self.0)(uri, variables)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A URI pattern with `{name}` placeholders. Each placeholder matches one
/// non-empty run of characters without `/`.
#[derive(Debug, Clone, PartialEq)]
pub struct UriTemplate {
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let end = rest[start..]
                .find('}')
                .map(|offset| start + offset)
                .ok_or_else(|| invalid("unclosed '{'"))?;
            let name = &rest[start + 1..end];

            if name.is_empty() || name.contains('{') {
                return Err(invalid("empty or nested variable"));
            }
            if matches!(segments.last(), Some(Segment::Variable(_))) {
                return Err(invalid("adjacent variables"));
            }

            segments.push(Segment::Variable(name.to_string()));
            rest = &rest[end + 1..];
        }

        if rest.contains('}') {
            return Err(invalid("unmatched '}'"));
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Variable bindings if `uri` matches, `None` otherwise.
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let mut variables = HashMap::new();
        let mut rest = uri;
        let mut segments = self.segments.iter().peekable();

        while let Some(segment) = segments.next() {
            match segment {
                Segment::Literal(literal) => rest = rest.strip_prefix(literal.as_str())?,
                Segment::Variable(name) => {
                    let end = match segments.peek() {
                        Some(Segment::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let value = &rest[..end];
                    if value.is_empty() || value.contains('/') {
                        return None;
                    }
                    variables.insert(name.clone(), value.to_string());
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(variables)
    }
}

enum Listing {
    Resource(Resource),
    Template(ResourceTemplate),
}

struct RegisteredResource {
    listing: Listing,
    pattern: UriTemplate,
    handler: Arc<dyn ResourceHandler>,
}

impl RegisteredResource {
    fn key(&self) -> &str {
        match &self.listing {
            Listing::Resource(r) => &r.uri,
            Listing::Template(t) => &t.uri_template,
        }
    }

    fn mime_type(&self) -> Option<String> {
        match &self.listing {
            Listing::Resource(r) => r.mime_type.clone(),
            Listing::Template(t) => t.mime_type.clone(),
        }
    }
}

#[derive(Default)]
pub struct ResourceRegistry {
    entries: Vec<RegisteredResource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource at a fixed URI.
    pub fn register_resource(
        &mut self,
        resource: Resource,
        handler: impl ResourceHandler,
    ) -> Result<(), RegistryError> {
        let pattern = UriTemplate {
            segments: vec![Segment::Literal(resource.uri.clone())],
        };
        self.insert(Listing::Resource(resource), pattern, Arc::new(handler))
    }

    pub fn register_template(
        &mut self,
        template: ResourceTemplate,
        handler: impl ResourceHandler,
    ) -> Result<(), RegistryError> {
        let pattern = UriTemplate::parse(&template.uri_template)?;
        self.insert(Listing::Template(template), pattern, Arc::new(handler))
    }

    fn insert(
        &mut self,
        listing: Listing,
        pattern: UriTemplate,
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), RegistryError> {
        let entry = RegisteredResource {
            listing,
            pattern,
            handler,
        };
        if self.entries.iter().any(|e| e.key() == entry.key()) {
            return Err(RegistryError::DuplicateResource(entry.key().to_string()));
        }

        debug!("Registered resource: {}", entry.key());
        self.entries.push(entry);
        Ok(())
    }

    pub fn resources(&self) -> Vec<Resource> {
        self.entries
            .iter()
            .filter_map(|e| match &e.listing {
                Listing::Resource(r) => Some(r.clone()),
                Listing::Template(_) => None,
            })
            .collect()
    }

    pub fn templates(&self) -> Vec<ResourceTemplate> {
        self.entries
            .iter()
            .filter_map(|e| match &e.listing {
                Listing::Template(t) => Some(t.clone()),
                Listing::Resource(_) => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the first registered entry whose URI pattern matches.
    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult, McpError> {
        let (entry, variables) = self
            .entries
            .iter()
            .find_map(|e| e.pattern.matches(uri).map(|vars| (e, vars)))
            .ok_or_else(|| McpError::ResourceNotFound(uri.to_string()))?;

        let handler = Arc::clone(&entry.handler);
        let owned_uri = uri.to_string();
        let task = tokio::spawn(async move { handler.read(&owned_uri, &variables).await });

        let text = match task.await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                error!(uri = %uri, error = %format!("{:#}", e), "Resource read failed");
                return Err(McpError::Internal(format!("reading '{}' failed: {}", uri, e)));
            }
            Err(e) => {
                error!(uri = %uri, error = %e, "Resource reader did not complete");
                return Err(McpError::Internal(format!("reading '{}' failed", uri)));
            }
        };

        Ok(ReadResourceResult {
            contents: vec![TextResourceContents {
                uri: uri.to_string(),
                mime_type: entry.mime_type(),
                text,
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(uri_template: &str) -> ResourceTemplate {
        ResourceTemplate {
            uri_template: uri_template.to_string(),
            name: "test".to_string(),
            description: None,
            mime_type: Some("text/plain".to_string()),
        }
    }

    #[test]
    fn test_template_matching() {
        let t = UriTemplate::parse("config://{component}").unwrap();
        let vars = t.matches("config://memory").unwrap();
        assert_eq!(vars["component"], "memory");

        assert!(t.matches("config://").is_none());
        assert!(t.matches("config://a/b").is_none());
        assert!(t.matches("other://memory").is_none());

        let t = UriTemplate::parse("repo://{owner}/{name}/readme").unwrap();
        let vars = t.matches("repo://acme/rocket/readme").unwrap();
        assert_eq!(vars["owner"], "acme");
        assert_eq!(vars["name"], "rocket");
        assert!(t.matches("repo://acme/rocket/license").is_none());
    }

    #[test]
    fn test_invalid_templates() {
        for bad in ["config://{", "config://{}", "x://{a}{b}", "x://a}"] {
            assert!(
                matches!(UriTemplate::parse(bad), Err(RegistryError::InvalidTemplate { .. })),
                "{}",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_read_binds_variables() {
        let mut registry = ResourceRegistry::new();
        registry
            .register_template(
                template("config://{component}"),
                fn_resource(|_uri: &str, vars: &HashMap<String, String>| {
                    Ok(format!("value of {}", vars["component"]))
                }),
            )
            .unwrap();

        let result = registry.read("config://tools").await.unwrap();
        assert_eq!(result.contents[0].text, "value of tools");
        assert_eq!(result.contents[0].uri, "config://tools");
        assert_eq!(result.contents[0].mime_type.as_deref(), Some("text/plain"));
        assert_eq!(registry.templates().len(), 1);
        assert!(registry.resources().is_empty());
    }

    #[tokio::test]
    async fn test_fixed_resource_and_unknown_uri() {
        let mut registry = ResourceRegistry::new();
        registry
            .register_resource(
                Resource {
                    uri: "status://now".to_string(),
                    name: "status".to_string(),
                    description: None,
                    mime_type: None,
                },
                fn_resource(|uri: &str, _vars: &HashMap<String, String>| Ok(uri.to_uppercase())),
            )
            .unwrap();

        assert_eq!(registry.read("status://now").await.unwrap().contents[0].text, "STATUS://NOW");

        let err = registry.read("status://later").await.unwrap_err();
        assert!(matches!(err, McpError::ResourceNotFound(uri) if uri == "status://later"));
    }

    #[test]
    fn test_duplicate_template_rejected() {
        let mut registry = ResourceRegistry::new();
        let reader = || fn_resource(|_: &str, _: &HashMap<String, String>| Ok(String::new()));
        registry.register_template(template("a://{x}"), reader()).unwrap();

        let err = registry.register_template(template("a://{x}"), reader()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateResource(_)));
    }
}
