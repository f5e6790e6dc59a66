// Tool trait and the name-keyed registry

use super::implementations::{CollectTool, ContinueSessionTool, SendNotificationTool};
use super::types::{ToolContext, ToolDefinition, ToolInputSchema};
use crate::dialog::InputResolver;
use crate::errors::ParleyError;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> ToolInputSchema;

    /// Run the tool. The returned text becomes the call's result.
    async fn execute(&self, input: Value, context: &ToolContext<'_>) -> Result<String>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Static table of tools, fixed after construction.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, so `list-tools` output is stable
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard tool set, all asking through `resolver`.
    pub fn builtin(resolver: Arc<InputResolver>) -> Result<Self, ParleyError> {
        let mut registry = Self::new();
        registry.register(Arc::new(CollectTool::text(resolver.clone())))?;
        registry.register(Arc::new(CollectTool::confirm(resolver.clone())))?;
        registry.register(Arc::new(CollectTool::notice(resolver.clone())))?;
        registry.register(Arc::new(SendNotificationTool::new(resolver.clone())))?;
        registry.register(Arc::new(ContinueSessionTool::new(resolver)))?;
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ParleyError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ParleyError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{CorrelationBroker, DisconnectedSink};
    use std::time::Duration;

    struct EchoTool(&'static str);

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        fn input_schema(&self) -> ToolInputSchema {
            ToolInputSchema::simple(vec![("text", "Text to echo")])
        }

        async fn execute(&self, input: Value, _ctx: &ToolContext<'_>) -> Result<String> {
            Ok(input["text"].as_str().unwrap_or_default().to_string())
        }
    }

    fn resolver() -> Arc<InputResolver> {
        let broker = CorrelationBroker::new(Arc::new(DisconnectedSink), Duration::from_secs(1));
        Arc::new(InputResolver::new(broker, None, Duration::from_secs(1), "Parley"))
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("echo"))).unwrap();
        let err = registry.register(Arc::new(EchoTool("echo"))).unwrap_err();
        assert!(matches!(err, ParleyError::DuplicateTool(name) if name == "echo"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("b"))).unwrap();
        registry.register(Arc::new(EchoTool("a"))).unwrap();
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_builtin_tool_set() {
        let registry = ToolRegistry::builtin(resolver()).unwrap();
        assert_eq!(
            registry.names(),
            &[
                "collect-input",
                "collect-confirm",
                "collect-notice",
                "send-notification",
                "continue-session"
            ]
        );
        assert!(registry.get("collect-confirm").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[tokio::test]
    async fn test_registered_tool_executes() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool("echo"))).unwrap();
        let tool = registry.get("echo").unwrap();
        let out = tool
            .execute(serde_json::json!({"text": "hi"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, "hi");
    }
}
