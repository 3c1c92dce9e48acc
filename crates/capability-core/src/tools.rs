//! Tool catalog and dispatch

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

use crate::content::ToolContent;
use crate::descriptor::{Arguments, CapabilityKind, ToolDescriptor};
use crate::discovery::{DiscoveryReport, LoadedUnit, UnitLoader};
use crate::error::{CapabilityError, Result};
use crate::panic::panic_message;
use crate::registry::{MergePolicy, RegistryTable};
use crate::settings::DiscoveryPolicy;
use crate::unit::{HandlerError, ToolUnit};

/// Tool table and dispatcher
pub struct ToolRegistry {
    loader: UnitLoader<dyn ToolUnit>,
    policy: DiscoveryPolicy,
}

impl ToolRegistry {
    pub fn new(loader: UnitLoader<dyn ToolUnit>, policy: DiscoveryPolicy) -> Self {
        Self { loader, policy }
    }

    /// Load any tool unit that is not loaded yet
    pub async fn discover(&self) -> DiscoveryReport {
        self.loader.discover().await
    }

    pub fn loader(&self) -> &UnitLoader<dyn ToolUnit> {
        &self.loader
    }

    /// Current merged tool table
    pub async fn table(&self) -> RegistryTable<ToolDescriptor, dyn ToolUnit> {
        self.snapshot().await.1
    }

    /// Every tool descriptor, duplicates included, in scan order
    pub async fn catalog(&self) -> Vec<ToolDescriptor> {
        self.table().await.descriptors()
    }

    /// Route a tool call to the first unit that claims `name`
    pub async fn call(&self, name: &str, arguments: Arguments) -> Result<Vec<ToolContent>> {
        let (units, table) = self.snapshot().await;

        for loaded in &units {
            let declared = table.declared_by(&loaded.id, name);
            let prepared = match declared {
                Some(entry) => entry.descriptor.input_schema.prepare(name, arguments.clone())?,
                None => arguments.clone(),
            };

            let outcome = AssertUnwindSafe(loaded.unit.call(name, prepared))
                .catch_unwind()
                .await;

            match outcome {
                Ok(None) => continue,
                Ok(Some(Ok(content))) => {
                    debug!("Tool '{}' handled by {}", name, loaded.id);
                    return Ok(content);
                }
                Ok(Some(Err(HandlerError::InvalidArguments(message)))) => {
                    return Err(CapabilityError::invalid_arguments(
                        CapabilityKind::Tool,
                        name,
                        message,
                    ));
                }
                Ok(Some(Err(HandlerError::Failed(message)))) => {
                    return Err(CapabilityError::execution_failed(
                        CapabilityKind::Tool,
                        name,
                        message,
                    ));
                }
                Err(payload) if declared.is_none() => {
                    warn!(
                        "Tool unit {} panicked while asked for '{}': {}",
                        loaded.id,
                        name,
                        panic_message(&*payload)
                    );
                    continue;
                }
                Err(payload) => {
                    return Err(CapabilityError::execution_failed(
                        CapabilityKind::Tool,
                        name,
                        format!("handler panicked: {}", panic_message(&*payload)),
                    ));
                }
            }
        }

        Err(CapabilityError::unknown(CapabilityKind::Tool, name))
    }

    async fn snapshot(
        &self,
    ) -> (
        Vec<LoadedUnit<dyn ToolUnit>>,
        RegistryTable<ToolDescriptor, dyn ToolUnit>,
    ) {
        if self.policy == DiscoveryPolicy::EveryRequest {
            self.loader.refresh().await;
        }

        let units = self.loader.loaded().await;
        let table = RegistryTable::build(&units, MergePolicy::Append, |unit| unit.tools());
        (units, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ParameterSpec;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    /// Serves `greet`, echoing its arguments back
    struct Greeter(&'static str);

    #[async_trait]
    impl ToolUnit for Greeter {
        fn tools(&self) -> Vec<ToolDescriptor> {
            vec![ToolDescriptor::new("greet", "Greet someone")
                .required("name", ParameterSpec::string("Who to greet"))
                .optional(
                    "punctuation",
                    ParameterSpec::string("Trailing mark").with_default("!"),
                )]
        }

        async fn call(
            &self,
            name: &str,
            arguments: Arguments,
        ) -> Option<crate::unit::HandlerResult<Vec<ToolContent>>> {
            if name != "greet" {
                return None;
            }
            let who = arguments.get("name").and_then(Value::as_str).unwrap_or("?");
            let mark = arguments
                .get("punctuation")
                .and_then(Value::as_str)
                .unwrap_or("");
            Some(Ok(vec![ToolContent::text(format!(
                "{} {}{}",
                self.0, who, mark
            ))]))
        }
    }

    /// Serves `explode` and `fail`
    struct Faulty;

    #[async_trait]
    impl ToolUnit for Faulty {
        fn tools(&self) -> Vec<ToolDescriptor> {
            vec![
                ToolDescriptor::new("explode", "Panics"),
                ToolDescriptor::new("fail", "Fails"),
            ]
        }

        async fn call(
            &self,
            name: &str,
            _arguments: Arguments,
        ) -> Option<crate::unit::HandlerResult<Vec<ToolContent>>> {
            match name {
                "explode" => panic!("handler blew up"),
                "fail" => Some(Err(anyhow::anyhow!("upstream unavailable").into())),
                _ => None,
            }
        }
    }

    fn tool_unit<T: ToolUnit + 'static>(unit: T) -> anyhow::Result<Arc<dyn ToolUnit>> {
        let unit: Arc<dyn ToolUnit> = Arc::new(unit);
        Ok(unit)
    }

    fn registry() -> ToolRegistry {
        let loader = UnitLoader::new(CapabilityKind::Tool)
            .with_unit("faulty", || tool_unit(Faulty))
            .with_unit("hello", || tool_unit(Greeter("Hello")))
            .with_unit("hi", || tool_unit(Greeter("Hi")));
        ToolRegistry::new(loader, DiscoveryPolicy::EveryRequest)
    }

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn text(content: &[ToolContent]) -> &str {
        match &content[0] {
            ToolContent::Text { text } => text,
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_catalog_keeps_duplicates() {
        let names: Vec<String> = registry()
            .catalog()
            .await
            .into_iter()
            .map(|tool| tool.name)
            .collect();

        assert_eq!(names, vec!["explode", "fail", "greet", "greet"]);
    }

    #[tokio::test]
    async fn test_first_match_wins_and_defaults_applied() {
        let content = registry()
            .call("greet", args(json!({ "name": "Ada" })))
            .await
            .unwrap();

        assert_eq!(text(&content), "Hello Ada!");
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let err = registry().call("greet", Arguments::new()).await.unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = registry().call("nope", Arguments::new()).await.unwrap_err();
        assert!(err.is_unknown_capability());
    }

    #[tokio::test]
    async fn test_handler_failure_and_panic() {
        let registry = registry();

        let err = registry.call("fail", Arguments::new()).await.unwrap_err();
        assert!(
            matches!(err, CapabilityError::CapabilityExecutionFailed { ref message, .. } if message.contains("upstream unavailable"))
        );

        let err = registry.call("explode", Arguments::new()).await.unwrap_err();
        assert!(
            matches!(err, CapabilityError::CapabilityExecutionFailed { ref message, .. } if message.contains("handler blew up"))
        );

        // A panicking handler does not poison later dispatch
        assert!(registry
            .call("greet", args(json!({ "name": "Bob" })))
            .await
            .is_ok());
    }

    /// Declares nothing and panics on every call
    struct Broken;

    #[async_trait]
    impl ToolUnit for Broken {
        fn tools(&self) -> Vec<ToolDescriptor> {
            Vec::new()
        }

        async fn call(
            &self,
            _name: &str,
            _arguments: Arguments,
        ) -> Option<crate::unit::HandlerResult<Vec<ToolContent>>> {
            panic!("broken unit")
        }
    }

    #[tokio::test]
    async fn test_panicking_unit_does_not_hide_later_units() {
        let loader = UnitLoader::new(CapabilityKind::Tool)
            .with_unit("broken", || tool_unit(Broken))
            .with_unit("hello", || tool_unit(Greeter("Hello")));
        let registry = ToolRegistry::new(loader, DiscoveryPolicy::EveryRequest);

        let content = registry
            .call("greet", args(json!({ "name": "Ada" })))
            .await
            .unwrap();
        assert_eq!(text(&content), "Hello Ada!");

        let err = registry.call("nope", Arguments::new()).await.unwrap_err();
        assert!(err.is_unknown_capability());
    }

    #[tokio::test]
    async fn test_startup_policy_requires_explicit_discovery() {
        let loader = UnitLoader::new(CapabilityKind::Tool).with_unit("hi", || tool_unit(Greeter("Hi")));
        let registry = ToolRegistry::new(loader, DiscoveryPolicy::Startup);

        assert!(registry.catalog().await.is_empty());

        registry.discover().await;
        assert_eq!(registry.catalog().await.len(), 1);
    }
}
