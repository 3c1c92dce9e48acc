//! The capability set a server exposes

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::descriptor::CapabilityKind;
use crate::discovery::{DiscoveryReport, UnitLoader};
use crate::prompts::PromptRegistry;
use crate::resources::ResourceRegistry;
use crate::settings::{DiscoveryPolicy, Settings};
use crate::tools::ToolRegistry;
use crate::unit::{PromptUnit, ResourceUnit, ToolUnit};

/// Tools, prompts and resources behind one owner
pub struct Capabilities {
    pub tools: ToolRegistry,
    pub prompts: PromptRegistry,
    pub resources: ResourceRegistry,
}

impl Capabilities {
    /// Start a registration table configured by `settings`
    pub fn builder(settings: &Settings) -> CapabilitiesBuilder {
        CapabilitiesBuilder {
            policy: settings.discovery,
            disabled: settings.disabled_units.clone(),
            retry_interval: Duration::from_secs(settings.retry_interval_secs),
            tools: UnitLoader::new(CapabilityKind::Tool),
            prompts: UnitLoader::new(CapabilityKind::Prompt),
            resources: UnitLoader::new(CapabilityKind::Resource),
        }
    }

    /// Run discovery for every kind
    pub async fn discover(&self) -> DiscoveryReport {
        let mut report = self.tools.discover().await;
        report.merge(self.prompts.discover().await);
        report.merge(self.resources.discover().await);

        if !report.is_empty() {
            info!(
                "Discovery loaded {} unit(s), {} failed",
                report.loaded.len(),
                report.failed.len()
            );
        }

        report
    }
}

/// Builder collecting the static registration tables
pub struct CapabilitiesBuilder {
    policy: DiscoveryPolicy,
    disabled: Vec<String>,
    retry_interval: Duration,
    tools: UnitLoader<dyn ToolUnit>,
    prompts: UnitLoader<dyn PromptUnit>,
    resources: UnitLoader<dyn ResourceUnit>,
}

impl CapabilitiesBuilder {
    /// Register a tool unit
    pub fn tool_unit<T, F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        T: ToolUnit + 'static,
        F: Fn() -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
    {
        self.tools.register(id, move || {
            factory().map(|unit| unit as Arc<dyn ToolUnit>)
        });
        self
    }

    /// Register a prompt unit
    pub fn prompt_unit<T, F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        T: PromptUnit + 'static,
        F: Fn() -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
    {
        self.prompts.register(id, move || {
            factory().map(|unit| unit as Arc<dyn PromptUnit>)
        });
        self
    }

    /// Register a resource unit
    pub fn resource_unit<T, F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        T: ResourceUnit + 'static,
        F: Fn() -> anyhow::Result<Arc<T>> + Send + Sync + 'static,
    {
        self.resources.register(id, move || {
            factory().map(|unit| unit as Arc<dyn ResourceUnit>)
        });
        self
    }

    pub fn build(mut self) -> Capabilities {
        self.tools.set_retry_interval(self.retry_interval);
        self.prompts.set_retry_interval(self.retry_interval);
        self.resources.set_retry_interval(self.retry_interval);

        for id in &self.disabled {
            self.tools.disable(id.as_str());
            self.prompts.disable(id.as_str());
            self.resources.disable(id.as_str());
        }

        Capabilities {
            tools: ToolRegistry::new(self.tools, self.policy),
            prompts: PromptRegistry::new(self.prompts, self.policy),
            resources: ResourceRegistry::new(self.resources, self.policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{PromptOutput, ResourceContent, ToolContent};
    use crate::descriptor::{Arguments, PromptArguments, PromptDescriptor, ResourceDescriptor, ToolDescriptor};
    use crate::unit::HandlerResult;
    use async_trait::async_trait;

    struct Ping;

    #[async_trait]
    impl ToolUnit for Ping {
        fn tools(&self) -> Vec<ToolDescriptor> {
            vec![ToolDescriptor::new("ping", "Reply with pong")]
        }

        async fn call(&self, name: &str, _arguments: Arguments) -> Option<HandlerResult<Vec<ToolContent>>> {
            (name == "ping").then(|| Ok(vec![ToolContent::text("pong")]))
        }
    }

    struct Hello;

    #[async_trait]
    impl PromptUnit for Hello {
        fn prompts(&self) -> Vec<PromptDescriptor> {
            vec![PromptDescriptor::new("hello", "Say hello")]
        }

        async fn render(&self, _name: &str, _arguments: PromptArguments) -> HandlerResult<PromptOutput> {
            Ok("hello".into())
        }
    }

    struct Note;

    #[async_trait]
    impl ResourceUnit for Note {
        fn resources(&self) -> Vec<ResourceDescriptor> {
            vec![ResourceDescriptor::new("file:///note.txt", "note", "A note", "text/plain")]
        }

        async fn read(&self, name: &str) -> HandlerResult<Option<ResourceContent>> {
            Ok((name == "note").then(|| "remember".into()))
        }
    }

    fn capabilities(settings: &Settings) -> Capabilities {
        Capabilities::builder(settings)
            .tool_unit("tools.ping", || Ok(Arc::new(Ping)))
            .tool_unit("tools.broken", || -> anyhow::Result<Arc<Ping>> {
                Err(anyhow::anyhow!("no network"))
            })
            .prompt_unit("prompts.hello", || Ok(Arc::new(Hello)))
            .resource_unit("resources.note", || Ok(Arc::new(Note)))
            .build()
    }

    #[tokio::test]
    async fn test_discover_all_kinds() {
        let capabilities = capabilities(&Settings::default());
        let report = capabilities.discover().await;

        assert_eq!(
            report.loaded,
            vec!["tools.ping", "prompts.hello", "resources.note"]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].unit, "tools.broken");

        assert_eq!(capabilities.tools.catalog().await.len(), 1);
        assert_eq!(capabilities.prompts.catalog().await.len(), 1);
        assert_eq!(capabilities.resources.catalog().await.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_units_contribute_nothing() {
        let mut settings = Settings::default();
        settings.disabled_units = vec!["tools.ping".into(), "resources.note".into()];
        let capabilities = capabilities(&settings);

        assert!(capabilities.tools.catalog().await.is_empty());
        assert!(capabilities.resources.catalog().await.is_empty());
        assert_eq!(capabilities.prompts.catalog().await.len(), 1);

        let err = capabilities
            .tools
            .call("ping", Arguments::new())
            .await
            .unwrap_err();
        assert!(err.is_unknown_capability());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_interval_from_settings() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let settings = Settings {
            retry_interval_secs: 5,
            ..Settings::default()
        };
        let capabilities = Capabilities::builder(&settings)
            .tool_unit("tools.flaky", move || -> anyhow::Result<Arc<Ping>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("no network"))
            })
            .build();

        for _ in 0..3 {
            assert!(capabilities.tools.catalog().await.is_empty());
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        capabilities.tools.catalog().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dispatch_through_each_kind() {
        let capabilities = capabilities(&Settings::default());

        let content = capabilities.tools.call("ping", Arguments::new()).await.unwrap();
        assert_eq!(content, vec![ToolContent::text("pong")]);

        let prompt = capabilities.prompts.get("hello", PromptArguments::new()).await.unwrap();
        assert_eq!(prompt.description.as_deref(), Some("Say hello"));

        let read = capabilities.resources.read("file:///note.txt").await.unwrap();
        assert_eq!(read.content, ResourceContent::Text("remember".into()));
    }
}
