//! Resource catalog and reads
//!
//! Resource names merge last-write-wins: when two units declare the same
//! name, the catalog lists the later unit's descriptor and reads prefer that
//! unit. Tools and prompts keep every duplicate and resolve to the first.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::content::ResourceContent;
use crate::descriptor::ResourceDescriptor;
use crate::discovery::{DiscoveryReport, LoadedUnit, UnitLoader};
use crate::error::{CapabilityError, Result};
use crate::locator::canonical_name;
use crate::panic::panic_message;
use crate::registry::{MergePolicy, RegistryTable};
use crate::settings::DiscoveryPolicy;
use crate::unit::ResourceUnit;

/// Outcome of a successful resource read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRead {
    /// Name of the resource that answered
    pub name: String,
    /// Declared MIME type, if the answering unit declared the resource
    pub mime_type: Option<String>,
    pub content: ResourceContent,
}

/// Resource table and reader
pub struct ResourceRegistry {
    loader: UnitLoader<dyn ResourceUnit>,
    policy: DiscoveryPolicy,
}

impl ResourceRegistry {
    pub fn new(loader: UnitLoader<dyn ResourceUnit>, policy: DiscoveryPolicy) -> Self {
        Self { loader, policy }
    }

    /// Load any resource unit that is not loaded yet
    pub async fn discover(&self) -> DiscoveryReport {
        self.loader.discover().await
    }

    pub fn loader(&self) -> &UnitLoader<dyn ResourceUnit> {
        &self.loader
    }

    /// Current merged resource table
    pub async fn table(&self) -> RegistryTable<ResourceDescriptor, dyn ResourceUnit> {
        self.snapshot().await.1
    }

    /// One descriptor per resource name
    pub async fn catalog(&self) -> Vec<ResourceDescriptor> {
        self.table().await.descriptors()
    }

    /// Read the resource identified by `locator`
    pub async fn read(&self, locator: &str) -> Result<ResourceRead> {
        let (units, table) = self.snapshot().await;
        let name = canonical_name(locator);

        let owner = table
            .iter()
            .find(|entry| entry.descriptor.name == name || entry.descriptor.uri == locator);

        if let Some(entry) = owner {
            if let Some(content) = read_from(&entry.unit_id, &entry.unit, &name).await {
                debug!("Resource '{}' served by {}", name, entry.unit_id);
                return Ok(ResourceRead {
                    name: entry.descriptor.name.clone(),
                    mime_type: Some(entry.descriptor.mime_type.clone()),
                    content,
                });
            }
        }

        let owner_id = owner.map(|entry| entry.unit_id.as_str());
        for loaded in units.iter().filter(|loaded| Some(loaded.id.as_str()) != owner_id) {
            if let Some(content) = read_from(&loaded.id, &loaded.unit, &name).await {
                debug!("Resource '{}' served by {}", name, loaded.id);
                let mime_type = table
                    .declared_by(&loaded.id, &name)
                    .map(|entry| entry.descriptor.mime_type.clone());
                return Ok(ResourceRead {
                    name,
                    mime_type,
                    content,
                });
            }
        }

        Err(CapabilityError::ResourceNotFound(locator.to_string()))
    }

    async fn snapshot(
        &self,
    ) -> (
        Vec<LoadedUnit<dyn ResourceUnit>>,
        RegistryTable<ResourceDescriptor, dyn ResourceUnit>,
    ) {
        if self.policy == DiscoveryPolicy::EveryRequest {
            self.loader.refresh().await;
        }

        let units = self.loader.loaded().await;
        let table = RegistryTable::build(&units, MergePolicy::LastWriteWins, |unit| {
            unit.resources()
        });
        (units, table)
    }
}

/// Ask one unit for `name`; errors and panics count as absent
async fn read_from(
    unit_id: &str,
    unit: &Arc<dyn ResourceUnit>,
    name: &str,
) -> Option<ResourceContent> {
    match AssertUnwindSafe(unit.read(name)).catch_unwind().await {
        Ok(Ok(content)) => content,
        Ok(Err(err)) => {
            warn!("Resource unit {} failed reading '{}': {}", unit_id, name, err);
            None
        }
        Err(payload) => {
            warn!(
                "Resource unit {} panicked reading '{}': {}",
                unit_id,
                name,
                panic_message(&*payload)
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CapabilityKind;
    use crate::unit::{HandlerError, HandlerResult};
    use async_trait::async_trait;

    /// Serves the single resource `x` with fixed text
    struct Fixed(&'static str);

    #[async_trait]
    impl ResourceUnit for Fixed {
        fn resources(&self) -> Vec<ResourceDescriptor> {
            vec![ResourceDescriptor::new("file:///x.txt", "x", self.0, "text/plain")]
        }

        async fn read(&self, name: &str) -> HandlerResult<Option<ResourceContent>> {
            Ok((name == "x").then(|| self.0.into()))
        }
    }

    /// Undeclared names only; also accepts `greeting.txt`
    struct Greetings;

    #[async_trait]
    impl ResourceUnit for Greetings {
        fn resources(&self) -> Vec<ResourceDescriptor> {
            vec![ResourceDescriptor::new(
                "file:///greeting.txt",
                "greeting",
                "A greeting",
                "text/plain",
            )]
        }

        async fn read(&self, name: &str) -> HandlerResult<Option<ResourceContent>> {
            match name {
                "greeting" | "greeting.txt" => Ok(Some("Hello, world!".into())),
                "secret" => Ok(Some(vec![0u8, 1, 2].into())),
                _ => Ok(None),
            }
        }
    }

    /// Fails or panics on every read
    struct Broken(bool);

    #[async_trait]
    impl ResourceUnit for Broken {
        fn resources(&self) -> Vec<ResourceDescriptor> {
            Vec::new()
        }

        async fn read(&self, _name: &str) -> HandlerResult<Option<ResourceContent>> {
            if self.0 {
                panic!("disk on fire");
            }
            Err(HandlerError::Failed("disk unavailable".into()))
        }
    }

    fn resource_unit<T: ResourceUnit + 'static>(unit: T) -> anyhow::Result<Arc<dyn ResourceUnit>> {
        let unit: Arc<dyn ResourceUnit> = Arc::new(unit);
        Ok(unit)
    }

    fn registry() -> ResourceRegistry {
        let loader = UnitLoader::new(CapabilityKind::Resource)
            .with_unit("broken", || resource_unit(Broken(false)))
            .with_unit("panicky", || resource_unit(Broken(true)))
            .with_unit("a", || resource_unit(Fixed("hi")))
            .with_unit("greetings", || resource_unit(Greetings))
            .with_unit("b", || resource_unit(Fixed("hello")));
        ResourceRegistry::new(loader, DiscoveryPolicy::EveryRequest)
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let registry = registry();

        let catalog = registry.catalog().await;
        let xs: Vec<_> = catalog.iter().filter(|r| r.name == "x").collect();
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].description, "hello");

        let read = registry.read("file:///x.txt").await.unwrap();
        assert_eq!(read.content.as_text(), Some("hello"));
        assert_eq!(read.mime_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_suffix_normalization() {
        let registry = registry();

        let with_suffix = registry.read("file:///greeting.txt").await.unwrap();
        let bare = registry.read("file:///greeting").await.unwrap();

        assert_eq!(with_suffix, bare);
        assert_eq!(with_suffix.name, "greeting");
        assert_eq!(with_suffix.content.as_text(), Some("Hello, world!"));
    }

    #[tokio::test]
    async fn test_undeclared_name_found_by_scan() {
        let read = registry().read("file:///secret").await.unwrap();

        assert_eq!(read.name, "secret");
        assert_eq!(read.mime_type, None);
        assert_eq!(read.content.as_bytes(), &[0, 1, 2]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let err = registry().read("file:///unknown.txt").await.unwrap_err();

        assert!(matches!(err, CapabilityError::ResourceNotFound(ref locator) if locator == "file:///unknown.txt"));
        assert!(err.is_unknown_capability());
    }
}
