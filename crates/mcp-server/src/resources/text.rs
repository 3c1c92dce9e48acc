//! Static text resources

use async_trait::async_trait;
use capability_core::{HandlerResult, ResourceContent, ResourceDescriptor, ResourceUnit};

const SAMPLE_TEXTS: [(&str, &str); 5] = [
    ("greeting", "Hello! This is a simple text resource."),
    ("help", "This server provides a few text resources for testing."),
    ("about", "A simple resource implementation for the ChatData MCP server."),
    (
        "guide",
        "The MCP resource API gives access to preset text and binary resources.",
    ),
    (
        "documentation",
        "# ChatData MCP resources\n\n## Introduction\nDocumentation for the MCP resource system.\n\n## Available resources\n- greeting: a greeting\n- help: help text\n- about: about this server\n- guide: usage guide\n- documentation: this document",
    ),
];

/// Serves the sample texts at `file:///<name>.txt`
pub struct TextResources;

#[async_trait]
impl ResourceUnit for TextResources {
    fn resources(&self) -> Vec<ResourceDescriptor> {
        SAMPLE_TEXTS
            .iter()
            .map(|(name, _)| {
                ResourceDescriptor::new(
                    format!("file:///{}.txt", name),
                    *name,
                    format!("Sample text resource '{}'", name),
                    "text/plain",
                )
            })
            .collect()
    }

    async fn read(&self, name: &str) -> HandlerResult<Option<ResourceContent>> {
        let name = name.strip_suffix(".txt").unwrap_or(name);

        Ok(SAMPLE_TEXTS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, text)| ResourceContent::from(*text)))
    }
}
