//! Binary sample resources

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use capability_core::{HandlerResult, ResourceContent, ResourceDescriptor, ResourceUnit};

/// 1x1 PNG
const SAMPLE_IMAGE_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVQI12P4//8/AAX+Av7czFnnAAAAAElFTkSuQmCC";

struct BinaryEntry {
    name: &'static str,
    file_name: &'static str,
    description: &'static str,
    mime_type: &'static str,
    bytes: Vec<u8>,
}

/// Serves a sample image, an opaque blob and a JSON document
pub struct BinaryResources {
    entries: Vec<BinaryEntry>,
}

impl BinaryResources {
    pub fn new() -> anyhow::Result<Self> {
        let image = base64::engine::general_purpose::STANDARD
            .decode(SAMPLE_IMAGE_PNG)
            .context("Failed to decode sample image")?;

        Ok(Self {
            entries: vec![
                BinaryEntry {
                    name: "sample_image",
                    file_name: "sample_image.png",
                    description: "Sample image resource",
                    mime_type: "image/png",
                    bytes: image,
                },
                BinaryEntry {
                    name: "sample_binary",
                    file_name: "sample_binary.bin",
                    description: "Sample binary resource",
                    mime_type: "application/octet-stream",
                    bytes: b"Hello, this is a binary resource example!".to_vec(),
                },
                BinaryEntry {
                    name: "sample_json",
                    file_name: "sample_json.json",
                    description: "Sample JSON resource",
                    mime_type: "application/json",
                    bytes: br#"{"name": "ChatData MCP", "version": "1.0", "type": "resource_demo"}"#
                        .to_vec(),
                },
            ],
        })
    }
}

#[async_trait]
impl ResourceUnit for BinaryResources {
    fn resources(&self) -> Vec<ResourceDescriptor> {
        self.entries
            .iter()
            .map(|entry| {
                ResourceDescriptor::new(
                    format!("file:///{}", entry.file_name),
                    entry.name,
                    entry.description,
                    entry.mime_type,
                )
            })
            .collect()
    }

    async fn read(&self, name: &str) -> HandlerResult<Option<ResourceContent>> {
        Ok(self
            .entries
            .iter()
            .find(|entry| entry.name == name || entry.file_name == name)
            .map(|entry| ResourceContent::Blob(entry.bytes.clone())))
    }
}
