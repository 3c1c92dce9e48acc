//! Main MCP server orchestration

use capability_core::{Capabilities, DiscoveryReport, Settings};
use std::sync::Arc;
use tracing::info;

use crate::builtin::builtin_capabilities;
use crate::error::ServerError;
use crate::protocol::RequestHandler;
use crate::transport::{HttpTransport, StdioTransport};

/// Server mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServerMode {
    /// stdio transport
    #[default]
    Stdio,
    /// HTTP/SSE transport
    Http { bind: String, port: u16 },
}

/// MCP server
pub struct McpServer {
    capabilities: Arc<Capabilities>,
    server_name: String,
    mode: ServerMode,
}

impl McpServer {
    pub fn new(capabilities: Capabilities, server_name: impl Into<String>) -> Self {
        Self {
            capabilities: Arc::new(capabilities),
            server_name: server_name.into(),
            mode: ServerMode::default(),
        }
    }

    /// Server exposing the builtin units, configured by `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self, ServerError> {
        settings.validate()?;
        Ok(Self::new(
            builtin_capabilities(settings),
            settings.server_name.clone(),
        ))
    }

    /// Set the server mode
    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn capabilities(&self) -> &Arc<Capabilities> {
        &self.capabilities
    }

    /// Load every unit that can be loaded now
    pub async fn discover(&self) -> DiscoveryReport {
        let report = self.capabilities.discover().await;

        if !report.failed.is_empty() {
            let units: Vec<&str> = report.failed.iter().map(|f| f.unit.as_str()).collect();
            info!(
                "{} capability unit(s) unavailable: {}",
                units.len(),
                units.join(", ")
            );
        }

        report
    }

    /// Run initial discovery, then serve the configured transport
    pub async fn run(&self) -> Result<(), ServerError> {
        self.discover().await;

        let handler = Arc::new(RequestHandler::new(
            self.capabilities.clone(),
            self.server_name.clone(),
        ));

        match &self.mode {
            ServerMode::Stdio => {
                info!("Starting MCP server in stdio mode");
                StdioTransport::new(handler).run().await
            }
            ServerMode::Http { bind, port } => {
                info!("Starting MCP server in HTTP mode on {}:{}", bind, port);
                HttpTransport::new(handler, bind.clone(), *port).run().await
            }
        }
    }
}
