//! ChatData MCP server CLI
//!
//! Serves the builtin tools, prompts and resources to MCP clients over stdio
//! (the default) or HTTP/SSE.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use capability_core::Settings;
use mcp_server::{McpServer, ServerMode};

/// ChatData MCP - tools, prompts and resources over the Model Context Protocol
#[derive(Parser, Debug)]
#[command(name = "chatdata-mcp-server")]
#[command(version)]
#[command(about = "ChatData MCP server - builtin tools, prompts and resources via MCP")]
struct Args {
    /// Run in stdio mode (for MCP clients such as desktop assistants)
    #[arg(long, conflicts_with = "http")]
    stdio: bool,

    /// Run in HTTP/SSE mode
    #[arg(long)]
    http: bool,

    /// Port for the HTTP server (overrides the settings file)
    #[arg(long)]
    port: Option<u16>,

    /// Bind address for the HTTP server (overrides the settings file)
    #[arg(long)]
    bind: Option<String>,

    /// Settings file (YAML, or JSON by extension)
    #[arg(long, env = "CHATDATA_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Write the effective settings to the settings file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let settings_path = args.config.clone().or_else(Settings::default_path);
    let settings = match &settings_path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };

    // stderr only: stdout carries the stdio protocol
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.log_filter.as_deref().unwrap_or("info")))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if args.init_config {
        let path = settings_path.context("No settings location available, pass --config")?;
        settings
            .save(&path)
            .await
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        info!("Wrote settings to {}", path.display());
        return Ok(());
    }

    let mode = if args.http && !args.stdio {
        ServerMode::Http {
            bind: args.bind.unwrap_or_else(|| settings.http.bind.clone()),
            port: args.port.unwrap_or(settings.http.port),
        }
    } else {
        // Default to stdio for MCP client compatibility
        ServerMode::Stdio
    };

    info!("Starting {} ({:?})", settings.server_name, mode);

    McpServer::from_settings(&settings)?
        .with_mode(mode)
        .run()
        .await?;

    Ok(())
}
