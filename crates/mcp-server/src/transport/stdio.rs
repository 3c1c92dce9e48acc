//! stdio transport for MCP
//!
//! One JSON-RPC message per line in each direction. Logging goes to stderr,
//! so stdout carries protocol traffic only.

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::error::ServerError;
use crate::protocol::{McpError, McpMessage, RequestHandler};

/// stdio transport for MCP protocol
pub struct StdioTransport {
    handler: Arc<RequestHandler>,
}

impl StdioTransport {
    pub fn new(handler: Arc<RequestHandler>) -> Self {
        Self { handler }
    }

    /// Serve stdin/stdout until EOF
    pub async fn run(&self) -> Result<(), ServerError> {
        info!("Starting MCP server on stdio");
        self.run_with(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited messages from `reader`, answering on `writer`
    pub async fn run_with<R, W>(&self, reader: R, mut writer: W) -> Result<(), ServerError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();

            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", line);

            let message: McpMessage = match serde_json::from_str(line) {
                Ok(msg) => msg,
                Err(e) => {
                    error!("Failed to parse message: {}", e);
                    let response = McpMessage::error_response(None, McpError::parse_error());
                    write_message(&mut writer, &response).await?;
                    continue;
                }
            };

            if let Some(response) = self.handler.handle(message).await {
                write_message(&mut writer, &response).await?;
            }
        }

        Ok(())
    }
}

async fn write_message<W>(writer: &mut W, message: &McpMessage) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let line = serde_json::to_string(message)?;
    debug!("Sending: {}", line);
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
