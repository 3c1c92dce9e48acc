//! # mcp-server
//!
//! MCP (Model Context Protocol) server for ChatData MCP.
//! Serves the builtin tools, prompts and resources over stdio or HTTP/SSE.

pub mod builtin;
mod error;
pub mod prompts;
pub mod protocol;
pub mod resources;
mod server;
pub mod tools;
pub mod transport;

pub use builtin::builtin_capabilities;
pub use error::ServerError;
pub use protocol::{McpError, McpMessage, RequestHandler, ServerCapabilities};
pub use server::{McpServer, ServerMode};
pub use transport::{router, HttpTransport, StdioTransport};
