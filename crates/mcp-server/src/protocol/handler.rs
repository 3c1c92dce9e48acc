//! MCP request handler

use base64::Engine;
use capability_core::{Arguments, Capabilities, CapabilityError, ResourceContent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::capabilities::ServerCapabilities;
use super::types::*;

/// Handler for MCP requests
pub struct RequestHandler {
    capabilities: Arc<Capabilities>,
    server_name: String,
    server_version: String,
    /// Whether a client has completed `initialize`
    initialized: AtomicBool,
}

impl RequestHandler {
    /// Create a new request handler
    pub fn new(capabilities: Arc<Capabilities>, server_name: impl Into<String>) -> Self {
        Self {
            capabilities,
            server_name: server_name.into(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Handle an incoming message, returning the response if one is due
    pub async fn handle(&self, message: McpMessage) -> Option<McpMessage> {
        match (message.method.as_deref(), message.id.clone()) {
            (Some(method), Some(id)) => {
                debug!("Handling request: {}", method);

                let result = match method {
                    "initialize" => self.handle_initialize(message.params),
                    "ping" => Ok(serde_json::json!({})),
                    "tools/list" => self.handle_tools_list().await,
                    "tools/call" => self.handle_tools_call(message.params).await,
                    "prompts/list" => self.handle_prompts_list().await,
                    "prompts/get" => self.handle_prompts_get(message.params).await,
                    "resources/list" => self.handle_resources_list().await,
                    "resources/read" => self.handle_resources_read(message.params).await,
                    _ => Err(McpError::method_not_found()),
                };

                Some(match result {
                    Ok(result) => McpMessage::response(id, result),
                    Err(error) => McpMessage::error_response(Some(id), error),
                })
            }
            (Some(method), None) => {
                match method {
                    "notifications/initialized" | "initialized" => info!("Client initialized"),
                    "notifications/cancelled" => debug!("Request cancelled"),
                    _ => debug!("Unknown notification: {}", method),
                }
                None
            }
            (None, _) => {
                // Responses are not expected in server mode
                debug!("Received unexpected response");
                None
            }
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: InitializeParams = parse_params(params)?;

        info!(
            "Initializing session with client: {} v{} (protocol {})",
            params.client_info.name, params.client_info.version, params.protocol_version
        );

        self.initialized.store(true, Ordering::SeqCst);

        to_value(InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities::with_all(),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
            },
        })
    }

    async fn handle_tools_list(&self) -> Result<Value, McpError> {
        let tools = self.capabilities.tools.catalog().await;
        to_value(ToolsListResult { tools })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ToolCallParams = parse_params(params)?;

        let arguments = match params.arguments {
            None | Some(Value::Null) => Arguments::new(),
            Some(Value::Object(arguments)) => arguments,
            Some(_) => return Err(McpError::invalid_params("Tool arguments must be an object")),
        };

        debug!("Calling tool: {}", params.name);

        match self.capabilities.tools.call(&params.name, arguments).await {
            Ok(content) => to_value(ToolCallResult::success(content)),
            Err(err @ CapabilityError::CapabilityExecutionFailed { .. }) => {
                error!("Tool execution failed: {}", err);
                to_value(ToolCallResult::error(err.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn handle_prompts_list(&self) -> Result<Value, McpError> {
        let prompts = self.capabilities.prompts.catalog().await;
        to_value(PromptsListResult { prompts })
    }

    async fn handle_prompts_get(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: PromptGetParams = parse_params(params)?;

        debug!("Getting prompt: {}", params.name);

        let result = self
            .capabilities
            .prompts
            .get(&params.name, params.arguments.unwrap_or_default())
            .await
            .map_err(|err| {
                error!("Prompt failed: {}", err);
                McpError::from(err)
            })?;

        to_value(result)
    }

    async fn handle_resources_list(&self) -> Result<Value, McpError> {
        let resources = self.capabilities.resources.catalog().await;
        to_value(ResourcesListResult { resources })
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> Result<Value, McpError> {
        let params: ResourceReadParams = parse_params(params)?;

        debug!("Reading resource: {}", params.uri);

        let read = self.capabilities.resources.read(&params.uri).await?;

        let (text, blob) = match read.content {
            ResourceContent::Text(text) => (Some(text), None),
            ResourceContent::Blob(bytes) => (
                None,
                Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            ),
        };

        to_value(ResourceReadResult {
            contents: vec![ResourceContents {
                uri: params.uri,
                mime_type: read.mime_type,
                text,
                blob,
            }],
        })
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, McpError> {
    params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::invalid_params(e.to_string()))?
        .ok_or_else(|| McpError::invalid_params("Missing params"))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::builtin_capabilities;
    use capability_core::Settings;
    use serde_json::json;

    fn handler() -> RequestHandler {
        let capabilities = builtin_capabilities(&Settings::default());
        RequestHandler::new(Arc::new(capabilities), "test-server")
    }

    async fn request(handler: &RequestHandler, method: &str, params: Value) -> McpMessage {
        handler
            .handle(McpMessage::request(1, method, Some(params)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let handler = handler();
        let params = json!({
            "protocolVersion": MCP_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        });

        let response = request(&handler, "initialize", params).await;
        let result = response.result.unwrap();

        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "test-server");
        assert!(result["capabilities"]["prompts"].is_object());
        assert!(handler.is_initialized());
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let handler = handler();
        let message = McpMessage::notification("notifications/initialized", None);
        assert!(handler.handle(message).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = request(&handler(), "sampling/createMessage", json!({})).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_tools_list_and_call() {
        let handler = handler();

        let response = request(&handler, "tools/list", json!({})).await;
        let tools = response.result.unwrap()["tools"].clone();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"echo"));
        assert!(names.contains(&"data_converter"));
        assert!(tools[0]["inputSchema"]["properties"].is_object());

        let response = request(
            &handler,
            "tools/call",
            json!({ "name": "echo", "arguments": { "message": "hi" } }),
        )
        .await;
        assert_eq!(
            response.result.unwrap(),
            json!({ "content": [{ "type": "text", "text": "Echo: hi" }] })
        );
    }

    #[tokio::test]
    async fn test_tool_errors() {
        let handler = handler();

        let response = request(&handler, "tools/call", json!({ "name": "nope" })).await;
        assert_eq!(response.error.unwrap().code, -32602);

        let response = request(&handler, "tools/call", json!({ "name": "echo" })).await;
        assert_eq!(response.error.unwrap().code, -32602);

        let response = request(
            &handler,
            "tools/call",
            json!({
                "name": "data_converter",
                "arguments": { "data": "{broken", "from_format": "json", "to_format": "yaml" }
            }),
        )
        .await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn test_prompts() {
        let handler = handler();

        let response = request(&handler, "prompts/list", json!({})).await;
        assert_eq!(response.result.unwrap()["prompts"].as_array().unwrap().len(), 3);

        let response = request(
            &handler,
            "prompts/get",
            json!({ "name": "review_code", "arguments": { "code": "fn main() {}" } }),
        )
        .await;
        let result = response.result.unwrap();
        assert_eq!(result["messages"][0]["role"], "assistant");
        assert!(result["messages"][0]["content"]["text"]
            .as_str()
            .unwrap()
            .contains("fn main() {}"));

        let response = request(&handler, "prompts/get", json!({ "name": "review_code" })).await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_resources() {
        let handler = handler();

        let response = request(&handler, "resources/list", json!({})).await;
        let resources = response.result.unwrap()["resources"].clone();
        assert!(resources
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r["uri"] == "file:///greeting.txt" && r["mimeType"] == "text/plain"));

        let response = request(
            &handler,
            "resources/read",
            json!({ "uri": "file:///greeting.txt" }),
        )
        .await;
        let contents = &response.result.unwrap()["contents"][0];
        assert_eq!(contents["uri"], "file:///greeting.txt");
        assert!(contents["text"].is_string());
        assert!(contents.get("blob").is_none());

        let response = request(
            &handler,
            "resources/read",
            json!({ "uri": "file:///sample_image.png" }),
        )
        .await;
        let contents = &response.result.unwrap()["contents"][0];
        assert_eq!(contents["mimeType"], "image/png");
        assert_eq!(
            contents["blob"],
            "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVQI12P4//8/AAX+Av7czFnnAAAAAElFTkSuQmCC"
        );

        let response = request(
            &handler,
            "resources/read",
            json!({ "uri": "file:///missing.txt" }),
        )
        .await;
        assert_eq!(response.error.unwrap().code, -32002);
    }
}
