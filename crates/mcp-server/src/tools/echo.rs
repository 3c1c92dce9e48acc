//! Echo tool

use async_trait::async_trait;
use capability_core::{Arguments, HandlerError, HandlerResult, ParameterSpec, ToolContent, ToolDescriptor, ToolUnit};
use serde_json::Value;

pub const ECHO: &str = "echo";

/// Replies with the message it was given
pub struct EchoTool;

#[async_trait]
impl ToolUnit for EchoTool {
    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(ECHO, "Echo the input message back")
            .required("message", ParameterSpec::string("Message to echo"))]
    }

    async fn call(&self, name: &str, arguments: Arguments) -> Option<HandlerResult<Vec<ToolContent>>> {
        if name != ECHO {
            return None;
        }

        let result = match arguments.get("message").and_then(Value::as_str) {
            Some(message) => Ok(vec![ToolContent::text(format!("Echo: {}", message))]),
            None => Err(HandlerError::invalid("Missing required argument 'message'")),
        };
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo() {
        let arguments = json!({ "message": "hello" }).as_object().cloned().unwrap();
        let content = EchoTool.call(ECHO, arguments).await.unwrap().unwrap();
        assert_eq!(content, vec![ToolContent::text("Echo: hello")]);
    }

    #[tokio::test]
    async fn test_other_names_declined() {
        assert!(EchoTool.call("data_converter", Arguments::new()).await.is_none());
    }
}
