//! A general question prompt with optional context and topic

use async_trait::async_trait;
use capability_core::{
    HandlerResult, PromptArgument, PromptArguments, PromptDescriptor, PromptMessage, PromptOutput,
    PromptResult, PromptUnit,
};

pub const SIMPLE: &str = "simple";

const DESCRIPTION: &str = "A simple prompt with optional context and topic arguments";

pub struct SimplePrompt;

impl SimplePrompt {
    fn messages(context: Option<&str>, topic: Option<&str>) -> Vec<PromptMessage> {
        let mut messages = Vec::new();

        if let Some(context) = context.filter(|c| !c.is_empty()) {
            messages.push(PromptMessage::user(format!(
                "Here is some relevant context: {}",
                context
            )));
        }

        let question = match topic.filter(|t| !t.is_empty()) {
            Some(topic) => format!("Please help me with the following topic: {}", topic),
            None => "Please help me with any questions I might have.".to_string(),
        };
        messages.push(PromptMessage::user(question));

        messages
    }
}

#[async_trait]
impl PromptUnit for SimplePrompt {
    fn prompts(&self) -> Vec<PromptDescriptor> {
        vec![PromptDescriptor::new(SIMPLE, DESCRIPTION)
            .argument(PromptArgument::optional("context", "Additional context to consider"))
            .argument(PromptArgument::optional("topic", "Specific topic to focus on"))]
    }

    async fn render(&self, _name: &str, arguments: PromptArguments) -> HandlerResult<PromptOutput> {
        let messages = Self::messages(
            arguments.get("context").map(String::as_str),
            arguments.get("topic").map(String::as_str),
        );
        Ok(PromptResult::new(DESCRIPTION, messages).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let messages = SimplePrompt::messages(None, None);
        assert_eq!(
            messages,
            vec![PromptMessage::user("Please help me with any questions I might have.")]
        );

        let messages = SimplePrompt::messages(Some("we use tokio"), Some("async"));
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            PromptMessage::user("Here is some relevant context: we use tokio")
        );
    }

    #[tokio::test]
    async fn test_render_is_finished() {
        let output = SimplePrompt
            .render(SIMPLE, PromptArguments::new())
            .await
            .unwrap();
        assert!(matches!(output, PromptOutput::Finished(_)));
    }
}
