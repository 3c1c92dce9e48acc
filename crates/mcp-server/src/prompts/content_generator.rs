//! Content generation prompt

use async_trait::async_trait;
use capability_core::{
    HandlerError, HandlerResult, PromptArgument, PromptArguments, PromptDescriptor, PromptOutput,
    PromptUnit,
};

pub const GENERATE_CONTENT: &str = "generate_content";

pub struct ContentGeneratorPrompt;

#[async_trait]
impl PromptUnit for ContentGeneratorPrompt {
    fn prompts(&self) -> Vec<PromptDescriptor> {
        vec![PromptDescriptor::new(
            GENERATE_CONTENT,
            "Generate content, optionally with a tone and length",
        )
        .argument(PromptArgument::required("prompt", "Subject or prompt for the content"))
        .argument(PromptArgument::optional(
            "tone",
            "Tone of the content (formal, humorous, technical...)",
        ))
        .argument(PromptArgument::optional(
            "length",
            "Length of the content (short, medium, long...)",
        ))]
    }

    async fn render(&self, _name: &str, arguments: PromptArguments) -> HandlerResult<PromptOutput> {
        let prompt = arguments
            .get("prompt")
            .ok_or_else(|| HandlerError::invalid("Missing required argument 'prompt'"))?;

        let mut text = format!("Generate content based on this prompt:\n\n{}", prompt);
        if let Some(tone) = arguments.get("tone").filter(|t| !t.is_empty()) {
            text.push_str(&format!("\n\nTone: {}", tone));
        }
        if let Some(length) = arguments.get("length").filter(|l| !l.is_empty()) {
            text.push_str(&format!("\n\nLength: {}", length));
        }

        Ok(text.into())
    }
}
