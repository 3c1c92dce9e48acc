//! Code review prompt

use async_trait::async_trait;
use capability_core::{
    HandlerError, HandlerResult, PromptArgument, PromptArguments, PromptDescriptor, PromptOutput,
    PromptUnit,
};

pub const REVIEW_CODE: &str = "review_code";

pub struct CodeReviewPrompt;

#[async_trait]
impl PromptUnit for CodeReviewPrompt {
    fn prompts(&self) -> Vec<PromptDescriptor> {
        vec![
            PromptDescriptor::new(REVIEW_CODE, "Review code and provide feedback")
                .argument(PromptArgument::required("code", "The code to review")),
        ]
    }

    async fn render(&self, _name: &str, arguments: PromptArguments) -> HandlerResult<PromptOutput> {
        let code = arguments
            .get("code")
            .ok_or_else(|| HandlerError::invalid("Missing required argument 'code'"))?;

        Ok(format!("Please review this code:\n\n{}", code).into())
    }
}
