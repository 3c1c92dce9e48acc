//! Static registration table for the builtin capability units
//!
//! Registration order is the scan order: it decides which unit answers a
//! tool or prompt name first, and which resource descriptor survives a name
//! collision.

use capability_core::{Capabilities, Settings};
use std::sync::Arc;

use crate::prompts::{CodeReviewPrompt, ContentGeneratorPrompt, SimplePrompt};
use crate::resources::{BinaryResources, DynamicResources, TextResources};
use crate::tools::{
    CalculatorTool, DataConverterTool, EchoTool, HttpClientTool, TextSummaryTool, WebScraperTool,
};

/// Every builtin unit, configured by `settings`
pub fn builtin_capabilities(settings: &Settings) -> Capabilities {
    let http_timeout_secs = settings.tools.http_timeout_secs;

    Capabilities::builder(settings)
        .tool_unit("tools.echo", || Ok(Arc::new(EchoTool)))
        .tool_unit("tools.data_converter", || Ok(Arc::new(DataConverterTool)))
        .tool_unit("tools.http_client", move || {
            Ok(Arc::new(HttpClientTool::new(http_timeout_secs)?))
        })
        .tool_unit("tools.text_summary", || Ok(Arc::new(TextSummaryTool::new()?)))
        .tool_unit("tools.calculator", || Ok(Arc::new(CalculatorTool::new()?)))
        .tool_unit("tools.web_scraper", move || {
            Ok(Arc::new(WebScraperTool::new(http_timeout_secs)?))
        })
        .prompt_unit("prompts.simple", || Ok(Arc::new(SimplePrompt)))
        .prompt_unit("prompts.code_review", || Ok(Arc::new(CodeReviewPrompt)))
        .prompt_unit("prompts.content_generator", || {
            Ok(Arc::new(ContentGeneratorPrompt))
        })
        .resource_unit("resources.text", || Ok(Arc::new(TextResources)))
        .resource_unit("resources.binary", || Ok(Arc::new(BinaryResources::new()?)))
        .resource_unit("resources.dynamic", || Ok(Arc::new(DynamicResources)))
        .build()
}
