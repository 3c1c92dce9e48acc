//! Extractive text summary: the leading sentences of a text

use async_trait::async_trait;
use capability_core::{
    Arguments, HandlerError, HandlerResult, ParameterSpec, ToolContent, ToolDescriptor, ToolUnit,
};
use regex::Regex;
use serde_json::Value;

pub const TEXT_SUMMARY: &str = "text_summary";

const DEFAULT_MAX_SENTENCES: u64 = 3;

/// Summarizes a text by keeping its first sentences
pub struct TextSummaryTool {
    sentence_end: Regex,
}

impl TextSummaryTool {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            sentence_end: Regex::new(r"[.!?]\s+")?,
        })
    }

    /// Split `text` after each `.`, `!` or `?` followed by whitespace
    fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for boundary in self.sentence_end.find_iter(text) {
            // The terminator is a single ASCII byte
            sentences.push(&text[start..boundary.start() + 1]);
            start = boundary.end();
        }
        if start < text.len() || sentences.is_empty() {
            sentences.push(&text[start..]);
        }

        sentences
    }

    pub fn summarize(&self, text: &str, max_sentences: usize) -> String {
        let sentences = self.sentences(text);

        let summary = if sentences.len() <= max_sentences {
            text.to_string()
        } else {
            sentences[..max_sentences].join(" ")
        };

        format!(
            "Original text: {} characters, {} sentences\nSummary ({} sentences):\n{}",
            text.chars().count(),
            sentences.len(),
            max_sentences,
            summary
        )
    }
}

#[async_trait]
impl ToolUnit for TextSummaryTool {
    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new(TEXT_SUMMARY, "Produce a short summary of a text")
            .required("text", ParameterSpec::string("Text to summarize"))
            .optional(
                "max_sentences",
                ParameterSpec::integer("Maximum number of sentences in the summary")
                    .with_default(DEFAULT_MAX_SENTENCES),
            )]
    }

    async fn call(&self, name: &str, arguments: Arguments) -> Option<HandlerResult<Vec<ToolContent>>> {
        if name != TEXT_SUMMARY {
            return None;
        }

        let Some(text) = arguments.get("text").and_then(Value::as_str) else {
            return Some(Err(HandlerError::invalid("Missing required argument 'text'")));
        };

        let max_sentences = match arguments.get("max_sentences").and_then(Value::as_u64) {
            Some(0) => return Some(Err(HandlerError::invalid("max_sentences must be at least 1"))),
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
            None => DEFAULT_MAX_SENTENCES as usize,
        };

        Some(Ok(vec![ToolContent::text(self.summarize(text, max_sentences))]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEXT: &str = "Rust is fast. It is also safe! Is it fun? Many say yes. The end.";

    fn tool() -> TextSummaryTool {
        TextSummaryTool::new().unwrap()
    }

    #[test]
    fn test_sentence_split() {
        assert_eq!(
            tool().sentences(TEXT),
            vec!["Rust is fast.", "It is also safe!", "Is it fun?", "Many say yes.", "The end."]
        );
        assert_eq!(tool().sentences("no terminator"), vec!["no terminator"]);
        assert_eq!(tool().sentences("v1.2 is out."), vec!["v1.2 is out."]);
    }

    #[test]
    fn test_summary_keeps_leading_sentences() {
        let summary = tool().summarize(TEXT, 2);

        assert!(summary.starts_with("Original text: 64 characters, 5 sentences\n"));
        assert!(summary.ends_with("Summary (2 sentences):\nRust is fast. It is also safe!"));
    }

    #[test]
    fn test_short_text_kept_whole() {
        let summary = tool().summarize("One. Two.", 3);
        assert!(summary.ends_with("\nOne. Two."));
    }

    #[tokio::test]
    async fn test_call() {
        let arguments = json!({ "text": TEXT, "max_sentences": 1 })
            .as_object()
            .cloned()
            .unwrap();
        let content = tool().call(TEXT_SUMMARY, arguments).await.unwrap().unwrap();

        match &content[0] {
            ToolContent::Text { text } => assert!(text.ends_with(":\nRust is fast.")),
            other => panic!("unexpected content {:?}", other),
        }

        let arguments = json!({ "text": TEXT, "max_sentences": 0 })
            .as_object()
            .cloned()
            .unwrap();
        assert!(matches!(
            tool().call(TEXT_SUMMARY, arguments).await.unwrap(),
            Err(HandlerError::InvalidArguments(_))
        ));
        assert!(tool().call("echo", Arguments::new()).await.is_none());
    }
}
