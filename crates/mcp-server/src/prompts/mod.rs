//! Builtin prompt units

mod code_review;
mod content_generator;
mod simple;

pub use code_review::{CodeReviewPrompt, REVIEW_CODE};
pub use content_generator::{ContentGeneratorPrompt, GENERATE_CONTENT};
pub use simple::{SimplePrompt, SIMPLE};
