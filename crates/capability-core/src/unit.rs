//! Capability unit trait definitions
//!
//! A capability unit is an independent, self-contained implementation that
//! contributes zero or more capabilities of one kind. Units are registered
//! in a static table and loaded by [`UnitLoader`](crate::UnitLoader); the
//! registries never reach into a unit except through these traits.

use async_trait::async_trait;
use thiserror::Error;

use crate::content::{PromptOutput, ResourceContent, ToolContent};
use crate::descriptor::{
    Arguments, PromptArguments, PromptDescriptor, ResourceDescriptor, ToolDescriptor,
};

/// Result type alias for handler bodies
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Failure raised by a handler that has claimed a request
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The request is addressed to this handler but its arguments are unusable
    #[error("{0}")]
    InvalidArguments(String),

    /// The handler ran and failed
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(format!("{:#}", err))
    }
}

/// A unit contributing tools
#[async_trait]
pub trait ToolUnit: Send + Sync {
    /// Descriptors for every tool this unit serves
    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Try to handle a tool call.
    ///
    /// Returns `None` if `name` is not served by this unit, so the dispatcher
    /// moves on to the next unit.
    async fn call(&self, name: &str, arguments: Arguments)
        -> Option<HandlerResult<Vec<ToolContent>>>;
}

/// A unit contributing prompts
#[async_trait]
pub trait PromptUnit: Send + Sync {
    /// Descriptors for every prompt this unit serves
    fn prompts(&self) -> Vec<PromptDescriptor>;

    /// Produce the prompt `name` from already validated arguments
    async fn render(&self, name: &str, arguments: PromptArguments) -> HandlerResult<PromptOutput>;
}

/// A unit contributing resources
#[async_trait]
pub trait ResourceUnit: Send + Sync {
    /// Descriptors for every resource this unit serves
    fn resources(&self) -> Vec<ResourceDescriptor>;

    /// Read a resource by canonical name.
    ///
    /// Returns `Ok(None)` for names this unit does not recognize. Units
    /// should accept both the bare name and the name with its file suffix.
    async fn read(&self, name: &str) -> HandlerResult<Option<ResourceContent>>;
}
