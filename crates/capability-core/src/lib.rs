//! Capability Core - discovery, registry and dispatch for ChatData MCP
//!
//! This crate provides:
//! - Descriptor and content types for tools, prompts and resources
//! - The capability unit traits every builtin unit implements
//! - Discovery of units from a static registration table
//! - Registry tables with per-kind merge policies
//! - Dispatch by name, with argument validation and failure isolation
//! - Server settings

pub mod capabilities;
pub mod content;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod locator;
mod panic;
pub mod prompts;
pub mod registry;
pub mod resources;
pub mod settings;
pub mod tools;
pub mod unit;

pub use capabilities::{Capabilities, CapabilitiesBuilder};
pub use content::{
    MessageContent, PromptMessage, PromptOutput, PromptResult, ResourceContent, Role, ToolContent,
};
pub use descriptor::{
    Arguments, CapabilityKind, Descriptor, InputSchema, ParamType, ParameterSpec, PromptArgument,
    PromptArguments, PromptDescriptor, ResourceDescriptor, ToolDescriptor,
};
pub use discovery::{DiscoveryReport, LoadedUnit, UnitLoadFailure, UnitLoader};
pub use error::{CapabilityError, Result};
pub use locator::canonical_name;
pub use prompts::{normalize_prompt_output, PromptRegistry};
pub use registry::{MergePolicy, RegistryEntry, RegistryTable};
pub use resources::{ResourceRead, ResourceRegistry};
pub use settings::{DiscoveryPolicy, HttpSettings, Settings, ToolSettings};
pub use tools::ToolRegistry;
pub use unit::{HandlerError, HandlerResult, PromptUnit, ResourceUnit, ToolUnit};
