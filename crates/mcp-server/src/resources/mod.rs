//! Builtin resource units

mod binary;
mod dynamic;
mod text;

pub use binary::BinaryResources;
pub use dynamic::{DynamicResources, CURRENT_TIME, MEMORY_USAGE, SYSTEM_INFO};
pub use text::TextResources;
