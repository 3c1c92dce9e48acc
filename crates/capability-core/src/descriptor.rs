//! Capability descriptors
//!
//! A descriptor is the immutable metadata a capability unit publishes for one
//! tool, prompt or resource. The name is the only public identity of a
//! capability and doubles as its dispatch key.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::{CapabilityError, Result};

/// Arguments passed to a tool call
pub type Arguments = serde_json::Map<String, Value>;

/// Arguments passed to a prompt; prompt arguments are always strings
pub type PromptArguments = HashMap<String, String>;

/// The three kinds of capability a server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Tool,
    Prompt,
    Resource,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Tool => "tool",
            Self::Prompt => "prompt",
            Self::Resource => "resource",
        };
        f.write_str(label)
    }
}

/// Common view over the descriptors of every kind
pub trait Descriptor: Clone + Send + Sync + 'static {
    /// Kind this descriptor belongs to
    const KIND: CapabilityKind;

    /// Dispatch key
    fn name(&self) -> &str;
}

// ============================================================================
// Tools
// ============================================================================

/// Tool descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::default(),
        }
    }

    /// Declare a required parameter
    pub fn required(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        let name = name.into();
        if !self.input_schema.required.contains(&name) {
            self.input_schema.required.push(name.clone());
        }
        self.input_schema.properties.insert(name, spec);
        self
    }

    /// Declare an optional parameter
    pub fn optional(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.input_schema.properties.insert(name.into(), spec);
        self
    }
}

impl Descriptor for ToolDescriptor {
    const KIND: CapabilityKind = CapabilityKind::Tool;

    fn name(&self) -> &str {
        &self.name
    }
}

/// JSON Schema for tool inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, ParameterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }
}

impl InputSchema {
    /// Validate `arguments` against this schema and fill declared defaults.
    ///
    /// Only the top level is checked: presence of required parameters, and
    /// the JSON type and `enum` membership of declared ones. Undeclared
    /// arguments pass through.
    pub fn prepare(&self, tool: &str, mut arguments: Arguments) -> Result<Arguments> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|name| arguments.get(name.as_str()).map_or(true, Value::is_null))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() {
            return Err(CapabilityError::invalid_arguments(
                CapabilityKind::Tool,
                tool,
                format!("missing required argument(s): {}", missing.join(", ")),
            ));
        }

        for (name, spec) in &self.properties {
            match arguments.get(name) {
                Some(Value::Null) | None => {
                    if let Some(default) = &spec.default {
                        arguments.insert(name.clone(), default.clone());
                    }
                }
                Some(value) => {
                    if !spec.param_type.matches(value) {
                        return Err(CapabilityError::invalid_arguments(
                            CapabilityKind::Tool,
                            tool,
                            format!("argument '{}' must be of type {}", name, spec.param_type),
                        ));
                    }
                    if !spec.allowed.is_empty() && !spec.allowed.contains(value) {
                        let allowed: Vec<String> =
                            spec.allowed.iter().map(Value::to_string).collect();
                        return Err(CapabilityError::invalid_arguments(
                            CapabilityKind::Tool,
                            tool,
                            format!("argument '{}' must be one of: {}", name, allowed.join(", ")),
                        ));
                    }
                }
            }
        }

        Ok(arguments)
    }
}

/// A single declared tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn new(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: Some(description.into()),
            allowed: Vec::new(),
            default: None,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(ParamType::String, description)
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::new(ParamType::Integer, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(ParamType::Boolean, description)
    }

    pub fn object(description: impl Into<String>) -> Self {
        Self::new(ParamType::Object, description)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }
}

/// JSON types a parameter can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// Prompt descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

impl PromptDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arguments: Vec::new(),
        }
    }

    pub fn argument(mut self, argument: PromptArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Check the supplied arguments against the declared list.
    ///
    /// Absent optional arguments with a declared default are filled in;
    /// absent optional arguments without one stay absent.
    pub fn prepare(&self, mut arguments: PromptArguments) -> Result<PromptArguments> {
        if let Some(unexpected) = arguments
            .keys()
            .find(|key| !self.arguments.iter().any(|arg| &arg.name == *key))
        {
            return Err(CapabilityError::invalid_arguments(
                CapabilityKind::Prompt,
                &self.name,
                format!("unexpected argument '{}'", unexpected),
            ));
        }

        for argument in &self.arguments {
            if arguments.contains_key(&argument.name) {
                continue;
            }
            if argument.required {
                return Err(CapabilityError::invalid_arguments(
                    CapabilityKind::Prompt,
                    &self.name,
                    format!("missing required argument '{}'", argument.name),
                ));
            }
            if let Some(default) = &argument.default {
                arguments.insert(argument.name.clone(), default.clone());
            }
        }

        Ok(arguments)
    }
}

impl Descriptor for PromptDescriptor {
    const KIND: CapabilityKind = CapabilityKind::Prompt;

    fn name(&self) -> &str {
        &self.name
    }
}

/// A named prompt argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Value used when the caller omits this argument; not sent to clients
    #[serde(skip)]
    pub default: Option<String>,
}

impl PromptArgument {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Resource descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

impl ResourceDescriptor {
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: description.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl Descriptor for ResourceDescriptor {
    const KIND: CapabilityKind = CapabilityKind::Resource;

    fn name(&self) -> &str {
        &self.name
    }
}
