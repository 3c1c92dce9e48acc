//! Prompt catalog and dispatch

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use tracing::debug;

use crate::content::{PromptMessage, PromptOutput, PromptResult};
use crate::descriptor::{CapabilityKind, PromptArguments, PromptDescriptor};
use crate::discovery::{DiscoveryReport, UnitLoader};
use crate::error::{CapabilityError, Result};
use crate::panic::panic_message;
use crate::registry::{MergePolicy, RegistryTable};
use crate::settings::DiscoveryPolicy;
use crate::unit::{HandlerError, PromptUnit};

/// Prompt table and dispatcher
pub struct PromptRegistry {
    loader: UnitLoader<dyn PromptUnit>,
    policy: DiscoveryPolicy,
}

impl PromptRegistry {
    pub fn new(loader: UnitLoader<dyn PromptUnit>, policy: DiscoveryPolicy) -> Self {
        Self { loader, policy }
    }

    /// Load any prompt unit that is not loaded yet
    pub async fn discover(&self) -> DiscoveryReport {
        self.loader.discover().await
    }

    pub fn loader(&self) -> &UnitLoader<dyn PromptUnit> {
        &self.loader
    }

    /// Current merged prompt table
    pub async fn table(&self) -> RegistryTable<PromptDescriptor, dyn PromptUnit> {
        if self.policy == DiscoveryPolicy::EveryRequest {
            self.loader.refresh().await;
        }

        let units = self.loader.loaded().await;
        RegistryTable::build(&units, MergePolicy::Append, |unit| unit.prompts())
    }

    /// Every prompt descriptor, duplicates included, in scan order
    pub async fn catalog(&self) -> Vec<PromptDescriptor> {
        self.table().await.descriptors()
    }

    /// Render the prompt `name`
    pub async fn get(&self, name: &str, arguments: PromptArguments) -> Result<PromptResult> {
        let table = self.table().await;
        let entry = table
            .first(name)
            .ok_or_else(|| CapabilityError::unknown(CapabilityKind::Prompt, name))?;

        let arguments = entry.descriptor.prepare(arguments)?;
        debug!("Rendering prompt '{}' from {}", name, entry.unit_id);

        let output = match AssertUnwindSafe(entry.unit.render(name, arguments))
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => output,
            // Arguments were already checked by `prepare`, so anything the
            // producer raises is an execution failure
            Ok(Err(HandlerError::InvalidArguments(message) | HandlerError::Failed(message))) => {
                return Err(CapabilityError::execution_failed(
                    CapabilityKind::Prompt,
                    name,
                    message,
                ));
            }
            Err(payload) => {
                return Err(CapabilityError::execution_failed(
                    CapabilityKind::Prompt,
                    name,
                    format!("producer panicked: {}", panic_message(&*payload)),
                ));
            }
        };

        Ok(normalize_prompt_output(&entry.descriptor, output))
    }
}

/// Turn whatever a producer returned into a finished prompt result.
///
/// Finished results pass through unchanged. Anything else is annotated with
/// the descriptor's description; bare values become one assistant message.
pub fn normalize_prompt_output(descriptor: &PromptDescriptor, output: PromptOutput) -> PromptResult {
    let description = descriptor.description.clone();

    match output {
        PromptOutput::Finished(result) => result,
        PromptOutput::Messages(messages) => PromptResult::new(description, messages),
        PromptOutput::Text(text) => {
            PromptResult::new(description, vec![PromptMessage::assistant(text)])
        }
        PromptOutput::Value(Value::String(text)) => {
            PromptResult::new(description, vec![PromptMessage::assistant(text)])
        }
        PromptOutput::Value(value) => {
            if value.is_array() {
                if let Ok(messages) = serde_json::from_value::<Vec<PromptMessage>>(value.clone()) {
                    return PromptResult::new(description, messages);
                }
            }
            PromptResult::new(description, vec![PromptMessage::assistant(value.to_string())])
        }
    }
}
