//! Registry tables built from loaded capability units
//!
//! A table is a projection, not state: it is rebuilt from a snapshot of the
//! loaded units every time a catalog or dispatch needs it, and never patched.

use indexmap::IndexMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::descriptor::Descriptor;
use crate::discovery::LoadedUnit;
use crate::panic::panic_message;

/// How descriptors sharing a name are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep every descriptor; lookups resolve to the first occurrence
    Append,
    /// A later unit's descriptor replaces an earlier one with the same name,
    /// keeping the position of the first occurrence
    LastWriteWins,
}

/// A descriptor and the unit that owns it
pub struct RegistryEntry<D, U: ?Sized> {
    pub descriptor: D,
    pub unit_id: String,
    pub unit: Arc<U>,
}

impl<D: Clone, U: ?Sized> Clone for RegistryEntry<D, U> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            unit_id: self.unit_id.clone(),
            unit: Arc::clone(&self.unit),
        }
    }
}

/// Name to descriptor table for one capability kind
pub struct RegistryTable<D, U: ?Sized> {
    entries: Vec<RegistryEntry<D, U>>,
}

impl<D: Descriptor, U: ?Sized> RegistryTable<D, U> {
    /// Build a table by visiting `units` in order and merging what
    /// `extract` returns for each.
    ///
    /// A unit whose extraction panics contributes nothing.
    pub fn build<F>(units: &[LoadedUnit<U>], policy: MergePolicy, extract: F) -> Self
    where
        F: Fn(&U) -> Vec<D>,
    {
        let mut entries: Vec<RegistryEntry<D, U>> = Vec::new();
        let mut by_name: IndexMap<String, RegistryEntry<D, U>> = IndexMap::new();

        for loaded in units {
            let descriptors = match catch_unwind(AssertUnwindSafe(|| extract(&*loaded.unit))) {
                Ok(descriptors) => descriptors,
                Err(payload) => {
                    warn!(
                        "Skipping {} unit {}: descriptor extraction panicked: {}",
                        D::KIND,
                        loaded.id,
                        panic_message(&*payload)
                    );
                    continue;
                }
            };

            for descriptor in descriptors {
                let entry = RegistryEntry {
                    descriptor,
                    unit_id: loaded.id.clone(),
                    unit: Arc::clone(&loaded.unit),
                };

                match policy {
                    MergePolicy::Append => {
                        if entries.iter().any(|e| e.descriptor.name() == entry.descriptor.name()) {
                            debug!(
                                "{} '{}' from {} is shadowed by an earlier unit",
                                D::KIND,
                                entry.descriptor.name(),
                                entry.unit_id
                            );
                        }
                        entries.push(entry);
                    }
                    MergePolicy::LastWriteWins => {
                        let name = entry.descriptor.name().to_string();
                        if let Some(previous) = by_name.insert(name, entry) {
                            debug!(
                                "{} '{}' from {} replaced by a later unit",
                                D::KIND,
                                previous.descriptor.name(),
                                previous.unit_id
                            );
                        }
                    }
                }
            }
        }

        if policy == MergePolicy::LastWriteWins {
            entries = by_name.into_values().collect();
        }

        Self { entries }
    }

    /// Flattened descriptor list, in table order
    pub fn descriptors(&self) -> Vec<D> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// First entry registered under `name`
    pub fn first(&self, name: &str) -> Option<&RegistryEntry<D, U>> {
        self.entries.iter().find(|e| e.descriptor.name() == name)
    }

    /// Entry for `name` contributed by the unit `unit_id`
    pub fn declared_by(&self, unit_id: &str, name: &str) -> Option<&RegistryEntry<D, U>> {
        self.entries
            .iter()
            .find(|e| e.unit_id == unit_id && e.descriptor.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry<D, U>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
