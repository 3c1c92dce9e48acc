//! Discovery of capability units
//!
//! Units are declared up front in a static registration table of
//! `(unit id, factory)` pairs. Discovery walks that table and constructs
//! every unit that is not loaded yet. A unit is loaded at most once; a unit
//! whose factory fails is reported and retried on the next explicit pass, and
//! never stops the remaining units from loading. Request-path refreshes retry
//! a failed unit only once its retry interval has elapsed.

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::descriptor::CapabilityKind;
use crate::error::CapabilityError;
use crate::panic::panic_message;

/// Default wait before a request-path refresh retries a failed unit
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Constructor for one capability unit
pub type UnitFactory<U> = Box<dyn Fn() -> anyhow::Result<Arc<U>> + Send + Sync>;

struct UnitSource<U: ?Sized> {
    id: String,
    factory: UnitFactory<U>,
}

/// A unit that could not be loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitLoadFailure {
    pub unit: String,
    pub reason: String,
}

impl From<UnitLoadFailure> for CapabilityError {
    fn from(failure: UnitLoadFailure) -> Self {
        CapabilityError::UnitLoadFailed {
            unit: failure.unit,
            reason: failure.reason,
        }
    }
}

/// Outcome of one discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Units loaded during this pass
    pub loaded: Vec<String>,
    /// Units that failed during this pass
    pub failed: Vec<UnitLoadFailure>,
}

impl DiscoveryReport {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.failed.is_empty()
    }

    pub fn merge(&mut self, other: DiscoveryReport) {
        self.loaded.extend(other.loaded);
        self.failed.extend(other.failed);
    }
}

/// A loaded unit together with its identifier
pub struct LoadedUnit<U: ?Sized> {
    pub id: String,
    pub unit: Arc<U>,
}

impl<U: ?Sized> Clone for LoadedUnit<U> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            unit: Arc::clone(&self.unit),
        }
    }
}

struct FailedAttempt {
    failure: UnitLoadFailure,
    at: Instant,
}

struct LoaderState<U: ?Sized> {
    /// One slot per registered source, in registration order
    slots: Vec<Option<Arc<U>>>,
    /// Outstanding failures keyed by unit id
    failures: HashMap<String, FailedAttempt>,
}

/// Loads the units of one capability kind exactly once
pub struct UnitLoader<U: ?Sized> {
    kind: CapabilityKind,
    sources: Vec<UnitSource<U>>,
    disabled: HashSet<String>,
    retry_interval: Duration,
    state: RwLock<LoaderState<U>>,
}

impl<U: ?Sized + Send + Sync + 'static> UnitLoader<U> {
    /// Create an empty loader
    pub fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            sources: Vec::new(),
            disabled: HashSet::new(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            state: RwLock::new(LoaderState {
                slots: Vec::new(),
                failures: HashMap::new(),
            }),
        }
    }

    /// Kind of the units this loader manages
    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    /// Add a unit to the registration table.
    ///
    /// Registration order is the scan order used by every registry build
    /// and dispatch. A second registration under an existing id is ignored.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<U>> + Send + Sync + 'static,
    {
        let id = id.into();

        if self.sources.iter().any(|source| source.id == id) {
            warn!("Ignoring duplicate {} unit registration: {}", self.kind, id);
            return;
        }

        self.sources.push(UnitSource {
            id,
            factory: Box::new(factory),
        });
        self.state.get_mut().slots.push(None);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_unit<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<U>> + Send + Sync + 'static,
    {
        self.register(id, factory);
        self
    }

    /// Set how long [`refresh`](Self::refresh) waits before retrying a
    /// failed unit
    pub fn set_retry_interval(&mut self, interval: Duration) {
        self.retry_interval = interval;
    }

    /// Exclude a unit from discovery
    pub fn disable(&mut self, id: impl Into<String>) {
        self.disabled.insert(id.into());
    }

    /// Identifiers of all registered units, in registration order
    pub fn unit_ids(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.id.as_str()).collect()
    }

    /// Load every registered unit that is not loaded yet, retrying failed
    /// units immediately.
    ///
    /// Safe to call from concurrent requests: the loaded set only grows and
    /// every caller converges on the same membership.
    pub async fn discover(&self) -> DiscoveryReport {
        self.load_due(true).await
    }

    /// Load units never attempted before, and failed units whose retry
    /// interval has elapsed.
    ///
    /// Used before every catalog and dispatch request. Once nothing is due
    /// it only takes the read lock.
    pub async fn refresh(&self) -> DiscoveryReport {
        self.load_due(false).await
    }

    async fn load_due(&self, retry_now: bool) -> DiscoveryReport {
        if !self.has_due(retry_now).await {
            return DiscoveryReport::default();
        }

        let mut state = self.state.write().await;
        let mut report = DiscoveryReport::default();
        let now = Instant::now();

        for (index, source) in self.sources.iter().enumerate() {
            if !self.is_due(&state, index, retry_now, now) {
                continue;
            }

            match load_unit(source) {
                Ok(unit) => {
                    info!("Loaded {} unit {}", self.kind, source.id);
                    state.slots[index] = Some(unit);
                    state.failures.remove(&source.id);
                    report.loaded.push(source.id.clone());
                }
                Err(reason) => {
                    let repeated = state
                        .failures
                        .get(&source.id)
                        .is_some_and(|previous| previous.failure.reason == reason);

                    if repeated {
                        debug!("{} unit {} still failing: {}", self.kind, source.id, reason);
                    } else {
                        warn!("Failed to load {} unit {}: {}", self.kind, source.id, reason);
                    }

                    let failure = UnitLoadFailure {
                        unit: source.id.clone(),
                        reason,
                    };
                    state.failures.insert(
                        source.id.clone(),
                        FailedAttempt {
                            failure: failure.clone(),
                            at: now,
                        },
                    );
                    report.failed.push(failure);
                }
            }
        }

        report
    }

    /// Snapshot of the loaded units in registration order
    pub async fn loaded(&self) -> Vec<LoadedUnit<U>> {
        let state = self.state.read().await;

        self.sources
            .iter()
            .zip(state.slots.iter())
            .filter_map(|(source, slot)| {
                slot.as_ref().map(|unit| LoadedUnit {
                    id: source.id.clone(),
                    unit: Arc::clone(unit),
                })
            })
            .collect()
    }

    /// Failures still outstanding after the last pass, in registration order
    pub async fn failures(&self) -> Vec<UnitLoadFailure> {
        let state = self.state.read().await;

        self.sources
            .iter()
            .filter_map(|source| {
                state
                    .failures
                    .get(&source.id)
                    .map(|attempt| attempt.failure.clone())
            })
            .collect()
    }

    async fn has_due(&self, retry_now: bool) -> bool {
        let state = self.state.read().await;
        let now = Instant::now();

        (0..self.sources.len()).any(|index| self.is_due(&state, index, retry_now, now))
    }

    fn is_due(&self, state: &LoaderState<U>, index: usize, retry_now: bool, now: Instant) -> bool {
        let source = &self.sources[index];
        if state.slots[index].is_some() || self.disabled.contains(&source.id) {
            return false;
        }

        match state.failures.get(&source.id) {
            Some(attempt) => retry_now || now.duration_since(attempt.at) >= self.retry_interval,
            None => true,
        }
    }
}

fn load_unit<U: ?Sized>(source: &UnitSource<U>) -> Result<Arc<U>, String> {
    match catch_unwind(AssertUnwindSafe(|| (source.factory)())) {
        Ok(Ok(unit)) => Ok(unit),
        Ok(Err(err)) => Err(format!("{:#}", err)),
        Err(payload) => Err(format!("factory panicked: {}", panic_message(&*payload))),
    }
}
