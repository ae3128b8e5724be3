//! At-most-once evaluation of named checks.
//!
//! Entries are registered unresolved and resolved on first read. Nothing is
//! ever invalidated: a resolved value lives as long as the cache.
//!
//! A check read again while its own probe is still running (a host callback
//! querying the result it is computing) sees `false`. That read is not
//! cached; the outer computation still stores its value.

use std::cell::Cell;
use std::collections::HashMap;

use once_cell::unsync::OnceCell;
use tracing::{trace, warn};

use crate::detector::Detector;
use crate::error::{DetectionError, Result};
use crate::value::{CheckValue, Probe};

/// A named check and its lazily computed value.
#[derive(Debug)]
pub struct ResultEntry {
    name: String,
    probe: Probe,
    value: OnceCell<CheckValue>,
    resolving: Cell<bool>,
}

static IN_PROGRESS: CheckValue = CheckValue::Flag(false);

impl ResultEntry {
    #[must_use]
    pub fn new(name: &str, probe: Probe) -> Self {
        Self {
            name: name.to_string(),
            probe,
            value: OnceCell::new(),
            resolving: Cell::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value if already computed.
    #[must_use]
    pub fn cached(&self) -> Option<&CheckValue> {
        self.value.get()
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// Computes on first call; later calls return the stored value.
    pub fn resolve(&self, detector: &Detector) -> &CheckValue {
        if let Some(value) = self.value.get() {
            return value;
        }
        if self.resolving.replace(true) {
            warn!(name = %self.name, "check read while computing itself");
            return &IN_PROGRESS;
        }
        let value = self.probe.resolve(detector);
        self.resolving.set(false);
        trace!(name = %self.name, %value, "resolved check");
        self.value.get_or_init(|| value)
    }
}

/// Ordered, name-keyed memo table.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Vec<ResultEntry>,
    index: HashMap<String, usize>,
}

impl ResultCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `probe` under `name`, unresolved.
    pub fn memoize(&mut self, name: &str, probe: Probe) -> Result<()> {
        if self.index.contains_key(name) {
            return Err(DetectionError::DuplicateCheck {
                name: name.to_string(),
            });
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(ResultEntry::new(name, probe));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ResultEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Resolves `name`, computing it if this is the first read.
    pub fn get(&self, name: &str, detector: &Detector) -> Option<&CheckValue> {
        self.entry(name).map(|entry| entry.resolve(detector))
    }

    /// Entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
