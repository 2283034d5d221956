//! Priority selection between value sources
//!
//! Unlike a merge chain, precedence here is an explicit integer rather than
//! registration order. The map returns the value of the highest priority
//! entry that currently holds one, falling back to a configured default.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::chain::MergeChain;
use crate::error::{CoreError, Result};

/// Explicit precedence; larger wins
pub type Priority = i32;

/// Anything that may currently hold a value
pub trait ValueSource<T>: Send + Sync {
    fn current(&self) -> Option<T>;
}

impl<T: Clone + Send + 'static> ValueSource<T> for MergeChain<T> {
    fn current(&self) -> Option<T> {
        self.value()
    }
}

/// A settable value holder
#[derive(Debug, Default)]
pub struct ValueSlot<T> {
    value: RwLock<Option<T>>,
}

impl<T: Clone> ValueSlot<T> {
    pub fn new() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    pub fn with_value(value: T) -> Self {
        Self {
            value: RwLock::new(Some(value)),
        }
    }

    pub fn set(&self, value: T) {
        *self.value.write() = Some(value);
    }

    pub fn clear(&self) {
        *self.value.write() = None;
    }
}

impl<T: Clone + Send + Sync> ValueSource<T> for ValueSlot<T> {
    fn current(&self) -> Option<T> {
        self.value.read().clone()
    }
}

/// Highest-priority-wins selection with a default
pub struct PriorityMap<T> {
    default: RwLock<T>,
    entries: Mutex<BTreeMap<Priority, Arc<dyn ValueSource<T>>>>,
}

impl<T: Clone> PriorityMap<T> {
    pub fn new(default: T) -> Self {
        Self {
            default: RwLock::new(default),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Add a source at `priority`; each priority holds at most one source
    pub fn insert(&self, priority: Priority, source: Arc<dyn ValueSource<T>>) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&priority) {
            return Err(CoreError::DuplicateRegistration(format!(
                "priority {} already has a source",
                priority
            )));
        }
        entries.insert(priority, source);
        debug!("Added source at priority {}", priority);
        Ok(())
    }

    /// Remove the source at `priority`, returning it if present
    pub fn remove(&self, priority: Priority) -> Option<Arc<dyn ValueSource<T>>> {
        self.entries.lock().remove(&priority)
    }

    /// Value of the highest priority source holding one, else the default
    pub fn value(&self) -> T {
        // Query sources outside the lock; a source may take its own locks
        let sources: Vec<Arc<dyn ValueSource<T>>> =
            self.entries.lock().values().rev().cloned().collect();

        sources
            .iter()
            .find_map(|source| source.current())
            .unwrap_or_else(|| self.default.read().clone())
    }

    pub fn default_value(&self) -> T {
        self.default.read().clone()
    }

    pub fn set_default(&self, value: T) {
        *self.default.write() = value;
    }

    /// Registered priorities, highest first
    pub fn priorities(&self) -> Vec<Priority> {
        self.entries.lock().keys().rev().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
