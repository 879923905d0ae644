//! Per-destination mutual exclusion
//!
//! One mutex per source identifier, created on demand and never removed.
//! The registry lock is held only long enough to fetch or insert a handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct DestinationLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DestinationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock handle for an identifier, creating it on first use
    pub fn handle(&self, identifier: &str) -> Arc<Mutex<()>> {
        // A panic while holding the registry cannot leave the map inconsistent
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(identifier.to_string()).or_default())
    }

    /// Number of identifiers seen so far
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquire a destination lock, recovering it if a previous holder panicked
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|e| e.into_inner())
}
