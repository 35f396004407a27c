use crate::scope::ProjectRootKey;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Roots with a session creation in flight
#[derive(Debug, Default)]
pub struct PendingSet {
    keys: Mutex<HashSet<ProjectRootKey>>,
}

/// Marker held for the duration of one creation. Dropping it clears the
/// marker, whichever way the creation ended.
#[derive(Debug)]
pub struct PendingGuard {
    set: Arc<PendingSet>,
    key: ProjectRootKey,
}

impl PendingSet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark `key` pending unless it already is
    pub fn try_mark(self: &Arc<Self>, key: &ProjectRootKey) -> Option<PendingGuard> {
        if !self.keys().insert(key.clone()) {
            return None;
        }
        Some(PendingGuard {
            set: Arc::clone(self),
            key: key.clone(),
        })
    }

    pub fn contains(&self, key: &ProjectRootKey) -> bool {
        self.keys().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    fn keys(&self) -> MutexGuard<'_, HashSet<ProjectRootKey>> {
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PendingGuard {
    pub fn key(&self) -> &ProjectRootKey {
        &self.key
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        debug!("Clearing pending marker for {}", self.key);
        self.set.keys().remove(&self.key);
    }
}
