use crate::scope::ProjectRootKey;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Routing hint for commands: the root of the most recently relevant
/// session. Holds a key, never the session itself.
#[derive(Debug, Default)]
pub struct ActiveSessionTracker {
    current: RwLock<Option<ProjectRootKey>>,
}

impl ActiveSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: ProjectRootKey) {
        let mut current = self.write();
        if current.as_ref() != Some(&key) {
            debug!("Active session is now {}", key);
            *current = Some(key);
        }
    }

    pub fn current(&self) -> Option<ProjectRootKey> {
        self.read().clone()
    }

    pub fn is_active(&self, key: &ProjectRootKey) -> bool {
        self.read().as_ref() == Some(key)
    }

    /// Forget the active root if it is `key`
    pub fn clear_if(&self, key: &ProjectRootKey) -> bool {
        let mut current = self.write();
        if current.as_ref() == Some(key) {
            *current = None;
            return true;
        }
        false
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<ProjectRootKey>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<ProjectRootKey>> {
        self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    #[test]
    fn test_tracks_latest_key() {
        let tracker = ActiveSessionTracker::new();
        assert_eq!(tracker.current(), None);

        let a = Scope::file("/a").key();
        let b = Scope::file("/b").key();
        tracker.set(a.clone());
        tracker.set(b.clone());

        assert!(tracker.is_active(&b));
        assert!(!tracker.is_active(&a));
        assert!(!tracker.clear_if(&a));
        assert!(tracker.clear_if(&b));
        assert_eq!(tracker.current(), None);
    }
}
