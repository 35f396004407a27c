use crate::scope::{ProjectRootKey, Scope};
use crate::session::pending::{PendingGuard, PendingSet};
use crate::session::types::*;
use crate::session::WorkerSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

/// Registered session together with its lifecycle bookkeeping
pub struct SessionEntry {
    pub session: Arc<dyn WorkerSession>,
    pub phase: SessionPhase,
    pub(crate) forwarder: Option<JoinHandle<()>>,
}

/// Result of asking the registry for a creation slot
pub enum Reservation {
    /// A session is already registered for the root
    Existing(Arc<dyn WorkerSession>),
    /// Another caller is creating the session right now
    Pending,
    /// The caller owns the creation until the guard is dropped
    Reserved(PendingGuard),
}

/// Authoritative map from project root to live session
pub struct SessionRegistry {
    entries: RwLock<HashMap<ProjectRootKey, SessionEntry>>,
    pending: Arc<PendingSet>,
}

impl SessionEntry {
    fn new(session: Arc<dyn WorkerSession>) -> Self {
        Self {
            session,
            phase: SessionPhase::Constructing,
            forwarder: None,
        }
    }

    /// Stop forwarding events and hand back the session for disposal
    pub fn detach(mut self) -> Arc<dyn WorkerSession> {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        self.session
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            pending: PendingSet::new(),
        }
    }

    /// Look up `key`, or claim the right to create its session.
    ///
    /// The registry check and the pending mark happen under one write lock,
    /// so two callers can never both receive [`Reservation::Reserved`].
    pub async fn reserve(&self, key: &ProjectRootKey) -> Reservation {
        let entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            return Reservation::Existing(Arc::clone(&entry.session));
        }

        match self.pending.try_mark(key) {
            Some(guard) => {
                debug!("Reserved session creation for {}", key);
                Reservation::Reserved(guard)
            }
            None => Reservation::Pending,
        }
    }

    /// Register a freshly constructed session in [`SessionPhase::Constructing`]
    pub async fn insert(&self, key: ProjectRootKey, session: Arc<dyn WorkerSession>) {
        let mut entries = self.entries.write().await;
        if let Some(previous) = entries.insert(key, SessionEntry::new(session)) {
            previous.detach();
        }
    }

    /// Update the phase if `key` still maps to session `id`
    pub async fn set_phase(&self, key: &ProjectRootKey, id: SessionId, phase: SessionPhase) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.session.id() == id => {
                debug!("Session {} for {} is now {:?}", id, key, phase);
                entry.phase = phase;
                true
            }
            _ => false,
        }
    }

    /// Attach the event forwarder of session `id`. The forwarder is aborted
    /// if the session was removed in the meantime.
    pub async fn attach_forwarder(
        &self,
        key: &ProjectRootKey,
        id: SessionId,
        forwarder: JoinHandle<()>,
    ) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.session.id() == id => {
                if let Some(previous) = entry.forwarder.replace(forwarder) {
                    previous.abort();
                }
                true
            }
            _ => {
                forwarder.abort();
                false
            }
        }
    }

    pub async fn remove(&self, key: &ProjectRootKey) -> Option<SessionEntry> {
        self.entries.write().await.remove(key)
    }

    /// Remove `key` only while it still maps to session `id`
    pub async fn remove_if(&self, key: &ProjectRootKey, id: SessionId) -> Option<SessionEntry> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.session.id() == id => entries.remove(key),
            _ => None,
        }
    }

    pub async fn get(&self, key: &ProjectRootKey) -> Option<Arc<dyn WorkerSession>> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| Arc::clone(&entry.session))
    }

    pub async fn phase(&self, key: &ProjectRootKey) -> Option<SessionPhase> {
        self.entries.read().await.get(key).map(|entry| entry.phase)
    }

    pub async fn sessions(&self) -> Vec<Arc<dyn WorkerSession>> {
        self.entries
            .read()
            .await
            .values()
            .map(|entry| Arc::clone(&entry.session))
            .collect()
    }

    pub async fn roots(&self) -> Vec<Scope> {
        self.entries
            .read()
            .await
            .values()
            .map(|entry| entry.session.root().clone())
            .collect()
    }

    /// Remove every entry, e.g. on coordinator teardown
    pub async fn drain(&self) -> Vec<SessionEntry> {
        self.entries
            .write()
            .await
            .drain()
            .map(|(_, entry)| entry)
            .collect()
    }

    pub fn is_pending(&self, key: &ProjectRootKey) -> bool {
        self.pending.contains(key)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
