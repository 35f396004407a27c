use crate::error::{CoordinatorError, Result};
use crate::scope::Scope;
use crate::session::{FileProgress, SessionEvent, StopReason, WorkerSession};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

/// Coordinator-wide lifecycle events
#[derive(Clone)]
pub enum CoordinatorEvent {
    SessionAdded(Arc<dyn WorkerSession>),
    SessionRemoved(Arc<dyn WorkerSession>),
    SessionStopped {
        session: Arc<dyn WorkerSession>,
        /// The stopped session was the active one when the stop was observed
        was_active: bool,
        reason: StopReason,
    },
    Progress {
        root: Scope,
        files: Vec<FileProgress>,
    },
}

/// Whether a forwarder keeps listening after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardControl {
    Continue,
    Stop,
}

/// Fans per-session events into one broadcast stream
#[derive(Debug, Clone)]
pub struct EventAggregator {
    tx: broadcast::Sender<CoordinatorEvent>,
}

/// Receiving end of [`EventAggregator`]
pub struct CoordinatorEventSubscription {
    receiver: broadcast::Receiver<CoordinatorEvent>,
}

impl CoordinatorEvent {
    /// Root the event concerns
    pub fn root(&self) -> &Scope {
        match self {
            CoordinatorEvent::SessionAdded(session)
            | CoordinatorEvent::SessionRemoved(session)
            | CoordinatorEvent::SessionStopped { session, .. } => session.root(),
            CoordinatorEvent::Progress { root, .. } => root,
        }
    }
}

impl fmt::Debug for CoordinatorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorEvent::SessionAdded(session) => f
                .debug_struct("SessionAdded")
                .field("id", &session.id())
                .field("root", session.root())
                .finish(),
            CoordinatorEvent::SessionRemoved(session) => f
                .debug_struct("SessionRemoved")
                .field("id", &session.id())
                .field("root", session.root())
                .finish(),
            CoordinatorEvent::SessionStopped {
                session,
                was_active,
                reason,
            } => f
                .debug_struct("SessionStopped")
                .field("id", &session.id())
                .field("root", session.root())
                .field("was_active", was_active)
                .field("reason", reason)
                .finish(),
            CoordinatorEvent::Progress { root, files } => f
                .debug_struct("Progress")
                .field("root", root)
                .field("files", &files.len())
                .finish(),
        }
    }
}

impl EventAggregator {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: CoordinatorEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> CoordinatorEventSubscription {
        CoordinatorEventSubscription {
            receiver: self.tx.subscribe(),
        }
    }

    /// Forward one session's events to `handle` on a background task until
    /// the session's channel closes or `handle` asks to stop.
    pub fn forward<F, Fut>(
        mut receiver: broadcast::Receiver<SessionEvent>,
        mut handle: F,
    ) -> JoinHandle<()>
    where
        F: FnMut(SessionEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ForwardControl> + Send,
    {
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if handle(event).await == ForwardControl::Stop {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Session event forwarder lagged; dropped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl CoordinatorEventSubscription {
    /// Next event, or `None` once the coordinator is gone
    pub async fn next_event(&mut self) -> Result<Option<CoordinatorEvent>> {
        match self.receiver.recv().await {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::RecvError::Closed) => Ok(None),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(CoordinatorError::Session(
                format!("coordinator subscriber lagged; dropped {skipped} events"),
            )),
        }
    }

    /// Next event if one is already queued
    pub fn try_next_event(&mut self) -> Option<CoordinatorEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
