pub mod pending;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;

pub use pending::*;
pub use registry::*;
pub use types::*;

use crate::error::Result;
use crate::scope::{Document, Scope};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;

/// A managed worker bound to one project root.
///
/// Implementations own the worker process and its protocol; the coordinator
/// only drives the lifecycle and listens to [`SessionEvent`]s.
#[async_trait]
pub trait WorkerSession: Send + Sync {
    fn id(&self) -> SessionId;

    fn root(&self) -> &Scope;

    fn created_at(&self) -> DateTime<Utc>;

    fn is_running(&self) -> bool;

    fn is_started(&self) -> bool;

    /// New receiver for this session's lifecycle events
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    async fn restart(&self) -> Result<()>;

    /// Re-elaborate a single document, refreshing its dependencies
    async fn restart_file(&self, document: &Document) -> Result<()>;

    async fn open_document(&self, document: &Document) -> Result<()>;

    /// Release the worker. The session is unusable afterwards.
    async fn dispose(&self);
}

/// Constructs sessions for the coordinator
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self, spec: SessionSpec) -> Result<Arc<dyn WorkerSession>>;
}
