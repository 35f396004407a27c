use crate::coordinator::active::ActiveSessionTracker;
use crate::coordinator::config::CoordinatorConfig;
use crate::coordinator::events::*;
use crate::coordinator::serializer::ChangeEventSerializer;
use crate::env::messages;
use crate::error::Result;
use crate::scope::{Document, ProjectRootKey, Scope};
use crate::session::*;
use crate::toolchain::{ToolchainInstaller, VersionCache, VersionInfo};
use crate::workspace::{
    FolderResolver, ProjectLayoutAdvisor, ProjectLocator, UserNotifier, WorkspaceView,
};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Host-provided collaborators of the coordinator
#[derive(Clone)]
pub struct Collaborators {
    pub locator: Arc<dyn ProjectLocator>,
    pub installer: Arc<dyn ToolchainInstaller>,
    pub workspace: Arc<dyn WorkspaceView>,
    pub notifier: Arc<dyn UserNotifier>,
    pub factory: Arc<dyn SessionFactory>,
}

/// Result of [`SessionCoordinator::ensure_session`]
#[derive(Clone)]
pub struct EnsureOutcome {
    /// The session existed before this call
    pub already_present: bool,
    pub session: Option<Arc<dyn WorkerSession>>,
    /// Phase the root is in after this call; `Constructing` when another
    /// caller is creating its session, `Rejected` for unmanaged versions
    pub phase: Option<SessionPhase>,
}

/// Outcome of a user command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Executed,
    NoActiveSession,
    NoActiveDocument,
    Failed(String),
}

/// Keeps one worker session per project root.
///
/// Cloning is cheap; clones share state. All owned sessions are disposed by
/// [`shutdown`](Self::shutdown).
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    collaborators: Collaborators,
    registry: SessionRegistry,
    versions: VersionCache,
    active: ActiveSessionTracker,
    changes: ChangeEventSerializer<Scope>,
    events: EventAggregator,
    advisor: ProjectLayoutAdvisor,
}

impl EnsureOutcome {
    fn present(session: Arc<dyn WorkerSession>, phase: Option<SessionPhase>) -> Self {
        Self {
            already_present: true,
            session: Some(session),
            phase,
        }
    }

    fn absent(phase: SessionPhase) -> Self {
        Self {
            already_present: false,
            session: None,
            phase: Some(phase),
        }
    }
}

impl SessionCoordinator {
    pub fn new(config: CoordinatorConfig, collaborators: Collaborators) -> Self {
        let versions = VersionCache::new(
            Arc::clone(&collaborators.installer),
            Arc::clone(&collaborators.notifier),
            config.prompt_user_for_install,
        );
        let advisor = ProjectLayoutAdvisor::new(
            Arc::clone(&collaborators.locator),
            Arc::clone(&collaborators.notifier),
            config.show_invalid_project_warnings,
        );
        let events = EventAggregator::new(config.event_buffer);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                collaborators,
                registry: SessionRegistry::new(),
                versions,
                active: ActiveSessionTracker::new(),
                changes: ChangeEventSerializer::new(),
                events,
                advisor,
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn versions(&self) -> &VersionCache {
        &self.inner.versions
    }

    pub fn subscribe(&self) -> CoordinatorEventSubscription {
        self.inner.events.subscribe()
    }

    /// Open every document already visible in the workspace
    pub async fn initialize(&self) {
        let documents = self.inner.collaborators.workspace.visible_documents().await;
        info!("Initializing with {} visible documents", documents.len());
        join_all(documents.iter().map(|doc| self.did_open_document(doc))).await;
    }

    /// Make sure the root owning `scope` has a session.
    ///
    /// Returns the existing session untouched when there is one. Returns no
    /// session while another caller is creating it, or when the root's
    /// toolchain has a major version other than the managed one. Every
    /// call that yields a session makes it the active one.
    pub async fn ensure_session(
        &self,
        scope: &Scope,
        version: Option<VersionInfo>,
    ) -> Result<EnsureOutcome> {
        let root = self.find_project_root(scope).await?;
        let key = root.key();
        let registry = &self.inner.registry;

        let pending = match registry.reserve(&key).await {
            Reservation::Existing(session) => {
                let phase = registry.phase(&key).await;
                self.inner.active.set(key);
                return Ok(EnsureOutcome::present(session, phase));
            }
            Reservation::Pending => {
                debug!("Ignoring ensure_session, creation already pending for {}", key);
                return Ok(EnsureOutcome::absent(SessionPhase::Constructing));
            }
            Reservation::Reserved(guard) => guard,
        };

        let version = match version {
            Some(version) => version,
            None => {
                // May install the toolchain, so it runs before any session exists.
                let lookup = self.inner.versions.get_version(&root).await;
                if lookup.installed {
                    self.retrigger_all().await;
                }
                lookup.info
            }
        };

        info!("Creating session for {}", root);
        let default_toolchain = self
            .inner
            .collaborators
            .installer
            .default_toolchain(&root)
            .await;
        let session = self
            .inner
            .collaborators
            .factory
            .create(SessionSpec::new(root.clone(), default_toolchain))
            .await?;
        let id = session.id();
        let receiver = session.subscribe();

        // Registered before validation so concurrent openers see it.
        registry.insert(key.clone(), Arc::clone(&session)).await;

        if version.is_other_major(&self.inner.config.managed_major_version) {
            info!(
                "Ignoring {}: toolchain {} is not major version {}",
                root, version, self.inner.config.managed_major_version
            );
            if let Some(entry) = registry.remove_if(&key, id).await {
                entry.detach();
            }
            session.dispose().await;
            drop(pending);
            return Ok(EnsureOutcome::absent(SessionPhase::Rejected));
        }

        let forwarder = self.spawn_forwarder(key.clone(), Arc::clone(&session), receiver);
        registry.attach_forwarder(&key, id, forwarder).await;
        drop(pending);

        debug!("Publishing session added for {}", root);
        self.inner
            .events
            .publish(CoordinatorEvent::SessionAdded(Arc::clone(&session)));

        let phase = if version.is_ok() {
            if let Err(e) = session.start().await {
                error!("Failed to start session for {}: {}", root, e);
                self.remove_failed(&key, id, &e.to_string(), false).await;
                return Ok(EnsureOutcome::absent(SessionPhase::Rejected));
            }
            SessionPhase::Started
        } else {
            // An install may be in progress; the install-changed notification starts it.
            warn!("Not starting session for {}: {}", root, version);
            SessionPhase::AwaitingToolchain
        };

        // Removed while starting, e.g. by folder removal or a fatal failure event.
        if !registry.set_phase(&key, id, phase).await {
            debug!("Session for {} was removed during start", root);
            return Ok(EnsureOutcome::absent(SessionPhase::Rejected));
        }
        self.inner.active.set(key);

        Ok(EnsureOutcome {
            already_present: false,
            session: Some(session),
            phase: Some(phase),
        })
    }

    /// Handle a document being opened or focused
    pub async fn did_open_document(&self, document: &Document) {
        if document.language_id != self.inner.config.language_id {
            return;
        }

        if !self.inner.collaborators.workspace.is_visible(&document.uri).await {
            debug!("Skipping {}: no editor shows it", document.uri);
            return;
        }

        if let Err(e) = self.open_in_session(document).await {
            error!("Error opening document {}: {}", document.uri, e);
        }
    }

    pub async fn did_change_active_document(&self, document: Option<&Document>) {
        if let Some(document) = document {
            self.did_open_document(document).await;
        }
    }

    /// Handle "toolchain installation changed" for `scope`.
    ///
    /// Notifications are serialized through one drain loop; a notification
    /// arriving while a drain is active is processed by that drain.
    pub fn on_install_changed(&self, scope: Scope) -> BoxFuture<'_, ()> {
        async move {
            info!("Install changed for {}", scope);
            self.inner
                .changes
                .submit(scope, |scope| self.process_install_change(scope))
                .await;
        }
        .boxed()
    }

    /// Drop every session whose root is no longer covered by an open
    /// workspace folder. Untitled sessions are not folder-bound and stay.
    pub async fn on_workspace_folders_removed(&self) -> usize {
        let mut removed = 0;
        for session in self.inner.registry.sessions().await {
            let root = session.root();
            if root.is_untitled()
                || self
                    .inner
                    .collaborators
                    .workspace
                    .containing_folder(root)
                    .await
                    .is_some()
            {
                continue;
            }

            let key = root.key();
            info!("Workspace folder removed, dropping session for {}", key);
            if let Some(entry) = self.inner.registry.remove_if(&key, session.id()).await {
                self.inner.versions.invalidate(&key);
                self.inner.active.clear_if(&key);
                self.inner.advisor.forget(root);
                let session = entry.detach();
                session.dispose().await;
                self.inner
                    .events
                    .publish(CoordinatorEvent::SessionRemoved(session));
                removed += 1;
            }
        }
        removed
    }

    /// Re-elaborate the focused document in the active session
    pub async fn restart_current_file(&self) -> CommandOutcome {
        let Some(session) = self.active_session().await.filter(|s| s.is_running()) else {
            return self.no_active_session().await;
        };

        let document = self
            .inner
            .collaborators
            .workspace
            .active_document()
            .await
            .filter(|doc| doc.language_id == self.inner.config.language_id);
        let Some(document) = document else {
            self.inner
                .collaborators
                .notifier
                .show_error(messages::NO_ACTIVE_DOCUMENT)
                .await;
            return CommandOutcome::NoActiveDocument;
        };

        self.command_result("restart file", session.restart_file(&document).await)
            .await
    }

    /// Same as [`restart_current_file`](Self::restart_current_file); a
    /// restart re-reads the file's dependencies.
    pub async fn refresh_file_dependencies(&self) -> CommandOutcome {
        self.restart_current_file().await
    }

    pub async fn restart_active_session(&self) -> CommandOutcome {
        let Some(session) = self.active_session().await else {
            return self.no_active_session().await;
        };

        let result = session.restart().await;
        if result.is_ok() {
            self.inner
                .registry
                .set_phase(&session.root().key(), session.id(), SessionPhase::Started)
                .await;
        }
        self.command_result("restart", result).await
    }

    pub async fn stop_active_session(&self) -> CommandOutcome {
        let Some(session) = self.active_session().await.filter(|s| s.is_started()) else {
            return self.no_active_session().await;
        };

        self.command_result("stop", session.stop().await).await
    }

    pub async fn sessions(&self) -> Vec<Arc<dyn WorkerSession>> {
        self.inner.registry.sessions().await
    }

    pub async fn session_for_root(&self, root: &Scope) -> Option<Arc<dyn WorkerSession>> {
        self.inner.registry.get(&root.key()).await
    }

    /// Session managing `document`, by most specific containing root
    pub async fn find_session(&self, document: &Scope) -> Option<Arc<dyn WorkerSession>> {
        let roots = self.inner.registry.roots().await;
        let root = FolderResolver::resolve(&roots, document)?;
        self.inner.registry.get(&root.key()).await
    }

    pub async fn active_session(&self) -> Option<Arc<dyn WorkerSession>> {
        let key = self.inner.active.current()?;
        self.inner.registry.get(&key).await
    }

    pub async fn phase_of(&self, root: &Scope) -> Option<SessionPhase> {
        self.inner.registry.phase(&root.key()).await
    }

    pub fn is_pending(&self, root: &Scope) -> bool {
        self.inner.registry.is_pending(&root.key())
    }

    /// Dispose every owned session and forget all state
    pub async fn shutdown(&self) {
        let entries = self.inner.registry.drain().await;
        info!("Shutting down, disposing {} sessions", entries.len());
        for entry in entries {
            entry.detach().dispose().await;
        }
        self.inner.versions.clear();
        self.inner.active.clear();
    }

    async fn find_project_root(&self, scope: &Scope) -> Result<Scope> {
        match scope {
            Scope::Untitled => Ok(Scope::Untitled),
            Scope::File(_) => {
                self.inner
                    .collaborators
                    .locator
                    .find_project_root(scope)
                    .await
            }
        }
    }

    async fn open_in_session(&self, document: &Document) -> Result<()> {
        let outcome = self.ensure_session(&document.uri, None).await?;
        let Some(session) = outcome.session else {
            return Ok(());
        };

        session.open_document(document).await?;
        self.inner.advisor.check(session.root()).await;
        Ok(())
    }

    async fn process_install_change(&self, scope: Scope) -> Result<()> {
        let root = self.find_project_root(&scope).await?;
        let key = root.key();
        self.inner.versions.invalidate(&key);

        debug!("Probing toolchain for {}", root);
        let version = self.inner.versions.probe_uncached(&root).await;
        if version.major() == Some(self.inner.config.managed_major_version.as_str()) {
            let outcome = self.ensure_session(&scope, Some(version)).await?;
            if let (true, Some(session)) = (outcome.already_present, outcome.session) {
                session.restart().await?;
                self.inner
                    .registry
                    .set_phase(&key, session.id(), SessionPhase::Started)
                    .await;
                info!("Restart complete for {}", root);
            }
        } else if let Some(probe_error) = version.error() {
            warn!("Toolchain for {} not ready: {}", root, probe_error);
        }
        Ok(())
    }

    /// Re-run the install-changed flow for every registered root
    async fn retrigger_all(&self) {
        for root in self.inner.registry.roots().await {
            self.on_install_changed(root).await;
        }
    }

    fn spawn_forwarder(
        &self,
        key: ProjectRootKey,
        session: Arc<dyn WorkerSession>,
        receiver: broadcast::Receiver<SessionEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let weak: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);
        EventAggregator::forward(receiver, move |event| {
            let weak = weak.clone();
            let key = key.clone();
            let session = Arc::clone(&session);
            async move {
                let Some(inner) = weak.upgrade() else {
                    return ForwardControl::Stop;
                };
                SessionCoordinator { inner }
                    .handle_session_event(key, session, event)
                    .await
            }
        })
    }

    async fn handle_session_event(
        &self,
        key: ProjectRootKey,
        session: Arc<dyn WorkerSession>,
        event: SessionEvent,
    ) -> ForwardControl {
        match event {
            SessionEvent::Progress { files } => {
                self.inner.events.publish(CoordinatorEvent::Progress {
                    root: session.root().clone(),
                    files,
                });
                ForwardControl::Continue
            }
            SessionEvent::Stopped { reason } => {
                let was_active = self.inner.active.is_active(&key);
                info!("Session for {} stopped: {}", key, reason);
                self.inner.events.publish(CoordinatorEvent::SessionStopped {
                    session,
                    was_active,
                    reason,
                });
                ForwardControl::Continue
            }
            SessionEvent::Failed { message } => {
                self.remove_failed(&key, session.id(), &message, true).await;
                ForwardControl::Stop
            }
        }
    }

    /// Fatal failure: forget the session, never restart it automatically.
    /// `from_forwarder` is set when running on the session's own forwarder
    /// task, which then ends by itself instead of being aborted.
    async fn remove_failed(
        &self,
        key: &ProjectRootKey,
        id: SessionId,
        message: &str,
        from_forwarder: bool,
    ) {
        let Some(mut entry) = self.inner.registry.remove_if(key, id).await else {
            debug!("Session {} for {} already removed", id, key);
            return;
        };
        info!("Session {} failed, removing session for {}", id, key);
        if from_forwarder {
            drop(entry.forwarder.take());
        }
        self.inner.active.clear_if(key);
        let session = entry.detach();
        session.dispose().await;
        self.inner
            .events
            .publish(CoordinatorEvent::SessionRemoved(session));
        self.inner.collaborators.notifier.show_error(message).await;
    }

    async fn no_active_session(&self) -> CommandOutcome {
        self.inner
            .collaborators
            .notifier
            .show_error(messages::NO_ACTIVE_SESSION)
            .await;
        CommandOutcome::NoActiveSession
    }

    async fn command_result(&self, command: &str, result: Result<()>) -> CommandOutcome {
        match result {
            Ok(()) => CommandOutcome::Executed,
            Err(e) => {
                error!("Command '{}' failed: {}", command, e);
                self.inner
                    .collaborators
                    .notifier
                    .show_error(&e.to_string())
                    .await;
                CommandOutcome::Failed(e.to_string())
            }
        }
    }
}
