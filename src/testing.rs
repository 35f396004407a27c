//! In-memory collaborators.
//!
//! Drive a [`SessionCoordinator`] without an editor, a toolchain or worker
//! processes. Every collaborator records what it was asked to do.

use crate::coordinator::{Collaborators, CoordinatorConfig, SessionCoordinator};
use crate::error::{CoordinatorError, Result};
use crate::scope::{Document, ProjectRootKey, Scope};
use crate::session::*;
use crate::toolchain::{ToolchainInstaller, VersionInfo};
use crate::workspace::{ProjectLocator, UserNotifier, WorkspaceView};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Session that records lifecycle calls and emits events on demand
pub struct MockSession {
    spec: SessionSpec,
    events: broadcast::Sender<SessionEvent>,
    running: AtomicBool,
    started: AtomicBool,
    disposed: AtomicBool,
    fail_start: bool,
    start_delay: Option<Duration>,
    start_crash: Option<String>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    restarts: AtomicUsize,
    restarted_files: Mutex<Vec<Document>>,
    opened: Mutex<Vec<Document>>,
}

/// Factory producing [`MockSession`]s
#[derive(Default)]
pub struct MockSessionFactory {
    created: Mutex<Vec<Arc<MockSession>>>,
    delay: Mutex<Option<Duration>>,
    fail_create: AtomicBool,
    fail_start: AtomicBool,
    start_delay: Mutex<Option<Duration>>,
    start_crash: Mutex<Option<String>>,
}

/// Installer answering probes from a per-root table
pub struct MockInstaller {
    versions: Mutex<HashMap<ProjectRootKey, VersionInfo>>,
    fallback: Mutex<VersionInfo>,
    after_install: Mutex<Option<VersionInfo>>,
    default_toolchain: Mutex<Option<String>>,
    probe_delay: Mutex<Option<Duration>>,
    probes: AtomicUsize,
    installs: AtomicUsize,
    install_prompts: AtomicUsize,
}

/// Locator resolving files to the deepest registered package root
#[derive(Default)]
pub struct MockLocator {
    packages: Mutex<Vec<PathBuf>>,
    valid: Mutex<HashSet<PathBuf>>,
}

/// Workspace with explicit folders, hidden documents and a focused document
#[derive(Default)]
pub struct MockWorkspace {
    folders: Mutex<Vec<PathBuf>>,
    hidden: Mutex<HashSet<Scope>>,
    visible: Mutex<Vec<Document>>,
    active: Mutex<Option<Document>>,
}

/// Notifier recording every message
#[derive(Default)]
pub struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
    warnings: Mutex<Vec<String>>,
    action_answer: Mutex<Option<String>>,
    opened_folders: Mutex<Vec<PathBuf>>,
}

/// One of each collaborator, shared with the coordinator built from it
#[derive(Clone)]
pub struct MockEnvironment {
    pub locator: Arc<MockLocator>,
    pub installer: Arc<MockInstaller>,
    pub workspace: Arc<MockWorkspace>,
    pub notifier: Arc<RecordingNotifier>,
    pub factory: Arc<MockSessionFactory>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockSession {
    pub fn new(spec: SessionSpec, fail_start: bool) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            spec,
            events,
            running: AtomicBool::new(false),
            started: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            fail_start,
            start_delay: None,
            start_crash: None,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            restarts: AtomicUsize::new(0),
            restarted_files: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Take `delay` to start
    pub fn with_start_delay(mut self, delay: Option<Duration>) -> Self {
        self.start_delay = delay;
        self
    }

    /// Report `Failed { message }` from inside `start`, then fail it
    pub fn with_start_crash(mut self, message: Option<String>) -> Self {
        self.start_crash = message;
        self
    }

    pub fn spec(&self) -> &SessionSpec {
        &self.spec
    }

    /// Emit a lifecycle event to subscribers
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Stop the worker and report it
    pub fn report_stopped(&self, reason: StopReason) {
        self.running.store(false, Ordering::SeqCst);
        self.emit(SessionEvent::Stopped { reason });
    }

    pub fn report_failed(&self, message: impl Into<String>) {
        self.running.store(false, Ordering::SeqCst);
        self.emit(SessionEvent::Failed {
            message: message.into(),
        });
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn restart_count(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn restarted_files(&self) -> Vec<Document> {
        lock(&self.restarted_files).clone()
    }

    pub fn opened_documents(&self) -> Vec<Document> {
        lock(&self.opened).clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerSession for MockSession {
    fn id(&self) -> SessionId {
        self.spec.id
    }

    fn root(&self) -> &Scope {
        &self.spec.root
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.spec.created_at
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.start_crash {
            self.report_failed(message.clone());
            // Let the forwarder see the event before start returns.
            tokio::time::sleep(Duration::from_millis(20)).await;
            return Err(CoordinatorError::Session(message.clone()));
        }
        if self.fail_start {
            return Err(CoordinatorError::Session("worker exited during start".to_string()));
        }
        self.started.store(true, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.report_stopped(StopReason::new("stopped by user"));
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn restart_file(&self, document: &Document) -> Result<()> {
        lock(&self.restarted_files).push(document.clone());
        Ok(())
    }

    async fn open_document(&self, document: &Document) -> Result<()> {
        lock(&self.opened).push(document.clone());
        Ok(())
    }

    async fn dispose(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.disposed.store(true, Ordering::SeqCst);
    }
}

impl MockSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every construction, widening creation race windows
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    /// Make construction itself fail
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make sessions created from now on fail to start
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Make sessions created from now on take `delay` to start
    pub fn set_start_delay(&self, delay: Duration) {
        *lock(&self.start_delay) = Some(delay);
    }

    /// Make sessions created from now on crash while starting
    pub fn set_start_crash(&self, message: impl Into<String>) {
        *lock(&self.start_crash) = Some(message.into());
    }

    pub fn created(&self) -> Vec<Arc<MockSession>> {
        lock(&self.created).clone()
    }

    pub fn created_for(&self, root: &Scope) -> Vec<Arc<MockSession>> {
        self.created()
            .into_iter()
            .filter(|session| session.root() == root)
            .collect()
    }

    /// Most recently created session for `root`
    pub fn last_for(&self, root: &Scope) -> Option<Arc<MockSession>> {
        self.created_for(root).pop()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn create(&self, spec: SessionSpec) -> Result<Arc<dyn WorkerSession>> {
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(CoordinatorError::SessionCreation {
                root: spec.root.to_string(),
                reason: "worker binary missing".to_string(),
            });
        }
        let session = Arc::new(
            MockSession::new(spec, self.fail_start.load(Ordering::SeqCst))
                .with_start_delay(*lock(&self.start_delay))
                .with_start_crash(lock(&self.start_crash).clone()),
        );
        lock(&self.created).push(Arc::clone(&session));
        Ok(session)
    }
}

impl MockInstaller {
    /// Installer reporting `version` for every root without an explicit entry
    pub fn new(version: VersionInfo) -> Self {
        Self {
            versions: Mutex::new(HashMap::new()),
            fallback: Mutex::new(version),
            after_install: Mutex::new(None),
            default_toolchain: Mutex::new(None),
            probe_delay: Mutex::new(None),
            probes: AtomicUsize::new(0),
            installs: AtomicUsize::new(0),
            install_prompts: AtomicUsize::new(0),
        }
    }

    pub fn set_version(&self, root: &Scope, version: VersionInfo) {
        lock(&self.versions).insert(root.key(), version);
    }

    pub fn set_fallback(&self, version: VersionInfo) {
        *lock(&self.fallback) = version;
    }

    /// Version every probe reports once `install_toolchain` ran
    pub fn set_after_install(&self, version: VersionInfo) {
        *lock(&self.after_install) = Some(version);
    }

    pub fn set_default_toolchain(&self, name: impl Into<String>) {
        *lock(&self.default_toolchain) = Some(name.into());
    }

    pub fn set_probe_delay(&self, delay: Duration) {
        *lock(&self.probe_delay) = Some(delay);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn install_prompt_count(&self) -> usize {
        self.install_prompts.load(Ordering::SeqCst)
    }
}

impl Default for MockInstaller {
    fn default() -> Self {
        Self::new(VersionInfo::detected("4"))
    }
}

#[async_trait]
impl ToolchainInstaller for MockInstaller {
    async fn probe_version(&self, root: &Scope) -> VersionInfo {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.probe_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.install_count() > 0
            && let Some(version) = lock(&self.after_install).clone()
        {
            return version;
        }
        lock(&self.versions)
            .get(&root.key())
            .cloned()
            .unwrap_or_else(|| lock(&self.fallback).clone())
    }

    async fn default_toolchain(&self, _root: &Scope) -> Option<String> {
        lock(&self.default_toolchain).clone()
    }

    async fn install_toolchain(&self) -> Result<()> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn show_install_options(&self, _scope: &Scope) -> Result<()> {
        self.install_prompts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MockLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package root. Files below it resolve to it.
    pub fn add_package(&self, root: impl Into<PathBuf>) {
        lock(&self.packages).push(root.into());
    }

    /// Mark `root` as having a valid project layout
    pub fn mark_valid(&self, root: impl Into<PathBuf>) {
        lock(&self.valid).insert(root.into());
    }
}

#[async_trait]
impl ProjectLocator for MockLocator {
    async fn find_project_root(&self, scope: &Scope) -> Result<Scope> {
        let Some(path) = scope.path() else {
            return Ok(Scope::Untitled);
        };
        let packages = lock(&self.packages);
        if let Some(root) = packages
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.as_os_str().len())
        {
            return Ok(Scope::File(root.clone()));
        }
        match path.parent() {
            Some(parent) => Ok(Scope::File(parent.to_path_buf())),
            None => Err(CoordinatorError::ProjectRoot {
                path: path.to_path_buf(),
                reason: "path has no parent directory".to_string(),
            }),
        }
    }

    async fn is_valid_project_layout(&self, root: &Path) -> bool {
        lock(&self.valid).contains(root)
    }

    async fn find_ancestor_project_layout(&self, root: &Path) -> Option<PathBuf> {
        let valid = lock(&self.valid);
        root.ancestors()
            .skip(1)
            .find(|ancestor| valid.contains(*ancestor))
            .map(Path::to_path_buf)
    }
}

impl MockWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&self, folder: impl Into<PathBuf>) {
        lock(&self.folders).push(folder.into());
    }

    pub fn remove_folder(&self, folder: &Path) {
        lock(&self.folders).retain(|f| f != folder);
    }

    /// Treat `uri` as opened without an editor
    pub fn hide(&self, uri: Scope) {
        lock(&self.hidden).insert(uri);
    }

    pub fn show(&self, document: Document) {
        lock(&self.visible).push(document);
    }

    pub fn set_active(&self, document: Option<Document>) {
        *lock(&self.active) = document;
    }
}

#[async_trait]
impl WorkspaceView for MockWorkspace {
    async fn containing_folder(&self, scope: &Scope) -> Option<PathBuf> {
        let path = scope.path()?;
        lock(&self.folders)
            .iter()
            .find(|folder| path.starts_with(folder))
            .cloned()
    }

    async fn is_visible(&self, uri: &Scope) -> bool {
        !lock(&self.hidden).contains(uri)
    }

    async fn active_document(&self) -> Option<Document> {
        lock(&self.active).clone()
    }

    async fn visible_documents(&self) -> Vec<Document> {
        lock(&self.visible).clone()
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer future action prompts with `answer`
    pub fn answer_actions_with(&self, answer: Option<&str>) {
        *lock(&self.action_answer) = answer.map(str::to_string);
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }

    pub fn opened_folders(&self) -> Vec<PathBuf> {
        lock(&self.opened_folders).clone()
    }
}

#[async_trait]
impl UserNotifier for RecordingNotifier {
    async fn show_error(&self, message: &str) {
        lock(&self.errors).push(message.to_string());
    }

    async fn show_warning(&self, message: &str) {
        lock(&self.warnings).push(message.to_string());
    }

    async fn show_warning_with_action(&self, message: &str, _action: &str) -> Option<String> {
        lock(&self.warnings).push(message.to_string());
        lock(&self.action_answer).clone()
    }

    async fn open_folder(&self, folder: &Path) -> Result<()> {
        lock(&self.opened_folders).push(folder.to_path_buf());
        Ok(())
    }
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            locator: Arc::new(MockLocator::new()),
            installer: Arc::new(MockInstaller::default()),
            workspace: Arc::new(MockWorkspace::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            factory: Arc::new(MockSessionFactory::new()),
        }
    }

    /// Register `root` as a package inside an open workspace folder
    pub fn with_project(self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.locator.add_package(root.clone());
        self.locator.mark_valid(root.clone());
        self.workspace.add_folder(root);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            locator: self.locator.clone(),
            installer: self.installer.clone(),
            workspace: self.workspace.clone(),
            notifier: self.notifier.clone(),
            factory: self.factory.clone(),
        }
    }

    pub fn coordinator(&self, config: CoordinatorConfig) -> SessionCoordinator {
        SessionCoordinator::new(config, self.collaborators())
    }
}

impl Default for MockEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
