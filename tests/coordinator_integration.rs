//! End-to-end coordinator scenarios against the public API.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wsc::testing::MockEnvironment;
use wsc::{
    Collaborators, CoordinatorConfig, CoordinatorEvent, Document, ProjectLocator, Result, Scope,
    SessionCoordinator,
};

const PROJECT_MARKER: &str = "lakefile.lean";

/// Locator walking up from a file to the nearest directory with a project marker
struct MarkerLocator;

#[async_trait]
impl ProjectLocator for MarkerLocator {
    async fn find_project_root(&self, scope: &Scope) -> Result<Scope> {
        let Some(path) = scope.path() else {
            return Ok(Scope::Untitled);
        };
        let root = path
            .ancestors()
            .skip(1)
            .find(|dir| dir.join(PROJECT_MARKER).is_file())
            .or_else(|| path.parent())
            .map(Path::to_path_buf)
            .ok_or_else(|| wsc::CoordinatorError::ProjectRoot {
                path: path.to_path_buf(),
                reason: "no parent".to_string(),
            })?;
        Ok(Scope::File(root))
    }

    async fn is_valid_project_layout(&self, root: &Path) -> bool {
        root.join(PROJECT_MARKER).is_file()
    }

    async fn find_ancestor_project_layout(&self, root: &Path) -> Option<PathBuf> {
        root.ancestors()
            .skip(1)
            .find(|dir| dir.join(PROJECT_MARKER).is_file())
            .map(Path::to_path_buf)
    }
}

fn project(dir: &Path, name: &str) -> PathBuf {
    let root = dir.join(name);
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join(PROJECT_MARKER), "").unwrap();
    root
}

fn coordinator_on_disk(env: &MockEnvironment) -> SessionCoordinator {
    let collaborators = Collaborators {
        locator: Arc::new(MarkerLocator),
        ..env.collaborators()
    };
    SessionCoordinator::new(CoordinatorConfig::default(), collaborators)
}

#[tokio::test]
async fn test_multi_project_workspace_routing() {
    let temp = TempDir::new().unwrap();
    let alpha = project(temp.path(), "alpha");
    let beta = project(temp.path(), "beta");
    let env = MockEnvironment::new();
    env.workspace.add_folder(temp.path());
    let coordinator = coordinator_on_disk(&env);
    let mut events = coordinator.subscribe();

    for file in [
        alpha.join("src/A.lean"),
        alpha.join("src/deep/B.lean"),
        beta.join("Main.lean"),
    ] {
        coordinator
            .did_open_document(&Document::new(Scope::file(file), "lean4"))
            .await;
    }

    assert_eq!(coordinator.sessions().await.len(), 2);
    let alpha_session = coordinator
        .find_session(&Scope::file(alpha.join("src/Other.lean")))
        .await
        .unwrap();
    assert_eq!(alpha_session.root(), &Scope::file(&alpha));
    assert_eq!(
        coordinator.active_session().await.unwrap().root(),
        &Scope::file(&beta)
    );

    let mut added = Vec::new();
    while let Some(event) = events.try_next_event() {
        if let CoordinatorEvent::SessionAdded(session) = event {
            added.push(session.root().clone());
        }
    }
    assert_eq!(added, vec![Scope::file(&alpha), Scope::file(&beta)]);
    assert!(env.notifier.warnings().is_empty());

    coordinator.shutdown().await;
    assert!(env.factory.created().iter().all(|s| s.is_disposed()));
}

#[tokio::test]
async fn test_layout_advisories() {
    let temp = TempDir::new().unwrap();
    let alpha = project(temp.path(), "alpha");
    let scratch = alpha.join("scratch");
    fs::create_dir_all(&scratch).unwrap();
    let env = MockEnvironment::new();
    env.workspace.add_folder(&scratch);
    let coordinator = coordinator_on_disk(&env);

    // The nearest project of a file in a plain subfolder is the enclosing project.
    coordinator
        .did_open_document(&Document::new(Scope::file(scratch.join("T.lean")), "lean4"))
        .await;
    assert!(env.notifier.warnings().is_empty());
    assert!(coordinator.session_for_root(&Scope::file(&alpha)).await.is_some());

    // Unsaved documents run in single file mode, reported once.
    let untitled = Document::new(Scope::Untitled, "lean4");
    coordinator.did_open_document(&untitled).await;
    coordinator.did_open_document(&untitled).await;
    assert_eq!(env.notifier.warnings().len(), 1);
    assert!(coordinator.session_for_root(&Scope::Untitled).await.is_some());
}

#[tokio::test]
async fn test_folder_removal_then_reopen() {
    let temp = TempDir::new().unwrap();
    let alpha = project(temp.path(), "alpha");
    let env = MockEnvironment::new();
    env.workspace.add_folder(&alpha);
    let coordinator = coordinator_on_disk(&env);
    let document = Document::new(Scope::file(alpha.join("Main.lean")), "lean4");

    coordinator.did_open_document(&document).await;
    let first = coordinator.find_session(&document.uri).await.unwrap();

    env.workspace.remove_folder(&alpha);
    assert_eq!(coordinator.on_workspace_folders_removed().await, 1);
    assert!(coordinator.find_session(&document.uri).await.is_none());

    env.workspace.add_folder(&alpha);
    coordinator.did_open_document(&document).await;
    let second = coordinator.find_session(&document.uri).await.unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(env.installer.probe_count(), 2);
}

#[tokio::test]
async fn test_crash_reported_to_subscribers() {
    let env = MockEnvironment::new().with_project("/work/alpha");
    let coordinator = env.coordinator(CoordinatorConfig::default());
    coordinator
        .did_open_document(&Document::new(Scope::file("/work/alpha/A.lean"), "lean4"))
        .await;
    let mut events = coordinator.subscribe();

    env.factory
        .last_for(&Scope::file("/work/alpha"))
        .unwrap()
        .report_failed("server crashed");

    let event = tokio::time::timeout(Duration::from_secs(2), events.next_event())
        .await
        .expect("no event")
        .unwrap()
        .unwrap();
    assert!(matches!(event, CoordinatorEvent::SessionRemoved(_)));
    assert!(coordinator.sessions().await.is_empty());
    assert_eq!(env.notifier.errors(), vec!["server crashed".to_string()]);
}
