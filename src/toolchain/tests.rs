use crate::scope::Scope;
use crate::testing::{MockInstaller, RecordingNotifier};
use crate::toolchain::*;
use std::sync::Arc;
use test_tag::tag;

fn cache_with(installer: &Arc<MockInstaller>, prompt: bool) -> (VersionCache, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let cache = VersionCache::new(installer.clone(), notifier.clone(), prompt);
    (cache, notifier)
}

#[test]
fn test_parse_version_output() {
    let version =
        parse_version_output("Lean (version 4.9.0, x86_64-unknown-linux-gnu, commit 8f9843a4a5fe, Release)")
            .unwrap();
    assert_eq!(version.major, "4");
    assert_eq!(version.full.as_deref(), Some("4.9.0"));

    let nightly = parse_version_output("Lean (version 4.10.0-nightly-2024-06-01, Release)").unwrap();
    assert_eq!(nightly.full.as_deref(), Some("4.10.0-nightly-2024-06-01"));

    let bare = parse_version_output("v3.51.1\n").unwrap();
    assert_eq!(bare.major, "3");

    assert!(parse_version_output("command not found").is_none());
}

#[test]
fn test_version_info_majors() {
    let four = VersionInfo::detected("4");
    assert!(four.is_ok());
    assert!(!four.is_other_major("4"));
    assert!(VersionInfo::detected("3").is_other_major("4"));

    let missing = VersionInfo::failed(ProbeError::ToolNotFound);
    assert!(!missing.is_ok());
    assert!(!missing.is_other_major("4"));
    assert!(missing.error().unwrap().is_not_installed());
    assert!(!ProbeError::Other("boom".to_string()).is_not_installed());
}

#[test]
fn test_version_info_serializes_with_status_tag() {
    let json = serde_json::to_value(VersionInfo::detected("4")).unwrap();
    assert_eq!(json["status"], "detected");
    assert_eq!(json["major"], "4");

    let json = serde_json::to_value(VersionInfo::failed(ProbeError::PackageManagerMissing)).unwrap();
    assert_eq!(json["status"], "failed");
}

#[tokio::test]
async fn test_cache_hit_does_not_probe() {
    let installer = Arc::new(MockInstaller::default());
    let (cache, _) = cache_with(&installer, true);
    let root = Scope::file("/ws/a");

    let first = cache.get_version(&root).await;
    let second = cache.get_version(&root).await;

    assert_eq!(first.info, second.info);
    assert!(!second.installed);
    assert_eq!(installer.probe_count(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_invalidate_forces_new_probe() {
    let installer = Arc::new(MockInstaller::default());
    let (cache, _) = cache_with(&installer, true);
    let root = Scope::file("/ws/a");

    cache.get_version(&root).await;
    installer.set_version(&root, VersionInfo::detected("5"));
    assert_eq!(cache.get_version(&root).await.info, VersionInfo::detected("4"));

    assert!(cache.invalidate(&root.key()).is_some());
    assert_eq!(cache.get_version(&root).await.info, VersionInfo::detected("5"));
    assert_eq!(installer.probe_count(), 2);
}

#[tokio::test]
async fn test_missing_toolchain_prompts_user() {
    let installer = Arc::new(MockInstaller::new(VersionInfo::failed(
        ProbeError::PackageManagerMissing,
    )));
    let (cache, notifier) = cache_with(&installer, true);

    let lookup = cache.get_version(&Scope::file("/ws/a")).await;

    assert!(!lookup.installed);
    assert!(!lookup.info.is_ok());
    assert_eq!(installer.install_prompt_count(), 1);
    assert_eq!(installer.install_count(), 0);
    assert!(notifier.errors().is_empty());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_missing_toolchain_installs_unattended() {
    let installer = Arc::new(MockInstaller::new(VersionInfo::failed(
        ProbeError::ToolNotFound,
    )));
    installer.set_after_install(VersionInfo::detected("4"));
    let (cache, _) = cache_with(&installer, false);
    let root = Scope::file("/ws/a");

    let lookup = cache.get_version(&root).await;

    assert!(lookup.installed);
    assert_eq!(lookup.info, VersionInfo::detected("4"));
    assert_eq!(installer.install_count(), 1);
    assert_eq!(installer.probe_count(), 2);
    assert_eq!(cache.cached(&root), Some(VersionInfo::detected("4")));
}

#[tokio::test]
async fn test_probe_uncached_leaves_memo_alone() {
    let installer = Arc::new(MockInstaller::default());
    let (cache, _) = cache_with(&installer, true);
    let root = Scope::file("/ws/a");

    cache.probe_uncached(&root).await;
    assert!(cache.cached(&root).is_none());
    cache.get_version(&root).await;
    cache.clear();
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_command_probe_missing_program() {
    let probe = CommandVersionProbe::new(ProbeConfig {
        program: "wsc-definitely-missing-toolchain".to_string(),
        ..ProbeConfig::default()
    });

    let info = probe.probe(&Scope::file("/tmp")).await;
    assert!(info.error().unwrap().is_not_installed());
}

// NOTE: Tests tagged with #[tag(toolchain)] require a `lean` toolchain on PATH.
// These tests are excluded from CI via the pattern `--skip "::toolchain::test"`
#[tokio::test]
#[tag(toolchain)]
async fn test_command_probe_real_toolchain() {
    let probe = CommandVersionProbe::new(ProbeConfig::default());
    let dir = tempfile::tempdir().unwrap();

    let info = probe.probe(&Scope::file(dir.path())).await;
    assert!(info.is_ok(), "probe failed: {}", info);
}
