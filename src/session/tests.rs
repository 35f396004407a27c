use crate::scope::Scope;
use crate::session::*;
use crate::testing::MockSession;
use std::sync::Arc;

fn mock_session(root: &str) -> Arc<dyn WorkerSession> {
    Arc::new(MockSession::new(
        SessionSpec::new(Scope::file(root), None),
        false,
    ))
}

async fn wait_finished(handle: &tokio::task::AbortHandle) {
    tokio::time::timeout(std::time::Duration::from_secs(1), async {
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("forwarder was not aborted");
}

#[test]
fn test_pending_guard_clears_on_drop() {
    let set = PendingSet::new();
    let key = Scope::file("/ws/a").key();

    let guard = set.try_mark(&key).expect("first mark succeeds");
    assert_eq!(guard.key(), &key);
    assert!(set.contains(&key));
    assert!(set.try_mark(&key).is_none());

    drop(guard);
    assert!(!set.contains(&key));
    assert!(set.is_empty());
    assert!(set.try_mark(&key).is_some());
}

#[test]
fn test_pending_keys_are_independent() {
    let set = PendingSet::new();
    let _a = set.try_mark(&Scope::file("/ws/a").key()).unwrap();
    let _b = set.try_mark(&Scope::file("/ws/b").key()).unwrap();
    let _untitled = set.try_mark(&Scope::Untitled.key()).unwrap();
    assert_eq!(set.len(), 3);
}

#[tokio::test]
async fn test_reserve_lifecycle() {
    let registry = SessionRegistry::new();
    let key = Scope::file("/ws/a").key();

    let guard = match registry.reserve(&key).await {
        Reservation::Reserved(guard) => guard,
        _ => panic!("expected a reservation"),
    };
    assert!(registry.is_pending(&key));
    assert!(matches!(registry.reserve(&key).await, Reservation::Pending));

    let session = mock_session("/ws/a");
    registry.insert(key.clone(), Arc::clone(&session)).await;
    drop(guard);
    assert!(!registry.is_pending(&key));

    match registry.reserve(&key).await {
        Reservation::Existing(existing) => assert!(Arc::ptr_eq(&existing, &session)),
        _ => panic!("expected the registered session"),
    }
    assert_eq!(registry.phase(&key).await, Some(SessionPhase::Constructing));
}

#[tokio::test]
async fn test_remove_if_ignores_replaced_session() {
    let registry = SessionRegistry::new();
    let key = Scope::file("/ws/a").key();
    let old = mock_session("/ws/a");
    let new = mock_session("/ws/a");

    registry.insert(key.clone(), Arc::clone(&old)).await;
    registry.insert(key.clone(), Arc::clone(&new)).await;

    assert!(registry.remove_if(&key, old.id()).await.is_none());
    assert!(!registry.set_phase(&key, old.id(), SessionPhase::Started).await);
    assert!(registry.set_phase(&key, new.id(), SessionPhase::Started).await);
    assert_eq!(registry.phase(&key).await, Some(SessionPhase::Started));

    let entry = registry.remove_if(&key, new.id()).await.unwrap();
    assert!(Arc::ptr_eq(&entry.detach(), &new));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_forwarder_of_removed_session_is_aborted() {
    let registry = SessionRegistry::new();
    let key = Scope::file("/ws/a").key();
    let session = mock_session("/ws/a");
    registry.insert(key.clone(), Arc::clone(&session)).await;
    registry.remove(&key).await;

    let forwarder = tokio::spawn(std::future::pending::<()>());
    let probe = forwarder.abort_handle();
    assert!(!registry.attach_forwarder(&key, session.id(), forwarder).await);
    wait_finished(&probe).await;
}

#[tokio::test]
async fn test_detach_aborts_forwarder() {
    let registry = SessionRegistry::new();
    let key = Scope::file("/ws/a").key();
    let session = mock_session("/ws/a");
    registry.insert(key.clone(), Arc::clone(&session)).await;

    let forwarder = tokio::spawn(std::future::pending::<()>());
    let probe = forwarder.abort_handle();
    assert!(registry.attach_forwarder(&key, session.id(), forwarder).await);

    let entries = registry.drain().await;
    assert_eq!(entries.len(), 1);
    for entry in entries {
        entry.detach();
    }
    wait_finished(&probe).await;
}

#[tokio::test]
async fn test_roots_and_sessions() {
    let registry = SessionRegistry::new();
    registry
        .insert(Scope::file("/ws/a").key(), mock_session("/ws/a"))
        .await;
    registry
        .insert(Scope::file("/ws/b").key(), mock_session("/ws/b"))
        .await;

    let mut roots = registry.roots().await;
    roots.sort_by_key(|root| root.to_string());
    assert_eq!(roots, vec![Scope::file("/ws/a"), Scope::file("/ws/b")]);
    assert_eq!(registry.sessions().await.len(), 2);
    assert_eq!(registry.len().await, 2);
}

#[test]
fn test_stop_reason_display() {
    assert_eq!(StopReason::new("worker exited").to_string(), "worker exited");
    assert_eq!(
        StopReason::new("worker exited")
            .with_detail("signal 9")
            .to_string(),
        "worker exited (signal 9)"
    );
}
