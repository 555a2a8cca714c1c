//! Tests for runtime spawners and snapshots

use std::time::Duration;

use futures::FutureExt;
use prometheus_work_hub::core::{AsyncWork, Spawn, WorkPhase};
use prometheus_work_hub::runtime::{HubSnapshot, ThreadSpawner, TokioSpawner, WorkSnapshot};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_spawner_spawn() {
    let spawner = TokioSpawner::new(tokio::runtime::Handle::current());

    let (tx, rx) = tokio::sync::oneshot::channel();
    spawner.spawn(
        async move {
            tx.send(123).unwrap();
        }
        .boxed(),
    );

    let result = rx.await.expect("oneshot result");
    assert_eq!(result, 123);
}

#[test]
fn test_owned_tokio_runtime_stays_alive() {
    let spawner = TokioSpawner::with_worker_threads(1).unwrap();
    let (tx, rx) = flume::bounded(1);
    spawner.spawn(
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tx.send(7).unwrap();
        }
        .boxed(),
    );
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(7));
}

#[test]
fn test_thread_spawner_runs_on_named_thread() {
    let spawner = ThreadSpawner::new().with_name("runtime-test");
    let (tx, rx) = flume::bounded(1);
    spawner.spawn(
        async move {
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        }
        .boxed(),
    );
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5)),
        Ok(Some("runtime-test".to_string()))
    );
}

#[test]
fn test_work_snapshot_serializes() {
    let work = AsyncWork::completed("snap", 3u32);
    let snapshot = work.snapshot();
    assert_eq!(snapshot.phase, WorkPhase::Done);
    assert_eq!(snapshot.key, "snap");
    assert!(snapshot.error.is_none());

    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains(r#""phase":"done""#));
    let back: WorkSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}

#[test]
fn test_hub_snapshot_roundtrip() {
    let snapshot = HubSnapshot {
        concurrency: 3,
        waitings: 1,
        workings: 3,
        active: true,
        interval_ms: 250,
        retry_ledger: 0,
        taken_at_ms: 1,
    };
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: HubSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snapshot);
}
