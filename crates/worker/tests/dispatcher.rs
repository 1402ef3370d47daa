mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeProvider, Harness, harness, pending_analysis, reload};
use storage::models::AnalysisStatus;
use storage::repository::{AnalysisRepository, JobQueue};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use worker::{Dispatcher, DispatcherConfig};

fn provider() -> FakeProvider {
    FakeProvider::new()
        .with_opponents("hikaru", &["a", "b"])
        .with_opponents("magnus", &["a"])
        .with_rating("hikaru", 1500)
        .with_rating("magnus", 1800)
        .with_rating("a", 1600)
        .with_rating("b", 1400)
}

fn dispatcher(h: &Harness) -> Arc<Dispatcher> {
    dispatcher_with_lease(h, Duration::from_secs(60))
}

fn dispatcher_with_lease(h: &Harness, lease: Duration) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        h.store.clone(),
        h.store.clone(),
        h.orchestrator.clone(),
        DispatcherConfig {
            worker_id: "test-worker".to_string(),
            concurrency: 2,
            poll_interval: Duration::from_millis(10),
            lease,
        },
    ))
}

async fn wait_for_terminal(h: &Harness, analysis_id: Uuid) -> AnalysisStatus {
    let mut status = AnalysisStatus::Pending;
    for _ in 0..500 {
        status = reload(&h.store, analysis_id).await.status;
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    status
}

#[tokio::test]
async fn drain_processes_and_acks_queued_analyses() {
    let h = harness(provider());
    let first = pending_analysis(&h.store, "hikaru").await;
    let second = pending_analysis(&h.store, "magnus").await;
    h.store.enqueue(first.analysis_id).await.unwrap();
    h.store.enqueue(second.analysis_id).await.unwrap();

    let handled = dispatcher(&h).drain().await.unwrap();

    assert_eq!(handled, 2);
    assert_eq!(h.store.queued(), 0);
    for id in [first.analysis_id, second.analysis_id] {
        assert_eq!(reload(&h.store, id).await.status, AnalysisStatus::Completed);
    }
}

#[tokio::test]
async fn redelivered_processing_analysis_is_failed_as_interrupted() {
    let h = harness(provider());
    let analysis = pending_analysis(&h.store, "hikaru").await;
    h.store.begin_processing(analysis.analysis_id).await.unwrap();
    h.store.enqueue(analysis.analysis_id).await.unwrap();

    dispatcher(&h).drain().await.unwrap();

    let stored = reload(&h.store, analysis.analysis_id).await;
    assert_eq!(stored.status, AnalysisStatus::Failed);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("analysis processing was interrupted before completion")
    );
    assert!(h.store.opponents(analysis.analysis_id).await.unwrap().is_empty());
    assert_eq!(h.store.queued(), 0);
    assert_eq!(h.provider.resolve_calls(), 0);
}

#[tokio::test]
async fn terminal_and_missing_analyses_are_just_acked() {
    let h = harness(provider());
    let analysis = pending_analysis(&h.store, "hikaru").await;
    h.orchestrator.run(analysis.analysis_id).await.unwrap();
    h.store.enqueue(analysis.analysis_id).await.unwrap();
    h.store.enqueue(Uuid::new_v4()).await.unwrap();

    let handled = dispatcher(&h).drain().await.unwrap();

    assert_eq!(handled, 2);
    assert_eq!(h.store.queued(), 0);
    assert_eq!(h.provider.resolve_calls(), 1);
}

#[tokio::test]
async fn run_loop_processes_until_cancelled() {
    let h = harness(provider());
    let cancel = CancellationToken::new();
    let task = tokio::spawn(dispatcher(&h).run(cancel.clone()));

    let analysis = pending_analysis(&h.store, "magnus").await;
    h.store.enqueue(analysis.analysis_id).await.unwrap();

    assert_eq!(
        wait_for_terminal(&h, analysis.analysis_id).await,
        AnalysisStatus::Completed
    );

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("dispatcher should stop after cancellation")
        .unwrap();
    assert_eq!(h.store.queued(), 0);
}

#[tokio::test]
async fn analysis_outliving_one_lease_still_completes() {
    let opponents: Vec<String> = (0..10).map(|i| format!("opponent{i}")).collect();
    let names: Vec<&str> = opponents.iter().map(String::as_str).collect();
    let mut provider = FakeProvider::new()
        .with_opponents("hikaru", &names)
        .with_rating("hikaru", 1500)
        .with_fetch_delay(Duration::from_millis(30));
    for (i, name) in names.iter().enumerate() {
        provider = provider.with_rating(name, 1400 + i as i32 * 20);
    }
    let h = harness(provider);

    let cancel = CancellationToken::new();
    let task = tokio::spawn(dispatcher_with_lease(&h, Duration::from_millis(100)).run(cancel.clone()));

    let analysis = pending_analysis(&h.store, "hikaru").await;
    h.store.enqueue(analysis.analysis_id).await.unwrap();

    let status = wait_for_terminal(&h, analysis.analysis_id).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("dispatcher should stop after cancellation")
        .unwrap();

    let stored = reload(&h.store, analysis.analysis_id).await;
    assert_eq!(status, AnalysisStatus::Completed, "{:?}", stored.error_message);
    assert_eq!(stored.total_opponents, Some(10));
    assert_eq!(h.provider.resolve_calls(), 1);
    assert_eq!(h.store.queued(), 0);
}
