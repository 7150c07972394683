mod common;

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use common::{independent, linear, FakeExecutor};
use conductor_core::api::{
    CheckpointStore, ExecutorError, FileCheckpointStore, InMemoryCheckpointStore, NodeStatus,
    RunOptions, RunState, RunStatus, SchedulerEngine,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const SESSION: &str = "default";

/// Persisted state for A -> B -> C -> D as left by an earlier run.
fn persisted(run_id: &str, statuses: &[(&str, NodeStatus)]) -> RunState {
    let mut state = RunState::new(run_id, SESSION);
    state.register(["A", "B", "C", "D"]);
    for (id, status) in statuses {
        if *status != NodeStatus::Pending {
            state.transition(id, NodeStatus::Running).unwrap();
            state.transition(id, *status).unwrap();
        }
    }
    state
}

#[tokio::test]
async fn resume_does_not_rerun_completed_nodes() {
    let store = Arc::new(InMemoryCheckpointStore::new());

    // First attempt stops right after A
    let token = CancellationToken::new();
    let first = FakeExecutor::new().cancelling_on("A", token.clone()).into_arc();
    let interrupted = SchedulerEngine::builder(first.clone())
        .checkpoint_store(store.clone())
        .build()
        .run(
            &linear(),
            RunOptions::default().with_run_id("resume-1").with_cancel(token),
        )
        .await
        .unwrap();
    assert_eq!(interrupted.status, RunStatus::Cancelled);
    assert_eq!(interrupted.node_statuses["A"], NodeStatus::Completed);

    let saved = store.get("resume-1", SESSION).unwrap();
    assert_eq!(saved.status_of("A"), Some(NodeStatus::Completed));

    let second = FakeExecutor::new().into_arc();
    let resumed = SchedulerEngine::builder(second.clone())
        .checkpoint_store(store.clone())
        .build()
        .run(
            &linear(),
            RunOptions::default().with_run_id("resume-1").resuming(false),
        )
        .await
        .unwrap();

    assert_eq!(second.call_count("A"), 0);
    assert_eq!(second.called_ids(), vec!["B", "C", "D"]);

    // B still gets A's output from the checkpoint
    let b = second.calls().into_iter().find(|c| c.node_id == "B").unwrap();
    assert_eq!(b.dependency_outputs, vec!["A"]);

    let uninterrupted = SchedulerEngine::new(FakeExecutor::new().into_arc())
        .run(&linear(), RunOptions::default().with_run_id("fresh"))
        .await
        .unwrap();
    assert_eq!(resumed.node_statuses, uninterrupted.node_statuses);
    assert_eq!(resumed.status, RunStatus::Completed);

    // Restored entry is kept once, the rest are new
    let ids: Vec<&str> = resumed.timeline.iter().map(|e| e.node_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C", "D"]);
}

#[tokio::test]
async fn stale_completed_node_is_revalidated_by_default() {
    let store = Arc::new(InMemoryCheckpointStore::new());
    store.insert(persisted(
        "stale",
        &[("A", NodeStatus::Failed), ("B", NodeStatus::Completed)],
    ));

    let exec = FakeExecutor::new().into_arc();
    let result = SchedulerEngine::builder(exec.clone())
        .checkpoint_store(store.clone())
        .build()
        .run(
            &linear(),
            RunOptions::default().with_run_id("stale").resuming(false),
        )
        .await
        .unwrap();

    assert_eq!(exec.called_ids(), vec!["A", "B", "C", "D"]);
    assert_eq!(result.status, RunStatus::Completed);
}

#[tokio::test]
async fn trusted_checkpoint_keeps_stale_completed_nodes() {
    let store = Arc::new(InMemoryCheckpointStore::new());
    store.insert(persisted(
        "trusted",
        &[("A", NodeStatus::Failed), ("B", NodeStatus::Completed)],
    ));

    let exec = FakeExecutor::new().into_arc();
    let result = SchedulerEngine::builder(exec.clone())
        .checkpoint_store(store.clone())
        .build()
        .run(
            &linear(),
            RunOptions::default().with_run_id("trusted").resuming(true),
        )
        .await
        .unwrap();

    assert_eq!(exec.called_ids(), vec!["A", "C", "D"]);
    assert_eq!(result.node_statuses["B"], NodeStatus::Completed);
}

#[tokio::test]
async fn resume_without_checkpoint_starts_fresh() {
    let store = Arc::new(InMemoryCheckpointStore::new());
    let exec = FakeExecutor::new().into_arc();
    let result = SchedulerEngine::builder(exec.clone())
        .checkpoint_store(store.clone())
        .build()
        .run(
            &linear(),
            RunOptions::default().with_run_id("nothing").resuming(false),
        )
        .await
        .unwrap();
    assert_eq!(exec.calls().len(), 4);
    assert!(result.is_success());
}

#[tokio::test]
async fn checkpoint_is_saved_every_n_batches_and_at_the_end() {
    let store = Arc::new(InMemoryCheckpointStore::new());
    let exec = FakeExecutor::new().into_arc();
    let options = RunOptions::default()
        .with_run_id("interval")
        .with_max_parallel(1)
        .with_checkpoint_interval(2);

    let result = SchedulerEngine::builder(exec)
        .checkpoint_store(store.clone())
        .build()
        .run(&independent(5), options)
        .await
        .unwrap();

    // 5 batches: saves after batch 2 and 4, then the final one
    assert_eq!(store.save_count(), 3);
    let saved = store.get("interval", SESSION).unwrap();
    assert_eq!(saved, result.state);
    assert_eq!(saved.batches_applied, 5);
    assert_eq!(saved.status, RunStatus::Completed);
}

/// Records `batches_applied` of every snapshot in the order saves finish.
/// The first save is slow so a later one could overtake it.
#[derive(Default)]
struct OrderedStore {
    landed: std::sync::Mutex<Vec<usize>>,
}

#[async_trait]
impl CheckpointStore for OrderedStore {
    fn name(&self) -> &str {
        "ordered"
    }

    async fn save(&self, _run_id: &str, _session_id: &str, snapshot: &RunState) -> anyhow::Result<()> {
        if snapshot.batches_applied == 1 {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        self.landed.lock().unwrap().push(snapshot.batches_applied);
        Ok(())
    }

    async fn load(&self, _run_id: &str, _session_id: &str) -> anyhow::Result<Option<RunState>> {
        Ok(None)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn interval_saves_land_in_batch_order() {
    let store = Arc::new(OrderedStore::default());
    let options = RunOptions::default()
        .with_run_id("ordered")
        .with_max_parallel(1)
        .with_checkpoint_interval(1);

    SchedulerEngine::builder(FakeExecutor::new().into_arc())
        .checkpoint_store(store.clone())
        .build()
        .run(&independent(4), options)
        .await
        .unwrap();

    // one save per batch, then the final one
    assert_eq!(*store.landed.lock().unwrap(), vec![1, 2, 3, 4, 4]);
}

struct BrokenStore;

#[async_trait]
impl CheckpointStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn save(&self, _run_id: &str, _session_id: &str, _snapshot: &RunState) -> anyhow::Result<()> {
        bail!("disk full")
    }

    async fn load(&self, _run_id: &str, _session_id: &str) -> anyhow::Result<Option<RunState>> {
        Ok(None)
    }
}

#[tokio::test]
async fn checkpoint_failure_aborts_with_partial_state() {
    let err = SchedulerEngine::builder(FakeExecutor::new().into_arc())
        .checkpoint_store(Arc::new(BrokenStore))
        .build()
        .run(&linear(), RunOptions::default().with_run_id("broken"))
        .await
        .unwrap_err();

    match &err {
        ExecutorError::Checkpoint { message, state } => {
            assert!(message.contains("disk full"), "{message}");
            assert!(state.is_some());
        }
        other => panic!("expected checkpoint error, got {other:?}"),
    }
    assert!(err.partial_state().is_some());
}

#[tokio::test]
async fn file_store_round_trip_through_resume() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCheckpointStore::new(dir.path().join("checkpoints")).unwrap());

    let exec = FakeExecutor::new().failing("C").into_arc();
    let first = SchedulerEngine::builder(exec)
        .checkpoint_store(store.clone())
        .build()
        .run(
            &linear(),
            RunOptions::default().with_run_id("file-run").with_session_id("s1"),
        )
        .await
        .unwrap();
    assert_eq!(first.status, RunStatus::Failed);

    let listed = store.list_runs(Some("s1")).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].run_id, "file-run");
    assert_eq!(listed[0].status, RunStatus::Failed);
    assert_eq!(listed[0].completed, 2);

    // Fixed executor: only C and D run again
    let exec = FakeExecutor::new().into_arc();
    let second = SchedulerEngine::builder(exec.clone())
        .checkpoint_store(store.clone())
        .build()
        .run(
            &linear(),
            RunOptions::default()
                .with_run_id("file-run")
                .with_session_id("s1")
                .resuming(false),
        )
        .await
        .unwrap();

    assert_eq!(exec.called_ids(), vec!["C", "D"]);
    assert_eq!(second.status, RunStatus::Completed);
    let reloaded = store.load("file-run", "s1").await.unwrap().unwrap();
    assert_eq!(reloaded.status, RunStatus::Completed);
    assert_eq!(reloaded.timeline.len(), 4);
}
