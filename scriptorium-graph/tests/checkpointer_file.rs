use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

use scriptorium_graph::{
    AppendVec, Checkpoint, Checkpointer, ExecutionOptions, FileCheckpointer, GraphBuilder,
    GraphError, GraphState, HistoryCheckpointer, Node, NodeContext, NodeError, NodeOutput,
    Override, StateSchema, END,
};

#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq)]
struct CountState {
    count: i32,
    trace: Vec<String>,
}

#[derive(Clone, Default)]
struct CountUpdate {
    count: Option<i32>,
    trace: Vec<String>,
}

impl StateSchema for CountState {
    type Update = CountUpdate;

    fn apply(&mut self, update: CountUpdate) {
        if let Some(count) = update.count {
            self.count = Override::merge(&self.count, count);
        }
        self.trace = AppendVec::merge(&self.trace, update.trace);
    }
}

#[tokio::test]
async fn appends_and_loads_latest() {
    let dir = tempdir().unwrap();
    let checkpointer = FileCheckpointer::new(dir.path());

    let first = Checkpoint::new(
        "thread/1".to_string(),
        "a".to_string(),
        1,
        GraphState::new(CountState {
            count: 1,
            trace: vec![],
        }),
    );
    let second = Checkpoint::new(
        "thread/1".to_string(),
        "b".to_string(),
        2,
        GraphState::new(CountState {
            count: 2,
            trace: vec![],
        }),
    );

    checkpointer.save(&first).await.unwrap();
    checkpointer.save(&second).await.unwrap();

    let loaded: Checkpoint<CountState> = checkpointer.load("thread/1").await.unwrap().unwrap();
    assert_eq!(loaded.state.data.count, 2);
    assert_eq!(loaded.node, "b");

    // Path separators in the thread id are sanitized into file names.
    let path = dir.path().join("thread_1.jsonl");
    assert!(path.exists());
}

#[tokio::test]
async fn lists_checkpoint_history() {
    let dir = tempdir().unwrap();
    let checkpointer = FileCheckpointer::new(dir.path());

    for step in 1..=3u64 {
        let checkpoint = Checkpoint::new(
            "thread-2".to_string(),
            "node".to_string(),
            step,
            GraphState::new(CountState::default()),
        );
        checkpointer.save(&checkpoint).await.unwrap();
    }

    let history = <FileCheckpointer as HistoryCheckpointer<CountState>>::list_checkpoints(
        &checkpointer,
        "thread-2",
    )
    .await
    .unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].seq, 1);
    assert_eq!(history[2].seq, 3);
    assert!(!history[0].created_at.is_empty());
}

#[tokio::test]
async fn load_missing_thread_is_none() {
    let dir = tempdir().unwrap();
    let checkpointer = FileCheckpointer::new(dir.path());
    let loaded: Option<Checkpoint<CountState>> = checkpointer.load("ghost").await.unwrap();
    assert!(loaded.is_none());
}

struct Step {
    name: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Node<CountState> for Step {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &CountState,
    ) -> Result<NodeOutput<CountState>, NodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(NodeOutput::Update(CountUpdate {
            count: Some(state.count + 1),
            trace: vec![self.name.to_string()],
        }))
    }
}

/// Fails on its first invocation, succeeds afterwards: a crash between
/// checkpoints.
struct Flaky {
    name: &'static str,
    failed_once: Arc<AtomicBool>,
}

#[async_trait]
impl Node<CountState> for Flaky {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &CountState,
    ) -> Result<NodeOutput<CountState>, NodeError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err("backend unreachable".into());
        }
        Ok(NodeOutput::Update(CountUpdate {
            count: Some(state.count + 1),
            trace: vec![self.name.to_string()],
        }))
    }
}

#[tokio::test]
async fn retry_resumes_from_last_checkpoint() {
    let dir = tempdir().unwrap();
    let checkpointer = Arc::new(FileCheckpointer::new(dir.path()));

    let a_calls = Arc::new(AtomicUsize::new(0));
    let b_calls = Arc::new(AtomicUsize::new(0));
    let graph = GraphBuilder::new()
        .add_node(
            "a",
            Step {
                name: "a",
                calls: a_calls.clone(),
            },
        )
        .add_node(
            "b",
            Step {
                name: "b",
                calls: b_calls.clone(),
            },
        )
        .add_node(
            "c",
            Flaky {
                name: "c",
                failed_once: Arc::new(AtomicBool::new(false)),
            },
        )
        .set_entry("a")
        .add_edge("a", "b")
        .add_edge("b", "c")
        .add_edge("c", END)
        .with_checkpointer(checkpointer)
        .build()
        .unwrap();

    let options = ExecutionOptions::for_thread("crash-1");
    let err = graph
        .invoke(GraphState::default(), &options)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NodeFailed { ref node, .. } if node == "c"));

    // Retrying the same thread picks up after 'b'; the completed nodes do
    // not run again.
    let state = graph
        .invoke(GraphState::default(), &options)
        .await
        .unwrap()
        .into_state()
        .unwrap();
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.data.count, 3);
    assert_eq!(state.data.trace, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn crash_resume_matches_uninterrupted_run() {
    // Reference run without failures.
    let dir_ref = tempdir().unwrap();
    let reference = GraphBuilder::new()
        .add_node(
            "a",
            Step {
                name: "a",
                calls: Arc::new(AtomicUsize::new(0)),
            },
        )
        .add_node(
            "b",
            Step {
                name: "b",
                calls: Arc::new(AtomicUsize::new(0)),
            },
        )
        .set_entry("a")
        .add_edge("a", "b")
        .add_edge("b", END)
        .with_checkpointer(Arc::new(FileCheckpointer::new(dir_ref.path())))
        .build()
        .unwrap();
    let expected = reference
        .invoke(
            GraphState::default(),
            &ExecutionOptions::for_thread("ref"),
        )
        .await
        .unwrap()
        .into_state()
        .unwrap();

    // Same chain, but 'b' fails once mid-run before the retry.
    let dir = tempdir().unwrap();
    let checkpointer = Arc::new(FileCheckpointer::new(dir.path()));
    let flaky_graph = |failed: Arc<AtomicBool>| {
        GraphBuilder::new()
            .add_node(
                "a",
                Step {
                    name: "a",
                    calls: Arc::new(AtomicUsize::new(0)),
                },
            )
            .add_node(
                "b",
                Flaky {
                    name: "b",
                    failed_once: failed,
                },
            )
            .set_entry("a")
            .add_edge("a", "b")
            .add_edge("b", END)
            .with_checkpointer(checkpointer.clone())
            .build()
            .unwrap()
    };

    let failed = Arc::new(AtomicBool::new(false));
    let graph = flaky_graph(failed.clone());
    let options = ExecutionOptions::for_thread("crashy");
    graph
        .invoke(GraphState::default(), &options)
        .await
        .unwrap_err();

    // Simulated process restart: fresh graph instance, same store.
    let graph = flaky_graph(failed);
    let resumed = graph
        .invoke(GraphState::default(), &options)
        .await
        .unwrap()
        .into_state()
        .unwrap();

    assert_eq!(resumed.data, expected.data);
}

#[tokio::test]
async fn completed_thread_reinvokes_to_final_state() {
    let dir = tempdir().unwrap();
    let checkpointer = Arc::new(FileCheckpointer::new(dir.path()));
    let calls = Arc::new(AtomicUsize::new(0));
    let graph = GraphBuilder::new()
        .add_node(
            "a",
            Step {
                name: "a",
                calls: calls.clone(),
            },
        )
        .set_entry("a")
        .add_edge("a", END)
        .with_checkpointer(checkpointer)
        .build()
        .unwrap();

    let options = ExecutionOptions::for_thread("done");
    graph.invoke(GraphState::default(), &options).await.unwrap();
    let again = graph
        .invoke(GraphState::default(), &options)
        .await
        .unwrap()
        .into_state()
        .unwrap();

    // Second invoke returns the stored final state without re-running.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(again.data.count, 1);
}
