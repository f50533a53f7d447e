use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::{GraphError, GraphState, InterruptPayload, StateSchema};

/// Durable snapshot of a thread's position: the state after the last
/// completed node and the node to run next. A pending interrupt means the
/// named node is waiting for a resume value instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound = "S: StateSchema")]
pub struct Checkpoint<S: StateSchema> {
    pub thread_id: String,
    pub step: u64,
    pub node: String,
    pub created_at: String,
    pub state: GraphState<S>,
    #[serde(default)]
    pub interrupt: Option<InterruptPayload>,
}

impl<S: StateSchema> Checkpoint<S> {
    pub fn new(thread_id: String, node: String, step: u64, state: GraphState<S>) -> Self {
        Self {
            thread_id,
            step,
            node,
            created_at: chrono::Utc::now().to_rfc3339(),
            state,
            interrupt: None,
        }
    }

    pub fn with_interrupt(mut self, interrupt: InterruptPayload) -> Self {
        self.interrupt = Some(interrupt);
        self
    }
}

/// Stores partition by thread id and do not arbitrate writers: the caller
/// keeps at most one executor advancing a given thread id at a time.
#[async_trait::async_trait]
pub trait Checkpointer<S: StateSchema>: Send + Sync {
    /// Persists the checkpoint; must be durable before returning. The
    /// executor awaits this before reporting the step complete.
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), GraphError>;
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, GraphError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointMetadata {
    pub seq: u64,
    pub created_at: String,
}

#[async_trait::async_trait]
pub trait HistoryCheckpointer<S: StateSchema>: Send + Sync {
    async fn list_checkpoints(
        &self,
        thread_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, GraphError>;
}

/// Keeps only the latest checkpoint per thread; for tests and throwaway runs.
#[derive(Default, Clone)]
pub struct InMemoryCheckpointer<S: StateSchema> {
    inner: Arc<RwLock<HashMap<String, Checkpoint<S>>>>,
}

#[async_trait::async_trait]
impl<S: StateSchema> Checkpointer<S> for InMemoryCheckpointer<S> {
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), GraphError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| GraphError::Checkpoint("lock".into()))?;
        guard.insert(checkpoint.thread_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, GraphError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| GraphError::Checkpoint("lock".into()))?;
        Ok(guard.get(thread_id).cloned())
    }
}
