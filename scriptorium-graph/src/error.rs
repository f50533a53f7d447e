use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("checkpoint failed: {0}")]
    Checkpoint(String),
    #[error("node failed: {node}")]
    NodeFailed {
        node: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("missing node: {node}")]
    MissingNode { node: String },
    #[error("invalid edge from '{from}' to '{to}'")]
    InvalidEdge { from: String, to: String },
    #[error("no entry node set")]
    MissingEntry,
    #[error("node '{node}' has more than one outgoing edge definition")]
    ConflictingEdges { node: String },
    #[error("router at '{node}' returned unmapped label '{label}'")]
    UnmappedRouteLabel { node: String, label: String },
    #[error("max steps exceeded: reached {reached}, limit {max}")]
    MaxStepsExceeded { max: usize, reached: usize },
    #[error("node '{node}' requested an interrupt but the graph has no checkpointer or thread id")]
    InterruptNeedsCheckpointer { node: String },
    #[error("thread '{thread_id}' has no pending interrupt to resume")]
    NoPendingInterrupt { thread_id: String },
    #[error("no checkpoint found for thread '{thread_id}'")]
    UnknownThread { thread_id: String },
}
