//! Directed workflow graphs over a shared, checkpointed state.
//!
//! Nodes are async functions from state to a partial update; edges are
//! either fixed or selected by a router over the merged state. Runs are
//! resumable: every step persists a checkpoint, and a node may suspend the
//! walk to wait for an external decision.

mod checkpoint;
mod config;
mod error;
mod file_checkpointer;
mod graph;
mod interrupt;
mod node;
mod observer;
mod reducer;
mod state;

pub use checkpoint::{
    Checkpoint, CheckpointMetadata, Checkpointer, HistoryCheckpointer, InMemoryCheckpointer,
};
pub use config::{ExecutionConfig, ExecutionOptions};
pub use error::GraphError;
pub use file_checkpointer::{CheckpointRecord, FileCheckpointer};
pub use graph::{ExecutableGraph, GraphBuilder, RunOutcome, END};
pub use interrupt::InterruptPayload;
pub use node::{Node, NodeContext, NodeError, NodeOutput};
pub use observer::Observer;
pub use reducer::{AddCounter, AppendVec, MergeMap, Override};
pub use state::{GraphState, StateSchema};
