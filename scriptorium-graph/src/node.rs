use async_trait::async_trait;
use serde_json::Value;

use crate::{InterruptPayload, StateSchema};

pub type NodeError = Box<dyn std::error::Error + Send + Sync>;

/// What a node hands back to the executor: a partial state update, or a
/// request to suspend the run until an external decision arrives.
pub enum NodeOutput<S: StateSchema> {
    Update(S::Update),
    Interrupt(InterruptPayload),
}

impl<S: StateSchema> NodeOutput<S> {
    pub fn update(update: S::Update) -> Self {
        NodeOutput::Update(update)
    }

    pub fn interrupt(prompt: impl Into<String>) -> Self {
        NodeOutput::Interrupt(InterruptPayload::new(prompt))
    }
}

/// Per-invocation context handed to a node alongside the state.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    pub thread_id: Option<String>,
    pub step: u64,
    resume: Option<Value>,
}

impl NodeContext {
    pub(crate) fn new(thread_id: Option<String>, step: u64, resume: Option<Value>) -> Self {
        Self {
            thread_id,
            step,
            resume,
        }
    }

    /// The value supplied to `resume`, present only on the first invocation
    /// of the node that raised the interrupt. A node that suspends checks
    /// this: `None` means "ask", `Some` means "the answer arrived".
    pub fn resume_value(&self) -> Option<&Value> {
        self.resume.as_ref()
    }
}

/// A named unit of work: full state in, partial update out.
///
/// Nodes hold no mutable state of their own and must tolerate re-invocation;
/// a failed run retried under the same thread id re-runs the in-flight node.
#[async_trait]
pub trait Node<S: StateSchema>: Send + Sync {
    async fn run(&self, ctx: &NodeContext, state: &S) -> Result<NodeOutput<S>, NodeError>;
}
