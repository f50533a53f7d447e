use serde::{Deserialize, Serialize};

/// Payload surfaced to the caller when a node suspends the run.
///
/// Persisted with the checkpoint so a restarted process can re-display the
/// prompt before the resume value arrives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InterruptPayload {
    pub prompt: String,
}

impl InterruptPayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}
