/// Limits applied to every run of a graph.
#[derive(Clone, Debug)]
pub struct ExecutionConfig {
    /// Safety cap on node executions per run; router-bounded loops should
    /// exit well below it.
    pub max_steps: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: Some(200),
        }
    }
}

impl ExecutionConfig {
    pub fn merge(&self, overrides: &ExecutionOptions) -> Self {
        Self {
            max_steps: overrides.max_steps.or(self.max_steps),
        }
    }
}

/// Per-invocation overrides and the thread id partitioning checkpoints.
#[derive(Clone, Debug, Default)]
pub struct ExecutionOptions {
    pub thread_id: Option<String>,
    pub max_steps: Option<usize>,
}

impl ExecutionOptions {
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            max_steps: None,
        }
    }
}
