use std::sync::Arc;

use ahash::AHashMap;
use serde_json::Value;

use crate::{
    Checkpoint, Checkpointer, ExecutionConfig, ExecutionOptions, GraphError, GraphState,
    InterruptPayload, Node, NodeContext, NodeOutput, Observer, StateSchema,
};

/// Reserved edge target ending the run.
pub const END: &str = "__end__";

type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

enum EdgeDef<S: StateSchema> {
    Direct(String),
    Conditional {
        router: Router<S>,
        targets: AHashMap<String, String>,
    },
}

/// Result of walking a graph: either the final merged state, or a designed
/// pause with the payload to show whoever supplies the resume value.
#[derive(Debug)]
pub enum RunOutcome<S: StateSchema> {
    Complete(GraphState<S>),
    Suspended {
        node: String,
        interrupt: InterruptPayload,
    },
}

impl<S: StateSchema> RunOutcome<S> {
    pub fn into_state(self) -> Option<GraphState<S>> {
        match self {
            RunOutcome::Complete(state) => Some(state),
            RunOutcome::Suspended { .. } => None,
        }
    }
}

pub struct GraphBuilder<S: StateSchema> {
    nodes: AHashMap<String, Arc<dyn Node<S>>>,
    edges: Vec<(String, EdgeDef<S>)>,
    entry: Option<String>,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    observer: Option<Arc<dyn Observer>>,
    config: ExecutionConfig,
}

impl<S: StateSchema> GraphBuilder<S> {
    pub fn new() -> Self {
        Self {
            nodes: AHashMap::new(),
            edges: Vec::new(),
            entry: None,
            checkpointer: None,
            observer: None,
            config: ExecutionConfig::default(),
        }
    }

    pub fn add_node<N>(mut self, name: &str, node: N) -> Self
    where
        N: Node<S> + 'static,
    {
        self.nodes.insert(name.to_string(), Arc::new(node));
        self
    }

    pub fn set_entry(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    /// Adds the single unconditional edge out of `from`. Use [`END`] as the
    /// target to terminate the run there.
    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.edges
            .push((from.to_string(), EdgeDef::Direct(to.to_string())));
        self
    }

    /// Adds a router-gated edge set out of `from`. The router must be a pure,
    /// deterministic function of the state; every label it can return must
    /// appear in `targets`.
    pub fn add_conditional_edges<R>(
        mut self,
        from: &str,
        router: R,
        targets: &[(&str, &str)],
    ) -> Self
    where
        R: Fn(&S) -> String + Send + Sync + 'static,
    {
        let targets = targets
            .iter()
            .map(|(label, to)| (label.to_string(), to.to_string()))
            .collect();
        self.edges.push((
            from.to_string(),
            EdgeDef::Conditional {
                router: Arc::new(router),
                targets,
            },
        ));
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer<S>>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the wiring and produces the executable graph. Configuration
    /// errors (unknown targets, missing entry, conflicting edges) surface
    /// here, never mid-run.
    pub fn build(self) -> Result<ExecutableGraph<S>, GraphError> {
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::MissingNode { node: entry });
        }

        let mut edges: AHashMap<String, EdgeDef<S>> = AHashMap::new();
        for (from, def) in self.edges {
            if !self.nodes.contains_key(&from) {
                return Err(GraphError::MissingNode { node: from });
            }
            let targets: Vec<String> = match &def {
                EdgeDef::Direct(to) => vec![to.clone()],
                EdgeDef::Conditional { targets, .. } => targets.values().cloned().collect(),
            };
            for to in targets {
                if to != END && !self.nodes.contains_key(&to) {
                    return Err(GraphError::InvalidEdge { from, to });
                }
            }
            if edges.insert(from.clone(), def).is_some() {
                return Err(GraphError::ConflictingEdges { node: from });
            }
        }

        Ok(ExecutableGraph {
            nodes: self.nodes,
            edges,
            entry,
            checkpointer: self.checkpointer,
            observer: self.observer,
            config: self.config,
        })
    }
}

impl<S: StateSchema> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ExecutableGraph<S: StateSchema> {
    nodes: AHashMap<String, Arc<dyn Node<S>>>,
    edges: AHashMap<String, EdgeDef<S>>,
    entry: String,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    observer: Option<Arc<dyn Observer>>,
    config: ExecutionConfig,
}

impl<S: StateSchema> ExecutableGraph<S> {
    /// Walks the graph from the entry node, or from the thread's checkpoint
    /// when one exists (the supplied initial state is then ignored). A
    /// checkpointed pending interrupt is re-surfaced without running
    /// anything; a checkpointed completed run returns its final state.
    pub async fn invoke(
        &self,
        initial: GraphState<S>,
        options: &ExecutionOptions,
    ) -> Result<RunOutcome<S>, GraphError> {
        let config = self.config.merge(options);
        let thread_id = options.thread_id.clone();

        let mut state = initial;
        let mut current = self.entry.clone();
        let mut step = 0u64;

        if let (Some(checkpointer), Some(tid)) = (&self.checkpointer, &thread_id) {
            if let Some(loaded) = checkpointer.load(tid).await? {
                if let Some(interrupt) = loaded.interrupt {
                    tracing::info!(thread_id = %tid, node = %loaded.node, "pending interrupt");
                    return Ok(RunOutcome::Suspended {
                        node: loaded.node,
                        interrupt,
                    });
                }
                if loaded.node == END {
                    return Ok(RunOutcome::Complete(loaded.state));
                }
                tracing::info!(thread_id = %tid, node = %loaded.node, step = loaded.step, "resuming from checkpoint");
                state = loaded.state;
                current = loaded.node;
                step = loaded.step;
            }
        }

        self.run_loop(state, current, step, None, &config, thread_id)
            .await
    }

    /// Continues a suspended thread, handing `value` to the node that raised
    /// the interrupt as its resume value.
    pub async fn resume(&self, thread_id: &str, value: Value) -> Result<RunOutcome<S>, GraphError> {
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or_else(|| GraphError::Checkpoint("graph has no checkpointer".into()))?;
        let loaded = checkpointer
            .load(thread_id)
            .await?
            .ok_or_else(|| GraphError::UnknownThread {
                thread_id: thread_id.to_string(),
            })?;
        if loaded.interrupt.is_none() {
            return Err(GraphError::NoPendingInterrupt {
                thread_id: thread_id.to_string(),
            });
        }
        tracing::info!(thread_id, node = %loaded.node, "resuming interrupted node");
        self.run_loop(
            loaded.state,
            loaded.node,
            loaded.step,
            Some(value),
            &self.config,
            Some(thread_id.to_string()),
        )
        .await
    }

    async fn run_loop(
        &self,
        mut state: GraphState<S>,
        mut current: String,
        mut step: u64,
        mut resume: Option<Value>,
        config: &ExecutionConfig,
        thread_id: Option<String>,
    ) -> Result<RunOutcome<S>, GraphError> {
        let mut executed = 0usize;
        loop {
            if let Some(max) = config.max_steps {
                if executed >= max {
                    return Err(GraphError::MaxStepsExceeded {
                        max,
                        reached: executed,
                    });
                }
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::MissingNode {
                    node: current.clone(),
                })?;

            if let Some(observer) = &self.observer {
                observer.on_node_enter(&current);
            }
            tracing::debug!(node = %current, step, "running node");

            let ctx = NodeContext::new(thread_id.clone(), step, resume.take());
            let output = match node.run(&ctx, &state.data).await {
                Ok(output) => output,
                Err(source) => {
                    if let Some(observer) = &self.observer {
                        observer.on_error(&current, &source.to_string());
                    }
                    return Err(GraphError::NodeFailed {
                        node: current,
                        source,
                    });
                }
            };
            executed += 1;

            match output {
                NodeOutput::Interrupt(interrupt) => {
                    let (checkpointer, tid) = match (&self.checkpointer, &thread_id) {
                        (Some(checkpointer), Some(tid)) => (checkpointer, tid.clone()),
                        _ => {
                            return Err(GraphError::InterruptNeedsCheckpointer { node: current })
                        }
                    };
                    let checkpoint = Checkpoint::new(tid, current.clone(), step, state.clone())
                        .with_interrupt(interrupt.clone());
                    checkpointer.save(&checkpoint).await?;
                    if let Some(observer) = &self.observer {
                        observer.on_interrupt(&current);
                    }
                    tracing::info!(node = %current, "run suspended");
                    return Ok(RunOutcome::Suspended {
                        node: current,
                        interrupt,
                    });
                }
                NodeOutput::Update(update) => {
                    state.apply(update);
                    step += 1;
                    if let Some(observer) = &self.observer {
                        observer.on_node_exit(&current);
                    }

                    let next = self.next_node(&current, &state.data)?;
                    if let (Some(checkpointer), Some(tid)) = (&self.checkpointer, &thread_id) {
                        let resume_point = next.clone().unwrap_or_else(|| END.to_string());
                        let checkpoint =
                            Checkpoint::new(tid.clone(), resume_point, step, state.clone());
                        checkpointer.save(&checkpoint).await?;
                        if let Some(observer) = &self.observer {
                            observer.on_checkpoint_saved(&current);
                        }
                        tracing::debug!(node = %current, step, "checkpoint saved");
                    }

                    match next {
                        Some(next) => current = next,
                        None => {
                            tracing::info!(steps = executed, "run complete");
                            return Ok(RunOutcome::Complete(state));
                        }
                    }
                }
            }
        }
    }

    fn next_node(&self, from: &str, state: &S) -> Result<Option<String>, GraphError> {
        match self.edges.get(from) {
            None => Ok(None),
            Some(EdgeDef::Direct(to)) if to == END => Ok(None),
            Some(EdgeDef::Direct(to)) => Ok(Some(to.clone())),
            Some(EdgeDef::Conditional { router, targets }) => {
                let label = router(state);
                match targets.get(&label) {
                    Some(to) if to == END => Ok(None),
                    Some(to) => Ok(Some(to.clone())),
                    None => Err(GraphError::UnmappedRouteLabel {
                        node: from.to_string(),
                        label,
                    }),
                }
            }
        }
    }
}
