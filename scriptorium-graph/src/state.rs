use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Schema of a workflow's shared state.
///
/// The associated `Update` type is the partial result a node returns: scalar
/// fields are `Option` (None leaves the field untouched), accumulating
/// fields are `Vec` (appended in order, never overwritten). `apply` is the
/// per-field merge schema; implementations route each field through the
/// reducers ([`crate::Override`], [`crate::AppendVec`], ...).
pub trait StateSchema:
    Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static
{
    type Update: Clone + Send + Sync + 'static;

    fn apply(&mut self, update: Self::Update);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(bound = "S: StateSchema")]
pub struct GraphState<S: StateSchema> {
    pub data: S,
}

impl<S: StateSchema> GraphState<S> {
    pub fn new(data: S) -> Self {
        Self { data }
    }

    /// Merges a node's partial result into the state.
    pub fn apply(&mut self, update: S::Update) {
        self.data.apply(update);
    }
}

impl<S: StateSchema> Default for GraphState<S> {
    fn default() -> Self {
        Self { data: S::default() }
    }
}
