//! Writer/editor review-loop workflows: agents, state, graphs, export.
//!
//! The engine lives in `scriptorium-graph`; this crate supplies the content
//! pipeline built on it: intent analysis, outline drafting and review,
//! web research, draft/review loops with human checkpoints, and the
//! book/tutorial chapter pipeline.

pub mod agents;
pub mod export;
pub mod settings;
pub mod state;
pub mod templates;
pub mod workflows;

mod parse;

pub use export::{ExportError, ExportManager};
pub use settings::Settings;
pub use state::{BookState, BookType, WorkflowState};
pub use workflows::{
    create_book_workflow, create_initial_book_state, create_initial_state,
    create_multi_agent_workflow, create_simple_workflow, WorkflowContext, WorkflowMode,
};
