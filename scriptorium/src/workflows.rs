//! The prebuilt workflow graphs, one builder per mode.
//!
//! Loop policy: counters are advanced by the intervention nodes, and the
//! routers force the exit branch once a counter reaches its limit, so every
//! cycle terminates in bounded time no matter what the reviewer or the human
//! answers. The outline reviewer's three labels all route into the
//! intervention node on purpose; the rendered prompt tells the human which
//! case occurred.

use std::sync::Arc;

use scriptorium_graph::{
    Checkpointer, ExecutableGraph, GraphBuilder, GraphError, Observer, END,
};
use scriptorium_llm::TextGenerator;
use scriptorium_search::Searcher;

use crate::agents::{
    BookCoordinator, BusinessAnalyst, ChapterEditor, ChapterReviser, ChapterWriter,
    CodeExampleGenerator, ContentStrategist, DraftIntervention, Editor, ExerciseGenerator,
    ExportChapter, OutlineIntervention, OutlineReviewer, TocIntervention, WebResearch, Writer,
};
use crate::export::ExportManager;
use crate::settings::Settings;
use crate::state::{BookState, BookType, WorkflowState};

/// Which prebuilt graph to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowMode {
    Simple,
    MultiAgent,
    Book,
    Tutorial,
}

impl WorkflowMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "simple" => Some(WorkflowMode::Simple),
            "multi-agent" | "multi_agent" => Some(WorkflowMode::MultiAgent),
            "book" => Some(WorkflowMode::Book),
            "tutorial" => Some(WorkflowMode::Tutorial),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkflowMode::Simple => "simple",
            WorkflowMode::MultiAgent => "multi-agent",
            WorkflowMode::Book => "book",
            WorkflowMode::Tutorial => "tutorial",
        }
    }
}

/// Everything the graph builders need, constructed once at startup.
#[derive(Clone)]
pub struct WorkflowContext {
    pub settings: Settings,
    pub generator: Arc<dyn TextGenerator>,
    pub searcher: Option<Arc<dyn Searcher>>,
    pub exporter: Arc<ExportManager>,
    pub observer: Option<Arc<dyn Observer>>,
}

// Routers. Pure functions of state; checked for totality by the edge maps
// declared next to them.

fn should_approve_outline(state: &WorkflowState) -> String {
    if state.outline_revision_count >= state.max_outline_revisions {
        "max_revisions".to_string()
    } else if state
        .current_outline_review
        .as_ref()
        .map(|review| review.approved)
        .unwrap_or(false)
    {
        "approved".to_string()
    } else {
        "revise".to_string()
    }
}

fn route_outline_decision(state: &WorkflowState) -> String {
    // The revision budget outranks the human's wish; exhausted means proceed.
    if state.outline_revision_count > state.max_outline_revisions {
        return "proceed".to_string();
    }
    if state.user_decision == "revise" {
        "revise".to_string()
    } else {
        "proceed".to_string()
    }
}

fn should_continue_draft(state: &WorkflowState) -> String {
    if state.iteration_count >= state.max_iterations {
        "end".to_string()
    } else if state.user_decision == "continue" {
        "writer".to_string()
    } else {
        "end".to_string()
    }
}

fn route_toc_decision(state: &BookState) -> String {
    if state.toc_revision_count > state.max_toc_revisions {
        return "proceed".to_string();
    }
    if state.user_decision == "revise" {
        "revise".to_string()
    } else {
        "proceed".to_string()
    }
}

fn route_chapters(state: &BookState) -> String {
    let total = state
        .table_of_contents
        .as_ref()
        .map(|toc| toc.chapters.len() as u32)
        .unwrap_or(0);
    if state.current_chapter > total {
        "finished".to_string()
    } else {
        "next_chapter".to_string()
    }
}

/// Writer -> editor -> human decision loop.
pub fn create_simple_workflow(
    ctx: &WorkflowContext,
    checkpointer: Arc<dyn Checkpointer<WorkflowState>>,
) -> Result<ExecutableGraph<WorkflowState>, GraphError> {
    let settings = &ctx.settings;
    let mut builder = GraphBuilder::new()
        .add_node(
            "writer",
            Writer::new(
                ctx.generator.clone(),
                settings.writer_temperature,
                settings.max_tokens,
            ),
        )
        .add_node(
            "editor",
            Editor::new(
                ctx.generator.clone(),
                settings.editor_temperature,
                settings.max_tokens,
            ),
        )
        .add_node("draft_intervention", DraftIntervention)
        .set_entry("writer")
        .add_edge("writer", "editor")
        .add_edge("editor", "draft_intervention")
        .add_conditional_edges(
            "draft_intervention",
            should_continue_draft,
            &[("writer", "writer"), ("end", END)],
        )
        .with_checkpointer(checkpointer);
    if let Some(observer) = &ctx.observer {
        builder = builder.with_observer(observer.clone());
    }
    builder.build()
}

/// The full pipeline: analysis, outline loop with human approval, research,
/// then the draft loop.
pub fn create_multi_agent_workflow(
    ctx: &WorkflowContext,
    checkpointer: Arc<dyn Checkpointer<WorkflowState>>,
) -> Result<ExecutableGraph<WorkflowState>, GraphError> {
    let settings = &ctx.settings;
    let mut builder = GraphBuilder::new()
        .add_node(
            "business_analyst",
            BusinessAnalyst::new(
                ctx.generator.clone(),
                settings.analyst_temperature,
                settings.max_tokens,
            ),
        )
        .add_node(
            "content_strategist",
            ContentStrategist::new(
                ctx.generator.clone(),
                settings.strategist_temperature,
                settings.max_tokens,
            ),
        )
        .add_node(
            "outline_reviewer",
            OutlineReviewer::new(
                ctx.generator.clone(),
                settings.outline_reviewer_temperature,
                settings.max_tokens,
            ),
        )
        .add_node("outline_intervention", OutlineIntervention)
        .add_node(
            "web_research",
            WebResearch::new(
                ctx.generator.clone(),
                settings.research_temperature,
                settings.max_tokens,
                ctx.searcher.clone(),
                settings.max_search_results_per_query,
            ),
        )
        .add_node(
            "writer",
            Writer::new(
                ctx.generator.clone(),
                settings.writer_temperature,
                settings.max_tokens,
            ),
        )
        .add_node(
            "editor",
            Editor::new(
                ctx.generator.clone(),
                settings.editor_temperature,
                settings.max_tokens,
            ),
        )
        .add_node("draft_intervention", DraftIntervention)
        .set_entry("business_analyst")
        .add_edge("business_analyst", "content_strategist")
        .add_edge("content_strategist", "outline_reviewer")
        // All three outcomes land on the intervention; the prompt text tells
        // the human whether the outline passed, failed, or ran out of
        // revisions.
        .add_conditional_edges(
            "outline_reviewer",
            should_approve_outline,
            &[
                ("approved", "outline_intervention"),
                ("revise", "outline_intervention"),
                ("max_revisions", "outline_intervention"),
            ],
        )
        .add_conditional_edges(
            "outline_intervention",
            route_outline_decision,
            &[
                ("proceed", "web_research"),
                ("revise", "content_strategist"),
            ],
        )
        .add_edge("web_research", "writer")
        .add_edge("writer", "editor")
        .add_edge("editor", "draft_intervention")
        .add_conditional_edges(
            "draft_intervention",
            should_continue_draft,
            &[("writer", "writer"), ("end", END)],
        )
        .with_checkpointer(checkpointer);
    if let Some(observer) = &ctx.observer {
        builder = builder.with_observer(observer.clone());
    }
    builder.build()
}

/// Chapter pipeline: plan, approve the table of contents, then write, edit,
/// revise and export each chapter in order. Tutorial mode inserts the code
/// example and exercise nodes between drafting and review.
pub fn create_book_workflow(
    ctx: &WorkflowContext,
    book_type: BookType,
    checkpointer: Arc<dyn Checkpointer<BookState>>,
) -> Result<ExecutableGraph<BookState>, GraphError> {
    let settings = &ctx.settings;
    let tutorial = book_type == BookType::Tutorial;

    let mut builder = GraphBuilder::new()
        .add_node(
            "book_coordinator",
            BookCoordinator::new(
                ctx.generator.clone(),
                settings.strategist_temperature,
                settings.max_tokens,
                settings.default_book_chapters,
            ),
        )
        .add_node("toc_intervention", TocIntervention)
        .add_node(
            "chapter_writer",
            ChapterWriter::new(
                ctx.generator.clone(),
                settings.writer_temperature,
                settings.max_tokens,
            ),
        )
        .add_node(
            "chapter_editor",
            ChapterEditor::new(
                ctx.generator.clone(),
                settings.editor_temperature,
                settings.max_tokens,
            ),
        )
        .add_node(
            "chapter_reviser",
            ChapterReviser::new(
                ctx.generator.clone(),
                settings.writer_temperature,
                settings.max_tokens,
            ),
        )
        .add_node("export_chapter", ExportChapter::new(ctx.exporter.clone()))
        .set_entry("book_coordinator")
        .add_edge("book_coordinator", "toc_intervention")
        .add_conditional_edges(
            "toc_intervention",
            route_toc_decision,
            &[
                ("proceed", "chapter_writer"),
                ("revise", "book_coordinator"),
            ],
        )
        .add_edge("chapter_editor", "chapter_reviser")
        .add_edge("chapter_reviser", "export_chapter")
        .add_conditional_edges(
            "export_chapter",
            route_chapters,
            &[("next_chapter", "chapter_writer"), ("finished", END)],
        )
        .with_checkpointer(checkpointer);

    builder = if tutorial {
        builder
            .add_node(
                "code_examples",
                CodeExampleGenerator::new(
                    ctx.generator.clone(),
                    settings.writer_temperature,
                    settings.max_tokens,
                ),
            )
            .add_node(
                "exercises",
                ExerciseGenerator::new(
                    ctx.generator.clone(),
                    settings.writer_temperature,
                    settings.max_tokens,
                ),
            )
            .add_edge("chapter_writer", "code_examples")
            .add_edge("code_examples", "exercises")
            .add_edge("exercises", "chapter_editor")
    } else {
        builder.add_edge("chapter_writer", "chapter_editor")
    };

    if let Some(observer) = &ctx.observer {
        builder = builder.with_observer(observer.clone());
    }
    builder.build()
}

/// Initial state for the article modes, mirroring a fresh session.
pub fn create_initial_state(
    topic: impl Into<String>,
    settings: &Settings,
    max_iterations: Option<u32>,
    max_outline_revisions: Option<u32>,
) -> WorkflowState {
    WorkflowState {
        topic: topic.into(),
        max_iterations: max_iterations.unwrap_or(settings.max_iterations),
        max_outline_revisions: max_outline_revisions.unwrap_or(settings.max_outline_revisions),
        current_stage: "initialized".to_string(),
        ..Default::default()
    }
}

/// Initial state for the book modes.
pub fn create_initial_book_state(
    topic: impl Into<String>,
    book_type: BookType,
    settings: &Settings,
    chapters: Option<u32>,
    max_toc_revisions: Option<u32>,
) -> BookState {
    BookState {
        topic: topic.into(),
        book_type,
        requested_chapters: chapters,
        max_toc_revisions: max_toc_revisions.unwrap_or(settings.max_outline_revisions),
        current_stage: "initialized".to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{OutlineReview, TableOfContents, TocChapter};

    fn review(approved: bool) -> OutlineReview {
        OutlineReview {
            version_reviewed: 1,
            approved,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            recommendations: Vec::new(),
            overall_assessment: String::new(),
            timestamp: String::new(),
        }
    }

    #[test]
    fn outline_router_forces_exit_at_limit() {
        let mut state = WorkflowState {
            max_outline_revisions: 1,
            current_outline_review: Some(review(false)),
            ..Default::default()
        };
        assert_eq!(should_approve_outline(&state), "revise");

        state.outline_revision_count = 1;
        // Rejected again, but the budget is spent.
        assert_eq!(should_approve_outline(&state), "max_revisions");
    }

    #[test]
    fn outline_router_approves_below_limit() {
        let state = WorkflowState {
            max_outline_revisions: 3,
            current_outline_review: Some(review(true)),
            ..Default::default()
        };
        assert_eq!(should_approve_outline(&state), "approved");
    }

    #[test]
    fn outline_decision_honors_revise_below_limit() {
        let state = WorkflowState {
            max_outline_revisions: 3,
            outline_revision_count: 1,
            user_decision: "revise".to_string(),
            ..Default::default()
        };
        assert_eq!(route_outline_decision(&state), "revise");
    }

    #[test]
    fn outline_decision_forces_proceed_past_limit() {
        let state = WorkflowState {
            max_outline_revisions: 1,
            outline_revision_count: 2,
            user_decision: "revise".to_string(),
            ..Default::default()
        };
        assert_eq!(route_outline_decision(&state), "proceed");
    }

    #[test]
    fn draft_router_continues_until_limit() {
        let mut state = WorkflowState {
            max_iterations: 2,
            iteration_count: 1,
            user_decision: "continue".to_string(),
            ..Default::default()
        };
        assert_eq!(should_continue_draft(&state), "writer");

        state.iteration_count = 2;
        // Human wants more, the budget says no.
        assert_eq!(should_continue_draft(&state), "end");
    }

    #[test]
    fn draft_router_stops_on_stop() {
        let state = WorkflowState {
            max_iterations: 10,
            iteration_count: 1,
            user_decision: "stop".to_string(),
            ..Default::default()
        };
        assert_eq!(should_continue_draft(&state), "end");
    }

    #[test]
    fn chapter_router_finishes_after_last_chapter() {
        let toc = TableOfContents {
            chapters: vec![
                TocChapter {
                    number: 1,
                    title: "One".to_string(),
                    summary: String::new(),
                    estimated_length: String::new(),
                    key_topics: Vec::new(),
                },
                TocChapter {
                    number: 2,
                    title: "Two".to_string(),
                    summary: String::new(),
                    estimated_length: String::new(),
                    key_topics: Vec::new(),
                },
            ],
        };
        let mut state = BookState {
            table_of_contents: Some(toc),
            current_chapter: 2,
            ..Default::default()
        };
        assert_eq!(route_chapters(&state), "next_chapter");
        state.current_chapter = 3;
        assert_eq!(route_chapters(&state), "finished");
    }

    #[test]
    fn mode_parses_cli_names() {
        assert_eq!(WorkflowMode::parse("simple"), Some(WorkflowMode::Simple));
        assert_eq!(
            WorkflowMode::parse("multi-agent"),
            Some(WorkflowMode::MultiAgent)
        );
        assert_eq!(WorkflowMode::parse("nope"), None);
    }
}
