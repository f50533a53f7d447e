use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::tempdir;

use scriptorium::state::BookType;
use scriptorium::{
    create_book_workflow, create_initial_book_state, create_initial_state,
    create_multi_agent_workflow, create_simple_workflow, ExportManager, Settings, WorkflowContext,
};
use scriptorium_graph::{
    ExecutionOptions, GraphState, InMemoryCheckpointer, RunOutcome,
};
use scriptorium_llm::{GenerateOptions, GenerationError, Message, TextGenerator};

/// Generator that replays a scripted transcript in order.
struct Scripted {
    responses: Mutex<VecDeque<String>>,
}

impl Scripted {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl TextGenerator for Scripted {
    async fn generate(
        &self,
        _messages: &[Message],
        _options: GenerateOptions,
    ) -> Result<String, GenerationError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GenerationError::Provider("script exhausted".to_string()))
    }
}

fn context(generator: Arc<dyn TextGenerator>, output_dir: &std::path::Path) -> WorkflowContext {
    WorkflowContext {
        settings: Settings::default(),
        generator,
        searcher: None,
        exporter: Arc::new(ExportManager::new(output_dir).unwrap()),
        observer: None,
    }
}

#[tokio::test]
async fn simple_workflow_continue_then_stop() {
    // Spec scenario: max_iterations=2; first draft, human continues once,
    // then stops. Terminates with iteration_count=1 and both passes in the
    // accumulated history.
    let dir = tempdir().unwrap();
    let generator = Scripted::new(&["draft one", "needs work", "draft two", "better"]);
    let ctx = context(generator, dir.path());
    let checkpointer = Arc::new(InMemoryCheckpointer::default());
    let graph = create_simple_workflow(&ctx, checkpointer).unwrap();

    let initial = create_initial_state("AI in healthcare", &ctx.settings, Some(2), None);
    let options = ExecutionOptions::for_thread("session-1");

    let outcome = graph.invoke(GraphState::new(initial), &options).await.unwrap();
    let RunOutcome::Suspended { node, interrupt } = outcome else {
        panic!("expected the draft intervention to suspend");
    };
    assert_eq!(node, "draft_intervention");
    assert!(interrupt.prompt.contains("draft one"));
    assert!(interrupt.prompt.contains("needs work"));

    let outcome = graph.resume("session-1", json!("continue")).await.unwrap();
    let RunOutcome::Suspended { interrupt, .. } = outcome else {
        panic!("expected a second intervention after the revision");
    };
    assert!(interrupt.prompt.contains("draft two"));

    let state = graph
        .resume("session-1", json!("stop"))
        .await
        .unwrap()
        .into_state()
        .unwrap()
        .data;

    assert_eq!(state.iteration_count, 1);
    assert_eq!(state.iterations.len(), 2);
    assert_eq!(state.iterations[0].draft, "draft one");
    assert_eq!(state.iterations[1].draft, "draft two");
    assert_eq!(state.current_draft, "draft two");
    assert_eq!(state.user_decision, "stop");
    assert_eq!(state.current_stage, "draft_decision_made");
}

#[tokio::test]
async fn draft_loop_is_bounded_by_max_iterations() {
    // The human keeps saying continue; the router exits at the limit anyway.
    let dir = tempdir().unwrap();
    let generator = Scripted::new(&["d1", "f1", "d2", "f2", "d3", "f3"]);
    let ctx = context(generator, dir.path());
    let checkpointer = Arc::new(InMemoryCheckpointer::default());
    let graph = create_simple_workflow(&ctx, checkpointer).unwrap();

    let initial = create_initial_state("topic", &ctx.settings, Some(2), None);
    let options = ExecutionOptions::for_thread("session-2");

    let mut outcome = graph.invoke(GraphState::new(initial), &options).await.unwrap();
    let mut resumes = 0;
    loop {
        match outcome {
            RunOutcome::Suspended { .. } => {
                resumes += 1;
                assert!(resumes <= 5, "loop failed to terminate");
                outcome = graph.resume("session-2", json!("continue")).await.unwrap();
            }
            RunOutcome::Complete(state) => {
                // The counter reaches the cap and the router exits, despite
                // the human never asking to stop.
                assert_eq!(state.data.iteration_count, 2);
                assert_eq!(state.data.iterations.len(), 2);
                assert_eq!(resumes, 2);
                break;
            }
        }
    }
}

const REJECTED_REVIEW: &str =
    r#"{"approved": false, "weaknesses": ["thin"], "overall_assessment": "too thin"}"#;

#[tokio::test]
async fn outline_loop_forces_proceed_after_budget() {
    // Spec scenario: max_outline_revisions=1 and a reviewer that never
    // approves. The first rejection loops back through revise; after the
    // second the router forces proceed no matter what the human answers.
    let dir = tempdir().unwrap();
    let generator = Scripted::new(&[
        r#"{"document_type": "blog_post", "target_audience": "nurses", "tone": "clear",
            "key_messages": [], "constraints": [], "objectives": ["inform"]}"#,
        "outline pass one",
        REJECTED_REVIEW,
        "outline pass two",
        REJECTED_REVIEW,
        "the draft",
        "the feedback",
    ]);
    let ctx = context(generator, dir.path());
    let checkpointer = Arc::new(InMemoryCheckpointer::default());
    let graph = create_multi_agent_workflow(&ctx, checkpointer).unwrap();

    let initial = create_initial_state("AI in healthcare", &ctx.settings, Some(2), Some(1));
    let options = ExecutionOptions::for_thread("session-3");

    let outcome = graph.invoke(GraphState::new(initial), &options).await.unwrap();
    let RunOutcome::Suspended { node, interrupt } = outcome else {
        panic!("expected the outline intervention to suspend");
    };
    assert_eq!(node, "outline_intervention");
    assert!(interrupt.prompt.contains("NEEDS REVISION"));

    // First revise request is honored.
    let outcome = graph.resume("session-3", json!("revise")).await.unwrap();
    let RunOutcome::Suspended { node, interrupt } = outcome else {
        panic!("expected a second outline intervention");
    };
    assert_eq!(node, "outline_intervention");
    assert!(interrupt.prompt.contains("Revisions made: 1 / 1"));

    // The human insists on another revision; the budget forces proceed, so
    // the run moves on to research (skipped) and drafting.
    let outcome = graph.resume("session-3", json!("revise")).await.unwrap();
    let RunOutcome::Suspended { node, .. } = outcome else {
        panic!("expected the draft intervention after the forced proceed");
    };
    assert_eq!(node, "draft_intervention");

    let state = graph
        .resume("session-3", json!("stop"))
        .await
        .unwrap()
        .into_state()
        .unwrap()
        .data;

    assert_eq!(state.outlines.len(), 2);
    assert_eq!(state.outline_reviews.len(), 2);
    assert!(!state.outline_reviews.iter().any(|review| review.approved));
    assert_eq!(state.current_draft, "the draft");
    // Research was skipped (no searcher configured) and is distinguishable
    // from a successful empty result by its stage entry.
    assert!(state.research_by_section.is_empty());
    assert!(state
        .conversation_history
        .iter()
        .any(|entry| entry.content.contains("Research skipped")));
}

#[tokio::test]
async fn approved_outline_goes_straight_to_writing() {
    let dir = tempdir().unwrap();
    let generator = Scripted::new(&[
        r#"{"document_type": "general", "target_audience": "anyone", "tone": "warm",
            "key_messages": [], "constraints": [], "objectives": []}"#,
        "outline refinement",
        r#"{"approved": true, "strengths": ["solid"], "overall_assessment": "good"}"#,
        "the draft",
        "the feedback",
    ]);
    let ctx = context(generator, dir.path());
    let checkpointer = Arc::new(InMemoryCheckpointer::default());
    let graph = create_multi_agent_workflow(&ctx, checkpointer).unwrap();

    let initial = create_initial_state("tea ceremonies", &ctx.settings, Some(2), Some(3));
    let options = ExecutionOptions::for_thread("session-4");

    let outcome = graph.invoke(GraphState::new(initial), &options).await.unwrap();
    let RunOutcome::Suspended { interrupt, .. } = outcome else {
        panic!("expected the outline intervention");
    };
    assert!(interrupt.prompt.contains("APPROVED"));

    let outcome = graph.resume("session-4", json!("proceed")).await.unwrap();
    let RunOutcome::Suspended { node, .. } = outcome else {
        panic!("expected the draft intervention");
    };
    assert_eq!(node, "draft_intervention");

    let state = graph
        .resume("session-4", json!("stop"))
        .await
        .unwrap()
        .into_state()
        .unwrap()
        .data;
    assert_eq!(state.outline_revision_count, 0);
    assert_eq!(state.outlines.len(), 1);
    assert_eq!(state.user_intent.as_ref().unwrap().document_type, "general");
}

#[tokio::test]
async fn book_workflow_writes_and_exports_every_chapter() {
    let dir = tempdir().unwrap();
    let generator = Scripted::new(&[
        // Planning: metadata, table of contents, glossary.
        r#"{"book_title": "Signals", "description": "About signals.",
            "target_audience": "engineers", "estimated_chapters": 2, "objectives": []}"#,
        "Chapter 1: Alpha\nSummary: Opening moves.\nEstimated Length: 1000-1500 words\nKey Topics: basics\n\nChapter 2: Beta\nSummary: Deeper waters.\nKey Topics: depth\n",
        "TERM: signal = A time-varying value.",
        // Chapter 1: draft, feedback, revision.
        "alpha draft",
        "alpha feedback",
        "alpha revised",
        // Chapter 2.
        "beta draft",
        "beta feedback",
        "beta revised",
    ]);
    let ctx = context(generator, dir.path());
    let checkpointer = Arc::new(InMemoryCheckpointer::default());
    let graph = create_book_workflow(&ctx, BookType::General, checkpointer).unwrap();

    let initial =
        create_initial_book_state("Signals", BookType::General, &ctx.settings, Some(2), None);
    let options = ExecutionOptions::for_thread("book-1");

    let outcome = graph.invoke(GraphState::new(initial), &options).await.unwrap();
    let RunOutcome::Suspended { node, interrupt } = outcome else {
        panic!("expected the table of contents intervention");
    };
    assert_eq!(node, "toc_intervention");
    assert!(interrupt.prompt.contains("Chapter 1: Alpha"));
    assert!(interrupt.prompt.contains("Chapter 2: Beta"));

    let state = graph
        .resume("book-1", json!("proceed"))
        .await
        .unwrap()
        .into_state()
        .unwrap()
        .data;

    assert_eq!(state.chapters.len(), 2);
    assert_eq!(state.chapters[0].title, "Alpha");
    assert_eq!(state.chapters[0].content, "alpha revised");
    assert_eq!(state.chapters[1].content, "beta revised");
    assert_eq!(state.exported_files.len(), 2);
    assert_eq!(state.current_stage, "chapter_exported");
    assert_eq!(state.glossary.len(), 1);

    // The files really exist and carry frontmatter plus the revised text.
    let first = std::path::Path::new(&state.exported_files[0]);
    assert!(first.ends_with("chapter-01-alpha.md"));
    let content = std::fs::read_to_string(first).unwrap();
    assert!(content.starts_with("---\nchapter: 1"));
    assert!(content.contains("alpha revised"));
}

#[tokio::test]
async fn tutorial_workflow_adds_examples_and_exercises() {
    let dir = tempdir().unwrap();
    let generator = Scripted::new(&[
        r#"{"book_title": "Learn Zig", "description": "Zig from zero.",
            "target_audience": "beginners", "estimated_chapters": 1, "objectives": []}"#,
        "Chapter 1: Hello\nSummary: First program.\nKey Topics: setup\n",
        "TERM: comptime = Compile-time execution.",
        // Chapter 1 pipeline: draft, code examples, exercises, feedback,
        // revision.
        "hello draft",
        "Here you go:\n```zig\nconst x = 1;\n```\n",
        r#"{"multiple_choice": [{"question": "q?", "options": ["a", "b"], "answer": "a"}],
            "fill_in_blank": [], "coding_challenges": []}"#,
        "hello feedback",
        "hello revised",
    ]);
    let ctx = context(generator, dir.path());
    let checkpointer = Arc::new(InMemoryCheckpointer::default());
    let graph = create_book_workflow(&ctx, BookType::Tutorial, checkpointer).unwrap();

    let initial =
        create_initial_book_state("Learn Zig", BookType::Tutorial, &ctx.settings, Some(1), None);
    let options = ExecutionOptions::for_thread("tutorial-1");

    graph
        .invoke(GraphState::new(initial), &options)
        .await
        .unwrap();
    let state = graph
        .resume("tutorial-1", json!("proceed"))
        .await
        .unwrap()
        .into_state()
        .unwrap()
        .data;

    assert_eq!(state.chapters.len(), 1);
    let exported = std::fs::read_to_string(&state.exported_files[0]).unwrap();
    assert!(exported.contains("## Code Examples"));
    assert!(exported.contains("const x = 1;"));
    assert!(exported.contains("## Exercises"));
    assert!(exported.contains("q?"));
    // Per-chapter scratch fields were cleared by the export step.
    assert!(state.current_code_examples.is_empty());
    assert!(state.current_exercises.is_empty());
}

#[tokio::test]
async fn toc_revision_replans_the_book() {
    let dir = tempdir().unwrap();
    let generator = Scripted::new(&[
        // First planning round.
        r#"{"book_title": "Gardens", "description": "d", "target_audience": "t",
            "estimated_chapters": 1, "objectives": []}"#,
        "Chapter 1: Seeds\nSummary: s\n",
        "TERM: loam = Rich soil.",
        // Second planning round after the human asks for a revision.
        r#"{"book_title": "Gardens", "description": "d", "target_audience": "t",
            "estimated_chapters": 1, "objectives": []}"#,
        "Chapter 1: Soil First\nSummary: s\n",
        "TERM: loam = Rich soil.",
        // Chapter pipeline.
        "draft",
        "feedback",
        "revised",
    ]);
    let ctx = context(generator, dir.path());
    let checkpointer = Arc::new(InMemoryCheckpointer::default());
    let graph = create_book_workflow(&ctx, BookType::General, checkpointer).unwrap();

    let initial =
        create_initial_book_state("Gardens", BookType::General, &ctx.settings, Some(1), Some(2));
    let options = ExecutionOptions::for_thread("book-2");

    graph
        .invoke(GraphState::new(initial), &options)
        .await
        .unwrap();
    let outcome = graph.resume("book-2", json!("revise")).await.unwrap();
    let RunOutcome::Suspended { interrupt, .. } = outcome else {
        panic!("expected a second toc intervention");
    };
    assert!(interrupt.prompt.contains("Soil First"));

    let state = graph
        .resume("book-2", json!("proceed"))
        .await
        .unwrap()
        .into_state()
        .unwrap()
        .data;
    assert_eq!(state.toc_revision_count, 1);
    assert_eq!(state.chapters[0].title, "Soil First");
}
