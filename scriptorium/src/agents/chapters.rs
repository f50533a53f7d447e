//! Per-chapter pipeline of the book and tutorial workflows: draft, enrich
//! (tutorial only), review, revise, export.

use std::sync::Arc;

use async_trait::async_trait;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};
use scriptorium_llm::{GenerateOptions, Message, TextGenerator};

use crate::export::ExportManager;
use crate::parse::{extract_code_blocks, parse_json_lenient};
use crate::state::{
    now, BookState, BookUpdate, ChapterExercises, ChapterRecord, CodeExample, ConversationEntry,
    TocChapter,
};

const WRITER_PROMPT: &str = "You write book chapters. Produce complete, flowing chapter prose in \
markdown, building on what earlier chapters covered. Output only the chapter text.";

const EDITOR_PROMPT: &str = "You are a book editor. Review the chapter for clarity, pacing, \
correctness and fit with its planned scope. Give specific, actionable feedback as a short \
numbered list. Do not rewrite the chapter.";

fn current_toc_chapter(state: &BookState) -> Result<TocChapter, NodeError> {
    let toc = state
        .table_of_contents
        .as_ref()
        .ok_or("chapter pipeline needs a table of contents")?;
    let index = state
        .current_chapter
        .checked_sub(1)
        .ok_or("current chapter index is unset")? as usize;
    toc.chapters
        .get(index)
        .cloned()
        .ok_or_else(|| format!("no chapter {} in the table of contents", state.current_chapter).into())
}

/// Drafts the chapter named by `current_chapter` from its plan entry.
pub struct ChapterWriter {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl ChapterWriter {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }
}

#[async_trait]
impl Node<BookState> for ChapterWriter {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &BookState,
    ) -> Result<NodeOutput<BookState>, NodeError> {
        let chapter = current_toc_chapter(state)?;
        let title = state
            .book_metadata
            .as_ref()
            .map(|metadata| metadata.book_title.clone())
            .unwrap_or_else(|| state.topic.clone());

        let mut request = format!(
            "Book: {title}\nChapter {} of {}: {}\n",
            chapter.number,
            state
                .table_of_contents
                .as_ref()
                .map(|toc| toc.chapters.len())
                .unwrap_or_default(),
            chapter.title,
        );
        if !chapter.summary.is_empty() {
            request.push_str(&format!("Planned scope: {}\n", chapter.summary));
        }
        if !chapter.key_topics.is_empty() {
            request.push_str(&format!("Cover: {}\n", chapter.key_topics.join(", ")));
        }
        if !chapter.estimated_length.is_empty() {
            request.push_str(&format!("Target length: {}\n", chapter.estimated_length));
        }
        if !state.chapters.is_empty() {
            let covered: Vec<&str> = state
                .chapters
                .iter()
                .map(|done| done.title.as_str())
                .collect();
            request.push_str(&format!("Already covered: {}\n", covered.join("; ")));
        }
        if !state.glossary.is_empty() {
            request.push_str("Use this terminology consistently:\n");
            for term in &state.glossary {
                request.push_str(&format!("- {}: {}\n", term.term, term.definition));
            }
        }

        let draft = self
            .generator
            .generate(
                &[Message::system(WRITER_PROMPT), Message::user(request)],
                self.options,
            )
            .await?;

        Ok(NodeOutput::Update(BookUpdate {
            current_chapter_draft: Some(draft),
            conversation_history: vec![ConversationEntry::new(
                "chapter_writer",
                format!("Drafted chapter {}: {}", chapter.number, chapter.title),
            )],
            current_stage: Some("chapter_drafted".to_string()),
            ..Default::default()
        }))
    }
}

/// Tutorial-mode enrichment: runnable code examples for the current chapter.
/// A dead backend degrades to no examples rather than failing the chapter.
pub struct CodeExampleGenerator {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl CodeExampleGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }
}

#[async_trait]
impl Node<BookState> for CodeExampleGenerator {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &BookState,
    ) -> Result<NodeOutput<BookState>, NodeError> {
        let chapter = current_toc_chapter(state)?;
        let request = format!(
            "Write 2-3 short, self-contained code examples for a tutorial chapter titled \
\"{}\" covering: {}. Put each example in its own fenced code block with a one-line comment \
saying what it shows.",
            chapter.title,
            chapter.key_topics.join(", "),
        );

        let examples = match self
            .generator
            .generate(
                &[Message::system(WRITER_PROMPT), Message::user(request)],
                self.options,
            )
            .await
        {
            Ok(response) => extract_code_blocks(&response)
                .into_iter()
                .map(|(language, code)| CodeExample {
                    description: language,
                    code,
                })
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "code example generation failed, continuing without");
                Vec::new()
            }
        };

        let summary = format!("Generated {} code examples", examples.len());
        Ok(NodeOutput::Update(BookUpdate {
            current_code_examples: Some(examples),
            conversation_history: vec![ConversationEntry::new("code_examples", summary)],
            current_stage: Some("code_examples_ready".to_string()),
            ..Default::default()
        }))
    }
}

/// Tutorial-mode enrichment: an exercise set for the current chapter.
pub struct ExerciseGenerator {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl ExerciseGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }
}

#[async_trait]
impl Node<BookState> for ExerciseGenerator {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &BookState,
    ) -> Result<NodeOutput<BookState>, NodeError> {
        let chapter = current_toc_chapter(state)?;
        let request = format!(
            "Create exercises for a tutorial chapter titled \"{}\". Answer with a single JSON \
object: multiple_choice (array of {{question, options, answer}}), fill_in_blank (array of \
{{prompt, answer}}), coding_challenges (array of {{prompt, solution}}). 2-3 of each. No other \
text.",
            chapter.title,
        );

        let exercises = match self
            .generator
            .generate(
                &[Message::system(WRITER_PROMPT), Message::user(request)],
                self.options,
            )
            .await
        {
            Ok(response) => {
                parse_json_lenient::<ChapterExercises>(&response).unwrap_or_default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "exercise generation failed, continuing without");
                ChapterExercises::default()
            }
        };

        let summary = format!(
            "Generated {} multiple choice, {} fill-in, {} coding exercises",
            exercises.multiple_choice.len(),
            exercises.fill_in_blank.len(),
            exercises.coding_challenges.len()
        );
        Ok(NodeOutput::Update(BookUpdate {
            current_exercises: Some(exercises),
            conversation_history: vec![ConversationEntry::new("exercises", summary)],
            current_stage: Some("exercises_ready".to_string()),
            ..Default::default()
        }))
    }
}

/// One editorial pass over the current chapter draft.
pub struct ChapterEditor {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl ChapterEditor {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }
}

#[async_trait]
impl Node<BookState> for ChapterEditor {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &BookState,
    ) -> Result<NodeOutput<BookState>, NodeError> {
        let chapter = current_toc_chapter(state)?;
        let request = format!(
            "Chapter {} (\"{}\") planned scope: {}\n\nChapter draft:\n\n{}",
            chapter.number, chapter.title, chapter.summary, state.current_chapter_draft,
        );
        let feedback = self
            .generator
            .generate(
                &[Message::system(EDITOR_PROMPT), Message::user(request)],
                self.options,
            )
            .await?;

        Ok(NodeOutput::Update(BookUpdate {
            current_chapter_feedback: Some(feedback.clone()),
            conversation_history: vec![ConversationEntry::new("chapter_editor", feedback)],
            current_stage: Some("chapter_reviewed".to_string()),
            ..Default::default()
        }))
    }
}

/// Applies the editorial feedback in one revision pass.
pub struct ChapterReviser {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl ChapterReviser {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }
}

#[async_trait]
impl Node<BookState> for ChapterReviser {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &BookState,
    ) -> Result<NodeOutput<BookState>, NodeError> {
        let request = format!(
            "Here is a chapter draft:\n\n{}\n\nHere is the editor's feedback:\n\n{}\n\n\
Revise the chapter to address every point. Output the full revised chapter.",
            state.current_chapter_draft, state.current_chapter_feedback,
        );
        let revised = self
            .generator
            .generate(
                &[Message::system(WRITER_PROMPT), Message::user(request)],
                self.options,
            )
            .await?;

        Ok(NodeOutput::Update(BookUpdate {
            current_chapter_draft: Some(revised),
            current_stage: Some("chapter_revised".to_string()),
            ..Default::default()
        }))
    }
}

/// Writes the finished chapter to disk, records it, and advances the loop.
/// Export failures propagate; the checkpoint before this node makes the
/// export retryable without redrafting.
pub struct ExportChapter {
    exporter: Arc<ExportManager>,
}

impl ExportChapter {
    pub fn new(exporter: Arc<ExportManager>) -> Self {
        Self { exporter }
    }
}

#[async_trait]
impl Node<BookState> for ExportChapter {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &BookState,
    ) -> Result<NodeOutput<BookState>, NodeError> {
        let chapter = current_toc_chapter(state)?;
        let path = self.exporter.export_chapter(
            chapter.number,
            &chapter.title,
            &state.current_chapter_draft,
            &state.current_code_examples,
            &state.current_exercises,
        )?;

        let record = ChapterRecord {
            number: chapter.number,
            title: chapter.title.clone(),
            content: state.current_chapter_draft.clone(),
            feedback: state.current_chapter_feedback.clone(),
            timestamp: now(),
        };

        Ok(NodeOutput::Update(BookUpdate {
            chapters: vec![record],
            exported_files: vec![path.display().to_string()],
            current_chapter: Some(state.current_chapter + 1),
            current_chapter_draft: Some(String::new()),
            current_chapter_feedback: Some(String::new()),
            current_code_examples: Some(Vec::new()),
            current_exercises: Some(ChapterExercises::default()),
            conversation_history: vec![ConversationEntry::new(
                "export",
                format!("Exported chapter {} to {}", chapter.number, path.display()),
            )],
            current_stage: Some("chapter_exported".to_string()),
            ..Default::default()
        }))
    }
}
