//! Shared workflow state and the per-field merge schema.
//!
//! Two schemas: [`WorkflowState`] drives the article modes (simple and
//! multi-agent), [`BookState`] drives the chapter pipeline. Accumulating
//! fields (iterations, reviews, history, research, chapters) only ever
//! append; everything else is last-write-wins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use scriptorium_graph::{AppendVec, Override, StateSchema};
use scriptorium_search::SearchResult;

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationEntry {
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

impl ConversationEntry {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: now(),
        }
    }
}

/// One pass through the draft/review loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewIteration {
    pub iteration_number: u32,
    pub draft: String,
    pub feedback: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserIntentAnalysis {
    pub document_type: String,
    pub target_audience: String,
    pub tone: String,
    pub key_messages: Vec<String>,
    pub constraints: Vec<String>,
    pub objectives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutlineSection {
    pub section_id: String,
    pub title: String,
    pub purpose: String,
    pub key_points: Vec<String>,
    pub estimated_length: String,
    pub research_needed: bool,
    pub search_queries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentOutline {
    pub version: u32,
    pub sections: Vec<OutlineSection>,
    pub overall_structure: String,
    pub estimated_total_length: String,
    pub template_used: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutlineReview {
    pub version_reviewed: u32,
    pub approved: bool,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub overall_assessment: String,
    pub timestamp: String,
}

/// Research gathered for one outline section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionResearch {
    pub section_id: String,
    pub summary: String,
    pub key_facts: Vec<String>,
    pub sources: Vec<SearchResult>,
}

/// State of the article workflows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkflowState {
    pub topic: String,
    pub current_draft: String,
    pub current_feedback: String,
    pub iterations: Vec<ReviewIteration>,
    pub iteration_count: u32,
    pub user_decision: String,
    pub max_iterations: u32,
    pub conversation_history: Vec<ConversationEntry>,
    pub user_intent: Option<UserIntentAnalysis>,
    pub outlines: Vec<ContentOutline>,
    pub current_outline: Option<ContentOutline>,
    pub outline_version: u32,
    pub outline_reviews: Vec<OutlineReview>,
    pub current_outline_review: Option<OutlineReview>,
    pub outline_revision_count: u32,
    pub max_outline_revisions: u32,
    pub research_data: Vec<SectionResearch>,
    pub research_by_section: HashMap<String, SectionResearch>,
    pub current_stage: String,
}

/// Partial update to [`WorkflowState`]. `None` leaves a scalar untouched;
/// the `Vec` fields append.
#[derive(Debug, Clone, Default)]
pub struct WorkflowUpdate {
    pub current_draft: Option<String>,
    pub current_feedback: Option<String>,
    pub iterations: Vec<ReviewIteration>,
    pub iteration_count: Option<u32>,
    pub user_decision: Option<String>,
    pub conversation_history: Vec<ConversationEntry>,
    pub user_intent: Option<UserIntentAnalysis>,
    pub outlines: Vec<ContentOutline>,
    pub current_outline: Option<ContentOutline>,
    pub outline_version: Option<u32>,
    pub outline_reviews: Vec<OutlineReview>,
    pub current_outline_review: Option<OutlineReview>,
    pub outline_revision_count: Option<u32>,
    pub research_data: Vec<SectionResearch>,
    pub research_by_section: Option<HashMap<String, SectionResearch>>,
    pub current_stage: Option<String>,
}

impl StateSchema for WorkflowState {
    type Update = WorkflowUpdate;

    fn apply(&mut self, update: WorkflowUpdate) {
        if let Some(value) = update.current_draft {
            self.current_draft = Override::merge(&self.current_draft, value);
        }
        if let Some(value) = update.current_feedback {
            self.current_feedback = Override::merge(&self.current_feedback, value);
        }
        self.iterations = AppendVec::merge(&self.iterations, update.iterations);
        if let Some(value) = update.iteration_count {
            self.iteration_count = Override::merge(&self.iteration_count, value);
        }
        if let Some(value) = update.user_decision {
            self.user_decision = Override::merge(&self.user_decision, value);
        }
        self.conversation_history =
            AppendVec::merge(&self.conversation_history, update.conversation_history);
        if let Some(value) = update.user_intent {
            self.user_intent = Some(value);
        }
        self.outlines = AppendVec::merge(&self.outlines, update.outlines);
        if let Some(value) = update.current_outline {
            self.current_outline = Some(value);
        }
        if let Some(value) = update.outline_version {
            self.outline_version = Override::merge(&self.outline_version, value);
        }
        self.outline_reviews = AppendVec::merge(&self.outline_reviews, update.outline_reviews);
        if let Some(value) = update.current_outline_review {
            self.current_outline_review = Some(value);
        }
        if let Some(value) = update.outline_revision_count {
            self.outline_revision_count = Override::merge(&self.outline_revision_count, value);
        }
        self.research_data = AppendVec::merge(&self.research_data, update.research_data);
        if let Some(value) = update.research_by_section {
            self.research_by_section = Override::merge(&self.research_by_section, value);
        }
        if let Some(value) = update.current_stage {
            self.current_stage = Override::merge(&self.current_stage, value);
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookType {
    History,
    TechnicalGuide,
    Tutorial,
    #[default]
    General,
}

impl BookType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "history" => Some(BookType::History),
            "technical_guide" | "technical-guide" => Some(BookType::TechnicalGuide),
            "tutorial" => Some(BookType::Tutorial),
            "general" => Some(BookType::General),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookType::History => "history",
            BookType::TechnicalGuide => "technical guide",
            BookType::Tutorial => "tutorial",
            BookType::General => "general",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookMetadata {
    pub book_title: String,
    pub description: String,
    pub target_audience: String,
    pub estimated_chapters: u32,
    pub objectives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TocChapter {
    pub number: u32,
    pub title: String,
    pub summary: String,
    pub estimated_length: String,
    pub key_topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TableOfContents {
    pub chapters: Vec<TocChapter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeExample {
    pub description: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultipleChoice {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FillInBlank {
    pub prompt: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodingChallenge {
    pub prompt: String,
    pub solution: String,
}

/// Parsed from model output, so every section is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChapterExercises {
    #[serde(default)]
    pub multiple_choice: Vec<MultipleChoice>,
    #[serde(default)]
    pub fill_in_blank: Vec<FillInBlank>,
    #[serde(default)]
    pub coding_challenges: Vec<CodingChallenge>,
}

impl ChapterExercises {
    pub fn is_empty(&self) -> bool {
        self.multiple_choice.is_empty()
            && self.fill_in_blank.is_empty()
            && self.coding_challenges.is_empty()
    }
}

/// A finished chapter as it entered the export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterRecord {
    pub number: u32,
    pub title: String,
    pub content: String,
    pub feedback: String,
    pub timestamp: String,
}

/// State of the book/tutorial workflows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookState {
    pub topic: String,
    pub book_type: BookType,
    /// Chapter-count override from the caller; None lets the planner decide.
    pub requested_chapters: Option<u32>,
    pub user_decision: String,
    pub book_metadata: Option<BookMetadata>,
    pub table_of_contents: Option<TableOfContents>,
    pub glossary: Vec<GlossaryTerm>,
    pub toc_revision_count: u32,
    pub max_toc_revisions: u32,
    /// 1-based index of the chapter currently in production.
    pub current_chapter: u32,
    pub current_chapter_draft: String,
    pub current_chapter_feedback: String,
    pub current_code_examples: Vec<CodeExample>,
    pub current_exercises: ChapterExercises,
    pub chapters: Vec<ChapterRecord>,
    pub exported_files: Vec<String>,
    pub conversation_history: Vec<ConversationEntry>,
    pub current_stage: String,
}

#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub user_decision: Option<String>,
    pub book_metadata: Option<BookMetadata>,
    pub table_of_contents: Option<TableOfContents>,
    /// Replaced wholesale: the glossary is regenerated per planning round.
    pub glossary: Option<Vec<GlossaryTerm>>,
    pub toc_revision_count: Option<u32>,
    pub current_chapter: Option<u32>,
    pub current_chapter_draft: Option<String>,
    pub current_chapter_feedback: Option<String>,
    pub current_code_examples: Option<Vec<CodeExample>>,
    pub current_exercises: Option<ChapterExercises>,
    pub chapters: Vec<ChapterRecord>,
    pub exported_files: Vec<String>,
    pub conversation_history: Vec<ConversationEntry>,
    pub current_stage: Option<String>,
}

impl StateSchema for BookState {
    type Update = BookUpdate;

    fn apply(&mut self, update: BookUpdate) {
        if let Some(value) = update.user_decision {
            self.user_decision = Override::merge(&self.user_decision, value);
        }
        if let Some(value) = update.book_metadata {
            self.book_metadata = Some(value);
        }
        if let Some(value) = update.table_of_contents {
            self.table_of_contents = Some(value);
        }
        if let Some(value) = update.glossary {
            self.glossary = Override::merge(&self.glossary, value);
        }
        if let Some(value) = update.toc_revision_count {
            self.toc_revision_count = Override::merge(&self.toc_revision_count, value);
        }
        if let Some(value) = update.current_chapter {
            self.current_chapter = Override::merge(&self.current_chapter, value);
        }
        if let Some(value) = update.current_chapter_draft {
            self.current_chapter_draft = Override::merge(&self.current_chapter_draft, value);
        }
        if let Some(value) = update.current_chapter_feedback {
            self.current_chapter_feedback =
                Override::merge(&self.current_chapter_feedback, value);
        }
        if let Some(value) = update.current_code_examples {
            self.current_code_examples = Override::merge(&self.current_code_examples, value);
        }
        if let Some(value) = update.current_exercises {
            self.current_exercises = Override::merge(&self.current_exercises, value);
        }
        self.chapters = AppendVec::merge(&self.chapters, update.chapters);
        self.exported_files = AppendVec::merge(&self.exported_files, update.exported_files);
        self.conversation_history =
            AppendVec::merge(&self.conversation_history, update.conversation_history);
        if let Some(value) = update.current_stage {
            self.current_stage = Override::merge(&self.current_stage, value);
        }
    }
}
