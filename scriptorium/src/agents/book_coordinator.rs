use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};
use scriptorium_llm::{GenerateOptions, Message, TextGenerator};

use crate::parse::{labeled_line, parse_json_lenient};
use crate::state::{
    BookMetadata, BookState, BookType, BookUpdate, ConversationEntry, GlossaryTerm,
    TableOfContents, TocChapter,
};

const SYSTEM_PROMPT: &str = "You plan books: metadata, chapter structure and terminology. Follow \
the requested output format exactly.";

#[derive(Deserialize, Default)]
struct MetadataReply {
    #[serde(default)]
    book_title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    target_audience: String,
    #[serde(default)]
    estimated_chapters: u32,
    #[serde(default)]
    objectives: Vec<String>,
}

/// Book planning agent: requirements analysis, table of contents, glossary.
/// Every stage tolerates an unusable model reply by falling back to a
/// serviceable default plan.
pub struct BookCoordinator {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
    default_chapters: u32,
}

impl BookCoordinator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        temperature: f32,
        max_tokens: u32,
        default_chapters: u32,
    ) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
            default_chapters,
        }
    }

    pub async fn analyze_requirements(
        &self,
        topic: &str,
        book_type: BookType,
        chapters_override: Option<u32>,
    ) -> BookMetadata {
        let request = format!(
            "Plan a {} book about: {topic}\n\nAnswer with a single JSON object with the keys: \
book_title, description (2-3 sentences), target_audience, estimated_chapters (number), \
objectives (array). No other text.",
            book_type.label(),
        );
        let reply = match self
            .generator
            .generate(
                &[Message::system(SYSTEM_PROMPT), Message::user(request)],
                self.options,
            )
            .await
        {
            Ok(response) => parse_json_lenient::<MetadataReply>(&response).unwrap_or_default(),
            Err(err) => {
                tracing::warn!(error = %err, "book requirements analysis failed, using defaults");
                MetadataReply::default()
            }
        };

        let estimated_chapters = chapters_override
            .or((reply.estimated_chapters > 0).then_some(reply.estimated_chapters))
            .unwrap_or(self.default_chapters);
        BookMetadata {
            book_title: if reply.book_title.is_empty() {
                topic.to_string()
            } else {
                reply.book_title
            },
            description: reply.description,
            target_audience: if reply.target_audience.is_empty() {
                "General readers".to_string()
            } else {
                reply.target_audience
            },
            estimated_chapters,
            objectives: reply.objectives,
        }
    }

    pub async fn generate_table_of_contents(
        &self,
        metadata: &BookMetadata,
        book_type: BookType,
    ) -> TableOfContents {
        let chapters = metadata.estimated_chapters;
        let request = format!(
            "Create a table of contents with {chapters} chapters for the {} book \
\"{}\" ({}).\n\nFormat each chapter exactly as:\n\
Chapter 1: <title>\nSummary: <2-3 sentences>\nEstimated Length: <e.g. 2000-3000 words>\n\
Key Topics: <topic, topic, topic>\n\nEnsure logical progression from first to last chapter.",
            book_type.label(),
            metadata.book_title,
            metadata.description,
        );
        let parsed = match self
            .generator
            .generate(
                &[Message::system(SYSTEM_PROMPT), Message::user(request)],
                self.options,
            )
            .await
        {
            Ok(response) => parse_table_of_contents(&response, chapters),
            Err(err) => {
                tracing::warn!(error = %err, "table of contents generation failed, using defaults");
                TableOfContents::default()
            }
        };

        if parsed.chapters.is_empty() {
            fallback_toc(&metadata.book_title, chapters)
        } else {
            parsed
        }
    }

    pub async fn build_glossary(&self, metadata: &BookMetadata) -> Vec<GlossaryTerm> {
        let request = format!(
            "List the 8-12 core terms a reader of \"{}\" must know. One per line, formatted \
exactly as 'TERM: <term> = <one-sentence definition>'.",
            metadata.book_title,
        );
        match self
            .generator
            .generate(
                &[Message::system(SYSTEM_PROMPT), Message::user(request)],
                self.options,
            )
            .await
        {
            Ok(response) => parse_glossary(&response),
            Err(err) => {
                tracing::warn!(error = %err, "glossary generation failed, continuing without one");
                Vec::new()
            }
        }
    }
}

fn parse_table_of_contents(response: &str, expected_chapters: u32) -> TableOfContents {
    let mut chapters: Vec<TocChapter> = Vec::new();
    let mut current: Option<TocChapter> = None;

    for line in response.lines() {
        let trimmed = line.trim().trim_start_matches(['#', '*', ' ']);
        if let Some(rest) = trimmed.strip_prefix("Chapter ") {
            if let Some((_, title)) = rest.split_once(':') {
                if let Some(done) = current.take() {
                    chapters.push(done);
                }
                current = Some(TocChapter {
                    number: chapters.len() as u32 + 1,
                    title: title.trim().to_string(),
                    summary: String::new(),
                    estimated_length: String::new(),
                    key_topics: Vec::new(),
                });
                continue;
            }
        }
        let Some(chapter) = current.as_mut() else {
            continue;
        };
        if let Some(summary) = labeled_line(line, "Summary") {
            chapter.summary = summary.to_string();
        } else if let Some(length) = labeled_line(line, "Estimated Length") {
            chapter.estimated_length = length.to_string();
        } else if let Some(topics) = labeled_line(line, "Key Topics") {
            chapter.key_topics = topics
                .split(',')
                .map(|topic| topic.trim().to_string())
                .filter(|topic| !topic.is_empty())
                .collect();
        }
    }
    if let Some(done) = current.take() {
        chapters.push(done);
    }

    chapters.truncate(expected_chapters as usize);
    TableOfContents { chapters }
}

fn fallback_toc(book_title: &str, chapters: u32) -> TableOfContents {
    TableOfContents {
        chapters: (1..=chapters)
            .map(|number| TocChapter {
                number,
                title: format!("{book_title}, Part {number}"),
                summary: String::new(),
                estimated_length: "2000-3000 words".to_string(),
                key_topics: Vec::new(),
            })
            .collect(),
    }
}

fn parse_glossary(response: &str) -> Vec<GlossaryTerm> {
    response
        .lines()
        .filter_map(|line| labeled_line(line, "TERM"))
        .filter_map(|entry| {
            let (term, definition) = entry.split_once('=')?;
            let term = term.trim();
            let definition = definition.trim();
            (!term.is_empty() && !definition.is_empty()).then(|| GlossaryTerm {
                term: term.to_string(),
                definition: definition.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl Node<BookState> for BookCoordinator {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &BookState,
    ) -> Result<NodeOutput<BookState>, NodeError> {
        let chapters_override = state.requested_chapters.or(state
            .book_metadata
            .as_ref()
            .map(|metadata| metadata.estimated_chapters));
        let metadata = self
            .analyze_requirements(&state.topic, state.book_type, chapters_override)
            .await;
        let toc = self
            .generate_table_of_contents(&metadata, state.book_type)
            .await;
        let glossary = self.build_glossary(&metadata).await;

        let summary = format!(
            "Planned \"{}\": {} chapters, {} glossary terms",
            metadata.book_title,
            toc.chapters.len(),
            glossary.len()
        );
        Ok(NodeOutput::Update(BookUpdate {
            book_metadata: Some(metadata),
            table_of_contents: Some(toc),
            glossary: Some(glossary),
            current_chapter: Some(1),
            conversation_history: vec![ConversationEntry::new("book_coordinator", summary)],
            current_stage: Some("planning".to_string()),
            ..Default::default()
        }))
    }
}
