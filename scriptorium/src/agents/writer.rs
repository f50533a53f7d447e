use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};
use scriptorium_llm::{GenerateOptions, GenerationError, Message, TextGenerator};

use crate::state::{
    now, ContentOutline, ConversationEntry, ReviewIteration, SectionResearch, UserIntentAnalysis,
    WorkflowState, WorkflowUpdate,
};

const SYSTEM_PROMPT: &str = "You are a professional writer. Produce clear, well-structured, \
engaging prose with an introduction, body and conclusion. Address every feedback point you are \
given. Output only the draft itself, no meta-commentary.";

/// Drafting agent. Runs hot (creative temperature) and covers three modes:
/// first draft from a bare topic, first draft from an approved outline plus
/// research, and revision against editor feedback.
pub struct Writer {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl Writer {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }

    pub async fn create_initial_draft(&self, topic: &str) -> Result<String, GenerationError> {
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(format!("Write a draft article about: {topic}")),
        ];
        self.generator.generate(&messages, self.options).await
    }

    pub async fn create_draft_from_outline(
        &self,
        topic: &str,
        outline: &ContentOutline,
        intent: &UserIntentAnalysis,
        research: &HashMap<String, SectionResearch>,
    ) -> Result<String, GenerationError> {
        let mut brief = format!(
            "Write a complete draft about: {topic}\n\nAudience: {}\nTone: {}\n\nFollow this outline:\n",
            intent.target_audience, intent.tone
        );
        for section in &outline.sections {
            brief.push_str(&format!(
                "\n## {} ({})\nPurpose: {}\nCover: {}\n",
                section.title,
                section.estimated_length,
                section.purpose,
                section.key_points.join("; "),
            ));
            if let Some(section_research) = research.get(&section.section_id) {
                if !section_research.summary.is_empty() {
                    brief.push_str(&format!("Research notes: {}\n", section_research.summary));
                }
                for fact in &section_research.key_facts {
                    brief.push_str(&format!("- {fact}\n"));
                }
            }
        }
        let messages = [Message::system(SYSTEM_PROMPT), Message::user(brief)];
        self.generator.generate(&messages, self.options).await
    }

    pub async fn revise_draft(
        &self,
        current_draft: &str,
        feedback: &str,
    ) -> Result<String, GenerationError> {
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(format!(
                "Here is the current draft:\n\n{current_draft}\n\nHere is the editor's \
feedback:\n\n{feedback}\n\nRevise the draft to address every point. Output the full revised draft."
            )),
        ];
        self.generator.generate(&messages, self.options).await
    }
}

#[async_trait]
impl Node<WorkflowState> for Writer {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &WorkflowState,
    ) -> Result<NodeOutput<WorkflowState>, NodeError> {
        let draft = match (
            state.iteration_count,
            &state.current_outline,
            &state.user_intent,
        ) {
            (0, Some(outline), Some(intent)) => {
                self.create_draft_from_outline(
                    &state.topic,
                    outline,
                    intent,
                    &state.research_by_section,
                )
                .await?
            }
            (0, _, _) => self.create_initial_draft(&state.topic).await?,
            _ => {
                self.revise_draft(&state.current_draft, &state.current_feedback)
                    .await?
            }
        };

        let iteration = ReviewIteration {
            iteration_number: state.iteration_count,
            draft: draft.clone(),
            feedback: None,
            timestamp: now(),
        };

        Ok(NodeOutput::Update(WorkflowUpdate {
            current_draft: Some(draft.clone()),
            iterations: vec![iteration],
            conversation_history: vec![ConversationEntry::new("writer", draft)],
            current_stage: Some("draft_created".to_string()),
            ..Default::default()
        }))
    }
}
