use std::sync::Arc;

use async_trait::async_trait;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};
use scriptorium_llm::{GenerateOptions, GenerationError, Message, TextGenerator};

use crate::state::{
    ContentOutline, ConversationEntry, UserIntentAnalysis, WorkflowState, WorkflowUpdate,
};

const SYSTEM_PROMPT: &str = "You are a rigorous editor. Review the draft for structure, clarity, \
accuracy and tone. Give specific, actionable feedback as a short numbered list, most important \
issue first. Do not rewrite the draft.";

/// Review agent; runs cold for analytical, repeatable feedback.
pub struct Editor {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl Editor {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }

    pub async fn review_draft(
        &self,
        draft: &str,
        topic: &str,
        outline: Option<&ContentOutline>,
        intent: Option<&UserIntentAnalysis>,
        iteration: u32,
    ) -> Result<String, GenerationError> {
        let mut request = format!("Topic: {topic}\nRevision pass: {iteration}\n");
        if let Some(intent) = intent {
            request.push_str(&format!(
                "Intended audience: {}\nIntended tone: {}\n",
                intent.target_audience, intent.tone
            ));
        }
        if let Some(outline) = outline {
            request.push_str("\nThe draft should follow this outline:\n");
            for section in &outline.sections {
                request.push_str(&format!("- {}: {}\n", section.title, section.purpose));
            }
        }
        request.push_str(&format!("\nDraft to review:\n\n{draft}"));

        let messages = [Message::system(SYSTEM_PROMPT), Message::user(request)];
        self.generator.generate(&messages, self.options).await
    }
}

#[async_trait]
impl Node<WorkflowState> for Editor {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &WorkflowState,
    ) -> Result<NodeOutput<WorkflowState>, NodeError> {
        let feedback = self
            .review_draft(
                &state.current_draft,
                &state.topic,
                state.current_outline.as_ref(),
                state.user_intent.as_ref(),
                state.iteration_count,
            )
            .await?;

        Ok(NodeOutput::Update(WorkflowUpdate {
            current_feedback: Some(feedback.clone()),
            conversation_history: vec![ConversationEntry::new("editor", feedback)],
            current_stage: Some("draft_reviewed".to_string()),
            ..Default::default()
        }))
    }
}
