use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};
use scriptorium_llm::{GenerateOptions, Message, TextGenerator};

use crate::parse::parse_json_lenient;
use crate::state::{ConversationEntry, UserIntentAnalysis, WorkflowState, WorkflowUpdate};

const SYSTEM_PROMPT: &str = "You analyze writing requests. From the topic alone, infer what kind \
of document the requester wants, for whom, and in what tone. Answer with a single JSON object \
with the keys: document_type (blog_post | technical_guide | tutorial | general), target_audience, \
tone, key_messages (array), constraints (array), objectives (array). No other text.";

#[derive(Deserialize, Default)]
struct IntentReply {
    #[serde(default)]
    document_type: String,
    #[serde(default)]
    target_audience: String,
    #[serde(default)]
    tone: String,
    #[serde(default)]
    key_messages: Vec<String>,
    #[serde(default)]
    constraints: Vec<String>,
    #[serde(default)]
    objectives: Vec<String>,
}

/// Intent analysis. A dead backend or unparsable reply degrades to a generic
/// blog-post analysis instead of failing the run.
pub struct BusinessAnalyst {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl BusinessAnalyst {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }

    pub async fn analyze_intent(&self, topic: &str) -> UserIntentAnalysis {
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(format!("Topic: {topic}")),
        ];
        let response = match self.generator.generate(&messages, self.options).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "intent analysis failed, using fallback");
                return fallback_intent(topic);
            }
        };

        match parse_json_lenient::<IntentReply>(&response) {
            Some(reply) if !reply.document_type.is_empty() => UserIntentAnalysis {
                document_type: reply.document_type,
                target_audience: non_empty(reply.target_audience, "General audience"),
                tone: non_empty(reply.tone, "professional"),
                key_messages: reply.key_messages,
                constraints: reply.constraints,
                objectives: reply.objectives,
            },
            _ => {
                tracing::warn!("intent reply was not parseable JSON, using fallback");
                fallback_intent(topic)
            }
        }
    }
}

fn non_empty(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn fallback_intent(topic: &str) -> UserIntentAnalysis {
    UserIntentAnalysis {
        document_type: "blog_post".to_string(),
        target_audience: "General audience interested in the topic".to_string(),
        tone: "professional".to_string(),
        key_messages: vec![
            format!("Explore {topic}"),
            format!("Provide insights on {topic}"),
        ],
        constraints: vec![
            "Clear and engaging writing".to_string(),
            "Well-structured content".to_string(),
        ],
        objectives: vec![
            "Inform readers".to_string(),
            "Engage audience".to_string(),
            "Provide value".to_string(),
        ],
    }
}

#[async_trait]
impl Node<WorkflowState> for BusinessAnalyst {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &WorkflowState,
    ) -> Result<NodeOutput<WorkflowState>, NodeError> {
        let intent = self.analyze_intent(&state.topic).await;
        let summary = format!(
            "Intent: {} for {} in a {} tone",
            intent.document_type, intent.target_audience, intent.tone
        );

        Ok(NodeOutput::Update(WorkflowUpdate {
            user_intent: Some(intent),
            conversation_history: vec![ConversationEntry::new("business_analyst", summary)],
            current_stage: Some("intent_analysis_complete".to_string()),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_llm::GenerationError;

    struct Scripted(&'static str);

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    struct Dead;

    #[async_trait]
    impl TextGenerator for Dead {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::Provider("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn parses_json_intent() {
        let analyst = BusinessAnalyst::new(
            Arc::new(Scripted(
                r#"{"document_type": "tutorial", "target_audience": "beginners",
                   "tone": "friendly", "key_messages": ["m"], "constraints": [],
                   "objectives": ["teach"]}"#,
            )),
            0.4,
            256,
        );
        let intent = analyst.analyze_intent("rust").await;
        assert_eq!(intent.document_type, "tutorial");
        assert_eq!(intent.target_audience, "beginners");
    }

    #[tokio::test]
    async fn dead_backend_degrades_to_fallback() {
        let analyst = BusinessAnalyst::new(Arc::new(Dead), 0.4, 256);
        let intent = analyst.analyze_intent("rust").await;
        assert_eq!(intent.document_type, "blog_post");
        assert!(intent.key_messages[0].contains("rust"));
    }

    #[tokio::test]
    async fn garbage_reply_degrades_to_fallback() {
        let analyst = BusinessAnalyst::new(Arc::new(Scripted("sure, happy to help!")), 0.4, 256);
        let intent = analyst.analyze_intent("rust").await;
        assert_eq!(intent.document_type, "blog_post");
    }
}
