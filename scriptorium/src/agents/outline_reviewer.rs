use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};
use scriptorium_llm::{GenerateOptions, Message, TextGenerator};

use crate::parse::parse_json_lenient;
use crate::state::{
    now, ContentOutline, ConversationEntry, OutlineReview, UserIntentAnalysis, WorkflowState,
    WorkflowUpdate,
};

const SYSTEM_PROMPT: &str = "You review content outlines before writing begins. Judge coverage, \
ordering and fit for the stated audience. Answer with a single JSON object: approved (bool), \
strengths (array), weaknesses (array), recommendations (array), overall_assessment (string). \
Be constructive and specific. No other text.";

#[derive(Deserialize, Default)]
struct ReviewReply {
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    overall_assessment: String,
}

/// Automated outline gatekeeper. When the model's reply cannot be parsed the
/// review falls back to a structural heuristic, so the loop never stalls on
/// a chatty backend.
pub struct OutlineReviewer {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl OutlineReviewer {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }

    pub async fn review_outline(
        &self,
        outline: &ContentOutline,
        intent: &UserIntentAnalysis,
        topic: &str,
    ) -> OutlineReview {
        let mut request = format!(
            "Topic: {topic}\nAudience: {}\nTone: {}\nObjectives: {}\n\nOutline (version {}):\n",
            intent.target_audience,
            intent.tone,
            intent.objectives.join(", "),
            outline.version,
        );
        for (index, section) in outline.sections.iter().enumerate() {
            request.push_str(&format!(
                "{}. {} - {}\n   Points: {}\n   Length: {}\n",
                index + 1,
                section.title,
                section.purpose,
                section.key_points.join("; "),
                section.estimated_length,
            ));
        }

        let response = self
            .generator
            .generate(
                &[Message::system(SYSTEM_PROMPT), Message::user(request)],
                self.options,
            )
            .await;

        match response.ok().and_then(|r| parse_json_lenient::<ReviewReply>(&r)) {
            Some(reply) => OutlineReview {
                version_reviewed: outline.version,
                approved: reply.approved,
                strengths: reply.strengths,
                weaknesses: reply.weaknesses,
                recommendations: reply.recommendations,
                overall_assessment: if reply.overall_assessment.is_empty() {
                    "Review completed but assessment text not provided".to_string()
                } else {
                    reply.overall_assessment
                },
                timestamp: now(),
            },
            None => {
                tracing::warn!("outline review not parseable, using structural heuristic");
                heuristic_review(outline)
            }
        }
    }
}

/// Approve iff the outline has enough sections for real coverage.
fn heuristic_review(outline: &ContentOutline) -> OutlineReview {
    let has_good_structure = outline.sections.len() >= 3;
    OutlineReview {
        version_reviewed: outline.version,
        approved: has_good_structure,
        strengths: vec![
            "Outline structure follows the document template".to_string(),
            format!("{} sections provide coverage", outline.sections.len()),
        ],
        weaknesses: if has_good_structure {
            Vec::new()
        } else {
            vec!["Unable to perform detailed automated review".to_string()]
        },
        recommendations: vec!["Manual review recommended for quality assurance".to_string()],
        overall_assessment: if has_good_structure {
            "Outline structure is acceptable and can proceed to writing.".to_string()
        } else {
            "Outline needs more sections for complete coverage.".to_string()
        },
        timestamp: now(),
    }
}

#[async_trait]
impl Node<WorkflowState> for OutlineReviewer {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &WorkflowState,
    ) -> Result<NodeOutput<WorkflowState>, NodeError> {
        let outline = state
            .current_outline
            .clone()
            .ok_or("outline reviewer needs an outline")?;
        let intent = state
            .user_intent
            .clone()
            .ok_or("outline reviewer needs an intent analysis")?;

        let review = self.review_outline(&outline, &intent, &state.topic).await;
        let verdict = if review.approved {
            "APPROVED"
        } else {
            "NEEDS REVISION"
        };
        let summary = format!(
            "Review v{}: {} - {}",
            review.version_reviewed, verdict, review.overall_assessment
        );

        Ok(NodeOutput::Update(WorkflowUpdate {
            current_outline_review: Some(review.clone()),
            outline_reviews: vec![review],
            conversation_history: vec![ConversationEntry::new("outline_reviewer", summary)],
            current_stage: Some("outline_reviewed".to_string()),
            ..Default::default()
        }))
    }
}
