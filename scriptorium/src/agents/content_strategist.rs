use std::sync::Arc;

use async_trait::async_trait;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};
use scriptorium_llm::{GenerateOptions, Message, TextGenerator};

use crate::state::{
    ContentOutline, ConversationEntry, OutlineSection, UserIntentAnalysis, WorkflowState,
    WorkflowUpdate,
};
use crate::templates::{customize_sections, outline_template};

const SYSTEM_PROMPT: &str = "You are a content strategist. Given a topic, audience and a section \
plan, propose the key points each section should make. Answer per section as a markdown heading \
'## <section title>' followed by bullet points. No other commentary.";

/// Outline agent. The document-type template fixes the section structure;
/// the model only refines each section's key points, so a failed or
/// unparsable generation still yields a usable outline.
pub struct ContentStrategist {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
}

impl ContentStrategist {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
        }
    }

    pub async fn create_outline(
        &self,
        topic: &str,
        intent: &UserIntentAnalysis,
        version: u32,
        feedback: Option<&str>,
    ) -> ContentOutline {
        let template = outline_template(&intent.document_type);
        let mut sections = customize_sections(&template, topic);

        let mut request = format!(
            "Topic: {topic}\nAudience: {}\nTone: {}\n\nSections:\n",
            intent.target_audience, intent.tone
        );
        for section in &sections {
            request.push_str(&format!("- {}: {}\n", section.title, section.purpose));
        }
        if let Some(feedback) = feedback {
            request.push_str(&format!(
                "\nA reviewer rejected the previous outline. Address this feedback:\n{feedback}\n"
            ));
        }

        match self
            .generator
            .generate(
                &[Message::system(SYSTEM_PROMPT), Message::user(request)],
                self.options,
            )
            .await
        {
            Ok(response) => refine_key_points(&mut sections, &response),
            Err(err) => {
                tracing::warn!(error = %err, "outline refinement failed, using template points");
            }
        }

        let overall_structure = describe_structure(&sections);
        let estimated_total_length = estimate_total_length(&sections);
        ContentOutline {
            version,
            sections,
            overall_structure,
            estimated_total_length,
            template_used: template.name.to_string(),
        }
    }
}

/// Overwrites template key points with the model's bullets where the reply
/// contains a matching '## <title>' block.
fn refine_key_points(sections: &mut [OutlineSection], response: &str) {
    for section in sections.iter_mut() {
        let heading = format!("## {}", section.title);
        let Some(start) = response.find(&heading) else {
            continue;
        };
        let block = &response[start + heading.len()..];
        let block = match block.find("\n##") {
            Some(end) => &block[..end],
            None => block,
        };
        let points: Vec<String> = block
            .lines()
            .filter_map(|line| {
                let trimmed = line.trim();
                trimmed
                    .strip_prefix("- ")
                    .or_else(|| trimmed.strip_prefix("* "))
                    .map(str::to_string)
            })
            .filter(|point| !point.is_empty())
            .collect();
        if !points.is_empty() {
            section.key_points = points;
        }
    }
}

fn describe_structure(sections: &[OutlineSection]) -> String {
    let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
    format!("{}-section structure: {}", sections.len(), titles.join(" -> "))
}

/// Sums "N-M words" ranges; sections without a parsable range fall back to a
/// stock estimate.
fn estimate_total_length(sections: &[OutlineSection]) -> String {
    let mut total_min = 0u32;
    let mut total_max = 0u32;
    for section in sections {
        let Some(range) = section.estimated_length.strip_suffix(" words") else {
            continue;
        };
        if let Some((min, max)) = range.split_once('-') {
            if let (Ok(min), Ok(max)) = (min.trim().parse::<u32>(), max.trim().parse::<u32>()) {
                total_min += min;
                total_max += max;
            }
        }
    }
    if total_min > 0 && total_max > 0 {
        format!("{total_min}-{total_max} words")
    } else {
        "1500-2500 words (estimated)".to_string()
    }
}

#[async_trait]
impl Node<WorkflowState> for ContentStrategist {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &WorkflowState,
    ) -> Result<NodeOutput<WorkflowState>, NodeError> {
        let intent = state
            .user_intent
            .clone()
            .ok_or("content strategist needs an intent analysis")?;
        let feedback = state
            .current_outline_review
            .as_ref()
            .filter(|review| !review.approved)
            .map(|review| review.overall_assessment.as_str());

        let version = state.outline_version + 1;
        let outline = self
            .create_outline(&state.topic, &intent, version, feedback)
            .await;

        let summary = format!(
            "Created outline v{}: {}",
            outline.version, outline.overall_structure
        );
        Ok(NodeOutput::Update(WorkflowUpdate {
            current_outline: Some(outline.clone()),
            outline_version: Some(outline.version),
            outlines: vec![outline],
            conversation_history: vec![ConversationEntry::new("content_strategist", summary)],
            current_stage: Some("outline_created".to_string()),
            ..Default::default()
        }))
    }
}
