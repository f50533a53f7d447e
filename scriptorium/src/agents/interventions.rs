//! Human checkpoint nodes.
//!
//! Each one interrupts with a rendered decision prompt on its first
//! invocation and, once resumed, records the decision (and bumps the
//! relevant loop counter) as a normal state update.

use async_trait::async_trait;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};

use crate::state::{BookState, BookUpdate, ConversationEntry, WorkflowState, WorkflowUpdate};

fn decision_from(ctx: &NodeContext, default: &str) -> String {
    ctx.resume_value()
        .and_then(|value| value.as_str())
        .unwrap_or(default)
        .to_string()
}

/// Outline approval checkpoint: proceed with the outline or send it back for
/// another revision.
pub struct OutlineIntervention;

#[async_trait]
impl Node<WorkflowState> for OutlineIntervention {
    async fn run(
        &self,
        ctx: &NodeContext,
        state: &WorkflowState,
    ) -> Result<NodeOutput<WorkflowState>, NodeError> {
        if ctx.resume_value().is_none() {
            let outline = state
                .current_outline
                .as_ref()
                .ok_or("outline intervention needs an outline")?;
            let review = state
                .current_outline_review
                .as_ref()
                .ok_or("outline intervention needs a review")?;

            let verdict = if review.approved {
                "APPROVED"
            } else {
                "NEEDS REVISION"
            };
            let mut prompt = format!(
                "=== OUTLINE REVIEW (version {}) ===\n\nStructure: {}\nEstimated length: {}\n\n\
Review result: {verdict}\n",
                outline.version, outline.overall_structure, outline.estimated_total_length,
            );
            if !review.strengths.is_empty() {
                prompt.push_str("\nStrengths:\n");
                for strength in &review.strengths {
                    prompt.push_str(&format!("  - {strength}\n"));
                }
            }
            if !review.weaknesses.is_empty() {
                prompt.push_str("\nWeaknesses:\n");
                for weakness in &review.weaknesses {
                    prompt.push_str(&format!("  - {weakness}\n"));
                }
            }
            prompt.push_str(&format!(
                "\nAssessment:\n{}\n\nRevisions made: {} / {}\n\n\
Reply 'proceed' to continue with this outline (even if not approved) or 'revise' to request \
another revision.",
                review.overall_assessment, state.outline_revision_count, state.max_outline_revisions,
            ));
            return Ok(NodeOutput::interrupt(prompt));
        }

        let decision = decision_from(ctx, "proceed");
        let revision_count = if decision == "revise" {
            state.outline_revision_count + 1
        } else {
            state.outline_revision_count
        };
        Ok(NodeOutput::Update(WorkflowUpdate {
            user_decision: Some(decision.clone()),
            outline_revision_count: Some(revision_count),
            conversation_history: vec![ConversationEntry::new(
                "user",
                format!("Outline decision: {decision}"),
            )],
            current_stage: Some("outline_decision_made".to_string()),
            ..Default::default()
        }))
    }
}

/// Draft review checkpoint: keep iterating or accept the draft and finish.
pub struct DraftIntervention;

#[async_trait]
impl Node<WorkflowState> for DraftIntervention {
    async fn run(
        &self,
        ctx: &NodeContext,
        state: &WorkflowState,
    ) -> Result<NodeOutput<WorkflowState>, NodeError> {
        if ctx.resume_value().is_none() {
            let preview: String = state.current_draft.chars().take(500).collect();
            let ellipsis = if state.current_draft.chars().count() > 500 {
                "..."
            } else {
                ""
            };
            let prompt = format!(
                "=== DRAFT REVIEW (iteration {}) ===\n\nDRAFT:\n{preview}{ellipsis}\n\n\
EDITOR FEEDBACK:\n{}\n\nIterations: {} / {}\n\n\
Reply 'continue' to request a revision based on the feedback or 'stop' to accept this draft.",
                state.iteration_count,
                state.current_feedback,
                state.iteration_count + 1,
                state.max_iterations,
            );
            return Ok(NodeOutput::interrupt(prompt));
        }

        let decision = decision_from(ctx, "stop");
        let iteration_count = if decision == "continue" {
            state.iteration_count + 1
        } else {
            state.iteration_count
        };
        Ok(NodeOutput::Update(WorkflowUpdate {
            user_decision: Some(decision.clone()),
            iteration_count: Some(iteration_count),
            conversation_history: vec![ConversationEntry::new(
                "user",
                format!("Draft decision: {decision}"),
            )],
            current_stage: Some("draft_decision_made".to_string()),
            ..Default::default()
        }))
    }
}

/// Table-of-contents checkpoint for the book pipeline.
pub struct TocIntervention;

#[async_trait]
impl Node<BookState> for TocIntervention {
    async fn run(
        &self,
        ctx: &NodeContext,
        state: &BookState,
    ) -> Result<NodeOutput<BookState>, NodeError> {
        if ctx.resume_value().is_none() {
            let toc = state
                .table_of_contents
                .as_ref()
                .ok_or("toc intervention needs a table of contents")?;
            let title = state
                .book_metadata
                .as_ref()
                .map(|metadata| metadata.book_title.as_str())
                .unwrap_or(state.topic.as_str());

            let mut prompt = format!("=== TABLE OF CONTENTS: {title} ===\n\n");
            for chapter in &toc.chapters {
                prompt.push_str(&format!("Chapter {}: {}\n", chapter.number, chapter.title));
                if !chapter.summary.is_empty() {
                    prompt.push_str(&format!("  {}\n", chapter.summary));
                }
            }
            prompt.push_str(&format!(
                "\nRevisions made: {} / {}\n\nReply 'proceed' to start writing chapters or \
'revise' to request a new table of contents.",
                state.toc_revision_count, state.max_toc_revisions,
            ));
            return Ok(NodeOutput::interrupt(prompt));
        }

        let decision = decision_from(ctx, "proceed");
        let revision_count = if decision == "revise" {
            state.toc_revision_count + 1
        } else {
            state.toc_revision_count
        };
        Ok(NodeOutput::Update(BookUpdate {
            user_decision: Some(decision.clone()),
            toc_revision_count: Some(revision_count),
            conversation_history: vec![ConversationEntry::new(
                "user",
                format!("Table of contents decision: {decision}"),
            )],
            current_stage: Some("toc_decision_made".to_string()),
            ..Default::default()
        }))
    }
}
