use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use scriptorium_graph::{Node, NodeContext, NodeError, NodeOutput};
use scriptorium_llm::{GenerateOptions, Message, TextGenerator};
use scriptorium_search::{
    deduplicate_results, search_multiple_queries, SearchResult, Searcher,
};

use crate::parse::labeled_line;
use crate::state::{ContentOutline, ConversationEntry, SectionResearch, WorkflowState, WorkflowUpdate};

const SYSTEM_PROMPT: &str = "You condense web search results into research notes for a writer. \
Answer with a line 'SUMMARY: <2-3 sentences>' followed by 'FACT: <one finding>' lines, nothing \
else. Only use what the results support.";

/// Section researcher: searches the declared queries per section, dedups the
/// hits, and has the model distill them. Failures degrade (empty sources,
/// snippet-based summaries) rather than aborting the run.
pub struct WebResearch {
    generator: Arc<dyn TextGenerator>,
    options: GenerateOptions,
    searcher: Option<Arc<dyn Searcher>>,
    max_results_per_query: usize,
}

impl WebResearch {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        temperature: f32,
        max_tokens: u32,
        searcher: Option<Arc<dyn Searcher>>,
        max_results_per_query: usize,
    ) -> Self {
        Self {
            generator,
            options: GenerateOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
            },
            searcher,
            max_results_per_query,
        }
    }

    pub async fn research_sections(
        &self,
        outline: &ContentOutline,
        topic: &str,
    ) -> HashMap<String, SectionResearch> {
        let Some(searcher) = &self.searcher else {
            return HashMap::new();
        };

        let mut by_section = HashMap::new();
        for section in &outline.sections {
            if !section.research_needed {
                continue;
            }
            let queries = if section.search_queries.is_empty() {
                vec![format!("{topic} {}", section.title)]
            } else {
                section.search_queries.clone()
            };

            let results_by_query =
                search_multiple_queries(searcher.as_ref(), &queries, self.max_results_per_query)
                    .await;
            let sources = deduplicate_results(
                results_by_query.into_values().flatten().collect::<Vec<_>>(),
            );

            let research = if sources.is_empty() {
                // Distinguishable degraded result: the section was attempted
                // but nothing came back.
                SectionResearch {
                    section_id: section.section_id.clone(),
                    summary: String::new(),
                    key_facts: Vec::new(),
                    sources,
                }
            } else {
                self.summarize(section.section_id.clone(), &section.purpose, sources)
                    .await
            };
            by_section.insert(section.section_id.clone(), research);
        }
        by_section
    }

    async fn summarize(
        &self,
        section_id: String,
        purpose: &str,
        sources: Vec<SearchResult>,
    ) -> SectionResearch {
        let mut request = format!("Section purpose: {purpose}\n\nSearch results:\n");
        for (index, source) in sources.iter().enumerate() {
            request.push_str(&format!(
                "{}. {} ({})\n   {}\n",
                index + 1,
                source.title,
                source.url,
                source.snippet
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
            Ok(response) => {
                let (summary, key_facts) = parse_summary(&response);
                SectionResearch {
                    section_id,
                    summary,
                    key_facts,
                    sources,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "research summarization failed, using snippets");
                let summary = sources
                    .iter()
                    .map(|source| source.snippet.as_str())
                    .filter(|snippet| !snippet.is_empty())
                    .take(3)
                    .collect::<Vec<_>>()
                    .join(" ");
                let key_facts = sources.iter().map(|s| s.title.clone()).collect();
                SectionResearch {
                    section_id,
                    summary,
                    key_facts,
                    sources,
                }
            }
        }
    }
}

fn parse_summary(response: &str) -> (String, Vec<String>) {
    let mut summary = String::new();
    let mut facts = Vec::new();
    for line in response.lines() {
        if let Some(text) = labeled_line(line, "SUMMARY") {
            summary = text.to_string();
        } else if let Some(fact) = labeled_line(line, "FACT") {
            if !fact.is_empty() {
                facts.push(fact.to_string());
            }
        }
    }
    if summary.is_empty() {
        summary = response.trim().to_string();
    }
    (summary, facts)
}

#[async_trait]
impl Node<WorkflowState> for WebResearch {
    async fn run(
        &self,
        _ctx: &NodeContext,
        state: &WorkflowState,
    ) -> Result<NodeOutput<WorkflowState>, NodeError> {
        let Some(outline) = &state.current_outline else {
            // Nothing to research without an outline; skip rather than fail.
            return Ok(NodeOutput::Update(skipped_update("no outline to research")));
        };
        if self.searcher.is_none() {
            return Ok(NodeOutput::Update(skipped_update("web search disabled")));
        }

        let by_section = self.research_sections(outline, &state.topic).await;
        let research_data: Vec<SectionResearch> = by_section.values().cloned().collect();
        let total_sources: usize = research_data.iter().map(|r| r.sources.len()).sum();
        let summary = format!(
            "Researched {} sections, found {} sources",
            by_section.len(),
            total_sources
        );

        Ok(NodeOutput::Update(WorkflowUpdate {
            research_by_section: Some(by_section),
            research_data,
            conversation_history: vec![ConversationEntry::new("web_research", summary)],
            current_stage: Some("research_complete".to_string()),
            ..Default::default()
        }))
    }
}

fn skipped_update(reason: &str) -> WorkflowUpdate {
    tracing::info!(reason, "skipping research");
    WorkflowUpdate {
        research_by_section: Some(HashMap::new()),
        conversation_history: vec![ConversationEntry::new(
            "web_research",
            format!("Research skipped: {reason}"),
        )],
        current_stage: Some("research_skipped".to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_summary_splits_facts() {
        let response = "SUMMARY: Bees matter.\nFACT: Pollination supports crops.\nFACT: Hives are declining.";
        let (summary, facts) = parse_summary(response);
        assert_eq!(summary, "Bees matter.");
        assert_eq!(facts.len(), 2);
    }

    #[test]
    fn parse_summary_without_labels_keeps_text() {
        let (summary, facts) = parse_summary("just prose");
        assert_eq!(summary, "just prose");
        assert!(facts.is_empty());
    }
}
