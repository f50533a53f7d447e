//! Outline templates per document type.
//!
//! The strategist structures outlines from these; the `{topic}` placeholder
//! in titles, purposes and queries is substituted at customization time.

use crate::state::OutlineSection;

pub struct OutlineTemplate {
    pub name: &'static str,
    pub sections: Vec<OutlineSection>,
}

fn section(
    section_id: &str,
    title: &str,
    purpose: &str,
    key_points: &[&str],
    estimated_length: &str,
    research_needed: bool,
    search_queries: &[&str],
) -> OutlineSection {
    OutlineSection {
        section_id: section_id.to_string(),
        title: title.to_string(),
        purpose: purpose.to_string(),
        key_points: key_points.iter().map(|point| point.to_string()).collect(),
        estimated_length: estimated_length.to_string(),
        research_needed,
        search_queries: search_queries.iter().map(|q| q.to_string()).collect(),
    }
}

fn blog_post() -> OutlineTemplate {
    OutlineTemplate {
        name: "blog_post",
        sections: vec![
            section(
                "hook",
                "Introduction",
                "Hook the reader and frame why {topic} matters now",
                &["Opening hook", "Why this matters", "What the post covers"],
                "150-250 words",
                false,
                &[],
            ),
            section(
                "background",
                "Background",
                "Ground the reader in the essentials of {topic}",
                &["Key definitions", "Current landscape"],
                "250-400 words",
                true,
                &["{topic} overview", "{topic} basics"],
            ),
            section(
                "main_points",
                "Key Insights",
                "Develop the core arguments about {topic}",
                &["Main insight one", "Main insight two", "Supporting evidence"],
                "400-600 words",
                true,
                &["{topic} trends", "{topic} examples"],
            ),
            section(
                "implications",
                "Implications",
                "What the insights mean in practice",
                &["Practical consequences", "Who is affected"],
                "250-400 words",
                true,
                &["{topic} impact"],
            ),
            section(
                "conclusion",
                "Conclusion",
                "Wrap up and leave the reader with a takeaway",
                &["Summary", "Call to action"],
                "100-200 words",
                false,
                &[],
            ),
        ],
    }
}

fn technical_guide() -> OutlineTemplate {
    OutlineTemplate {
        name: "technical_guide",
        sections: vec![
            section(
                "overview",
                "Overview",
                "Explain what {topic} is and when to reach for it",
                &["Problem statement", "Where {topic} fits"],
                "200-350 words",
                true,
                &["{topic} introduction"],
            ),
            section(
                "concepts",
                "Core Concepts",
                "The mental model behind {topic}",
                &["Terminology", "Architecture", "Key invariants"],
                "400-600 words",
                true,
                &["{topic} architecture", "{topic} concepts"],
            ),
            section(
                "walkthrough",
                "Walkthrough",
                "A worked example applying {topic} end to end",
                &["Setup", "Step-by-step application", "Verification"],
                "500-800 words",
                true,
                &["{topic} tutorial", "{topic} example"],
            ),
            section(
                "pitfalls",
                "Common Pitfalls",
                "Mistakes practitioners make with {topic}",
                &["Frequent errors", "How to avoid them"],
                "250-400 words",
                true,
                &["{topic} mistakes", "{topic} best practices"],
            ),
            section(
                "summary",
                "Summary",
                "Recap and pointers for going deeper",
                &["Key takeaways", "Further reading"],
                "100-200 words",
                false,
                &[],
            ),
        ],
    }
}

fn tutorial() -> OutlineTemplate {
    OutlineTemplate {
        name: "tutorial",
        sections: vec![
            section(
                "goals",
                "Learning Goals",
                "What the learner will be able to do with {topic}",
                &["Objectives", "Prerequisites"],
                "100-200 words",
                false,
                &[],
            ),
            section(
                "setup",
                "Setup",
                "Get a working environment for {topic}",
                &["Installation", "Verification"],
                "200-300 words",
                true,
                &["{topic} setup"],
            ),
            section(
                "fundamentals",
                "Fundamentals",
                "First contact with {topic}, kept concrete",
                &["Smallest working example", "Each moving part explained"],
                "400-600 words",
                true,
                &["{topic} getting started"],
            ),
            section(
                "practice",
                "Guided Practice",
                "Hands-on exercises building on the fundamentals",
                &["Exercise sequence", "Expected results"],
                "400-600 words",
                false,
                &[],
            ),
            section(
                "next_steps",
                "Next Steps",
                "Where to go after this tutorial",
                &["Recap", "Follow-up material"],
                "100-200 words",
                false,
                &[],
            ),
        ],
    }
}

fn general() -> OutlineTemplate {
    OutlineTemplate {
        name: "general",
        sections: vec![
            section(
                "introduction",
                "Introduction",
                "Introduce {topic}",
                &["Context", "Scope"],
                "150-250 words",
                false,
                &[],
            ),
            section(
                "body",
                "Main Discussion",
                "Develop {topic} in depth",
                &["Primary aspects", "Evidence"],
                "500-800 words",
                true,
                &["{topic}"],
            ),
            section(
                "conclusion",
                "Conclusion",
                "Close the discussion of {topic}",
                &["Summary"],
                "100-200 words",
                false,
                &[],
            ),
        ],
    }
}

/// Template lookup by the analyst's document type; unknown types get the
/// general structure.
pub fn outline_template(document_type: &str) -> OutlineTemplate {
    match document_type {
        "blog_post" => blog_post(),
        "technical_guide" => technical_guide(),
        "tutorial" => tutorial(),
        _ => general(),
    }
}

/// Substitutes the topic into a template's placeholder slots.
pub fn customize_sections(template: &OutlineTemplate, topic: &str) -> Vec<OutlineSection> {
    template
        .sections
        .iter()
        .map(|section| OutlineSection {
            section_id: section.section_id.clone(),
            title: section.title.replace("{topic}", topic),
            purpose: section.purpose.replace("{topic}", topic),
            key_points: section.key_points.clone(),
            estimated_length: section.estimated_length.clone(),
            research_needed: section.research_needed,
            search_queries: section
                .search_queries
                .iter()
                .map(|query| query.replace("{topic}", topic))
                .collect(),
        })
        .collect()
}
