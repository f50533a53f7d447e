//! Response bodies of the supported search backends.

use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct TavilyResponse {
    #[serde(default)]
    pub results: Vec<TavilyResult>,
}

#[derive(Deserialize, Debug)]
pub struct TavilyResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Deserialize, Debug)]
pub struct SerperResponse {
    #[serde(default)]
    pub organic: Vec<SerperResult>,
}

#[derive(Deserialize, Debug)]
pub struct SerperResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Deserialize, Debug)]
pub struct DuckDuckGoResponse {
    #[serde(default, rename = "Heading")]
    pub heading: String,
    #[serde(default, rename = "AbstractText")]
    pub abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    pub abstract_url: String,
    #[serde(default, rename = "RelatedTopics")]
    pub related_topics: Vec<DuckDuckGoTopic>,
}

/// Related topics are either leaf results or nested category groups; other
/// shapes are tolerated and skipped.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum DuckDuckGoTopic {
    Leaf {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Topics")]
        topics: Vec<DuckDuckGoTopic>,
    },
    Other(serde_json::Value),
}
