use httpmock::prelude::*;
use serde_json::json;

use scriptorium_search::{
    search_multiple_queries, SearchBackend, SearchError, SearchProvider, Searcher,
};

#[tokio::test]
async fn serper_parses_organic_results() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/search")
            .header("X-API-KEY", "key-1")
            .json_body_partial(r#"{"q": "rust async"}"#);
        then.status(200).json_body(json!({
            "organic": [
                {"title": "Async book", "link": "https://a", "snippet": "about async"},
                {"title": "Tokio", "link": "https://b", "snippet": "runtime"}
            ]
        }));
    });

    let provider = SearchProvider::new(
        SearchBackend::Serper {
            api_key: "key-1".to_string(),
        },
        5,
    )
    .unwrap()
    .with_endpoint(server.url(""));

    let results = provider.search("rust async", 5).await.unwrap();
    mock.assert();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Async book");
    assert_eq!(results[0].url, "https://a");
    assert_eq!(results[0].source, "serper");
}

#[tokio::test]
async fn tavily_parses_results_with_scores() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/search")
            .json_body_partial(r#"{"api_key": "key-2", "query": "solar power"}"#);
        then.status(200).json_body(json!({
            "results": [
                {"title": "Solar", "url": "https://s", "content": "panels", "score": 0.91}
            ]
        }));
    });

    let provider = SearchProvider::new(
        SearchBackend::Tavily {
            api_key: "key-2".to_string(),
        },
        5,
    )
    .unwrap()
    .with_endpoint(server.url(""));

    let results = provider.search("solar power", 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].relevance_score, Some(0.91));
    assert_eq!(results[0].source, "tavily");
}

#[tokio::test]
async fn duckduckgo_flattens_related_topics() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/").query_param("format", "json");
        then.status(200).json_body(json!({
            "Heading": "Rust",
            "AbstractText": "A systems language.",
            "AbstractURL": "https://rust-lang.org",
            "RelatedTopics": [
                {"Text": "Cargo - the package manager", "FirstURL": "https://crates.io"},
                {"Name": "Tools", "Topics": [
                    {"Text": "Clippy - lints", "FirstURL": "https://clippy"}
                ]}
            ]
        }));
    });

    let provider = SearchProvider::new(SearchBackend::DuckDuckGo, 5)
        .unwrap()
        .with_endpoint(server.url(""));

    let results = provider.search("rust", 5).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].url, "https://rust-lang.org");
    assert_eq!(results[1].title, "Cargo");
    assert_eq!(results[1].snippet, "the package manager");
    assert_eq!(results[2].url, "https://clippy");
}

#[tokio::test]
async fn http_error_maps_to_provider_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/search");
        then.status(403);
    });

    let provider = SearchProvider::new(
        SearchBackend::Serper {
            api_key: "bad".to_string(),
        },
        5,
    )
    .unwrap()
    .with_endpoint(server.url(""));

    let err = provider.search("anything", 3).await.unwrap_err();
    assert!(matches!(err, SearchError::Provider(_)));
}

#[tokio::test]
async fn multi_query_batch_tolerates_failures() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/search")
            .json_body_partial(r#"{"q": "good"}"#);
        then.status(200).json_body(json!({
            "organic": [{"title": "hit", "link": "https://hit", "snippet": ""}]
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/search")
            .json_body_partial(r#"{"q": "bad"}"#);
        then.status(500);
    });

    let provider = SearchProvider::new(
        SearchBackend::Serper {
            api_key: "k".to_string(),
        },
        5,
    )
    .unwrap()
    .with_endpoint(server.url(""));

    let queries = vec!["good".to_string(), "bad".to_string()];
    let results = search_multiple_queries(&provider, &queries, 3).await;

    assert_eq!(results["good"].len(), 1);
    // The failed query degrades to empty instead of failing the batch.
    assert!(results["bad"].is_empty());
}
