//! Web search behind one provider type.
//!
//! DuckDuckGo needs no key and is the default; Tavily and Serper need API
//! keys and reject construction without one. Batch helpers tolerate
//! per-query failures so research degrades instead of aborting.

mod provider;
mod wire;

pub use provider::{
    deduplicate_results, search_multiple_queries, SearchBackend, SearchError, SearchProvider,
    SearchResult, Searcher,
};
