pub mod links;
pub mod list_parser;
pub mod orchestrator;
pub mod publisher;
pub mod query_cache;
pub mod search;
pub mod strategist;
pub mod synthesizer;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
