//! Built-in agent tools for Skylark.
//!
//! Two tools ship by default: live weather lookup and knowledge-base
//! retrieval. Both report their failures as tool-result text rather than
//! errors, so the model can see what went wrong and phrase a useful
//! answer anyway.

pub mod knowledge;
pub mod weather;

pub use knowledge::{HttpRetriever, KnowledgeRetriever, RetrieveKnowledgeTool, StaticRetriever};
pub use weather::WeatherTool;

use skylark_config::AppConfig;
use skylark_core::ToolRegistry;
use std::sync::Arc;

/// Build the default tool registry from configuration.
pub fn default_registry(config: &AppConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Box::new(WeatherTool::new(
        config.weather.api_key.clone(),
        config.weather.api_url.clone(),
    )));

    // No endpoint configured means an empty knowledge base, not a crash.
    let retriever: Arc<dyn KnowledgeRetriever> = match &config.retrieval.api_url {
        Some(url) => Arc::new(HttpRetriever::new(
            url.clone(),
            config.retrieval.collection.clone(),
            config.retrieval.top_k,
        )),
        None => Arc::new(StaticRetriever::empty()),
    };
    registry.register(Box::new(RetrieveKnowledgeTool::new(retriever)));

    registry
}
