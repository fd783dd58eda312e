//! Knowledge-base retrieval tool.
//!
//! The semantic search itself lives behind the [`KnowledgeRetriever`]
//! trait: the production [`HttpRetriever`] talks to an external vector
//! search service, and [`StaticRetriever`] serves a fixed passage set for
//! tests and offline runs. The tool concatenates whatever passages come
//! back; ranking is the backend's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skylark_core::error::ToolError;
use skylark_core::tool::Tool;
use std::sync::Arc;
use tracing::{debug, warn};

pub const NO_RESULTS: &str = "No relevant information found in the knowledge base.";

/// The semantic-search boundary.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Return the passages most relevant to `query`, best first.
    async fn search(&self, query: &str) -> std::result::Result<Vec<String>, RetrievalError>;

    /// Whether a real backend is reachable in principle (used by the
    /// vector-store-info endpoint).
    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("{0}")]
    Backend(String),
}

/// Retriever backed by an external vector search service over HTTP.
pub struct HttpRetriever {
    api_url: String,
    collection: String,
    top_k: usize,
    client: reqwest::Client,
}

impl HttpRetriever {
    pub fn new(api_url: String, collection: String, top_k: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            collection,
            top_k,
            client,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    passages: Vec<String>,
}

#[async_trait]
impl KnowledgeRetriever for HttpRetriever {
    async fn search(&self, query: &str) -> std::result::Result<Vec<String>, RetrievalError> {
        let url = format!("{}/collections/{}/search", self.api_url, self.collection);

        let response = self
            .client
            .post(&url)
            .json(&SearchRequest {
                query,
                top_k: self.top_k,
            })
            .send()
            .await
            .map_err(|e| RetrievalError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RetrievalError::Backend(format!(
                "search returned status {}",
                response.status().as_u16()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Backend(e.to_string()))?;

        Ok(parsed.passages)
    }
}

/// Fixed-corpus retriever for tests and offline runs.
///
/// Matching is a plain case-insensitive keyword scan; good enough to
/// exercise the agent loop without a vector backend.
pub struct StaticRetriever {
    passages: Vec<String>,
}

impl StaticRetriever {
    pub fn new(passages: Vec<String>) -> Self {
        Self { passages }
    }

    pub fn empty() -> Self {
        Self {
            passages: Vec::new(),
        }
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticRetriever {
    async fn search(&self, query: &str) -> std::result::Result<Vec<String>, RetrievalError> {
        let q = query.to_lowercase();
        Ok(self
            .passages
            .iter()
            .filter(|p| {
                q.split_whitespace()
                    .any(|word| p.to_lowercase().contains(word))
            })
            .cloned()
            .collect())
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// The `retrieve_knowledge` tool exposed to the model.
pub struct RetrieveKnowledgeTool {
    retriever: Arc<dyn KnowledgeRetriever>,
}

impl RetrieveKnowledgeTool {
    pub fn new(retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for RetrieveKnowledgeTool {
    fn name(&self) -> &str {
        "retrieve_knowledge"
    }

    fn description(&self) -> &str {
        "Searches the knowledge base for information relevant to the user's question. Use this for questions about the ingested documents."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<String, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        debug!(query = %query, "Searching knowledge base");

        match self.retriever.search(query).await {
            Ok(passages) if passages.is_empty() => Ok(NO_RESULTS.into()),
            Ok(passages) => Ok(passages.join("\n\n")),
            Err(e) => {
                warn!(query = %query, error = %e, "Knowledge retrieval failed");
                Ok(format!("Error retrieving knowledge: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingRetriever;

    #[async_trait]
    impl KnowledgeRetriever for FailingRetriever {
        async fn search(&self, _query: &str) -> std::result::Result<Vec<String>, RetrievalError> {
            Err(RetrievalError::Backend("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn empty_result_returns_literal() {
        let tool = RetrieveKnowledgeTool::new(Arc::new(StaticRetriever::empty()));
        let output = tool
            .execute(serde_json::json!({"query": "x"}))
            .await
            .unwrap();
        assert_eq!(output, NO_RESULTS);
    }

    #[tokio::test]
    async fn passages_are_concatenated_in_order() {
        let retriever = StaticRetriever::new(vec![
            "The warranty covers two years.".into(),
            "Warranty claims require a receipt.".into(),
        ]);
        let tool = RetrieveKnowledgeTool::new(Arc::new(retriever));
        let output = tool
            .execute(serde_json::json!({"query": "warranty"}))
            .await
            .unwrap();
        assert_eq!(
            output,
            "The warranty covers two years.\n\nWarranty claims require a receipt."
        );
    }

    #[tokio::test]
    async fn backend_fault_reported_as_text() {
        let tool = RetrieveKnowledgeTool::new(Arc::new(FailingRetriever));
        let output = tool
            .execute(serde_json::json!({"query": "anything"}))
            .await
            .unwrap();
        assert_eq!(output, "Error retrieving knowledge: connection refused");
    }

    #[tokio::test]
    async fn missing_query_is_invalid_arguments() {
        let tool = RetrieveKnowledgeTool::new(Arc::new(StaticRetriever::empty()));
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn static_retriever_matches_keywords() {
        let retriever = StaticRetriever::new(vec![
            "Shipping takes five days.".into(),
            "Returns are free within 30 days.".into(),
        ]);
        let hits = retriever.search("how long does shipping take").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].contains("Shipping"));
    }

    #[test]
    fn tool_definition() {
        let tool = RetrieveKnowledgeTool::new(Arc::new(StaticRetriever::empty()));
        let def = tool.to_definition();
        assert_eq!(def.name, "retrieve_knowledge");
    }
}
