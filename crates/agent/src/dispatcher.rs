//! Concurrent tool dispatch with per-call timeouts.
//!
//! A model response can request several tool calls at once. The dispatcher
//! runs them concurrently, bounds each with its own timeout, and returns
//! one result per request in request order. A failing or slow call never
//! affects its siblings; failures come back as failed results, never as
//! errors that would abort the turn.

use futures::future::join_all;
use skylark_core::error::ToolError;
use skylark_core::message::ToolCallRequest;
use skylark_core::tool::{ToolCall, ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Execute all requested calls concurrently; results come back in the
    /// same order as `requests`.
    pub async fn dispatch(&self, requests: &[ToolCallRequest]) -> Vec<ToolResult> {
        join_all(requests.iter().map(|req| self.dispatch_one(req))).await
    }

    async fn dispatch_one(&self, request: &ToolCallRequest) -> ToolResult {
        let arguments: serde_json::Value = match serde_json::from_str(&request.arguments) {
            Ok(v) => v,
            Err(e) => {
                warn!(tool = %request.name, error = %e, "Unparseable tool arguments");
                return ToolResult::failed(
                    &request.id,
                    format!("Error: {}", ToolError::InvalidArguments(e.to_string())),
                );
            }
        };

        let call = ToolCall {
            id: request.id.clone(),
            name: request.name.clone(),
            arguments,
        };

        debug!(tool = %call.name, call_id = %call.id, "Dispatching tool call");
        let start = std::time::Instant::now();

        let outcome = tokio::time::timeout(self.timeout, self.registry.execute(&call)).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                debug!(tool = %call.name, duration_ms, "Tool call succeeded");
                ToolResult::ok(&call.id, output)
            }
            Ok(Err(e)) => {
                warn!(tool = %call.name, duration_ms, error = %e, "Tool call failed");
                ToolResult::failed(&call.id, format!("Error: {e}"))
            }
            Err(_) => {
                let e = ToolError::Timeout {
                    tool_name: call.name.clone(),
                    timeout_secs: self.timeout.as_secs(),
                };
                warn!(tool = %call.name, duration_ms, "Tool call timed out");
                ToolResult::failed(&call.id, format!("Error: {e}"))
            }
        }
    }
}
