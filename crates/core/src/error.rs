//! Error types for the Skylark domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Skylark operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Agent errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Connection errors ---
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

/// Errors terminal to a single agent turn. The session stays usable for
/// the next turn; callers surface these as user-facing fallback messages.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model invocation failed: {0}")]
    ModelInvocation(#[from] ProviderError),

    #[error("Tool loop exceeded the cap of {max_iterations} iterations")]
    ToolLoopExceeded { max_iterations: u32 },
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Message delivery failed to {client_id}: {reason}")]
    DeliveryFailed { client_id: String, reason: String },

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("Invalid client payload: {0}")]
    InvalidPayload(String),
}
