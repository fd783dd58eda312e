//! The Skylark agent: a model-call loop with concurrent tool dispatch.
//!
//! One [`AgentLoop::run`] invocation is one conversational turn. The loop
//! alternates between the model and the tools the model asks for, and it
//! always produces a user-facing reply: provider faults and the iteration
//! cap both degrade to a short fallback sentence instead of an error.

pub mod dispatcher;
pub mod loop_runner;

pub use dispatcher::ToolDispatcher;
pub use loop_runner::AgentLoop;

/// The default behavioral instruction, folded into the first user message
/// of each session.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant. \
You have access to real-time weather data and a specific knowledge base (PDF).\n\
- If the user asks about the weather, use the 'get_weather' tool.\n\
- If the user asks a question that might be in the document (like specific codes, definitions, or assignment details), use the 'retrieve_knowledge' tool.\n\
- Always answer politely and concisely.";
