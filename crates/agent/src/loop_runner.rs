//! The agent reasoning loop implementation.
//!
//! One call to [`AgentLoop::run`] processes one user turn against one
//! session. The loop holds the session's history lock for the whole turn,
//! which is what serializes turns within a session.

use crate::dispatcher::ToolDispatcher;
use skylark_core::message::Message;
use skylark_core::provider::{Provider, ProviderRequest};
use skylark_core::session::Session;
use skylark_core::tool::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply used when the model backend cannot be reached or errors out.
const MODEL_FAILURE_REPLY: &str =
    "I'm sorry, I ran into a problem while processing your message. Please try again in a moment.";

/// Reply used when a turn exhausts the tool iteration cap.
const LOOP_CAP_REPLY: &str =
    "I've reached the maximum number of tool call steps for this request. Please try rephrasing your question.";

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    /// The model provider to use
    provider: Arc<dyn Provider>,

    /// The model to request
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Default max tokens per model response
    max_tokens: Option<u32>,

    /// Tool registry (for schemas sent to the model)
    tools: Arc<ToolRegistry>,

    /// Concurrent tool executor
    dispatcher: ToolDispatcher,

    /// Instruction folded into each session's first user message
    system_instruction: String,

    /// Maximum model round-trips per turn
    max_iterations: u32,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            dispatcher: ToolDispatcher::new(tools.clone(), 10),
            tools,
            system_instruction: system_instruction.into(),
            max_iterations: 8,
        }
    }

    /// Set the maximum number of tool call iterations per turn.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the default max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the per-tool-call timeout in seconds.
    pub fn with_tool_timeout(mut self, secs: u64) -> Self {
        self.dispatcher = ToolDispatcher::new(self.tools.clone(), secs);
        self
    }

    /// Process one user turn and return the reply text.
    ///
    /// Always returns something presentable: provider faults and the
    /// iteration cap degrade to short fallback sentences, recorded in the
    /// history like any other assistant message. The session stays usable
    /// for the next turn in every case.
    pub async fn run(&self, session: &Session, user_text: &str) -> String {
        session.touch();
        let mut history = session.history.lock().await;
        history.push_user(user_text, &self.system_instruction);

        info!(
            client_id = %session.id,
            history_len = history.len(),
            "Processing turn"
        );

        let tool_definitions = self.tools.definitions();

        for iteration in 1..=self.max_iterations {
            debug!(client_id = %session.id, iteration, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: history.snapshot(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = match self.provider.complete(request).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(client_id = %session.id, error = %e, "Model invocation failed");
                    history.push(Message::assistant(MODEL_FAILURE_REPLY));
                    return MODEL_FAILURE_REPLY.to_string();
                }
            };

            if response.message.tool_calls.is_empty() {
                let text = response.message.content.final_text();
                history.push(response.message);
                return text;
            }

            debug!(
                client_id = %session.id,
                tool_count = response.message.tool_calls.len(),
                "Model requested tool calls"
            );

            let calls = response.message.tool_calls.clone();
            history.push(response.message);

            let results = self.dispatcher.dispatch(&calls).await;
            for result in results {
                history.push(Message::tool_result(result.call_id, result.output));
            }
            // Loop back so the model can read the tool results.
        }

        warn!(
            client_id = %session.id,
            max_iterations = self.max_iterations,
            "Tool loop cap reached, returning fallback"
        );
        history.push(Message::assistant(LOOP_CAP_REPLY));
        LOOP_CAP_REPLY.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skylark_core::error::{ProviderError, ToolError};
    use skylark_core::message::{Role, ToolCallRequest};
    use skylark_core::provider::ProviderResponse;
    use skylark_core::session::SessionRegistry;
    use skylark_core::tool::Tool;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const INSTRUCTION: &str = "You are a test assistant.";

    /// Plays back a fixed sequence of assistant messages, one per
    /// `complete()` call; repeats the last one when exhausted.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Message>>,
        fallback: Message,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Message>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: Message::assistant("done"),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            let message = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            Ok(ProviderResponse {
                message,
                usage: None,
                model: "scripted-model".into(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> std::result::Result<String, ToolError> {
            Ok(arguments["text"].as_str().unwrap_or("").to_string())
        }
    }

    fn tool_call_message(name: &str) -> Message {
        let mut msg = Message::assistant("");
        msg.tool_calls = vec![ToolCallRequest {
            id: "call_1".into(),
            name: name.into(),
            arguments: r#"{"text":"hi"}"#.into(),
        }];
        msg
    }

    fn registry_with_echo() -> Arc<ToolRegistry> {
        let mut r = ToolRegistry::new();
        r.register(Box::new(EchoTool));
        Arc::new(r)
    }

    fn agent(provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> AgentLoop {
        AgentLoop::new(provider, "test-model", 0.7, tools, INSTRUCTION)
    }

    #[tokio::test]
    async fn simple_text_reply() {
        let provider = Arc::new(ScriptedProvider::new(vec![Message::assistant(
            "Hello! How can I help?",
        )]));
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("c1").await;

        let agent = agent(provider, Arc::new(ToolRegistry::new()));
        let reply = agent.run(&session, "Hello!").await;

        assert_eq!(reply, "Hello! How can I help?");
        let history = session.history.lock().await;
        assert_eq!(history.len(), 2);
        assert!(history.messages()[0].content.final_text().contains(INSTRUCTION));
    }

    #[tokio::test]
    async fn tool_round_trip_ordering() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_message("echo"),
            Message::assistant("The echo said: hi"),
        ]));
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("c1").await;

        let agent = agent(provider, registry_with_echo());
        let reply = agent.run(&session, "run the echo").await;

        assert_eq!(reply, "The echo said: hi");
        let history = session.history.lock().await;
        let roles: Vec<Role> = history.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(history.messages()[2].content.final_text(), "hi");
        assert_eq!(
            history.messages()[2].tool_call_id.as_deref(),
            Some("call_1")
        );
    }

    #[tokio::test]
    async fn unknown_tool_continues_the_loop() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call_message("nonexistent"),
            Message::assistant("I could not use that tool."),
        ]));
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("c1").await;

        let agent = agent(provider, registry_with_echo());
        let reply = agent.run(&session, "do something").await;

        assert_eq!(reply, "I could not use that tool.");
        let history = session.history.lock().await;
        // The failed tool result was fed back, not swallowed.
        assert!(history.messages()[2]
            .content
            .final_text()
            .contains("Tool not found"));
    }

    #[tokio::test]
    async fn endless_tool_calls_hit_the_cap() {
        // Every response requests another tool call, forever.
        let script: Vec<Message> = (0..20).map(|_| tool_call_message("echo")).collect();
        let mut provider = ScriptedProvider::new(script);
        provider.fallback = tool_call_message("echo");

        let registry = SessionRegistry::new();
        let session = registry.get_or_create("c1").await;

        let agent = agent(Arc::new(provider), registry_with_echo()).with_max_iterations(3);
        let reply = agent.run(&session, "loop forever").await;

        assert_eq!(reply, LOOP_CAP_REPLY);
        let history = session.history.lock().await;
        // user + 3 * (assistant + tool) + fallback assistant
        assert_eq!(history.len(), 8);
        // The session remains usable afterwards.
        drop(history);
        let provider2 = Arc::new(ScriptedProvider::new(vec![Message::assistant("fine now")]));
        let agent2 = self::agent(provider2, registry_with_echo());
        assert_eq!(agent2.run(&session, "still there?").await, "fine now");
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_fallback_reply() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("c1").await;

        let agent = agent(Arc::new(FailingProvider), Arc::new(ToolRegistry::new()));
        let reply = agent.run(&session, "hello").await;

        assert_eq!(reply, MODEL_FAILURE_REPLY);
        let history = session.history.lock().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn instruction_injected_once_across_turns() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Message::assistant("first"),
            Message::assistant("second"),
        ]));
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("c1").await;

        let agent = agent(provider, Arc::new(ToolRegistry::new()));
        agent.run(&session, "turn one").await;
        agent.run(&session, "turn two").await;

        let history = session.history.lock().await;
        let injected = history
            .messages()
            .iter()
            .filter(|m| m.content.final_text().contains(INSTRUCTION))
            .count();
        assert_eq!(injected, 1);
    }

    #[tokio::test]
    async fn history_grows_with_each_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Message::assistant("a"),
            Message::assistant("b"),
            Message::assistant("c"),
        ]));
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("c1").await;
        let agent = agent(provider, Arc::new(ToolRegistry::new()));

        let mut last_len = 0;
        for turn in ["one", "two", "three"] {
            agent.run(&session, turn).await;
            let len = session.history.lock().await.len();
            assert!(len > last_len);
            last_len = len;
        }
        assert_eq!(last_len, 6);
    }

    #[tokio::test]
    async fn concurrent_sessions_are_independent() {
        let registry = Arc::new(SessionRegistry::new());
        let a = registry.get_or_create("client_a").await;
        let b = registry.get_or_create("client_b").await;

        let failing = agent(Arc::new(FailingProvider), Arc::new(ToolRegistry::new()));
        let healthy = agent(
            Arc::new(ScriptedProvider::new(vec![Message::assistant("all good")])),
            Arc::new(ToolRegistry::new()),
        );

        let reply_a = failing.run(&a, "hi").await;
        let reply_b = healthy.run(&b, "hi").await;

        assert_eq!(reply_a, MODEL_FAILURE_REPLY);
        assert_eq!(reply_b, "all good");
        assert_eq!(a.history.lock().await.len(), 2);
        assert_eq!(b.history.lock().await.len(), 2);
    }
}
