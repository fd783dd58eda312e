//! `skylark chat` — Interactive or single-message chat mode.
//!
//! Runs the same agent loop the server uses, against a single local
//! session, without opening a socket.

use skylark_agent::AgentLoop;
use skylark_config::AppConfig;
use skylark_core::session::SessionRegistry;
use std::io::{BufRead, Write};
use std::sync::Arc;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = skylark_providers::build_provider(&config)
        .map_err(|e| format!("Provider setup failed: {e}"))?;
    let tools = Arc::new(skylark_tools::default_registry(&config));
    let instruction = config
        .agent
        .system_instruction_override
        .clone()
        .unwrap_or_else(|| skylark_agent::SYSTEM_INSTRUCTION.to_string());

    let agent = AgentLoop::new(
        provider,
        &config.provider.model,
        config.provider.temperature,
        tools,
        instruction,
    )
    .with_max_iterations(config.agent.max_iterations)
    .with_tool_timeout(config.agent.tool_timeout_secs);

    let registry = SessionRegistry::new();
    let session = registry.get_or_create("local").await;

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = agent.run(&session, &msg).await;
        eprint!("\r              \r");
        println!("{reply}");
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Skylark — Interactive Chat");
    println!("  Model: {}", config.provider.model);
    println!("  Tools: get_weather, retrieve_knowledge");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let reply = agent.run(&session, line).await;
        println!();
        println!("  Agent > {reply}");
        println!();
    }

    println!("  Bye!");
    Ok(())
}
