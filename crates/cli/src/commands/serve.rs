//! `skylark serve` — Start the WebSocket chat server.

use skylark_config::AppConfig;

pub async fn run(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port {
        config.server.port = port;
    }

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No model API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    SKYLARK_API_KEY");
        eprintln!("    GEMINI_API_KEY");
        eprintln!("    OPENAI_API_KEY");
        eprintln!();
        eprintln!("  Or add it to your config file under [provider].");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    skylark_gateway::start(config).await
}
