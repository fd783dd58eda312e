//! Language model provider implementations for Skylark.
//!
//! The only trait here is [`skylark_core::Provider`]; this crate supplies
//! concrete backends. Everything speaks the OpenAI-compatible chat
//! completions dialect, which covers Gemini (via its OpenAI endpoint),
//! OpenAI itself, and any self-hosted compatible server.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use skylark_config::AppConfig;
use skylark_core::error::ProviderError;
use std::sync::Arc;

/// Build the configured provider.
///
/// Fails fast at startup when no API key is available rather than on the
/// first user message.
pub fn build_provider(
    config: &AppConfig,
) -> Result<Arc<dyn skylark_core::Provider>, ProviderError> {
    let api_key = config
        .provider
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;

    Ok(Arc::new(OpenAiCompatProvider::new(
        "gemini",
        config.provider.api_url.clone(),
        api_key,
    )))
}
