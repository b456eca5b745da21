//! Text-generation clients used by the summarization pipeline.
//!
//! The pipeline only needs one operation, `generate(prompt) -> text`, so every backend hides
//! behind [`GenerationClient`]. Both adapters issue plain HTTP requests with `reqwest`; timeouts
//! are enforced by the HTTP client and surface as [`GenerationError::ProviderUnavailable`].

mod anthropic;
mod ollama;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;

use crate::config::{Config, LlmProvider};
use async_trait::async_trait;
use reqwest::Client;
use std::{sync::Arc, time::Duration};
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";
const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// System prompt shared by every generation request.
pub const SYSTEM_PROMPT: &str =
    "You are an expert at analysing and summarising books and long documents.";

/// Errors surfaced while calling a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider could not be reached (connection refused, timeout, missing endpoint).
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Request payload passed to a generation backend.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully assembled user prompt.
    pub prompt: String,
    /// Upper bound on tokens the provider may produce.
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Build a request for `prompt` with the given token ceiling.
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for the supplied prompt.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;

    /// Model identifier reported in logs.
    fn model(&self) -> &str;
}

/// Build the generation client selected by configuration.
pub fn build_generation_client(
    config: &Config,
) -> Result<Arc<dyn GenerationClient>, GenerationError> {
    let http = build_http_client(Duration::from_secs(config.llm_timeout_secs))?;
    match config.llm_provider {
        LlmProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            let model = config
                .llm_model
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
            tracing::info!(base_url = %base_url, model = %model, "Using Ollama generation client");
            Ok(Arc::new(OllamaClient::new(http, base_url, model)))
        }
        LlmProvider::Anthropic => {
            let api_key = config.anthropic_api_key.clone().ok_or_else(|| {
                GenerationError::ProviderUnavailable("ANTHROPIC_API_KEY is not configured".into())
            })?;
            let base_url = config
                .anthropic_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_URL.to_string());
            let model = config
                .llm_model
                .clone()
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            tracing::info!(model = %model, "Using Anthropic generation client");
            Ok(Arc::new(AnthropicClient::new(http, base_url, api_key, model)))
        }
    }
}

fn build_http_client(timeout: Duration) -> Result<Client, GenerationError> {
    Client::builder()
        .user_agent("rusty-digest/generate")
        .timeout(timeout)
        .build()
        .map_err(|error| {
            GenerationError::ProviderUnavailable(format!("failed to build HTTP client: {error}"))
        })
}

/// Map a transport-level `reqwest` failure into a provider error.
fn transport_error(provider: &str, base_url: &str, error: reqwest::Error) -> GenerationError {
    if error.is_timeout() {
        GenerationError::ProviderUnavailable(format!("{provider} request timed out: {error}"))
    } else {
        GenerationError::ProviderUnavailable(format!(
            "failed to reach {provider} at {base_url}: {error}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider) -> Config {
        Config {
            llm_provider: provider,
            llm_model: None,
            ollama_url: None,
            anthropic_api_key: None,
            anthropic_base_url: None,
            llm_timeout_secs: 5,
            llm_max_tokens: 256,
            max_chunk_size: 8000,
            max_concurrency: None,
            max_upload_bytes: 1024,
            server_port: None,
        }
    }

    #[test]
    fn ollama_client_uses_default_model() {
        let client = build_generation_client(&config(LlmProvider::Ollama)).expect("client");
        assert_eq!(client.model(), DEFAULT_OLLAMA_MODEL);
    }

    #[test]
    fn anthropic_client_requires_api_key() {
        let error = build_generation_client(&config(LlmProvider::Anthropic))
            .err()
            .expect("missing key rejected");
        assert!(matches!(error, GenerationError::ProviderUnavailable(message) if message.contains("ANTHROPIC_API_KEY")));
    }

    #[test]
    fn model_override_applies_to_anthropic() {
        let mut config = config(LlmProvider::Anthropic);
        config.anthropic_api_key = Some("sk-test".into());
        config.llm_model = Some("claude-3-5-sonnet-latest".into());
        let client = build_generation_client(&config).expect("client");
        assert_eq!(client.model(), "claude-3-5-sonnet-latest");
    }
}
