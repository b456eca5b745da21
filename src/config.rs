use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_MAX_CHUNK_SIZE: usize = 8000;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LLM_MAX_TOKENS: u32 = 4096;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10_000_000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Configuration was already installed for this process.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for the Rusty Digest server and CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Generation backend used for chunk summaries and synthesis.
    pub llm_provider: LlmProvider,
    /// Optional model override; each provider falls back to its own default.
    pub llm_model: Option<String>,
    /// Base URL of the Ollama runtime.
    pub ollama_url: Option<String>,
    /// API key for the Anthropic messages API.
    pub anthropic_api_key: Option<String>,
    /// Optional override for the Anthropic API base URL.
    pub anthropic_base_url: Option<String>,
    /// Per-request timeout applied by the generation client.
    pub llm_timeout_secs: u64,
    /// Upper bound on tokens requested per generation call.
    pub llm_max_tokens: u32,
    /// Maximum chunk length in characters.
    pub max_chunk_size: usize,
    /// Optional cap on concurrent chunk summarization calls.
    pub max_concurrency: Option<usize>,
    /// Largest decoded upload accepted by the HTTP surface.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted Anthropic messages API.
    Anthropic,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let llm_provider: LlmProvider = vars
            .required("LLM_PROVIDER")?
            .parse()
            .map_err(|()| ConfigError::InvalidValue("LLM_PROVIDER".to_string()))?;
        let anthropic_api_key = vars.optional("ANTHROPIC_API_KEY");
        if llm_provider == LlmProvider::Anthropic && anthropic_api_key.is_none() {
            return Err(ConfigError::MissingVariable("ANTHROPIC_API_KEY".to_string()));
        }

        let max_chunk_size = vars
            .parse::<usize>("DIGEST_MAX_CHUNK_SIZE")?
            .unwrap_or(DEFAULT_MAX_CHUNK_SIZE);
        if max_chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "DIGEST_MAX_CHUNK_SIZE".to_string(),
            ));
        }

        let max_concurrency = vars.parse::<usize>("DIGEST_MAX_CONCURRENCY")?;
        if max_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue(
                "DIGEST_MAX_CONCURRENCY".to_string(),
            ));
        }

        Ok(Self {
            llm_provider,
            llm_model: vars.optional("LLM_MODEL"),
            ollama_url: vars.optional("OLLAMA_URL"),
            anthropic_api_key,
            anthropic_base_url: vars.optional("ANTHROPIC_BASE_URL"),
            llm_timeout_secs: vars
                .parse("LLM_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            llm_max_tokens: vars
                .parse("LLM_MAX_TOKENS")?
                .unwrap_or(DEFAULT_LLM_MAX_TOKENS),
            max_chunk_size,
            max_concurrency,
            max_upload_bytes: vars
                .parse("DIGEST_MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            server_port: vars.parse("SERVER_PORT")?,
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.optional(key)
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string()))
            })
            .transpose()
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// Binaries call this once before touching any other module so that a missing API key or a
/// malformed value is reported as a [`ConfigError`] instead of a panic deep inside a request.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        provider = ?config.llm_provider,
        model = ?config.llm_model,
        max_chunk_size = config.max_chunk_size,
        max_concurrency = ?config.max_concurrency,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    Ok(get_config())
}
