//! Environment-driven configuration.
//!
//! All knobs come from environment variables (a `.env` file is honored when
//! present). `validate` must pass before the pipeline is constructed.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::PipelineError;

/// File extensions the document loader will ingest.
pub const SUPPORTED_FORMATS: [&str; 2] = ["txt", "md"];

/// Files larger than this are skipped at load time.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Ollama instance.
    pub ollama_base_url: String,
    /// Model used for both embedding and generation.
    pub ollama_model: String,
    /// Directory holding the persisted vector index. Removed on reset.
    pub vector_store_path: PathBuf,
    /// Directory for log files; kept outside the store so reset leaves it alone.
    pub log_dir: PathBuf,
    /// Chunk window size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap: usize,
    /// Embedding dimension; fallback vectors are generated at this size.
    pub embedding_dim: usize,
    /// Generation token budget.
    pub max_tokens: u32,
    pub temperature: f32,
    /// Timeout for embedding and model-listing requests.
    pub request_timeout: Duration,
    /// Timeout for generation requests.
    pub llm_timeout: Duration,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Context budget handed to the generative model, in characters.
    pub max_context_chars: usize,
    /// Round cap for document-processing conversations.
    pub max_rounds: usize,
    /// Round cap for single-question conversations.
    pub qa_max_rounds: usize,
    /// Emit JSON-formatted logs instead of human-readable ones.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "gemma:2b".to_string(),
            vector_store_path: PathBuf::from("./data/vector_store"),
            log_dir: PathBuf::from("./data/logs"),
            chunk_size: 500,
            chunk_overlap: 100,
            embedding_dim: 384,
            max_tokens: 2000,
            temperature: 0.3,
            request_timeout: Duration::from_secs(180),
            llm_timeout: Duration::from_secs(180),
            top_k: 5,
            max_context_chars: 4000,
            max_rounds: 50,
            qa_max_rounds: 10,
            log_json: false,
        }
    }
}

impl Config {
    /// Build a configuration from the process environment, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let defaults = Config::default();
        Config {
            ollama_base_url: env_string("OLLAMA_BASE_URL", defaults.ollama_base_url),
            ollama_model: env_string("OLLAMA_MODEL", defaults.ollama_model),
            vector_store_path: env::var("VECTOR_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vector_store_path),
            log_dir: env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            chunk_size: env_parse("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP", defaults.chunk_overlap),
            embedding_dim: env_parse("EMBEDDING_DIM", defaults.embedding_dim),
            max_tokens: env_parse("MAX_TOKENS", defaults.max_tokens),
            temperature: env_parse("TEMPERATURE", defaults.temperature),
            request_timeout: Duration::from_secs(env_parse(
                "REQUEST_TIMEOUT",
                defaults.request_timeout.as_secs(),
            )),
            llm_timeout: Duration::from_secs(env_parse(
                "LLM_TIMEOUT",
                defaults.llm_timeout.as_secs(),
            )),
            top_k: env_parse("TOP_K", defaults.top_k),
            max_context_chars: env_parse("MAX_CONTEXT_CHARS", defaults.max_context_chars),
            max_rounds: env_parse("MAX_ROUNDS", defaults.max_rounds),
            qa_max_rounds: env_parse("QA_MAX_ROUNDS", defaults.qa_max_rounds),
            log_json: env::var("LOG_JSON")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.log_json),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.ollama_base_url.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "OLLAMA_BASE_URL must not be empty".to_string(),
            ));
        }
        if self.ollama_model.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "OLLAMA_MODEL must not be empty".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "CHUNK_SIZE must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(PipelineError::InvalidConfig(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embedding_dim == 0 {
            return Err(PipelineError::InvalidConfig(
                "EMBEDDING_DIM must be greater than zero".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(PipelineError::InvalidConfig(
                "TOP_K must be greater than zero".to_string(),
            ));
        }
        if self.max_rounds == 0 || self.qa_max_rounds == 0 {
            return Err(PipelineError::InvalidConfig(
                "round caps must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_string(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
