use async_trait::async_trait;

use crate::errors::PipelineError;

/// Capability interface for a model backend.
///
/// One concrete implementation is selected by configuration; the rest of the
/// pipeline only ever sees this trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<bool, PipelineError>;

    /// List model names available on the backend.
    async fn list_models(&self) -> Result<Vec<String>, PipelineError>;

    /// Non-streaming text generation for a fully assembled prompt.
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;

    /// Embed a single text into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError>;
}
