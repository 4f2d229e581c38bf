//! Ollama HTTP provider.
//!
//! Talks to a local Ollama instance over its native REST API:
//! `/api/tags` for model listing, `/api/generate` for completion and
//! `/api/embeddings` for embeddings. Every request carries an explicit
//! timeout so a flaky backend can never hang the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::LlmProvider;
use crate::config::Config;
use crate::errors::PipelineError;

#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    request_timeout: Duration,
    llm_timeout: Duration,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            request_timeout: config.request_timeout,
            llm_timeout: config.llm_timeout,
            client: Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, PipelineError> {
        let url = format!("{}/api/tags", self.base_url);
        let res = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, PipelineError> {
        let url = format!("{}/api/tags", self.base_url);
        let res = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(PipelineError::upstream)?;

        if !res.status().is_success() {
            return Err(PipelineError::UpstreamUnavailable(format!(
                "failed to list models: {}",
                res.status()
            )));
        }

        let response: TagsResponse = res.json().await.map_err(PipelineError::upstream)?;
        Ok(response.models.into_iter().map(|m| m.name).collect())
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            },
        });

        let res = self
            .client
            .post(&url)
            .timeout(self.llm_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    PipelineError::SynthesisTimeout(self.llm_timeout.as_secs())
                } else {
                    PipelineError::SynthesisUpstream(err.to_string())
                }
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::SynthesisUpstream(format!(
                "{}: {}",
                status, text
            )));
        }

        let payload: GenerateResponse = res
            .json()
            .await
            .map_err(|err| PipelineError::SynthesisUpstream(err.to_string()))?;
        Ok(payload.response)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let url = format!("{}/api/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": text,
        });

        let res = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(PipelineError::upstream)?;

        if !res.status().is_success() {
            return Err(PipelineError::UpstreamUnavailable(format!(
                "embedding request failed: {}",
                res.status()
            )));
        }

        let payload: EmbeddingsResponse = res.json().await.map_err(PipelineError::upstream)?;
        Ok(payload.embedding)
    }
}
