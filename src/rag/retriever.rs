//! Top-k retrieval: embed the question, query the index.

use super::index::{embed_or_fallback, ScoredChunk, VectorIndex};
use crate::errors::PipelineError;
use crate::llm::LlmProvider;

/// Return the `k` chunks most similar to `question`.
pub async fn retrieve(
    provider: &dyn LlmProvider,
    index: &VectorIndex,
    question: &str,
    k: usize,
) -> Result<Vec<ScoredChunk>, PipelineError> {
    let query = embed_or_fallback(provider, index.dimension(), question).await;
    if query.degraded {
        tracing::warn!("question was embedded via the fallback path; retrieval quality will be poor");
    }
    index.query(&query.vector, k)
}
