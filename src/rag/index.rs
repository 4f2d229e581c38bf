//! Persisted vector index.
//!
//! A flat in-memory store of chunk/vector pairs with brute-force cosine
//! search. The index is serialized as JSON into the store directory and
//! swapped in atomically, so readers only ever observe a complete state.
//!
//! Embedding failures never fail a build: the failed chunk gets a
//! pseudo-random fallback vector and is flagged as degraded. The flag is
//! persisted and travels with every query hit, so callers can tell real
//! vectors from synthetic ones.

use std::fs;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chunker::Chunk;
use crate::errors::PipelineError;
use crate::llm::LlmProvider;
use crate::vector_math::rank_descending_by_cosine;

const INDEX_FILE: &str = "index.json";

/// An embedding plus the marker telling whether it came from the fallback
/// path instead of the real backend.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub degraded: bool,
}

/// A chunk/vector pair owned by the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub degraded: bool,
}

/// A query hit: the chunk, its similarity score, and the degraded marker of
/// the stored vector it matched on.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    /// Embed every chunk and build a fresh index.
    ///
    /// Entry ids are prefixed with the owning document id so chunks from
    /// different documents cannot collide.
    pub async fn build(
        provider: &dyn LlmProvider,
        dimension: usize,
        chunks: Vec<Chunk>,
    ) -> Result<Self, PipelineError> {
        if chunks.is_empty() {
            return Err(PipelineError::EmptyInput(
                "cannot build an index from zero chunks".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = embed_or_fallback(provider, dimension, &chunk.text).await;
            entries.push(IndexEntry {
                id: format!("{}_{}", chunk.document_id, chunk.id),
                chunk,
                vector: embedding.vector,
                degraded: embedding.degraded,
            });
        }

        let degraded = entries.iter().filter(|e| e.degraded).count();
        if degraded > 0 {
            tracing::warn!(
                "{} of {} chunks were embedded via the fallback path; retrieval quality is degraded for them",
                degraded,
                entries.len()
            );
        }

        Ok(Self { dimension, entries })
    }

    /// Serialize all entries into `dir`, replacing any prior index.
    ///
    /// The payload is written to a temp file and renamed over the live one,
    /// so a concurrent `load` sees either the old or the new complete state.
    pub fn persist(&self, dir: &Path) -> Result<(), PipelineError> {
        fs::create_dir_all(dir)?;

        let payload = serde_json::to_vec_pretty(&PersistedIndex {
            dimension: self.dimension,
            entries: self.entries.clone(),
        })
        .map_err(|err| PipelineError::IndexCorrupt(err.to_string()))?;

        let tmp_path = dir.join(format!("{}.tmp", INDEX_FILE));
        fs::write(&tmp_path, payload)?;
        fs::rename(&tmp_path, dir.join(INDEX_FILE))?;

        tracing::info!("persisted {} index entries to {}", self.entries.len(), dir.display());
        Ok(())
    }

    /// Reload a previously persisted index.
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Err(PipelineError::IndexNotFound(dir.to_path_buf()));
        }

        let data = fs::read(&path).map_err(|err| PipelineError::IndexCorrupt(err.to_string()))?;
        let persisted: PersistedIndex = serde_json::from_slice(&data)
            .map_err(|err| PipelineError::IndexCorrupt(err.to_string()))?;

        for entry in &persisted.entries {
            if entry.vector.len() != persisted.dimension {
                return Err(PipelineError::IndexCorrupt(format!(
                    "entry {} has dimension {} but the index declares {}",
                    entry.id,
                    entry.vector.len(),
                    persisted.dimension
                )));
            }
        }

        Ok(Self {
            dimension: persisted.dimension,
            entries: persisted.entries,
        })
    }

    /// Return up to `k` entries ranked by descending cosine similarity.
    ///
    /// Ties keep insertion order. An empty index yields an empty result.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, PipelineError> {
        if k == 0 {
            return Err(PipelineError::InvalidArgument(
                "k must be greater than zero".to_string(),
            ));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let candidates: Vec<&[f32]> = self.entries.iter().map(|e| e.vector.as_slice()).collect();
        let ranked = rank_descending_by_cosine(vector, &candidates)?;

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| ScoredChunk {
                chunk: self.entries[idx].chunk.clone(),
                score,
                degraded: self.entries[idx].degraded,
            })
            .collect())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries carrying a fallback vector.
    pub fn degraded_len(&self) -> usize {
        self.entries.iter().filter(|e| e.degraded).count()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}

/// Embed `text`, substituting a flagged pseudo-random vector when the
/// backend fails or returns the wrong dimension.
pub async fn embed_or_fallback(
    provider: &dyn LlmProvider,
    dimension: usize,
    text: &str,
) -> Embedding {
    match provider.embed(text).await {
        Ok(vector) if vector.len() == dimension => Embedding {
            vector,
            degraded: false,
        },
        Ok(vector) => {
            tracing::warn!(
                "embedding dimension drifted (expected {}, got {}); substituting fallback vector",
                dimension,
                vector.len()
            );
            Embedding {
                vector: fallback_vector(dimension),
                degraded: true,
            }
        }
        Err(err) => {
            tracing::warn!("embedding request failed ({}); substituting fallback vector", err);
            Embedding {
                vector: fallback_vector(dimension),
                degraded: true,
            }
        }
    }
}

fn fallback_vector(dimension: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    (0..dimension).map(|_| rng.random::<f32>()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    /// Embeds to a fixed per-text vector; fails for texts containing the
    /// configured marker.
    struct StubProvider {
        dimension: usize,
        fail_on: Option<String>,
    }

    impl StubProvider {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                fail_on: None,
            }
        }

        fn failing_on(dimension: usize, marker: &str) -> Self {
            Self {
                dimension,
                fail_on: Some(marker.to_string()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn health_check(&self) -> Result<bool, PipelineError> {
            Ok(true)
        }

        async fn list_models(&self) -> Result<Vec<String>, PipelineError> {
            Ok(vec!["stub".to_string()])
        }

        async fn generate(&self, _prompt: &str) -> Result<String, PipelineError> {
            Ok("stub answer".to_string())
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
            if let Some(marker) = &self.fail_on {
                if text.contains(marker) {
                    return Err(PipelineError::UpstreamUnavailable(
                        "forced failure".to_string(),
                    ));
                }
            }
            let seed = text.bytes().map(|b| b as f32).sum::<f32>() % 97.0;
            let mut vector = vec![1.0; self.dimension];
            vector[0] = seed;
            Ok(vector)
        }
    }

    fn make_chunk(document_id: &str, ordinal: usize, text: &str) -> Chunk {
        Chunk {
            id: format!("chunk_{}", ordinal),
            document_id: document_id.to_string(),
            ordinal,
            text: text.to_string(),
            metadata: json!({"source": format!("{}.txt", document_id)}),
        }
    }

    #[tokio::test]
    async fn build_rejects_empty_input() {
        let provider = StubProvider::new(4);
        let result = VectorIndex::build(&provider, 4, Vec::new()).await;
        assert!(matches!(result, Err(PipelineError::EmptyInput(_))));
    }

    #[tokio::test]
    async fn build_marks_failed_chunks_degraded() {
        let provider = StubProvider::failing_on(4, "unlucky");
        let chunks = vec![
            make_chunk("doc", 0, "first passage"),
            make_chunk("doc", 1, "second passage"),
            make_chunk("doc", 2, "unlucky passage"),
            make_chunk("doc", 3, "fourth passage"),
            make_chunk("doc", 4, "fifth passage"),
        ];

        let index = VectorIndex::build(&provider, 4, chunks)
            .await
            .expect("build should absorb embedding failures");

        assert_eq!(index.len(), 5);
        assert_eq!(index.degraded_len(), 1);

        // Every vector, real or fallback, has the configured dimension.
        for entry in index.entries() {
            assert_eq!(entry.vector.len(), 4);
        }

        let hits = index.query(&[1.0, 1.0, 1.0, 1.0], 5).expect("query");
        assert_eq!(hits.len(), 5);
        assert_eq!(hits.iter().filter(|hit| hit.degraded).count(), 1);
    }

    #[tokio::test]
    async fn entry_ids_are_prefixed_with_document_id() {
        let provider = StubProvider::new(4);
        let chunks = vec![make_chunk("doc-a", 0, "alpha"), make_chunk("doc-b", 0, "beta")];

        let index = VectorIndex::build(&provider, 4, chunks).await.expect("build");
        let ids: Vec<&str> = index.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["doc-a_chunk_0", "doc-b_chunk_0"]);
    }

    #[test]
    fn query_ranks_by_similarity_and_respects_k() {
        let mut index = VectorIndex::new(3);
        index.entries = vec![
            IndexEntry {
                id: "a".to_string(),
                chunk: make_chunk("doc", 0, "a"),
                vector: vec![0.1, 0.9, 0.0],
                degraded: false,
            },
            IndexEntry {
                id: "b".to_string(),
                chunk: make_chunk("doc", 1, "b"),
                vector: vec![1.0, 0.0, 0.0],
                degraded: false,
            },
            IndexEntry {
                id: "c".to_string(),
                chunk: make_chunk("doc", 2, "c"),
                vector: vec![0.7, 0.3, 0.0],
                degraded: false,
            },
        ];

        let hits = index.query(&[1.0, 0.0, 0.0], 2).expect("query");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.ordinal, 1);
        assert_eq!(hits[1].chunk.ordinal, 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn query_on_empty_index_returns_no_hits() {
        let index = VectorIndex::new(4);
        let hits = index.query(&[0.0, 0.0, 0.0, 0.0], 5).expect("query");
        assert!(hits.is_empty());
    }

    #[test]
    fn query_rejects_zero_k() {
        let index = VectorIndex::new(4);
        assert!(matches!(
            index.query(&[0.0; 4], 0),
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn query_rejects_mismatched_dimension() {
        let provider = StubProvider::new(4);
        let index = VectorIndex::build(&provider, 4, vec![make_chunk("doc", 0, "text")])
            .await
            .expect("build");

        assert!(matches!(
            index.query(&[0.0, 0.0], 5),
            Err(PipelineError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let provider = StubProvider::failing_on(4, "unlucky");
        let chunks = vec![
            make_chunk("doc", 0, "first passage"),
            make_chunk("doc", 1, "unlucky passage"),
        ];
        let index = VectorIndex::build(&provider, 4, chunks).await.expect("build");

        let dir = tempfile::tempdir().expect("tempdir");
        index.persist(dir.path()).expect("persist");

        let reloaded = VectorIndex::load(dir.path()).expect("load");
        assert_eq!(reloaded.dimension(), index.dimension());
        assert_eq!(reloaded.len(), index.len());
        assert_eq!(reloaded.degraded_len(), 1);
        for (left, right) in index.entries().iter().zip(reloaded.entries()) {
            assert_eq!(left.id, right.id);
            assert_eq!(left.vector, right.vector);
            assert_eq!(left.degraded, right.degraded);
        }
    }

    #[test]
    fn load_reports_missing_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            VectorIndex::load(&dir.path().join("nothing_here")),
            Err(PipelineError::IndexNotFound(_))
        ));
    }

    #[test]
    fn load_reports_corrupt_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(INDEX_FILE), b"not json at all").expect("write");
        assert!(matches!(
            VectorIndex::load(dir.path()),
            Err(PipelineError::IndexCorrupt(_))
        ));
    }

    #[tokio::test]
    async fn fallback_vectors_match_the_configured_dimension() {
        let provider = StubProvider::failing_on(16, "anything");
        let embedding = embed_or_fallback(&provider, 16, "anything goes").await;
        assert!(embedding.degraded);
        assert_eq!(embedding.vector.len(), 16);
    }
}
