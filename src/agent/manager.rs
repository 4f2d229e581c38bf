//! Pipeline entry points.
//!
//! `AgentManager` wires the loader, chunker, index, retriever and
//! synthesizer together and runs each operation inside a bounded
//! conversation. It owns the single active index behind a `RwLock`:
//! `process_documents` and `reset` hold the write lock for their full
//! duration, questions and status reads share the read lock, so builds and
//! queries never interleave on the same index.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use super::conversation::{
    Conversation, ConversationMessage, Phase, Role, TerminationCause, TurnSignal,
};
use crate::config::{Config, SUPPORTED_FORMATS};
use crate::errors::PipelineError;
use crate::llm::{LlmProvider, OllamaProvider};
use crate::rag::{chunk_document, load_documents, retrieve, synthesize_answer, Answer, VectorIndex};

/// Outcome of a document-processing run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub documents_processed: usize,
    pub chunks_created: usize,
    pub degraded_chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub entries: usize,
    pub degraded_entries: usize,
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationStatus {
    pub rounds: usize,
    pub phase: Phase,
    pub termination_cause: Option<TerminationCause>,
}

/// Snapshot of the running system, for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub model: String,
    pub base_url: String,
    pub vector_store_path: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub supported_formats: Vec<String>,
    pub index: Option<IndexStatus>,
    pub conversation: Option<ConversationStatus>,
}

pub struct AgentManager {
    config: Config,
    provider: Arc<dyn LlmProvider>,
    index: RwLock<Option<VectorIndex>>,
    conversation: RwLock<Option<Conversation>>,
}

impl AgentManager {
    /// Construct with the Ollama backend selected by the configuration.
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let provider = Arc::new(OllamaProvider::new(&config));
        Self::with_provider(config, provider)
    }

    /// Construct with an explicit backend.
    pub fn with_provider(
        config: Config,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let index = match VectorIndex::load(&config.vector_store_path) {
            Ok(index) => {
                tracing::info!(
                    "loaded persisted index with {} entries from {}",
                    index.len(),
                    config.vector_store_path.display()
                );
                Some(index)
            }
            Err(PipelineError::IndexNotFound(_)) => {
                tracing::info!(
                    "no persisted index at {}; will build on first ingest",
                    config.vector_store_path.display()
                );
                None
            }
            Err(PipelineError::IndexCorrupt(reason)) => {
                tracing::warn!("persisted index is unreadable ({}); starting empty", reason);
                None
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            config,
            provider,
            index: RwLock::new(index),
            conversation: RwLock::new(None),
        })
    }

    /// Chunk, embed, index and persist the given files, replacing the
    /// active index.
    pub async fn process_documents(
        &self,
        paths: &[PathBuf],
    ) -> Result<ProcessReport, PipelineError> {
        let mut index_guard = self.index.write().await;

        let mut conversation = Conversation::new(self.config.max_rounds)?;
        conversation.begin()?;
        conversation.append(
            Role::Driver,
            format!("Process {} document(s)", paths.len()),
            TurnSignal::Continue,
        )?;

        let documents = load_documents(paths);
        if documents.is_empty() {
            return Err(PipelineError::EmptyInput(
                "none of the given files could be loaded".to_string(),
            ));
        }
        let documents_processed = documents.len();

        let mut chunks = Vec::new();
        for document in &documents {
            let document_chunks =
                chunk_document(document, self.config.chunk_size, self.config.chunk_overlap)?;
            conversation.append(
                Role::Ingestion,
                format!(
                    "Chunked {} into {} chunk(s)",
                    document.source_path.display(),
                    document_chunks.len()
                ),
                TurnSignal::Continue,
            )?;
            chunks.extend(document_chunks);
        }

        if chunks.is_empty() {
            return Err(PipelineError::EmptyInput(
                "the loaded documents contain no text".to_string(),
            ));
        }
        let chunks_created = chunks.len();

        let index =
            VectorIndex::build(self.provider.as_ref(), self.config.embedding_dim, chunks).await?;
        let degraded_chunks = index.degraded_len();
        conversation.append(
            Role::Ingestion,
            format!(
                "Embedded and indexed {} chunk(s), {} via fallback vectors",
                chunks_created, degraded_chunks
            ),
            TurnSignal::Continue,
        )?;

        index.persist(&self.config.vector_store_path)?;
        conversation.append(
            Role::Ingestion,
            format!(
                "Index persisted to {}",
                self.config.vector_store_path.display()
            ),
            TurnSignal::Terminate,
        )?;

        *index_guard = Some(index);
        *self.conversation.write().await = Some(conversation);

        tracing::info!(
            "processed {} document(s) into {} chunk(s) ({} degraded)",
            documents_processed,
            chunks_created,
            degraded_chunks
        );

        Ok(ProcessReport {
            documents_processed,
            chunks_created,
            degraded_chunks,
        })
    }

    /// Answer a question from the active index.
    pub async fn ask_question(&self, question: &str) -> Result<Answer, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::InvalidArgument(
                "question must not be empty".to_string(),
            ));
        }

        let index_guard = self.index.read().await;
        let index = index_guard.as_ref().ok_or(PipelineError::IndexNotReady)?;

        let mut conversation = Conversation::new(self.config.qa_max_rounds)?;
        conversation.begin()?;
        conversation.append(Role::Driver, question, TurnSignal::Continue)?;

        let hits = retrieve(self.provider.as_ref(), index, question, self.config.top_k).await?;
        conversation.append(
            Role::Query,
            format!("Retrieved {} passage(s)", hits.len()),
            TurnSignal::Continue,
        )?;

        let answer = synthesize_answer(
            self.provider.as_ref(),
            question,
            &hits,
            self.config.max_context_chars,
        )
        .await?;
        conversation.append(Role::Query, answer.text.clone(), TurnSignal::Terminate)?;

        *self.conversation.write().await = Some(conversation);

        Ok(answer)
    }

    /// Snapshot of index and conversation state.
    pub async fn status(&self) -> StatusReport {
        let index_guard = self.index.read().await;
        let conversation_guard = self.conversation.read().await;

        StatusReport {
            model: self.config.ollama_model.clone(),
            base_url: self.config.ollama_base_url.clone(),
            vector_store_path: self.config.vector_store_path.display().to_string(),
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            top_k: self.config.top_k,
            supported_formats: SUPPORTED_FORMATS.iter().map(|s| s.to_string()).collect(),
            index: index_guard.as_ref().map(|index| IndexStatus {
                entries: index.len(),
                degraded_entries: index.degraded_len(),
                dimension: index.dimension(),
            }),
            conversation: conversation_guard
                .as_ref()
                .map(|conversation| ConversationStatus {
                    rounds: conversation.round(),
                    phase: conversation.phase(),
                    termination_cause: conversation.termination_cause(),
                }),
        }
    }

    /// Transcript of the most recent conversation.
    pub async fn conversation_history(&self) -> Vec<ConversationMessage> {
        self.conversation
            .read()
            .await
            .as_ref()
            .map(|conversation| conversation.transcript().to_vec())
            .unwrap_or_default()
    }

    /// Discard the persisted index and all conversation state.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        let mut index_guard = self.index.write().await;
        let mut conversation_guard = self.conversation.write().await;

        if self.config.vector_store_path.exists() {
            std::fs::remove_dir_all(&self.config.vector_store_path)?;
            tracing::info!(
                "removed persisted index at {}",
                self.config.vector_store_path.display()
            );
        }

        *index_guard = None;
        *conversation_guard = None;
        tracing::info!("system reset");
        Ok(())
    }

    /// Probe the backend and list the models it serves.
    pub async fn check_connection(&self) -> Result<Vec<String>, PipelineError> {
        self.provider.list_models().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubProvider {
        dimension: usize,
        fail_embeddings: bool,
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
            Ok(vec!["stub:latest".to_string()])
        }

        async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
            Ok(format!("answer for: {}", prompt.len()))
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
            if self.fail_embeddings {
                return Err(PipelineError::UpstreamUnavailable("down".to_string()));
            }
            let seed = text.bytes().map(|b| b as f32).sum::<f32>() % 31.0;
            let mut vector = vec![1.0; self.dimension];
            vector[0] = seed;
            Ok(vector)
        }
    }

    fn test_config(store: &std::path::Path) -> Config {
        Config {
            vector_store_path: store.join("store"),
            log_dir: store.join("logs"),
            embedding_dim: 8,
            ..Config::default()
        }
    }

    fn manager_with(
        store: &std::path::Path,
        fail_embeddings: bool,
    ) -> AgentManager {
        let config = test_config(store);
        let provider = Arc::new(StubProvider {
            dimension: config.embedding_dim,
            fail_embeddings,
        });
        AgentManager::with_provider(config, provider).expect("manager")
    }

    fn write_sample_docs(dir: &std::path::Path) -> Vec<PathBuf> {
        let a = dir.join("policies.txt");
        let b = dir.join("handbook.md");
        std::fs::write(&a, "Employees accrue twenty days of paid leave per year.")
            .expect("write a");
        std::fs::write(&b, "# Handbook\nRemote work requires manager approval.").expect("write b");
        vec![a, b]
    }

    #[tokio::test]
    async fn process_then_ask_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_with(dir.path(), false);
        let paths = write_sample_docs(dir.path());

        let report = manager.process_documents(&paths).await.expect("process");
        assert_eq!(report.documents_processed, 2);
        assert!(report.chunks_created >= 2);
        assert_eq!(report.degraded_chunks, 0);

        let answer = manager
            .ask_question("How many days of leave do employees get?")
            .await
            .expect("answer");
        assert!(answer.text.starts_with("answer for:"));
        assert!(!answer.sources.is_empty());

        let status = manager.status().await;
        let index = status.index.expect("index status");
        assert_eq!(index.entries, report.chunks_created);
        assert_eq!(index.degraded_entries, 0);

        let history = manager.conversation_history().await;
        assert!(!history.is_empty());
        assert_eq!(history.first().expect("first turn").sender, Role::Driver);
    }

    #[tokio::test]
    async fn degraded_build_is_flagged_but_serves_answers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_with(dir.path(), true);
        let paths = write_sample_docs(dir.path());

        let report = manager.process_documents(&paths).await.expect("process");
        assert_eq!(report.degraded_chunks, report.chunks_created);

        let answer = manager.ask_question("anything?").await.expect("answer");
        assert!(answer.sources.iter().all(|source| source.degraded));
    }

    #[tokio::test]
    async fn asking_before_processing_fails_cleanly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_with(dir.path(), false);

        assert!(matches!(
            manager.ask_question("too early?").await,
            Err(PipelineError::IndexNotReady)
        ));
        assert!(matches!(
            manager.ask_question("  ").await,
            Err(PipelineError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn persisted_index_survives_a_new_manager() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = write_sample_docs(dir.path());

        let report = {
            let manager = manager_with(dir.path(), false);
            manager.process_documents(&paths).await.expect("process")
        };

        let reopened = manager_with(dir.path(), false);
        let status = reopened.status().await;
        assert_eq!(
            status.index.expect("index status").entries,
            report.chunks_created
        );
    }

    #[tokio::test]
    async fn reset_clears_the_store_and_the_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_with(dir.path(), false);
        let paths = write_sample_docs(dir.path());

        manager.process_documents(&paths).await.expect("process");
        assert!(dir.path().join("store").exists());

        manager.reset().await.expect("reset");
        assert!(!dir.path().join("store").exists());
        assert!(matches!(
            manager.ask_question("gone?").await,
            Err(PipelineError::IndexNotReady)
        ));
        assert!(manager.status().await.index.is_none());
    }

    #[tokio::test]
    async fn processing_nothing_is_an_empty_input_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = manager_with(dir.path(), false);

        assert!(matches!(
            manager.process_documents(&[]).await,
            Err(PipelineError::EmptyInput(_))
        ));
        assert!(matches!(
            manager
                .process_documents(&[dir.path().join("missing.txt")])
                .await,
            Err(PipelineError::EmptyInput(_))
        ));
    }
}
