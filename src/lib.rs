//! ragdesk: a document Q&A pipeline over a local Ollama instance.
//!
//! Documents are split into overlapping chunks, embedded and stored in a
//! persisted vector index; questions are answered by top-k retrieval plus
//! grounded generation. Every operation runs inside a bounded conversation
//! between the driver, ingestion and query roles.

pub mod agent;
pub mod config;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod vector_math;

pub use agent::AgentManager;
pub use config::Config;
pub use errors::PipelineError;
