pub mod chunker;
pub mod context_builder;
pub mod index;
pub mod loader;
pub mod retriever;
pub mod synthesizer;

pub use chunker::{chunk_document, Chunk};
pub use context_builder::{build_context, BuiltContext, SourceAttribution};
pub use index::{Embedding, IndexEntry, ScoredChunk, VectorIndex};
pub use loader::{load_documents, Document};
pub use retriever::retrieve;
pub use synthesizer::{synthesize_answer, Answer};
