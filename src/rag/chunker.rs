//! Sliding-window chunking.
//!
//! Splits document text into fixed-size character windows advancing by
//! `size - overlap`, so consecutive chunks share `overlap` characters. The
//! final chunk may be shorter than `size`.

use serde::{Deserialize, Serialize};

use super::loader::Document;
use crate::errors::PipelineError;

/// A bounded span of a document's text, the unit of embedding and retrieval.
///
/// Ids are `chunk_<ordinal>` and unique only within a single chunking call;
/// callers indexing several documents together disambiguate with the
/// document id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub ordinal: usize,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Split a document into overlapping chunks.
pub fn chunk_document(
    document: &Document,
    size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, PipelineError> {
    if size == 0 {
        return Err(PipelineError::InvalidConfig(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if overlap >= size {
        return Err(PipelineError::InvalidConfig(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, size
        )));
    }

    let chars: Vec<char> = document.text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut ordinal = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let text: String = chars[start..end].iter().collect();

        chunks.push(Chunk {
            id: format!("chunk_{}", ordinal),
            document_id: document.id.clone(),
            ordinal,
            text,
            metadata: document.metadata.clone(),
        });

        if end == chars.len() {
            break;
        }
        start += step;
        ordinal += 1;
    }

    Ok(chunks)
}
