//! Context assembly.
//!
//! Formats retrieved chunks into a bounded context block with numbered
//! citations, and records which chunks actually made it into the prompt.

use serde::Serialize;

use super::index::ScoredChunk;

/// Formatting allowance per chunk on top of its text (citation line, spacing).
const FORMAT_OVERHEAD: usize = 50;

const SNIPPET_LEN: usize = 200;

/// A chunk that was placed into the generation context.
#[derive(Debug, Clone, Serialize)]
pub struct SourceAttribution {
    pub chunk_id: String,
    pub source: String,
    pub snippet: String,
    pub score: f32,
    pub degraded: bool,
}

/// The formatted context plus the attributions of every included chunk.
#[derive(Debug, Clone)]
pub struct BuiltContext {
    pub text: String,
    pub sources: Vec<SourceAttribution>,
}

/// Format `hits` into a context string no longer than `max_chars`.
///
/// Chunks are taken in ranked order; the first one that would overflow the
/// budget stops the fill. Hits that were dropped are counted in the log.
pub fn build_context(hits: &[ScoredChunk], max_chars: usize) -> BuiltContext {
    let mut text = String::new();
    let mut sources = Vec::new();
    let mut used = 0;

    for (position, hit) in hits.iter().enumerate() {
        let addition = hit.chunk.text.chars().count() + FORMAT_OVERHEAD;
        if used + addition > max_chars {
            break;
        }

        let source = source_label(hit);
        text.push_str(&format!(
            "[{}] (Source: {}, relevance: {:.2})\n{}\n\n",
            position + 1,
            source,
            hit.score,
            hit.chunk.text
        ));
        sources.push(SourceAttribution {
            chunk_id: hit.chunk.id.clone(),
            source,
            snippet: hit.chunk.text.chars().take(SNIPPET_LEN).collect(),
            score: hit.score,
            degraded: hit.degraded,
        });
        used += addition;
    }

    if sources.len() < hits.len() {
        tracing::debug!(
            "context budget of {} chars dropped {} of {} retrieved chunks",
            max_chars,
            hits.len() - sources.len(),
            hits.len()
        );
    }

    BuiltContext {
        text: text.trim_end().to_string(),
        sources,
    }
}

fn source_label(hit: &ScoredChunk) -> String {
    hit.chunk
        .metadata
        .get("source")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| hit.chunk.document_id.clone())
}
