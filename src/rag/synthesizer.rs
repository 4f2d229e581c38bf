//! Answer synthesis.
//!
//! Assembles a grounded prompt from the question and the retrieved context,
//! invokes the generative model and returns the answer together with the
//! source chunks that were actually placed in the context. Generation
//! failures surface to the caller; they are never papered over.

use serde::Serialize;

use super::context_builder::{build_context, SourceAttribution};
use super::index::ScoredChunk;
use crate::errors::PipelineError;
use crate::llm::LlmProvider;

/// A synthesized answer and the passages it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceAttribution>,
}

/// Generate an answer for `question` grounded in `retrieved`.
pub async fn synthesize_answer(
    provider: &dyn LlmProvider,
    question: &str,
    retrieved: &[ScoredChunk],
    max_context_chars: usize,
) -> Result<Answer, PipelineError> {
    let context = build_context(retrieved, max_context_chars);
    let prompt = build_prompt(question, &context.text);

    let text = provider.generate(&prompt).await?;

    Ok(Answer {
        text,
        sources: context.sources,
    })
}

fn build_prompt(question: &str, context: &str) -> String {
    if context.is_empty() {
        return format!(
            "Answer the question below. No supporting passages were found, \
             so say explicitly that the indexed documents do not cover it.\n\n\
             Question: {}\n\nAnswer:",
            question
        );
    }

    format!(
        "You are answering a question about a set of indexed documents. \
         Base the answer strictly on the numbered passages below, cite the \
         passage numbers you used, and say so when the passages are not \
         sufficient.\n\n{}\n\nQuestion: {}\n\nAnswer:",
        context, question
    )
}
