use crate::errors::PipelineError;

/// Cosine similarity between two vectors of equal dimension.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, PipelineError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(PipelineError::InvalidArgument(
            "vectors must not be empty".to_string(),
        ));
    }
    if query.len() != candidate.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: query.len(),
            actual: candidate.len(),
        });
    }

    let dot: f32 = query.iter().zip(candidate.iter()).map(|(x, y)| x * y).sum();
    let query_norm: f32 = query.iter().map(|x| x * x).sum::<f32>().sqrt();
    let candidate_norm: f32 = candidate.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = query_norm * candidate_norm;

    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok((dot / denom).clamp(-1.0, 1.0))
}

/// Rank candidates by descending cosine similarity to the query.
///
/// The sort is stable, so equal scores keep their insertion order.
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[&[f32]],
) -> Result<Vec<(usize, f32)>, PipelineError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.total_cmp(&left.1));
    Ok(scores)
}
