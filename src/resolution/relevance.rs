use super::context::find_case_insensitive;
use super::domain::ParameterSchema;
use crate::provider::{EmbeddingError, EmbeddingProvider};

/// Confidence that the prompt is *about* this parameter, independent of
/// whether its value is known: the maximum of the prompt's similarity to the
/// schema description, its similarity to each semantic hint, and a fixed
/// boost when a hint appears verbatim (case-insensitive) in the prompt.
/// Literal containment may only raise the score, never lower it. Returns
/// 0.0 when the schema carries neither hints nor a description.
pub fn calculate_relevance(
    embedder: &dyn EmbeddingProvider,
    prompt: &str,
    schema: &ParameterSchema,
    literal_hint_boost: f32,
) -> Result<f32, EmbeddingError> {
    let mut best = 0.0_f32;

    if !schema.description.trim().is_empty() {
        best = best.max(embedder.similarity(prompt, &schema.description)?);
    }

    for hint in &schema.semantic_hints {
        if hint.trim().is_empty() {
            continue;
        }
        best = best.max(embedder.similarity(prompt, hint)?);
        if find_case_insensitive(prompt, hint).is_some() {
            best = best.max(literal_hint_boost);
        }
    }

    Ok(best.clamp(0.0, 1.0))
}
