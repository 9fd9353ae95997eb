use super::index::{cosine_similarity, l2_norm};

pub const DEFAULT_EMBEDDING_DIM: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
}

/// Produces fixed-length embeddings and a text-to-text similarity score in
/// [0, 1]. Implementations must be deterministic for identical input.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
    fn similarity(&self, a: &str, b: &str) -> Result<f32, EmbeddingError>;
}

/// Deterministic token-hash bag embedder. Each token is FNV-hashed into a
/// signed bucket with a length-weighted magnitude, and the result is
/// L2-normalized. Whitespace-only text embeds to the zero vector, which
/// scores 0.0 against everything.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self {
            dim: DEFAULT_EMBEDDING_DIM,
        }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let tokens = text
            .split_whitespace()
            .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
            .map(|token| token.to_lowercase())
            .filter(|token| !token.is_empty())
            .collect::<Vec<_>>();

        let mut out = vec![0.0_f32; self.dim];
        if tokens.is_empty() {
            return Ok(out);
        }

        for token in tokens {
            let hash = fnv1a(token.as_bytes());
            let idx = (hash as usize) % self.dim;
            let sign = if hash & 1 == 0 { 1.0_f32 } else { -1.0_f32 };
            let mag = 1.0_f32 + (token.len() as f32 / 32.0_f32);
            out[idx] += sign * mag;
        }

        let norm = l2_norm(&out);
        if norm <= f32::EPSILON {
            return Ok(vec![0.0_f32; self.dim]);
        }
        for value in &mut out {
            *value /= norm;
        }
        Ok(out)
    }

    fn similarity(&self, a: &str, b: &str) -> Result<f32, EmbeddingError> {
        let left = self.embed(a)?;
        let right = self.embed(b)?;
        let left_norm = l2_norm(&left);
        if left_norm == 0.0 {
            return Ok(0.0);
        }
        Ok(cosine_similarity(&left, left_norm, &right).clamp(0.0, 1.0))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325_u64;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3_u64);
    }
    hash
}
