use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum VectorIndexError {
    #[error("sqlite open failed at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create index database parent {path}: {source}")]
    CreateParent {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite statement failed: {source}")]
    Sql {
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to decode embedding for record `{record_id}`")]
    InvalidEmbedding { record_id: String },
    #[error("failed to decode metadata for record `{record_id}`: {source}")]
    InvalidMetadata {
        record_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub namespace: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub namespace: String,
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub threshold: f32,
    pub metadata_filter: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record: VectorRecord,
    pub score: f32,
}

/// Namespaced vector storage with similarity search. Implementations must
/// tolerate concurrent search and upsert calls with per-record atomicity;
/// a stale read racing a concurrent write is acceptable.
pub trait VectorIndex: Send + Sync {
    fn upsert(&self, record: VectorRecord) -> Result<(), VectorIndexError>;

    /// Returns records in the query namespace whose metadata contains every
    /// `metadata_filter` entry and whose cosine score clears `threshold`,
    /// ordered by descending score (record id ascending on ties), truncated
    /// to `top_k`.
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, VectorIndexError>;

    fn delete(&self, namespace: &str, id: &str) -> Result<bool, VectorIndexError>;

    /// Removes every record in the namespace; returns the count removed.
    fn clear(&self, namespace: &str) -> Result<u64, VectorIndexError>;
}

pub(crate) fn metadata_matches(metadata: &Map<String, Value>, filter: &Map<String, Value>) -> bool {
    filter
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}

pub(crate) fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

pub(crate) fn cosine_similarity(a: &[f32], a_norm: f32, b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let b_norm = l2_norm(b);
    if b_norm == 0.0 || a_norm == 0.0 {
        return 0.0;
    }
    let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
    dot / (a_norm * b_norm)
}

pub(crate) fn rank_candidates(
    query: &SearchQuery,
    candidates: Vec<VectorRecord>,
) -> Vec<SearchHit> {
    let query_norm = l2_norm(&query.vector);
    let mut scored = candidates
        .into_iter()
        .filter(|record| metadata_matches(&record.metadata, &query.metadata_filter))
        .map(|record| {
            let score = cosine_similarity(&query.vector, query_norm, &record.vector);
            SearchHit { record, score }
        })
        .filter(|hit| hit.score >= query.threshold)
        .collect::<Vec<_>>();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    scored.truncate(query.top_k);
    scored
}
