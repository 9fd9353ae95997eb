use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Semantic,
    Generalized,
    None,
    Correction,
}

/// One audit record of a match outcome. Entries may be amended in place to
/// attach a later correction or helpfulness signal, but are otherwise
/// immutable history owned by the collector.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FeedbackEntry {
    pub timestamp: i64,
    pub prompt: String,
    #[serde(default)]
    pub matched_workflow: Option<String>,
    pub match_confidence: f32,
    pub match_type: MatchType,
    #[serde(default)]
    pub user_correction: Option<String>,
    #[serde(default)]
    pub was_helpful: Option<bool>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}
