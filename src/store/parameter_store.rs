use crate::config::DEFAULT_REUSE_THRESHOLD;
use crate::provider::{
    EmbeddingError, EmbeddingProvider, SearchHit, SearchQuery, VectorIndex, VectorIndexError,
    VectorRecord,
};
use crate::resolution::domain::{ParameterDomainError, ParameterValue, StoredMapping};
use crate::shared::logging::append_event;
use chrono::Utc;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

/// Logical partition of the vector index holding learned parameter
/// mappings, separate from any workflow-level records.
pub const PARAMETER_NAMESPACE: &str = "parameters";

#[derive(Debug, thiserror::Error)]
pub enum ParameterStoreError {
    #[error("embedding provider error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("vector index error: {0}")]
    Index(#[from] VectorIndexError),
    #[error("stored record `{record_id}` is missing or has malformed field `{field}`")]
    InvalidRecord {
        record_id: String,
        field: &'static str,
    },
    #[error("stored mapping invariant violated: {0}")]
    Domain(#[from] ParameterDomainError),
}

/// Content-addressed record id: the same (workflow, parameter, context)
/// triple always maps to the same record, so re-storing is an upsert.
pub fn mapping_record_id(workflow_name: &str, parameter_name: &str, context: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(workflow_name.as_bytes());
    hasher.update([0]);
    hasher.update(parameter_name.as_bytes());
    hasher.update([0]);
    hasher.update(context.as_bytes());
    let digest = hasher.finalize();
    to_hex(&digest)
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    const HEX: &[u8; 16] = b"0123456789abcdef";
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Maps (context text, parameter identity) to a previously agent-supplied
/// value via semantic similarity, and tracks reuse.
pub struct ParameterStore {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
    similarity_threshold: f32,
    event_log: Option<PathBuf>,
}

impl ParameterStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            namespace: PARAMETER_NAMESPACE.to_string(),
            similarity_threshold: DEFAULT_REUSE_THRESHOLD,
            event_log: None,
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_event_log(mut self, path: PathBuf) -> Self {
        self.event_log = Some(path);
        self
    }

    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    pub fn store_mapping(
        &self,
        context: &str,
        parameter_name: &str,
        value: &ParameterValue,
        workflow_name: &str,
    ) -> Result<(), ParameterStoreError> {
        let now = Utc::now().timestamp();
        let record_id = mapping_record_id(workflow_name, parameter_name, context);
        let vector = self.embedder.embed(context)?;
        let metadata = mapping_metadata(
            context,
            parameter_name,
            workflow_name,
            value,
            1,
            now,
            now,
        );
        self.index.upsert(VectorRecord {
            id: record_id.clone(),
            namespace: self.namespace.clone(),
            vector,
            text: context.to_string(),
            metadata,
        })?;
        self.log_event(
            "parameter.store",
            &[
                ("workflow", Value::String(workflow_name.to_string())),
                ("parameter", Value::String(parameter_name.to_string())),
                ("record_id", Value::String(record_id)),
            ],
        );
        Ok(())
    }

    /// Top-1 semantic lookup restricted to the (workflow, parameter)
    /// identity; returns `None` when nothing clears the threshold. Does not
    /// mutate stored state.
    pub fn find_mapping(
        &self,
        prompt: &str,
        parameter_name: &str,
        workflow_name: &str,
        threshold: Option<f32>,
    ) -> Result<Option<StoredMapping>, ParameterStoreError> {
        let vector = self.embedder.embed(prompt)?;
        let mut filter = Map::new();
        filter.insert(
            "parameter_name".to_string(),
            Value::String(parameter_name.to_string()),
        );
        filter.insert(
            "workflow_name".to_string(),
            Value::String(workflow_name.to_string()),
        );

        let hits = self.index.search(&SearchQuery {
            namespace: self.namespace.clone(),
            vector,
            top_k: 1,
            threshold: threshold.unwrap_or(self.similarity_threshold),
            metadata_filter: filter,
        })?;

        match hits.into_iter().next() {
            Some(hit) => Ok(Some(mapping_from_hit(&hit)?)),
            None => Ok(None),
        }
    }

    /// Re-upserts the mapping's record with `usage_count + 1` and a
    /// refreshed `updated_at`. Called once per successful reuse; never
    /// decremented.
    pub fn increment_usage(&self, mapping: &StoredMapping) -> Result<(), ParameterStoreError> {
        let now = Utc::now().timestamp();
        let record_id = mapping_record_id(
            &mapping.workflow_name,
            &mapping.parameter_name,
            &mapping.context,
        );
        let vector = self.embedder.embed(&mapping.context)?;
        let metadata = mapping_metadata(
            &mapping.context,
            &mapping.parameter_name,
            &mapping.workflow_name,
            &mapping.value,
            mapping.usage_count + 1,
            mapping.created_at.unwrap_or(now),
            now,
        );
        self.index.upsert(VectorRecord {
            id: record_id.clone(),
            namespace: self.namespace.clone(),
            vector,
            text: mapping.context.clone(),
            metadata,
        })?;
        self.log_event(
            "parameter.reuse",
            &[
                ("workflow", Value::String(mapping.workflow_name.clone())),
                ("parameter", Value::String(mapping.parameter_name.clone())),
                ("record_id", Value::String(record_id)),
                ("usage_count", Value::from(mapping.usage_count + 1)),
            ],
        );
        Ok(())
    }

    /// Administrative bulk delete of the parameter namespace.
    pub fn clear(&self) -> Result<u64, ParameterStoreError> {
        let removed = self.index.clear(&self.namespace)?;
        self.log_event("parameter.clear", &[("removed", Value::from(removed))]);
        Ok(removed)
    }

    fn log_event(&self, event: &str, fields: &[(&str, Value)]) {
        if let Some(path) = &self.event_log {
            let _ = append_event(path, event, fields);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn mapping_metadata(
    context: &str,
    parameter_name: &str,
    workflow_name: &str,
    value: &ParameterValue,
    usage_count: u64,
    created_at: i64,
    updated_at: i64,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("context".to_string(), Value::String(context.to_string()));
    metadata.insert(
        "parameter_name".to_string(),
        Value::String(parameter_name.to_string()),
    );
    metadata.insert(
        "workflow_name".to_string(),
        Value::String(workflow_name.to_string()),
    );
    metadata.insert("value".to_string(), value.to_json());
    metadata.insert(
        "value_type".to_string(),
        Value::String(value.type_label().to_string()),
    );
    metadata.insert("usage_count".to_string(), Value::from(usage_count));
    metadata.insert("created_at".to_string(), Value::from(created_at));
    metadata.insert("updated_at".to_string(), Value::from(updated_at));
    metadata
}

fn mapping_from_hit(hit: &SearchHit) -> Result<StoredMapping, ParameterStoreError> {
    let metadata = &hit.record.metadata;
    let record_id = hit.record.id.clone();

    let field_str = |field: &'static str| -> Result<String, ParameterStoreError> {
        metadata
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ParameterStoreError::InvalidRecord {
                record_id: record_id.clone(),
                field,
            })
    };

    let context = field_str("context")?;
    let parameter_name = field_str("parameter_name")?;
    let workflow_name = field_str("workflow_name")?;
    let value = metadata
        .get("value")
        .and_then(ParameterValue::from_json)
        .ok_or_else(|| ParameterStoreError::InvalidRecord {
            record_id: record_id.clone(),
            field: "value",
        })?;
    let usage_count = metadata
        .get("usage_count")
        .and_then(Value::as_u64)
        .ok_or_else(|| ParameterStoreError::InvalidRecord {
            record_id: record_id.clone(),
            field: "usage_count",
        })?;
    let created_at = metadata.get("created_at").and_then(Value::as_i64);

    let mapping = StoredMapping::new(
        context,
        value,
        hit.score.clamp(0.0, 1.0),
        workflow_name,
        parameter_name,
        usage_count,
        created_at,
    )?;
    Ok(mapping)
}
