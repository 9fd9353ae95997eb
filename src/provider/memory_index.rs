use super::index::{rank_candidates, SearchHit, SearchQuery, VectorIndex, VectorIndexError, VectorRecord};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Process-local vector index for tests and ephemeral sessions. A single
/// mutex gives per-record atomicity for concurrent search/upsert.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: Mutex<BTreeMap<(String, String), VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), VectorRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl VectorIndex for InMemoryVectorIndex {
    fn upsert(&self, record: VectorRecord) -> Result<(), VectorIndexError> {
        let key = (record.namespace.clone(), record.id.clone());
        self.lock().insert(key, record);
        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, VectorIndexError> {
        let candidates = self
            .lock()
            .range((query.namespace.clone(), String::new())..)
            .take_while(|((namespace, _), _)| *namespace == query.namespace)
            .map(|(_, record)| record.clone())
            .collect::<Vec<_>>();
        Ok(rank_candidates(query, candidates))
    }

    fn delete(&self, namespace: &str, id: &str) -> Result<bool, VectorIndexError> {
        let key = (namespace.to_string(), id.to_string());
        Ok(self.lock().remove(&key).is_some())
    }

    fn clear(&self, namespace: &str) -> Result<u64, VectorIndexError> {
        let mut records = self.lock();
        let keys = records
            .range((namespace.to_string(), String::new())..)
            .take_while(|((ns, _), _)| *ns == namespace)
            .map(|(key, _)| key.clone())
            .collect::<Vec<_>>();
        for key in &keys {
            records.remove(key);
        }
        Ok(keys.len() as u64)
    }
}
