use super::index::{rank_candidates, SearchHit, SearchQuery, VectorIndex, VectorIndexError, VectorRecord};
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Durable vector index over a single sqlite database. Connections are
/// opened per call with WAL journaling, so concurrent readers and a writer
/// may share the same database file.
pub struct SqliteVectorIndex {
    db_path: PathBuf,
}

impl SqliteVectorIndex {
    pub fn open(db_path: &Path) -> Result<Self, VectorIndexError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|source| VectorIndexError::CreateParent {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let index = Self {
            db_path: db_path.to_path_buf(),
        };
        index.ensure_schema()?;
        Ok(index)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    fn ensure_schema(&self) -> Result<(), VectorIndexError> {
        let connection = self.connect()?;
        connection
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS vector_records (
                    namespace TEXT NOT NULL,
                    record_id TEXT NOT NULL,
                    embedding BLOB NOT NULL,
                    text TEXT NOT NULL,
                    metadata TEXT NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (namespace, record_id)
                );

                CREATE INDEX IF NOT EXISTS idx_vector_records_namespace
                    ON vector_records(namespace);
                ",
            )
            .map_err(|source| VectorIndexError::Sql { source })?;
        Ok(())
    }

    fn connect(&self) -> Result<Connection, VectorIndexError> {
        let connection =
            Connection::open(&self.db_path).map_err(|source| VectorIndexError::Open {
                path: self.db_path.display().to_string(),
                source,
            })?;
        connection
            .execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|source| VectorIndexError::Sql { source })?;
        Ok(connection)
    }

    fn load_namespace(&self, namespace: &str) -> Result<Vec<VectorRecord>, VectorIndexError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare(
                "
                SELECT record_id, embedding, text, metadata
                FROM vector_records
                WHERE namespace = ?1
                ORDER BY record_id ASC
                ",
            )
            .map_err(|source| VectorIndexError::Sql { source })?;

        let rows = statement
            .query_map(params![namespace], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|source| VectorIndexError::Sql { source })?;

        let mut out = Vec::new();
        for row in rows {
            let (record_id, blob, text, metadata_raw) =
                row.map_err(|source| VectorIndexError::Sql { source })?;
            let vector = decode_embedding(&record_id, &blob)?;
            let metadata = decode_metadata(&record_id, &metadata_raw)?;
            out.push(VectorRecord {
                id: record_id,
                namespace: namespace.to_string(),
                vector,
                text,
                metadata,
            });
        }
        Ok(out)
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn upsert(&self, record: VectorRecord) -> Result<(), VectorIndexError> {
        let metadata = serde_json::to_string(&record.metadata).map_err(|source| {
            VectorIndexError::InvalidMetadata {
                record_id: record.id.clone(),
                source,
            }
        })?;
        let connection = self.connect()?;
        connection
            .execute(
                "
                INSERT INTO vector_records (
                    namespace, record_id, embedding, text, metadata, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, strftime('%s','now'))
                ON CONFLICT(namespace, record_id) DO UPDATE SET
                    embedding=excluded.embedding,
                    text=excluded.text,
                    metadata=excluded.metadata,
                    updated_at=excluded.updated_at
                ",
                params![
                    record.namespace,
                    record.id,
                    encode_embedding(&record.vector),
                    record.text,
                    metadata,
                ],
            )
            .map_err(|source| VectorIndexError::Sql { source })?;
        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, VectorIndexError> {
        let candidates = self.load_namespace(&query.namespace)?;
        Ok(rank_candidates(query, candidates))
    }

    fn delete(&self, namespace: &str, id: &str) -> Result<bool, VectorIndexError> {
        let connection = self.connect()?;
        let removed = connection
            .execute(
                "DELETE FROM vector_records WHERE namespace = ?1 AND record_id = ?2",
                params![namespace, id],
            )
            .map_err(|source| VectorIndexError::Sql { source })?;
        Ok(removed > 0)
    }

    fn clear(&self, namespace: &str) -> Result<u64, VectorIndexError> {
        let connection = self.connect()?;
        let removed = connection
            .execute(
                "DELETE FROM vector_records WHERE namespace = ?1",
                params![namespace],
            )
            .map_err(|source| VectorIndexError::Sql { source })?;
        Ok(removed as u64)
    }
}

fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

fn decode_embedding(record_id: &str, blob: &[u8]) -> Result<Vec<f32>, VectorIndexError> {
    if blob.len() % 4 != 0 {
        return Err(VectorIndexError::InvalidEmbedding {
            record_id: record_id.to_string(),
        });
    }
    let mut out = Vec::with_capacity(blob.len() / 4);
    for chunk in blob.chunks_exact(4) {
        out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok(out)
}

fn decode_metadata(record_id: &str, raw: &str) -> Result<Map<String, Value>, VectorIndexError> {
    serde_json::from_str(raw).map_err(|source| VectorIndexError::InvalidMetadata {
        record_id: record_id.to_string(),
        source,
    })
}
