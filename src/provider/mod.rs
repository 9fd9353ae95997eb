pub mod embedding;
pub mod index;
pub mod memory_index;
pub mod sqlite_index;

pub use embedding::{EmbeddingError, EmbeddingProvider, HashingEmbedder};
pub use index::{SearchHit, SearchQuery, VectorIndex, VectorIndexError, VectorRecord};
pub use memory_index::InMemoryVectorIndex;
pub use sqlite_index::SqliteVectorIndex;
