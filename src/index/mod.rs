//! Index store for retrieval
//!
//! A libsql database holding tenant-scoped documents, their embedded chunks
//! and the pinned chunks of each conversation. [`Database`] implements the
//! retrieval collaborator traits so it can back both retrievers directly.

mod database;
pub mod error;
mod schema;

pub use database::Database;
pub use error::DbError;
use rig::embeddings::Embedding;

/// An ingested page, owned by one bot of one team
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// ID of the document
    pub id: String,

    /// Owning team
    pub team_id: String,

    /// Owning bot
    pub bot_id: String,

    /// Public URL used for citation
    pub canonical_url: Option<String>,

    /// Page title
    pub title: Option<String>,

    /// Language of the document
    pub language: Option<String>,

    /// Shared with documents that translate the same source content
    pub translation_group_id: Option<String>,
}

/// Represents a chunk in the index
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// ID of the chunk
    pub id: String,

    /// ID of the owning document
    pub document_id: String,

    /// Fragment identifier of the section the chunk comes from
    pub anchor_id: Option<String>,

    /// Text of the chunk
    pub content: String,

    /// Chunk-level language, when it differs from or refines the document's
    pub language: Option<String>,

    /// Position of the chunk in the document
    pub position: i64,

    /// Embedding of the chunk
    pub embedding: Embedding,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EmbeddingConversion;

    #[test]
    fn test_indexed_chunk_embedding_blob() {
        let chunk = IndexedChunk {
            id: "c1".to_string(),
            document_id: "d1".to_string(),
            anchor_id: Some("setup".to_string()),
            content: "Install the agent".to_string(),
            language: None,
            position: 0,
            embedding: Embedding::from_vec(vec![0.25, 0.5]),
        };

        assert_eq!(chunk.embedding.to_binary().len(), 8);
        assert_eq!(chunk.embedding.to_vec(), vec![0.25, 0.5]);
    }
}
