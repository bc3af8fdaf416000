//! External services the retrievers delegate to
//!
//! Each trait is object safe so orchestrators can hold them as
//! `Arc<dyn Trait>` and tests can swap in fakes.

use async_trait::async_trait;

use crate::retrieval::error::RetrieveError;
use crate::retrieval::types::{CandidateRow, DetectedLanguage, RetrievedChunk};

/// Turns text into a fixed-length vector
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrieveError>;
}

/// Nearest-neighbor search scoped to one tenant bot
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Return up to `limit` candidates, most similar first
    async fn search(
        &self,
        query_vector: &[f32],
        team_id: &str,
        bot_id: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRow>, RetrieveError>;
}

/// Full-text search scoped to one tenant bot
#[async_trait]
pub trait LexicalSearch: Send + Sync {
    /// Return up to `limit` matches, best first, with the rank score in
    /// `CandidateRow::similarity`
    async fn search_text(
        &self,
        query: &str,
        team_id: &str,
        bot_id: &str,
        limit: usize,
    ) -> Result<Vec<CandidateRow>, RetrieveError>;
}

/// Best-guess language identification
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> DetectedLanguage;
}

/// Persists the ordered pinned chunk ids of a conversation
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_pinned(&self, conversation_id: &str) -> Result<Vec<String>, RetrieveError>;

    async fn set_pinned(
        &self,
        conversation_id: &str,
        chunk_ids: &[String],
    ) -> Result<(), RetrieveError>;
}

/// Materializes chunk records by id. Unknown ids are dropped, not errors.
#[async_trait]
pub trait ChunkLookup: Send + Sync {
    async fn fetch_by_ids(&self, chunk_ids: &[String]) -> Result<Vec<RetrievedChunk>, RetrieveError>;
}
