//! # Retrieval Error Types Module
//!
//! Error types for the retrieval pipeline. Only embedding failures (and
//! embedding timeouts) are fatal to a retrieval turn; the remaining variants
//! are produced by collaborators and mostly end up logged while the turn
//! degrades.

use thiserror::Error;

use crate::error::Error as CrateError;

/// Errors that can occur during retrieval operations
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The query could not be embedded
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A collaborator call exceeded its caller-enforced timeout
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        /// Name of the timed out call
        operation: &'static str,
        /// Configured timeout
        millis: u64,
    },

    /// Nearest-neighbor search failed
    #[error("Vector search error: {0}")]
    VectorSearch(String),

    /// Full-text search failed
    #[error("Lexical search error: {0}")]
    LexicalSearch(String),

    /// Reading or writing the conversation's pinned chunks failed
    #[error("Conversation store error: {0}")]
    ConversationStore(String),

    /// Materializing chunks by id failed
    #[error("Chunk lookup error: {0}")]
    ChunkLookup(String),
}

impl From<RetrieveError> for CrateError {
    fn from(err: RetrieveError) -> Self {
        CrateError::Retrieve(err.to_string())
    }
}
