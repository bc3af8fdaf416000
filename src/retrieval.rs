//! # Retrieval
//!
//! Chooses the chunks of indexed documentation to put in front of a language
//! model for one conversation turn.
//!
//! [`Retriever`] embeds the query, asks a vector index for candidates,
//! favors chunks in the user's language, keeps one chunk per document and
//! translation group, and merges the result with the chunks the
//! conversation has already been shown (its pins). [`DeterministicRetriever`]
//! is the lexical fallback that needs no embeddings.
//!
//! External services are reached through the traits in this module so the
//! libsql index in [`crate::index`], the rig embedding client in
//! [`crate::model`] or test fakes can be plugged in.

mod collaborators;
mod config;
mod deterministic;
mod error;
mod language;
mod memory;
mod ranking;
mod retriever;
mod types;

pub use collaborators::{
    ChunkLookup, ConversationStore, EmbeddingClient, LanguageDetector, LexicalSearch,
    VectorSearch,
};
pub use config::{
    RetrieveRequest, RetrieveRequestBuilder, RetrieverConfig, DEFAULT_LEXICAL_TOP_K,
    DEFAULT_PIN_LIMIT, DEFAULT_TOP_K,
};
pub use deterministic::DeterministicRetriever;
pub use error::RetrieveError;
pub use language::{
    effective_language, normalize_language_tag, resolve_preferred_languages,
    ScriptLanguageDetector,
};
pub use memory::InMemoryConversationStore;
pub use ranking::{merge_pins, rerank, select_diverse, Exclusions, ScoredCandidate};
pub use retriever::Retriever;
pub use types::{CandidateRow, ChunkSource, DetectedLanguage, RetrieveResult, RetrievedChunk};
