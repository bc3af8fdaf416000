//! Data types exchanged by the retrieval pipeline

use serde::{Deserialize, Serialize};

use crate::retrieval::language::effective_language;

/// Where a chunk in a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSource {
    /// Already pinned to the conversation before this turn
    Pinned,
    /// Selected fresh for this turn
    Retrieved,
}

/// A chunk as returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub document_id: String,
    /// Public source URL used for citation
    pub canonical_url: Option<String>,
    pub anchor_id: Option<String>,
    pub content: String,
    /// Chunk-level language tag
    pub language: Option<String>,
    /// Language of the owning document
    pub document_language: Option<String>,
    /// Shared by documents that translate the same source content
    pub translation_group_id: Option<String>,
    /// Similarity to the query; `None` for pinned chunks that were not re-scored
    pub similarity: Option<f64>,
    pub source: ChunkSource,
}

impl RetrievedChunk {
    /// Chunk language, falling back to the document language
    pub fn effective_language(&self) -> Option<String> {
        effective_language(self.language.as_deref(), self.document_language.as_deref())
    }

    /// Re-label a looked-up chunk as pinned context
    pub fn into_pinned(self) -> Self {
        Self {
            similarity: None,
            source: ChunkSource::Pinned,
            ..self
        }
    }
}

/// A nearest-neighbor (or lexical) match as produced by a search collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRow {
    pub chunk_id: String,
    pub document_id: String,
    pub canonical_url: Option<String>,
    pub anchor_id: Option<String>,
    pub content: String,
    pub language: Option<String>,
    pub document_language: Option<String>,
    pub translation_group_id: Option<String>,
    /// Cosine similarity for vector search, rank score for lexical search
    pub similarity: f64,
}

impl CandidateRow {
    /// Chunk language, falling back to the document language
    pub fn effective_language(&self) -> Option<String> {
        effective_language(self.language.as_deref(), self.document_language.as_deref())
    }

    pub fn into_retrieved(self) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: self.chunk_id,
            document_id: self.document_id,
            canonical_url: self.canonical_url,
            anchor_id: self.anchor_id,
            content: self.content,
            language: self.language,
            document_language: self.document_language,
            translation_group_id: self.translation_group_id,
            similarity: Some(self.similarity),
            source: ChunkSource::Retrieved,
        }
    }
}

/// Outcome of one retrieval turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResult {
    /// Pinned chunks first, then the fresh selection in score order
    pub chunks: Vec<RetrievedChunk>,
    /// Pin list of the conversation after this turn
    pub pinned_chunk_ids: Vec<String>,
}

impl RetrieveResult {
    /// Chunks selected fresh this turn
    pub fn retrieved(&self) -> impl Iterator<Item = &RetrievedChunk> {
        self.chunks
            .iter()
            .filter(|chunk| chunk.source == ChunkSource::Retrieved)
    }

    /// Chunks carried over from earlier turns
    pub fn pinned(&self) -> impl Iterator<Item = &RetrievedChunk> {
        self.chunks
            .iter()
            .filter(|chunk| chunk.source == ChunkSource::Pinned)
    }
}

/// Language guess for a piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedLanguage {
    pub language: String,
    /// 0.0 to 1.0
    pub confidence: f64,
}

impl DetectedLanguage {
    pub fn new(language: impl Into<String>, confidence: f64) -> Self {
        Self {
            language: language.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Undetermined language with zero confidence
    pub fn unknown() -> Self {
        Self::new("und", 0.0)
    }
}
