//! Semantic retrieval with language-aware reranking and conversation pins

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::retrieval::collaborators::{
    ChunkLookup, ConversationStore, EmbeddingClient, LanguageDetector, VectorSearch,
};
use crate::retrieval::config::{RetrieveRequest, RetrieverConfig};
use crate::retrieval::error::RetrieveError;
use crate::retrieval::language::resolve_preferred_languages;
use crate::retrieval::ranking::{merge_pins, rerank, select_diverse, Exclusions};
use crate::retrieval::types::{RetrieveResult, RetrievedChunk};

/// Embedding-based retriever for one deployment.
///
/// Holds no per-conversation state: pins live in the [`ConversationStore`],
/// so one instance can serve every tenant concurrently.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingClient>,
    vector_search: Arc<dyn VectorSearch>,
    detector: Arc<dyn LanguageDetector>,
    conversations: Arc<dyn ConversationStore>,
    chunks: Arc<dyn ChunkLookup>,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        vector_search: Arc<dyn VectorSearch>,
        detector: Arc<dyn LanguageDetector>,
        conversations: Arc<dyn ConversationStore>,
        chunks: Arc<dyn ChunkLookup>,
    ) -> Self {
        Self {
            embedder,
            vector_search,
            detector,
            conversations,
            chunks,
            config: RetrieverConfig::default(),
        }
    }

    /// Replace the default tuning
    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Run one retrieval turn.
    ///
    /// Only a failed or timed out embedding is returned as an error. When
    /// vector search is unavailable the turn degrades to the conversation's
    /// pinned chunks, and store or lookup failures are logged and treated as
    /// empty.
    #[instrument(
        skip(self, request),
        fields(
            team_id = %request.team_id,
            bot_id = %request.bot_id,
            conversation_id = ?request.conversation_id,
            top_k = request.top_k
        )
    )]
    pub async fn retrieve(&self, request: &RetrieveRequest) -> Result<RetrieveResult, RetrieveError> {
        let query = request.query.trim();
        if query.is_empty() {
            debug!("Empty query, nothing to retrieve");
            return Ok(RetrieveResult::default());
        }

        let existing_pins = match &request.conversation_id {
            Some(conversation_id) => self.load_pins(conversation_id).await,
            None => Vec::new(),
        };

        let detected = self.detector.detect(query);
        let preferred = resolve_preferred_languages(
            request.preferred_languages.as_deref(),
            &detected,
            self.config.language_confidence_threshold,
        );
        debug!(
            detected = %detected.language,
            confidence = detected.confidence,
            preferred = ?preferred,
            "Resolved language preferences"
        );

        let query_vector = with_timeout(
            "embedding",
            self.config.embed_timeout,
            self.embedder.embed(query),
        )
        .await?;

        let limit = self.config.candidate_limit(request.top_k);
        let candidates = match with_timeout(
            "vector search",
            self.config.search_timeout,
            self.vector_search
                .search(&query_vector, &request.team_id, &request.bot_id, limit),
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Vector search failed, returning pinned chunks only");
                return Ok(self.pinned_only(existing_pins, request.pin_limit).await);
            }
        };
        debug!(candidates = candidates.len(), limit, "Fetched candidates");

        let pinned_chunks = self.load_pinned_chunks(&existing_pins).await;

        let ranked = rerank(candidates, &preferred, &self.config);
        for candidate in ranked.iter().take(request.top_k) {
            debug!(
                chunk_id = %candidate.row.chunk_id,
                language = candidate.language.as_deref().unwrap_or("unknown"),
                similarity = candidate.row.similarity,
                score = candidate.score,
                "Ranked candidate"
            );
        }

        let exclusions = Exclusions {
            chunk_ids: existing_pins.iter().cloned().collect(),
            document_ids: pinned_chunks
                .iter()
                .map(|chunk| chunk.document_id.clone())
                .collect::<HashSet<_>>(),
        };
        let selected = select_diverse(ranked, request.top_k, &exclusions);
        let selected_ids: Vec<String> = selected
            .iter()
            .map(|candidate| candidate.row.chunk_id.clone())
            .collect();

        let pinned_chunk_ids = match &request.conversation_id {
            Some(conversation_id) => {
                let merged = merge_pins(&existing_pins, &selected_ids, request.pin_limit);
                if let Err(e) = self.conversations.set_pinned(conversation_id, &merged).await {
                    warn!(error = %e, "Failed to persist pinned chunks");
                }
                merged
            }
            None => Vec::new(),
        };

        let pinned_count = pinned_chunks.len();
        let mut chunks = pinned_chunks;
        chunks.extend(selected.into_iter().map(|candidate| candidate.row.into_retrieved()));

        info!(
            pinned = pinned_count,
            retrieved = chunks.len() - pinned_count,
            pins = pinned_chunk_ids.len(),
            "Retrieval complete"
        );

        Ok(RetrieveResult {
            chunks,
            pinned_chunk_ids,
        })
    }

    async fn load_pins(&self, conversation_id: &str) -> Vec<String> {
        match self.conversations.get_pinned(conversation_id).await {
            Ok(pins) => pins,
            Err(e) => {
                warn!(error = %e, "Failed to load pinned chunks, continuing without them");
                Vec::new()
            }
        }
    }

    /// Fetch pinned chunks, keeping pin order
    async fn load_pinned_chunks(&self, pins: &[String]) -> Vec<RetrievedChunk> {
        if pins.is_empty() {
            return Vec::new();
        }

        let mut fetched = match self.chunks.fetch_by_ids(pins).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "Failed to fetch pinned chunks");
                return Vec::new();
            }
        };

        let mut ordered = Vec::with_capacity(pins.len());
        for id in pins {
            if let Some(position) = fetched.iter().position(|chunk| &chunk.chunk_id == id) {
                ordered.push(fetched.swap_remove(position).into_pinned());
            }
        }
        ordered
    }

    async fn pinned_only(&self, existing_pins: Vec<String>, pin_limit: usize) -> RetrieveResult {
        let chunks = self.load_pinned_chunks(&existing_pins).await;
        let mut pinned_chunk_ids = existing_pins;
        pinned_chunk_ids.truncate(pin_limit);
        RetrieveResult {
            chunks,
            pinned_chunk_ids,
        }
    }
}

async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, RetrieveError>
where
    F: Future<Output = Result<T, RetrieveError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RetrieveError::Timeout {
            operation,
            millis: limit.as_millis() as u64,
        }),
    }
}
