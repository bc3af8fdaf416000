//! Lexical lookup used when embedding-based retrieval is unavailable

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::retrieval::collaborators::LexicalSearch;
use crate::retrieval::config::DEFAULT_LEXICAL_TOP_K;
use crate::retrieval::error::RetrieveError;
use crate::retrieval::types::{CandidateRow, RetrieveResult};

/// Delegates to a full-text search and returns its matches as retrieved
/// chunks. No reranking, pinning or dedup.
#[derive(Clone)]
pub struct DeterministicRetriever {
    search: Arc<dyn LexicalSearch>,
    default_top_k: usize,
}

impl DeterministicRetriever {
    pub fn new(search: Arc<dyn LexicalSearch>) -> Self {
        Self {
            search,
            default_top_k: DEFAULT_LEXICAL_TOP_K,
        }
    }

    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Look up to `top_k` (default 6) matches for `query`
    #[instrument(skip(self, query), fields(team_id = %team_id, bot_id = %bot_id))]
    pub async fn retrieve(
        &self,
        team_id: &str,
        bot_id: &str,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<RetrieveResult, RetrieveError> {
        let query = query.trim();
        let top_k = top_k.unwrap_or(self.default_top_k);
        if query.is_empty() || top_k == 0 {
            return Ok(RetrieveResult::default());
        }

        let matches = self.search.search_text(query, team_id, bot_id, top_k).await?;
        debug!(matches = matches.len(), top_k, "Lexical search complete");

        Ok(RetrieveResult {
            chunks: matches
                .into_iter()
                .take(top_k)
                .map(CandidateRow::into_retrieved)
                .collect(),
            pinned_chunk_ids: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::retrieval::types::ChunkSource;

    #[derive(Default)]
    struct FakeLexical {
        calls: Mutex<Vec<(String, String, String, usize)>>,
    }

    #[async_trait]
    impl LexicalSearch for FakeLexical {
        async fn search_text(
            &self,
            query: &str,
            team_id: &str,
            bot_id: &str,
            limit: usize,
        ) -> Result<Vec<CandidateRow>, RetrieveError> {
            self.calls.lock().unwrap().push((
                query.to_string(),
                team_id.to_string(),
                bot_id.to_string(),
                limit,
            ));
            // Two matches from the same document to show no dedup happens
            Ok((0..10)
                .map(|i| CandidateRow {
                    chunk_id: format!("c{i}"),
                    document_id: "doc".to_string(),
                    canonical_url: None,
                    anchor_id: None,
                    content: format!("match {i}"),
                    language: Some("en".to_string()),
                    document_language: None,
                    translation_group_id: None,
                    similarity: 1.0 / (i as f64 + 1.0),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_default_top_k_and_shape() {
        let search = Arc::new(FakeLexical::default());
        let retriever = DeterministicRetriever::new(search.clone());

        let result = retriever.retrieve("team", "bot", " refund policy ", None).await.unwrap();
        assert_eq!(result.chunks.len(), 6);
        assert!(result.pinned_chunk_ids.is_empty());
        assert!(result.chunks.iter().all(|c| c.source == ChunkSource::Retrieved));
        assert!(result.chunks.iter().all(|c| c.document_id == "doc"));
        assert_eq!(result.chunks[0].similarity, Some(1.0));

        let calls = search.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            ("refund policy".to_string(), "team".to_string(), "bot".to_string(), 6)
        );
    }

    #[tokio::test]
    async fn test_explicit_top_k_and_blank_query() {
        let search = Arc::new(FakeLexical::default());
        let retriever = DeterministicRetriever::new(search.clone());

        let result = retriever.retrieve("team", "bot", "refund", Some(2)).await.unwrap();
        assert_eq!(result.chunks.len(), 2);

        let empty = retriever.retrieve("team", "bot", "  ", None).await.unwrap();
        assert!(empty.chunks.is_empty());
        assert_eq!(search.calls.lock().unwrap().len(), 1);
    }
}
