//! Retrieval request and retriever tuning

use std::time::Duration;

/// Default number of fresh chunks per turn
pub const DEFAULT_TOP_K: usize = 12;

/// Default size of a conversation's pin list
pub const DEFAULT_PIN_LIMIT: usize = 6;

/// Default number of matches for the lexical retriever
pub const DEFAULT_LEXICAL_TOP_K: usize = 6;

/// One retrieval turn
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieveRequest {
    pub team_id: String,
    pub bot_id: String,
    pub query: String,
    /// Pins are loaded and persisted only when set
    pub conversation_id: Option<String>,
    /// Used verbatim (after normalization) instead of detection when set
    pub preferred_languages: Option<Vec<String>>,
    pub top_k: usize,
    pub pin_limit: usize,
}

impl RetrieveRequest {
    pub fn builder(
        team_id: impl Into<String>,
        bot_id: impl Into<String>,
        query: impl Into<String>,
    ) -> RetrieveRequestBuilder {
        RetrieveRequestBuilder::new(team_id, bot_id, query)
    }
}

/// Builder for RetrieveRequest
#[derive(Debug)]
pub struct RetrieveRequestBuilder {
    request: RetrieveRequest,
}

impl RetrieveRequestBuilder {
    pub fn new(
        team_id: impl Into<String>,
        bot_id: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            request: RetrieveRequest {
                team_id: team_id.into(),
                bot_id: bot_id.into(),
                query: query.into(),
                conversation_id: None,
                preferred_languages: None,
                top_k: DEFAULT_TOP_K,
                pin_limit: DEFAULT_PIN_LIMIT,
            },
        }
    }

    pub fn conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.request.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn preferred_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.preferred_languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.request.top_k = top_k;
        self
    }

    pub fn pin_limit(mut self, pin_limit: usize) -> Self {
        self.request.pin_limit = pin_limit;
        self
    }

    pub fn build(self) -> RetrieveRequest {
        self.request
    }
}

/// Tuning shared by every turn a retriever serves
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    /// Hard limit on the embedding call
    pub embed_timeout: Duration,
    /// Hard limit on the nearest-neighbor search
    pub search_timeout: Duration,
    /// Minimum detector confidence for the detected language to be preferred
    pub language_confidence_threshold: f64,
    /// Ceiling on candidates requested from vector search
    pub max_candidates: usize,
    /// Bonus for matching the first preferred language
    pub primary_language_bonus: f64,
    /// Bonus for matching the second preferred language
    pub secondary_language_bonus: f64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            embed_timeout: Duration::from_secs(10),
            search_timeout: Duration::from_secs(10),
            language_confidence_threshold: 0.6,
            max_candidates: 200,
            primary_language_bonus: 0.02,
            secondary_language_bonus: 0.01,
        }
    }
}

impl RetrieverConfig {
    /// Number of nearest neighbors to ask for: `min(max(top_k * 4, top_k), max_candidates)`
    pub fn candidate_limit(&self, top_k: usize) -> usize {
        top_k
            .saturating_mul(4)
            .max(top_k)
            .min(self.max_candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = RetrieveRequest::builder("team", "bot", "hello").build();
        assert_eq!(request.top_k, 12);
        assert_eq!(request.pin_limit, 6);
        assert!(request.conversation_id.is_none());
        assert!(request.preferred_languages.is_none());
    }

    #[test]
    fn test_request_builder() {
        let request = RetrieveRequest::builder("team", "bot", "hello")
            .conversation_id("conv-1")
            .preferred_languages(["th", "en"])
            .top_k(3)
            .pin_limit(2)
            .build();
        assert_eq!(request.conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(
            request.preferred_languages,
            Some(vec!["th".to_string(), "en".to_string()])
        );
        assert_eq!(request.top_k, 3);
        assert_eq!(request.pin_limit, 2);
    }

    #[test]
    fn test_candidate_limit() {
        let config = RetrieverConfig::default();
        assert_eq!(config.candidate_limit(12), 48);
        assert_eq!(config.candidate_limit(0), 0);
        assert_eq!(config.candidate_limit(100), 200);
        assert_eq!(config.candidate_limit(usize::MAX), 200);
    }
}
