//! # Embedding Model Module
//!
//! This module connects `rig` embedding models to the retrieval pipeline,
//! with built-in rate limiting to prevent API quota exhaustion.
//!
//! ## Key Components
//!
//! - `RigEmbeddingClient`: Adapts any `rig` embedding model to the retriever's `EmbeddingClient`
//! - `RateLimitedEmbeddingModel`: A wrapper that adds rate limiting to any embedding model
//! - `EmbeddingConversion`: Utilities for converting between embedding formats
//! - `MockEmbeddingModel`: Deterministic offline embeddings for tests
//!
//! ## Features
//!
//! - Configurable rate limiting with different quotas (standard and free tiers)
//! - Environment variable configuration for API keys
//! - Instrumentation with tracing spans for monitoring

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use rig::{embeddings::EmbeddingModel, providers::gemini};
use tracing::instrument;

use crate::retrieval::{EmbeddingClient, RetrieveError};

pub mod embedding;
pub mod mock_model;
pub mod ratelimited_embedding;

pub use embedding::EmbeddingConversion;
pub use mock_model::MockEmbeddingModel;
pub use ratelimited_embedding::RateLimitedEmbeddingModel;

/// Dimensions of `text-embedding-004` vectors
pub const GEMINI_EMBEDDING_DIMS: usize = 768;

/// Rate-limited Gemini `text-embedding-004`
pub type GeminiEmbeddingModel = RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel>;

/// Exposes a `rig` embedding model as an [`EmbeddingClient`]
#[derive(Debug, Clone)]
pub struct RigEmbeddingClient<E: EmbeddingModel> {
    model: E,
}

impl RigEmbeddingClient<GeminiEmbeddingModel> {
    /// Gemini client with the paid-tier quota, keyed by `GEMINI_API_KEY`
    pub fn new_gemini_from_env() -> Result<Self, RetrieveError> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            RetrieveError::Embedding("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new_gemini(gemini::Client::new(&gemini_api_key), 1000))
    }

    /// Gemini client with the free-tier quota, keyed by `GEMINI_FREE_API_KEY`
    pub fn new_gemini_free_from_env() -> Result<Self, RetrieveError> {
        let gemini_api_key = std::env::var("GEMINI_FREE_API_KEY").map_err(|_| {
            RetrieveError::Embedding(
                "GEMINI_FREE_API_KEY environment variable not set".to_string(),
            )
        })?;
        Ok(Self::new_gemini(gemini::Client::new(&gemini_api_key), 100))
    }

    /// Gemini embeddings limited to `per_minute` requests
    pub fn new_gemini(gemini_client: gemini::Client, per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_minute(per_minute));
        let model = RateLimitedEmbeddingModel::new(
            gemini_client.embedding_model(gemini::embedding::EMBEDDING_004),
            limiter,
        );
        Self::new(model)
    }
}

impl<E: EmbeddingModel> RigEmbeddingClient<E> {
    pub fn new(model: E) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &E {
        &self.model
    }

    /// Vector width produced by the wrapped model
    pub fn ndims(&self) -> usize {
        self.model.ndims()
    }
}

#[async_trait]
impl<E: EmbeddingModel> EmbeddingClient for RigEmbeddingClient<E> {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrieveError> {
        let mut embeddings = self
            .model
            .embed_texts(vec![text.to_string()])
            .await
            .map_err(|e| RetrieveError::Embedding(format!("Failed to generate embedding: {}", e)))?;

        let embedding = embeddings
            .pop()
            .ok_or_else(|| RetrieveError::Embedding("Model returned no embedding".to_string()))?;
        if embedding.vec.is_empty() {
            return Err(RetrieveError::Embedding("Model returned an empty vector".to_string()));
        }
        Ok(embedding.to_vec())
    }
}
