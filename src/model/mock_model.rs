//! # Mock Embedding Model for Testing
//!
//! Provides a `MockEmbeddingModel` that implements the `EmbeddingModel` trait
//! without making API calls. Texts are hashed word by word into a fixed
//! number of buckets, so texts sharing words get similar vectors and the same
//! text always gets the same vector.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};

/// A deterministic bag-of-words embedding model
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    ndims: usize,
    fail: bool,
}

impl MockEmbeddingModel {
    /// Creates a model producing vectors of `ndims` dimensions
    pub fn new(ndims: usize) -> Self {
        Self {
            ndims: ndims.max(1),
            fail: false,
        }
    }

    /// Creates a model whose every call fails
    pub fn failing(ndims: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(ndims)
        }
    }

    /// Unit-length vector for `text`
    pub fn vector_for(&self, text: &str) -> Vec<f64> {
        let mut vec = vec![0.0; self.ndims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() % self.ndims as u64) as usize;
            vec[bucket] += 1.0;
        }

        let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            vec.iter_mut().for_each(|v| *v /= norm);
        } else {
            vec[0] = 1.0;
        }
        vec
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    const MAX_DOCUMENTS: usize = 100;

    fn ndims(&self) -> usize {
        self.ndims
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::ProviderError(
                "mock embedding failure".to_string(),
            ));
        }
        Ok(texts
            .into_iter()
            .map(|document| Embedding {
                vec: self.vector_for(&document),
                document,
            })
            .collect())
    }
}
