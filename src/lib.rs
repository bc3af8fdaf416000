//! # Lore - Document Acquisition and Retrieval for Multi-Tenant Chatbots
//!
//! This crate grounds a chatbot's answers in a customer's own documentation.
//! It discovers the pages of a site, and for each conversation turn picks
//! the indexed chunks most worth showing to the language model.
//!
//! ## Features
//!
//! - Site discovery:
//!   - Breadth-first crawl seeded from sitemap.xml
//!   - robots.txt, same-origin, path-prefix and SSRF guards
//!   - Paced, timeout-bounded fetching with cancellation
//! - Retrieval:
//!   - Embedding search with a language preference bonus
//!   - One chunk per document and per translation group
//!   - Per-conversation pinned context
//!   - Lexical fallback without embeddings
//! - LibSQL index store and rate-limited Gemini embeddings
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lore::index::Database;
//! use lore::model::RigEmbeddingClient;
//! use lore::retrieval::{RetrieveRequest, Retriever, ScriptLanguageDetector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(Database::new_from_path("index.db").await?);
//!     let retriever = Retriever::new(
//!         Arc::new(RigEmbeddingClient::new_gemini_from_env()?),
//!         db.clone(),
//!         Arc::new(ScriptLanguageDetector::new()),
//!         db.clone(),
//!         db,
//!     );
//!
//!     let request = RetrieveRequest::builder("team-1", "bot-1", "How do I reset my password?")
//!         .conversation_id("conversation-42")
//!         .build();
//!     let result = retriever.retrieve(&request).await?;
//!
//!     for chunk in &result.chunks {
//!         println!("{:?} {}", chunk.source, chunk.canonical_url.as_deref().unwrap_or("-"));
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod model;

pub mod crawler;
pub mod index;
pub mod retrieval;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::crawler::{CrawlOptions, CrawlResult, Crawler, UrlNode};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::retrieval::{
        DeterministicRetriever, RetrieveRequest, RetrieveResult, RetrievedChunk, Retriever,
    };
}
