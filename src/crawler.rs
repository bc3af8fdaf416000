//! # Site Discovery Module
//!
//! This module discovers the importable pages of a website so they can be
//! turned into documents and chunks by the ingestion step. It is the first
//! stage of the grounding pipeline.
//!
//! ## Key Components
//!
//! - `CrawlOptions`: Depth, page cap, pacing, timeout and path scope of a crawl
//! - `Crawler`: Runs a breadth-first discovery over a `Fetcher`
//! - `CrawlResult` / `UrlNode`: The discovered URL tree plus per-page errors
//! - `RobotsRules`, `parse_sitemap`, `extract_metadata`, `extract_links`:
//!   the policy and parsing leaves the crawler is built from
//!
//! ## Features
//!
//! - Respects robots.txt `Disallow` rules for `*` and the crawler's own token
//! - Seeds the crawl from sitemap.xml
//! - Same-origin, path-prefix and SSRF guards on every candidate URL
//! - Fixed pacing between requests and a hard per-request timeout
//! - Per-page failures are collected instead of aborting the crawl
//! - External cancellation returning the partial tree
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lore::crawler::{discover, CrawlOptions};
//!
//! # async fn run() -> Result<(), lore::crawler::CrawlError> {
//! let options = CrawlOptions::builder("https://example.com/docs")
//!     .max_depth(2)
//!     .build();
//! let result = discover(options).await?;
//! println!("{} pages, {} unreachable", result.total, result.errors.len());
//! # Ok(())
//! # }
//! ```

mod cancel;
mod config;
mod error;
mod fetcher;
mod guard;
mod page;
mod robots;
mod session;
mod sitemap;
mod tree;

pub use cancel::{cancel_pair, CancelSignal, CancelTrigger};
pub use config::{
    CrawlOptions, CrawlOptionsBuilder, DEFAULT_DELAY_MS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES,
    DEFAULT_TIMEOUT_MS,
};
pub use error::CrawlError;
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher};
pub use guard::{is_private_host, normalize_url};
pub use page::{extract_links, extract_metadata, PageMetadata};
pub use robots::{fetch_robots, RobotsRules};
pub use session::{discover, Crawler};
pub use sitemap::{fetch_sitemap_urls, parse_sitemap};
pub use tree::{CrawlResult, UrlNode};
