//! # Crawler Configuration Module
//!
//! This module provides the options for a single site discovery run: traversal
//! bounds, pacing, scope and the identity the crawler presents to the target
//! site. It uses a builder pattern for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlOptions`: The per-crawl parameters
//! - `CrawlOptionsBuilder`: Builder pattern implementation for easier configuration
//!
//! ## Features
//!
//! - Defaults suitable for polite crawling of a documentation site
//! - Fine-grained control over traversal (depth, page cap, path scope)
//! - Pacing between requests and a hard per-request timeout
//! - User-agent customization (also used to select the robots.txt group)

use std::time::Duration;

/// Default maximum BFS depth below the base URL
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Default pause between two page fetches
pub const DEFAULT_DELAY_MS: u64 = 300;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Default hard cap on discovered nodes
pub const DEFAULT_MAX_PAGES: usize = 200;

/// Options for one crawl invocation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// URL the crawl starts from; becomes the root of the tree
    pub base_url: String,

    /// Maximum depth to crawl; pages at this depth are fetched but not expanded
    pub max_depth: u32,

    /// Only paths equal to or nested under this prefix are discovered.
    /// `None` means the base URL's own path.
    pub allow_path_prefix: Option<String>,

    /// Whether to seed the queue from `{origin}/sitemap.xml`
    pub use_sitemap: bool,

    /// Pause in milliseconds after each processed page
    pub delay_ms: u64,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Maximum number of nodes in the resulting tree
    pub max_pages: usize,

    /// User agent to use for requests
    pub user_agent: String,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            allow_path_prefix: None,
            use_sitemap: true,
            delay_ms: DEFAULT_DELAY_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_pages: DEFAULT_MAX_PAGES,
            user_agent: format!("lore-crawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for CrawlOptions
#[derive(Debug, Default)]
pub struct CrawlOptionsBuilder {
    options: CrawlOptions,
}

impl CrawlOptionsBuilder {
    /// Create a new builder for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            options: CrawlOptions {
                base_url: base_url.into(),
                ..CrawlOptions::default()
            },
        }
    }

    /// Set the maximum depth to crawl
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.options.max_depth = max_depth;
        self
    }

    /// Restrict discovery to paths under the given prefix
    pub fn allow_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.allow_path_prefix = Some(prefix.into());
        self
    }

    /// Set whether the sitemap is used to seed the crawl
    pub fn use_sitemap(mut self, use_sitemap: bool) -> Self {
        self.options.use_sitemap = use_sitemap;
        self
    }

    /// Set the pause between page fetches
    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.options.delay_ms = delay_ms;
        self
    }

    /// Set the per-request timeout
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum number of discovered nodes
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.options.max_pages = max_pages;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    /// Build the options
    pub fn build(self) -> CrawlOptions {
        self.options
    }
}

impl CrawlOptions {
    /// Create a new builder
    pub fn builder(base_url: impl Into<String>) -> CrawlOptionsBuilder {
        CrawlOptionsBuilder::new(base_url)
    }

    /// Get the inter-request pause as a Duration
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Get the per-request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Node cap actually enforced. The root node always exists, so the cap
    /// never drops below one.
    pub fn page_cap(&self) -> usize {
        self.max_pages.max(1)
    }

    /// Product token of the user agent, used to pick the robots.txt group
    pub fn agent_token(&self) -> &str {
        self.user_agent
            .split(['/', ' '])
            .next()
            .unwrap_or(&self.user_agent)
    }
}
