//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The base URL could not be parsed or uses an unsupported scheme
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The base URL points at a loopback or private network host
    #[error("Blocked host: {0}")]
    BlockedHost(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the per-request timeout
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// Sitemap XML error
    #[error("Sitemap error: {0}")]
    Sitemap(#[from] quick_xml::Error),

    /// Robots.txt could not be retrieved
    #[error("Robots.txt error: {0}")]
    RobotsTxt(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Http(e) => CrateError::Http(e),
            CrawlError::InvalidBaseUrl(_) | CrawlError::BlockedHost(_) => {
                CrateError::InvalidRequest(err.to_string())
            }
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
