//! HTTP fetching for the crawler
//!
//! The crawler talks to the network only through the [`Fetcher`] trait so a
//! crawl session can be driven by any transport. [`HttpFetcher`] is the
//! reqwest-backed implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Client as ReqwestClient;
use tracing::{debug, instrument};
use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::guard::is_private_host;

/// Maximum redirects followed for a single request
const MAX_REDIRECTS: usize = 5;

/// Default cap on the bytes read from one response body
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Raw response of a single GET
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,

    /// Content-Type header, if any
    pub content_type: Option<String>,

    /// Response body decoded as text
    pub body: String,
}

/// Whether a body of this type is worth reading. HTML pages, robots.txt and
/// sitemap XML all qualify; images, archives and PDFs do not.
fn is_textual(content_type: Option<&str>) -> bool {
    match content_type {
        Some(content_type) => {
            let content_type = content_type.to_ascii_lowercase();
            content_type.starts_with("text/")
                || content_type.contains("html")
                || content_type.contains("xml")
        }
        None => true,
    }
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body should be parsed as HTML. A missing content type is
    /// given the benefit of the doubt.
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(content_type) => {
                let content_type = content_type.to_ascii_lowercase();
                content_type.contains("text/html") || content_type.contains("application/xhtml")
            }
            None => true,
        }
    }
}

/// A transport able to GET a URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the URL. Non-success statuses are returned as a response, only
    /// transport failures are errors.
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, CrawlError>;
}

/// reqwest-backed fetcher presenting a fixed, identifiable User-Agent
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: ReqwestClient,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher with the given user agent and transport timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, CrawlError> {
        let redirect = Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if is_private_host(attempt.url()) {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = ReqwestClient::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(redirect)
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Truncate response bodies after this many bytes
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    async fn read_body(&self, mut response: reqwest::Response) -> Result<String, CrawlError> {
        let mut buf = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_body_bytes - buf.len();
            if chunk.len() >= room {
                buf.extend_from_slice(&chunk[..room]);
                debug!("Body truncated at {} bytes", self.max_body_bytes);
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url), level = "debug")]
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, CrawlError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = if is_textual(content_type.as_deref()) {
            self.read_body(response).await?
        } else {
            debug!("Skipping body of type {:?}", content_type);
            String::new()
        };
        debug!("Fetched {} bytes (HTTP {})", body.len(), status);

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("lore-test/0.1", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_html() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/docs")
            .match_header("user-agent", "lore-test/0.1")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><title>Docs</title></html>")
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/docs", server.url())).unwrap();
        let response = fetcher().fetch(&url).await.unwrap();

        assert!(response.is_success());
        assert!(response.is_html());
        assert!(response.body.contains("<title>Docs</title>"));
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_not_an_error() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/missing", server.url())).unwrap();
        let response = fetcher().fetch(&url).await.unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_html_content_type() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/file.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/file.pdf", server.url())).unwrap();
        let response = fetcher().fetch(&url).await.unwrap();

        assert!(!response.is_html());
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_body_is_capped() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/huge")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("x".repeat(1000))
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/huge", server.url())).unwrap();
        let response = fetcher()
            .with_max_body_bytes(16)
            .fetch(&url)
            .await
            .unwrap();

        assert_eq!(response.body, "x".repeat(16));
    }

    #[test]
    fn test_textual_content_types() {
        assert!(is_textual(Some("text/plain")));
        assert!(is_textual(Some("application/xml")));
        assert!(is_textual(Some("application/xhtml+xml")));
        assert!(is_textual(None));
        assert!(!is_textual(Some("application/pdf")));
        assert!(!is_textual(Some("image/png")));
    }

    #[tokio::test]
    async fn test_fetch_robots_from_server() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/robots.txt")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("User-agent: *\nDisallow: /private\n")
            .create_async()
            .await;

        let origin = Url::parse(&server.url()).unwrap();
        let rules = crate::crawler::robots::fetch_robots(&fetcher(), &origin, "lore-test")
            .await
            .unwrap();

        assert!(rules.is_blocked("/private/x"));
    }

    #[tokio::test]
    async fn test_fetch_sitemap_from_server() {
        let mut server = Server::new_async().await;
        let body = format!(
            "<urlset><url><loc>{0}/a</loc></url><url><loc>/relative</loc></url></urlset>",
            server.url()
        );
        let _mock = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(body)
            .create_async()
            .await;

        let origin = Url::parse(&server.url()).unwrap();
        let urls = crate::crawler::sitemap::fetch_sitemap_urls(&fetcher(), &origin)
            .await
            .unwrap();

        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].path(), "/a");
    }
}
