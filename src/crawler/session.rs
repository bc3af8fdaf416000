//! Breadth-first site discovery
//!
//! A [`Crawler`] owns nothing but its transport; every call to
//! [`Crawler::discover`] builds a fresh [`CrawlSession`] holding the queue,
//! the URL arena (which doubles as the visited set) and the error list, so
//! concurrent crawls never share mutable state.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::cancel::CancelSignal;
use crate::crawler::config::CrawlOptions;
use crate::crawler::error::CrawlError;
use crate::crawler::fetcher::{FetchResponse, Fetcher, HttpFetcher};
use crate::crawler::guard::{is_http_scheme, is_private_host, normalize_prefix, normalize_url, Scope};
use crate::crawler::page::{extract_links, extract_metadata};
use crate::crawler::robots::{fetch_robots, RobotsRules};
use crate::crawler::sitemap::fetch_sitemap_urls;
use crate::crawler::tree::{CrawlResult, NodeId, UrlTree};

/// Site crawler bound to a transport
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
}

impl Crawler {
    /// Create a crawler over any transport
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Create a crawler with the reqwest transport configured from the options
    pub fn with_http(options: &CrawlOptions) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&options.user_agent, options.timeout())?;
        Ok(Self::new(Arc::new(fetcher)))
    }

    /// Discover the site described by `options`
    pub async fn discover(&self, options: CrawlOptions) -> Result<CrawlResult, CrawlError> {
        self.discover_with_cancel(options, CancelSignal::never()).await
    }

    /// Discover the site, stopping early when `cancel` fires. A cancelled
    /// crawl returns the partial tree rather than an error.
    #[instrument(skip(self, options, cancel), fields(base_url = %options.base_url))]
    pub async fn discover_with_cancel(
        &self,
        options: CrawlOptions,
        cancel: CancelSignal,
    ) -> Result<CrawlResult, CrawlError> {
        let base = validate_base_url(&options.base_url)?;
        let prefix = match &options.allow_path_prefix {
            Some(prefix) => normalize_prefix(prefix),
            None => normalize_prefix(base.path()),
        };
        info!("Starting discovery of {} under {}", base, prefix);
        debug!("Crawl options: {:?}", options);

        let session = CrawlSession::new(self.fetcher.as_ref(), &options, Scope::new(base, prefix), cancel);
        let result = session.run().await;

        info!(
            "Discovery finished: {} pages, {} errors",
            result.total,
            result.errors.len()
        );
        Ok(result)
    }
}

/// Discover a site over HTTP with the given options
pub async fn discover(options: CrawlOptions) -> Result<CrawlResult, CrawlError> {
    Crawler::with_http(&options)?.discover(options).await
}

/// Parse and vet the base URL; failures here are the only fatal crawl errors
fn validate_base_url(raw: &str) -> Result<Url, CrawlError> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| CrawlError::InvalidBaseUrl(format!("{}: {}", raw, e)))?;

    if !is_http_scheme(&parsed) {
        return Err(CrawlError::InvalidBaseUrl(format!(
            "{}: unsupported scheme {}",
            raw,
            parsed.scheme()
        )));
    }
    if is_private_host(&parsed) {
        return Err(CrawlError::BlockedHost(
            parsed.host_str().unwrap_or(raw).to_string(),
        ));
    }

    Ok(normalize_url(&parsed))
}

#[derive(Debug)]
struct QueueEntry {
    url: Url,
    node: NodeId,
    depth: u32,
}

/// State of one crawl invocation
struct CrawlSession<'a> {
    fetcher: &'a dyn Fetcher,
    options: &'a CrawlOptions,
    scope: Scope,
    robots: RobotsRules,
    tree: UrlTree,
    queue: VecDeque<QueueEntry>,
    errors: Vec<String>,
    cancel: CancelSignal,
}

impl<'a> CrawlSession<'a> {
    fn new(
        fetcher: &'a dyn Fetcher,
        options: &'a CrawlOptions,
        scope: Scope,
        cancel: CancelSignal,
    ) -> Self {
        let tree = UrlTree::new(scope.base().as_str());
        Self {
            fetcher,
            options,
            scope,
            robots: RobotsRules::default(),
            tree,
            queue: VecDeque::new(),
            errors: Vec::new(),
            cancel,
        }
    }

    async fn run(mut self) -> CrawlResult {
        let root = self.tree.root();
        self.queue.push_back(QueueEntry {
            url: self.scope.base().clone(),
            node: root,
            depth: 0,
        });

        if self.load_robots().await && (!self.options.use_sitemap || self.seed_from_sitemap().await) {
            self.process_queue().await;
        }

        self.finish()
    }

    fn finish(self) -> CrawlResult {
        let total = self.tree.len();
        CrawlResult {
            root: self.tree.into_root(),
            total,
            errors: self.errors,
        }
    }

    /// Returns false if the crawl was cancelled
    async fn load_robots(&mut self) -> bool {
        let fetch = with_timeout(
            self.options.timeout_ms,
            fetch_robots(self.fetcher, self.scope.base(), self.options.agent_token()),
        );
        let Some(outcome) = until_cancelled(&mut self.cancel, fetch).await else {
            info!("Discovery cancelled while loading robots.txt");
            return false;
        };

        self.robots = outcome.unwrap_or_else(|e| {
            warn!("Ignoring robots.txt for {}: {}", self.scope.base(), e);
            RobotsRules::default()
        });
        true
    }

    /// Returns false if the crawl was cancelled
    async fn seed_from_sitemap(&mut self) -> bool {
        let fetch = with_timeout(
            self.options.timeout_ms,
            fetch_sitemap_urls(self.fetcher, self.scope.base()),
        );
        let Some(outcome) = until_cancelled(&mut self.cancel, fetch).await else {
            info!("Discovery cancelled while loading sitemap.xml");
            return false;
        };

        let urls = outcome.unwrap_or_else(|e| {
            warn!("Ignoring sitemap for {}: {}", self.scope.base(), e);
            Vec::new()
        });

        let root = self.tree.root();
        let mut seeded = 0;
        for url in urls {
            if self.tree.len() >= self.options.page_cap() {
                break;
            }
            let url = normalize_url(&url);
            if !self.scope.admits_with_robots(&url, &self.robots) {
                continue;
            }
            if let Some(node) = self.tree.add_child(root, url.as_str()) {
                self.queue.push_back(QueueEntry {
                    url,
                    node,
                    depth: 1,
                });
                seeded += 1;
            }
        }
        debug!("Seeded {} URLs from sitemap", seeded);
        true
    }

    async fn process_queue(&mut self) {
        while let Some(entry) = self.queue.pop_front() {
            if self.cancel.is_cancelled() {
                info!("Discovery cancelled with {} URLs still queued", self.queue.len() + 1);
                return;
            }
            if entry.depth > self.options.max_depth {
                continue;
            }
            if self.robots.is_blocked(entry.url.path()) {
                debug!("Skipping {}: blocked by robots.txt", entry.url);
                continue;
            }

            let fetch = with_timeout(self.options.timeout_ms, self.fetcher.fetch(&entry.url));
            let Some(outcome) = until_cancelled(&mut self.cancel, fetch).await else {
                info!("Discovery cancelled while fetching {}", entry.url);
                return;
            };

            match outcome {
                Err(e) => {
                    debug!("Fetch failed for {}: {}", entry.url, e);
                    self.errors.push(format!("Failed to fetch {}: {}", entry.url, e));
                }
                Ok(response) if !response.is_success() => {
                    self.errors
                        .push(format!("HTTP {} for {}", response.status, entry.url));
                }
                Ok(response) if !response.is_html() => {
                    debug!(
                        "Skipping {}: content type {:?}",
                        entry.url, response.content_type
                    );
                }
                Ok(response) => self.process_page(&entry, &response),
            }

            if self.queue.is_empty() {
                break;
            }
            let pause = tokio::time::sleep(self.options.delay());
            if until_cancelled(&mut self.cancel, pause).await.is_none() {
                info!("Discovery cancelled between requests");
                return;
            }
        }
    }

    fn process_page(&mut self, entry: &QueueEntry, response: &FetchResponse) {
        match extract_metadata(&response.body) {
            Ok(metadata) => self.tree.set_metadata(entry.node, metadata),
            Err(e) => warn!("Error extracting metadata from {}: {}", entry.url, e),
        }

        if entry.depth >= self.options.max_depth {
            debug!("{} is at max depth; not following links", entry.url);
            return;
        }

        let links = match extract_links(&response.body, &entry.url) {
            Ok(links) => links,
            Err(e) => {
                warn!("Error extracting links from {}: {}", entry.url, e);
                return;
            }
        };

        let mut discovered = 0;
        for link in links {
            if self.tree.len() >= self.options.page_cap() {
                debug!("Page cap of {} reached", self.options.page_cap());
                break;
            }
            let link = normalize_url(&link);
            if !self.scope.admits_with_robots(&link, &self.robots) {
                continue;
            }
            if let Some(node) = self.tree.add_child(entry.node, link.as_str()) {
                self.queue.push_back(QueueEntry {
                    url: link,
                    node,
                    depth: entry.depth + 1,
                });
                discovered += 1;
            }
        }
        debug!("{}: discovered {} new URLs", entry.url, discovered);
    }
}

async fn with_timeout<T, F>(timeout_ms: u64, future: F) -> Result<T, CrawlError>
where
    F: Future<Output = Result<T, CrawlError>>,
{
    match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), future).await {
        Ok(result) => result,
        Err(_) => Err(CrawlError::Timeout(timeout_ms)),
    }
}

/// Run `future` unless cancellation fires first
async fn until_cancelled<F: Future>(cancel: &mut CancelSignal, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::cancel::cancel_pair;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Script {
        Page(FetchResponse),
        Fail(String),
        Slow(Duration),
    }

    /// In-memory transport; unknown URLs answer 404
    #[derive(Default)]
    struct ScriptedFetcher {
        scripts: HashMap<String, Script>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn html(mut self, url: &str, body: &str) -> Self {
            self.scripts.insert(
                url.to_string(),
                Script::Page(FetchResponse {
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: body.to_string(),
                }),
            );
            self
        }

        fn respond(mut self, url: &str, status: u16, content_type: &str, body: &str) -> Self {
            self.scripts.insert(
                url.to_string(),
                Script::Page(FetchResponse {
                    status,
                    content_type: Some(content_type.to_string()),
                    body: body.to_string(),
                }),
            );
            self
        }

        fn fail(mut self, url: &str, reason: &str) -> Self {
            self.scripts
                .insert(url.to_string(), Script::Fail(reason.to_string()));
            self
        }

        fn slow(mut self, url: &str, delay: Duration) -> Self {
            self.scripts.insert(url.to_string(), Script::Slow(delay));
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchResponse, CrawlError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.scripts.get(url.as_str()) {
                Some(Script::Page(response)) => Ok(response.clone()),
                Some(Script::Fail(reason)) => Err(CrawlError::Other(reason.clone())),
                Some(Script::Slow(delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(FetchResponse {
                        status: 200,
                        content_type: Some("text/html".to_string()),
                        body: String::new(),
                    })
                }
                None => Ok(FetchResponse {
                    status: 404,
                    content_type: Some("text/html".to_string()),
                    body: "not found".to_string(),
                }),
            }
        }
    }

    fn options(base: &str) -> crate::crawler::config::CrawlOptionsBuilder {
        CrawlOptions::builder(base).delay_ms(0).timeout_ms(1_000)
    }

    async fn crawl(fetcher: ScriptedFetcher, options: CrawlOptions) -> (CrawlResult, Arc<ScriptedFetcher>) {
        let fetcher = Arc::new(fetcher);
        let crawler = Crawler::new(fetcher.clone());
        let result = crawler.discover(options).await.unwrap();
        (result, fetcher)
    }

    fn urls(result: &CrawlResult) -> Vec<String> {
        result.root.flatten().iter().map(|n| n.url.clone()).collect()
    }

    #[tokio::test]
    async fn test_docs_scenario_respects_robots_and_prefix() {
        let fetcher = ScriptedFetcher::default()
            .respond(
                "https://example.com/robots.txt",
                200,
                "text/plain",
                "User-agent: *\nDisallow: /private\n",
            )
            .html(
                "https://example.com/docs",
                r#"<h1>Docs</h1><a href="/docs/intro">Intro</a><a href="/private">Secret</a>"#,
            )
            .html("https://example.com/docs/intro", "<title>Intro</title>");

        let (result, fetcher) = crawl(fetcher, options("https://example.com/docs").max_depth(1).build()).await;

        assert_eq!(result.total, 2);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.root.url, "https://example.com/docs");
        assert_eq!(result.root.title.as_deref(), Some("Docs"));
        assert_eq!(result.root.children.len(), 1);
        assert_eq!(result.root.children[0].url, "https://example.com/docs/intro");
        assert_eq!(result.root.children[0].title.as_deref(), Some("Intro"));
        assert!(!fetcher
            .requested()
            .iter()
            .any(|url| url.contains("/private")));
    }

    #[tokio::test]
    async fn test_robots_blocks_in_scope_paths() {
        let fetcher = ScriptedFetcher::default()
            .respond(
                "https://example.com/robots.txt",
                200,
                "text/plain",
                "User-agent: *\nDisallow: /private\n",
            )
            .respond(
                "https://example.com/sitemap.xml",
                200,
                "application/xml",
                "<urlset><url><loc>https://example.com/private/listed</loc></url></urlset>",
            )
            .html(
                "https://example.com/",
                r#"<a href="/private/page">P</a><a href="/public">Public</a>"#,
            )
            .html("https://example.com/public", "<p>ok</p>");

        let (result, _) = crawl(fetcher, options("https://example.com/").build()).await;

        assert_eq!(
            urls(&result),
            vec!["https://example.com/", "https://example.com/public"]
        );
        assert!(result
            .root
            .flatten()
            .iter()
            .all(|node| !Url::parse(&node.url).unwrap().path().starts_with("/private")));
    }

    #[tokio::test]
    async fn test_sitemap_seeds_come_first_and_are_not_duplicated() {
        let fetcher = ScriptedFetcher::default()
            .respond(
                "https://example.com/sitemap.xml",
                200,
                "application/xml",
                "<urlset>\
                   <url><loc>https://example.com/docs/b</loc></url>\
                   <url><loc>https://example.com/docs/a/</loc></url>\
                   <url><loc>https://other.example.com/docs/x</loc></url>\
                   <url><loc>https://example.com/blog/post</loc></url>\
                 </urlset>",
            )
            .html(
                "https://example.com/docs",
                r#"<a href="/docs/c">C</a><a href="/docs/a#frag">A</a>"#,
            )
            .html("https://example.com/docs/a", r#"<a href="/docs/a/deep">Deep</a>"#)
            .html("https://example.com/docs/c", "<p>c</p>")
            .html("https://example.com/docs/a/deep", "<p>deep</p>");

        let (result, _) = crawl(fetcher, options("https://example.com/docs/").max_depth(2).build()).await;

        let children: Vec<&str> = result.root.children.iter().map(|n| n.url.as_str()).collect();
        assert_eq!(
            children,
            vec![
                "https://example.com/docs/b",
                "https://example.com/docs/a",
                "https://example.com/docs/c",
            ]
        );
        // Sitemap seeds are still crawled for links
        assert_eq!(result.root.children[1].children[0].url, "https://example.com/docs/a/deep");

        let all = urls(&result);
        let mut unique = all.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(all.len(), unique.len());
        assert_eq!(result.total, all.len());

        // docs/b answered 404
        assert_eq!(result.errors, vec!["HTTP 404 for https://example.com/docs/b"]);
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let fetcher = ScriptedFetcher::default()
            .html("https://example.com/", r#"<a href="/one">1</a>"#)
            .html("https://example.com/one", r#"<title>One</title><a href="/two">2</a>"#)
            .html("https://example.com/two", r#"<a href="/three">3</a>"#);

        let (result, fetcher) = crawl(
            fetcher,
            options("https://example.com").use_sitemap(false).max_depth(1).build(),
        )
        .await;

        assert_eq!(urls(&result), vec!["https://example.com/", "https://example.com/one"]);
        // Leaf pages are still fetched for their metadata
        assert_eq!(result.root.children[0].title.as_deref(), Some("One"));
        assert!(!fetcher.requested().contains(&"https://example.com/two".to_string()));

        for node in result.root.flatten() {
            assert!(result.root.depth_of(&node.url).unwrap() <= 1);
        }
    }

    #[tokio::test]
    async fn test_page_cap() {
        let links: String = (0..10).map(|i| format!(r#"<a href="/p{i}">{i}</a>"#)).collect();
        let fetcher = ScriptedFetcher::default().html("https://example.com/", &links);

        let (result, _) = crawl(
            fetcher,
            options("https://example.com/").use_sitemap(false).max_pages(4).build(),
        )
        .await;

        assert_eq!(result.total, 4);
        assert_eq!(result.root.children.len(), 3);
        assert_eq!(result.root.children[2].url, "https://example.com/p2");
    }

    #[tokio::test]
    async fn test_per_page_failures_are_collected() {
        let fetcher = ScriptedFetcher::default()
            .html(
                "https://example.com/",
                r#"<a href="/broken">b</a><a href="/down">d</a><a href="/report.pdf">r</a><a href="/slow">s</a>"#,
            )
            .respond("https://example.com/broken", 500, "text/html", "oops")
            .fail("https://example.com/down", "connection refused")
            .respond("https://example.com/report.pdf", 200, "application/pdf", "%PDF")
            .slow("https://example.com/slow", Duration::from_secs(5));

        let (result, _) = crawl(
            fetcher,
            options("https://example.com/")
                .use_sitemap(false)
                .timeout_ms(50)
                .build(),
        )
        .await;

        assert_eq!(result.total, 5);
        assert_eq!(
            result.errors,
            vec![
                "HTTP 500 for https://example.com/broken".to_string(),
                "Failed to fetch https://example.com/down: connection refused".to_string(),
                "Failed to fetch https://example.com/slow: timed out after 50ms".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_robots_and_sitemap_failures_do_not_abort() {
        let fetcher = ScriptedFetcher::default()
            .fail("https://example.com/robots.txt", "dns error")
            .respond("https://example.com/sitemap.xml", 200, "application/xml", "<urlset><loc>")
            .html("https://example.com/", r#"<a href="/a">a</a>"#);

        let (result, _) = crawl(fetcher, options("https://example.com/").build()).await;

        assert_eq!(result.total, 2);
        assert_eq!(result.errors, vec!["HTTP 404 for https://example.com/a"]);
    }

    #[tokio::test]
    async fn test_external_and_private_links_are_dropped() {
        let fetcher = ScriptedFetcher::default().html(
            "https://example.com/",
            r#"<a href="https://evil.example.net/">x</a>
               <a href="http://example.com/insecure">y</a>
               <a href="http://127.0.0.1/admin">z</a>
               <a href="/ok?page=2">ok</a>
               <a href="/ok">dup</a>"#,
        );

        let (result, _) = crawl(fetcher, options("https://example.com/").use_sitemap(false).build()).await;

        assert_eq!(urls(&result), vec!["https://example.com/", "https://example.com/ok"]);
    }

    #[tokio::test]
    async fn test_invalid_or_blocked_base_is_fatal() {
        let crawler = Crawler::new(Arc::new(ScriptedFetcher::default()));

        let err = crawler
            .discover(CrawlOptions::builder("not a url").build())
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::InvalidBaseUrl(_)));

        let err = crawler
            .discover(CrawlOptions::builder("ftp://example.com/").build())
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::InvalidBaseUrl(_)));

        for base in ["http://localhost:3000/", "http://192.168.0.10/", "http://intranet.local/"] {
            let err = crawler
                .discover(CrawlOptions::builder(base).build())
                .await
                .unwrap_err();
            assert!(matches!(err, CrawlError::BlockedHost(_)), "{base}");
        }
    }

    #[tokio::test]
    async fn test_cancelled_crawl_returns_partial_tree() {
        let fetcher = Arc::new(
            ScriptedFetcher::default().html("https://example.com/", r#"<a href="/a">a</a>"#),
        );
        let crawler = Crawler::new(fetcher.clone());
        let (trigger, signal) = cancel_pair();
        trigger.cancel();

        let result = crawler
            .discover_with_cancel(CrawlOptions::builder("https://example.com/").build(), signal)
            .await
            .unwrap();

        assert_eq!(result.total, 1);
        assert!(result.errors.is_empty());
        assert!(fetcher.requested().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_pacing() {
        let fetcher = Arc::new(ScriptedFetcher::default().html(
            "https://example.com/",
            r#"<a href="/a">a</a><a href="/b">b</a>"#,
        ));
        let crawler = Crawler::new(fetcher.clone());
        let (trigger, signal) = cancel_pair();

        let options = CrawlOptions::builder("https://example.com/")
            .use_sitemap(false)
            .delay_ms(10_000)
            .build();
        let handle = tokio::spawn(async move { crawler.discover_with_cancel(options, signal).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // The root was fetched and expanded; its children were never requested
        assert_eq!(result.total, 3);
        assert!(!fetcher.requested().contains(&"https://example.com/a".to_string()));
    }
}
