//! sitemap.xml reader
//!
//! Collects every `<loc>` text node, regardless of whether the document is a
//! `urlset` or a sitemap index. Only absolute http(s) URLs are kept.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::guard::is_http_scheme;

/// Extract all absolute http(s) `<loc>` URLs from a sitemap document, in
/// document order
pub fn parse_sitemap(xml: &str) -> Result<Vec<Url>, CrawlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut in_loc = false;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) if element.local_name().as_ref() == b"loc" => {
                in_loc = true;
                text.clear();
            }
            Event::Text(content) if in_loc => {
                text.push_str(&content.unescape()?);
            }
            Event::CData(content) if in_loc => {
                text.push_str(&String::from_utf8_lossy(&content.into_inner()));
            }
            Event::End(element) if element.local_name().as_ref() == b"loc" => {
                in_loc = false;
                match Url::parse(text.trim()) {
                    Ok(url) if is_http_scheme(&url) => urls.push(url),
                    Ok(url) => debug!("Skipping non-http sitemap entry {}", url),
                    Err(e) => debug!("Skipping malformed sitemap entry {:?}: {}", text, e),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(urls)
}

/// Fetch `{origin}/sitemap.xml` and return its entries.
///
/// A non-success status yields an empty list; transport and XML failures are
/// returned so the caller decides how to degrade.
pub async fn fetch_sitemap_urls(fetcher: &dyn Fetcher, origin: &Url) -> Result<Vec<Url>, CrawlError> {
    let sitemap_url = origin.join("/sitemap.xml")?;
    let response = fetcher.fetch(&sitemap_url).await?;

    if !response.is_success() {
        debug!("No sitemap at {} (HTTP {})", sitemap_url, response.status);
        return Ok(Vec::new());
    }

    let urls = parse_sitemap(&response.body)?;
    debug!("Sitemap {} listed {} URLs", sitemap_url, urls.len());
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
                <url><loc>https://example.com/docs/a</loc><lastmod>2024-01-01</lastmod></url>
                <url><loc> https://example.com/docs/b?x=1&amp;y=2 </loc></url>
                <url><loc><![CDATA[https://example.com/docs/c]]></loc></url>
            </urlset>"#;

        let urls = parse_sitemap(xml).unwrap();
        let urls: Vec<&str> = urls.iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/docs/a",
                "https://example.com/docs/b?x=1&y=2",
                "https://example.com/docs/c",
            ]
        );
    }

    #[test]
    fn test_parse_skips_relative_and_other_schemes() {
        let xml = "<urlset><url><loc>/relative</loc></url><url><loc>ftp://example.com/f</loc></url>\
                   <url><loc>http://example.com/ok</loc></url></urlset>";

        let urls = parse_sitemap(xml).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "http://example.com/ok");
    }

    #[test]
    fn test_parse_namespaced_loc() {
        let xml = r#"<sm:sitemapindex xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
            <sm:sitemap><sm:loc>https://example.com/sitemap-docs.xml</sm:loc></sm:sitemap>
        </sm:sitemapindex>"#;

        let urls = parse_sitemap(xml).unwrap();
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn test_parse_malformed_xml_is_an_error() {
        assert!(parse_sitemap("<urlset><url><loc>https://example.com</url></urlset>").is_err());
    }
}
