//! Page parsing for the crawler: title/description metadata and outbound links

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::crawler::error::CrawlError;

/// Metadata shown for a discovered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// Title of the page
    pub title: Option<String>,

    /// Description of the page
    pub description: Option<String>,
}

fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css)
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse selector '{}': {}", css, e)))
}

/// Collapse runs of whitespace; empty text becomes `None`
fn clean_text(text: &str) -> Option<String> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn first_text(document: &Html, css: &str) -> Result<Option<String>, CrawlError> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .find_map(|element| clean_text(&element.text().collect::<String>())))
}

fn first_content(document: &Html, css: &str) -> Result<Option<String>, CrawlError> {
    let selector = selector(css)?;
    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .find_map(clean_text))
}

/// Extract metadata from a page
///
/// Title preference: first `<h1>`, then `og:title`, then `<title>`.
/// Description preference: `meta[name=description]`, then `og:description`.
pub fn extract_metadata(html: &str) -> Result<PageMetadata, CrawlError> {
    let document = Html::parse_document(html);

    let title = match first_text(&document, "h1")? {
        Some(title) => Some(title),
        None => match first_content(&document, r#"meta[property="og:title"]"#)? {
            Some(title) => Some(title),
            None => first_text(&document, "title")?,
        },
    };

    let description = match first_content(&document, r#"meta[name="description"]"#)? {
        Some(description) => Some(description),
        None => first_content(&document, r#"meta[property="og:description"]"#)?,
    };

    Ok(PageMetadata { title, description })
}

/// Extract outbound links from anchor tags, resolved against the page URL,
/// in document order.
///
/// `mailto:`, `tel:`, `javascript:` and pure in-page fragments are dropped;
/// hrefs that fail to resolve are skipped.
pub fn extract_links(html: &str, page_url: &Url) -> Result<Vec<Url>, CrawlError> {
    let document = Html::parse_document(html);
    let anchors = selector("a[href]")?;

    let links = document
        .select(&anchors)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .filter(|href| {
            let lower = href.to_ascii_lowercase();
            !["mailto:", "tel:", "javascript:"]
                .iter()
                .any(|scheme| lower.starts_with(scheme))
        })
        .filter_map(|href| page_url.join(href).ok())
        .collect();

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_prefers_h1() {
        let html = r#"<html><head><title>Site | Page</title>
            <meta property="og:title" content="OG Title"></head>
            <body><h1>  Getting
            Started </h1></body></html>"#;
        let metadata = extract_metadata(html).unwrap();
        assert_eq!(metadata.title.as_deref(), Some("Getting Started"));
    }

    #[test]
    fn test_title_falls_back_to_og_then_title() {
        let with_og = r#"<head><title>Plain</title><meta property="og:title" content="OG Title"></head>"#;
        assert_eq!(
            extract_metadata(with_og).unwrap().title.as_deref(),
            Some("OG Title")
        );

        let plain = "<head><title>Plain</title></head><body><h1>  </h1></body>";
        assert_eq!(extract_metadata(plain).unwrap().title.as_deref(), Some("Plain"));
    }

    #[test]
    fn test_description_preference() {
        let html = r#"<head><meta property="og:description" content="From OG">
            <meta name="description" content="From meta"></head>"#;
        assert_eq!(
            extract_metadata(html).unwrap().description.as_deref(),
            Some("From meta")
        );

        let og_only = r#"<head><meta property="og:description" content="From OG"></head>"#;
        assert_eq!(
            extract_metadata(og_only).unwrap().description.as_deref(),
            Some("From OG")
        );
    }

    #[test]
    fn test_missing_metadata() {
        let metadata = extract_metadata("<p>no metadata</p>").unwrap();
        assert_eq!(metadata, PageMetadata::default());
    }

    #[test]
    fn test_extract_links() {
        let page = Url::parse("https://example.com/docs/guide").unwrap();
        let html = r##"
            <a href="intro">Intro</a>
            <a href="/docs/api#section">API</a>
            <a href="#top">Top</a>
            <a href="mailto:team@example.com">Mail</a>
            <a href="TEL:+1234">Call</a>
            <a href="javascript:void(0)">JS</a>
            <a href="https://other.example.org/x">External</a>
            <a href="http://[::1">Broken</a>
            <a>No href</a>
        "##;

        let links = extract_links(html, &page).unwrap();
        let links: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/docs/intro",
                "https://example.com/docs/api#section",
                "https://other.example.org/x",
            ]
        );
    }
}
