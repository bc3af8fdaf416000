//! URL normalization and the scope guards applied to every crawl candidate

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use crate::crawler::robots::RobotsRules;

/// Strip fragment and query, and drop a trailing slash unless the path is the root.
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.set_query(None);

    let path = normalized.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed };
        let trimmed = trimmed.to_string();
        normalized.set_path(&trimmed);
    }
    normalized
}

/// Normalize a path prefix: leading slash, no trailing slash except for the root
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Guard 1: only http(s) is crawled
pub fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Guard 2: reject loopback and private-range hosts
pub fn is_private_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") || domain.ends_with(".local")
            {
                return true;
            }
            // Hosts that are really dotted quads but were not parsed as IPs
            domain
                .parse::<Ipv4Addr>()
                .map(is_private_ipv4)
                .unwrap_or(false)
        }
        Some(Host::Ipv4(addr)) => is_private_ipv4(addr),
        Some(Host::Ipv6(addr)) => match addr.to_ipv4_mapped() {
            Some(v4) => is_private_ipv4(v4),
            None => is_private_ipv6(addr),
        },
        None => true,
    }
}

fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    let [a, b, ..] = addr.octets();
    a == 127
        || a == 10
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || addr.is_unspecified()
        || addr.is_link_local()
}

// Loopback, unspecified, unique-local fc00::/7 and link-local fe80::/10
fn is_private_ipv6(addr: Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    addr.is_loopback()
        || addr.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// Guard 3: scheme, host and port must match the base exactly
pub fn same_origin(url: &Url, base: &Url) -> bool {
    url.origin() == base.origin()
}

/// Guard 4: the path is equal to or nested under the allowed prefix
pub fn within_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Scope shared by every candidate of one crawl
#[derive(Debug, Clone)]
pub struct Scope {
    base: Url,
    prefix: String,
}

impl Scope {
    pub fn new(base: Url, prefix: String) -> Self {
        Self { base, prefix }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Guards 1-4
    pub fn admits(&self, url: &Url) -> bool {
        is_http_scheme(url)
            && !is_private_host(url)
            && same_origin(url, &self.base)
            && within_prefix(url.path(), &self.prefix)
    }

    /// Guards 1-5
    pub fn admits_with_robots(&self, url: &Url, robots: &RobotsRules) -> bool {
        self.admits(url) && !robots.is_blocked(url.path())
    }
}
