//! robots.txt policy for the crawler
//!
//! Only `Disallow` lines in groups addressed to `*` or to the crawler's own
//! product token are collected. A missing or unreachable robots.txt yields an
//! empty rule set.

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::fetcher::Fetcher;

/// Disallow rules that apply to this crawler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsRules {
    /// Path prefixes that must not be fetched
    pub disallow: Vec<String>,
}

impl RobotsRules {
    /// Parse a robots.txt body for the given agent token
    pub fn parse(body: &str, agent_token: &str) -> Self {
        let mut disallow = Vec::new();
        let mut group_applies = false;
        let mut in_agent_run = false;

        for raw_line in body.lines() {
            let line = match raw_line.find('#') {
                Some(pos) => &raw_line[..pos],
                None => raw_line,
            }
            .trim();
            if line.is_empty() {
                continue;
            }

            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share one group
                    if !in_agent_run {
                        group_applies = false;
                    }
                    in_agent_run = true;
                    if value == "*" || value.eq_ignore_ascii_case(agent_token) {
                        group_applies = true;
                    }
                }
                "disallow" => {
                    in_agent_run = false;
                    if group_applies {
                        // An empty disallow under our group blocks the whole site
                        let pattern = if value.is_empty() { "/" } else { value };
                        disallow.push(pattern.to_string());
                    }
                }
                _ => in_agent_run = false,
            }
        }

        Self { disallow }
    }

    /// Whether the path falls under any collected disallow prefix
    pub fn is_blocked(&self, path: &str) -> bool {
        self.disallow
            .iter()
            .any(|pattern| pattern == "/" || path.starts_with(pattern.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.disallow.is_empty()
    }
}

/// Fetch and parse `{origin}/robots.txt`.
///
/// Any non-success status is treated as "no robots.txt" and returns an empty
/// rule set. Transport failures are returned so the caller decides how to
/// degrade.
pub async fn fetch_robots(
    fetcher: &dyn Fetcher,
    origin: &Url,
    agent_token: &str,
) -> Result<RobotsRules, CrawlError> {
    let robots_url = origin.join("/robots.txt")?;
    let response = fetcher
        .fetch(&robots_url)
        .await
        .map_err(|e| CrawlError::RobotsTxt(format!("{}: {}", robots_url, e)))?;

    if !response.is_success() {
        debug!("No robots.txt at {} (HTTP {})", robots_url, response.status);
        return Ok(RobotsRules::default());
    }

    let rules = RobotsRules::parse(&response.body, agent_token);
    debug!("Loaded {} disallow rules from {}", rules.disallow.len(), robots_url);
    Ok(rules)
}
