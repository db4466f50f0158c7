//! Third-party signup platforms: search and page rules.

pub mod helloasso;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::browser::PageFetcher;
use crate::error::ResolveError;

pub use helloasso::HelloAssoSearch;

/// One search result on a signup platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    /// Detail page of the event.
    pub url: String,
    pub date: Option<String>,
    pub location: Option<String>,
}

/// Searches a signup platform through a worker's browser.
#[async_trait]
pub trait PlatformSearch: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query. An empty result is not an error.
    async fn search(&self, fetcher: &PageFetcher, query: &str)
        -> Result<Vec<SearchHit>, ResolveError>;
}

/// What identifies a live registration page on a known platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformRules {
    pub name: &'static str,
    /// Registrable domains; subdomains match too.
    pub hosts: &'static [&'static str],
    /// Markers of a form or checkout container in the page source.
    pub container_markers: &'static [&'static str],
    /// CSS selectors present only when registration is closed.
    pub closed_selectors: &'static str,
}

impl PlatformRules {
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
    }
}

const KNOWN_PLATFORMS: &[PlatformRules] = &[helloasso::RULES];

/// Platform rules for a host, if it belongs to a known signup platform.
pub fn known_platform(host: &str) -> Option<&'static PlatformRules> {
    KNOWN_PLATFORMS.iter().find(|p| p.matches_host(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_platform_hosts() {
        assert_eq!(known_platform("www.helloasso.com").unwrap().name, "helloasso");
        assert!(known_platform("helloasso.com").is_some());
        assert!(known_platform("nothelloasso.com").is_none());
        assert!(known_platform("club-tt.fr").is_none());
    }
}
