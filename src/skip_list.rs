//! Hosts and URL fragments never worth validating.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::parse_candidate;

const DEFAULT_HOSTS: &[&str] = &[
    "google.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "youtube.com",
    "linkedin.com",
    "github.com",
    "zoom.us",
    "wikipedia.org",
    "apple.com",
    "microsoft.com",
    "amazonaws.com",
    "cloudfront.net",
    "cdn.com",
];

const DEFAULT_PATTERNS: &[&str] = &[
    "/image/",
    "/images/",
    "/img/",
    "/css/",
    "/js/",
    "/assets/",
    "/static/",
    "/media/",
    "/video/",
    "/downloads/",
    "/docs/",
    "/pdf/",
    ".jpg",
    ".jpeg",
    ".png",
    ".gif",
    ".svg",
    ".css",
    ".js",
    ".ico",
    ".pdf",
    ".zip",
    ".doc",
    ".docx",
    ".xls",
    ".xlsx",
    ".mp4",
    ".mp3",
    "privacy",
    "terms",
    "about",
    "contact",
    "admin",
    "login",
];

/// Extra entries layered over the built-in lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkipListConfig {
    /// Additional hosts (subdomains included).
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Additional path fragments. Entries starting with `.` match extensions.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Read-only exclusion list, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct SkipList {
    hosts: Vec<String>,
    patterns: Vec<String>,
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new(
            DEFAULT_HOSTS.iter().map(|s| s.to_string()),
            DEFAULT_PATTERNS.iter().map(|s| s.to_string()),
        )
    }
}

impl SkipList {
    pub fn new(
        hosts: impl IntoIterator<Item = String>,
        patterns: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            hosts: hosts.into_iter().map(|h| h.to_lowercase()).collect(),
            patterns: patterns.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Built-in lists plus configured additions.
    pub fn from_config(config: &SkipListConfig) -> Self {
        let mut list = Self::default();
        list.hosts
            .extend(config.hosts.iter().map(|h| h.to_lowercase()));
        list.patterns
            .extend(config.patterns.iter().map(|p| p.to_lowercase()));
        list
    }

    pub fn is_skipped_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
    }

    /// Whether a parsed URL is excluded by host or path.
    pub fn is_skipped_url(&self, url: &Url) -> bool {
        if url.host_str().is_some_and(|h| self.is_skipped_host(h)) {
            return true;
        }
        let path = url.path().to_lowercase();
        self.patterns.iter().any(|p| {
            if p.starts_with('.') {
                path.ends_with(p.as_str())
            } else {
                path.contains(p.as_str())
            }
        })
    }

    /// Whether a raw candidate string is excluded. Unparseable input counts as skipped.
    pub fn is_skipped(&self, raw: &str) -> bool {
        parse_candidate(raw).map_or(true, |url| self.is_skipped_url(&url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_social_hosts_and_subdomains() {
        let list = SkipList::default();
        assert!(list.is_skipped("https://www.facebook.com/club"));
        assert!(list.is_skipped("m.youtube.com/watch"));
        assert!(!list.is_skipped("https://tournoi.club-tt.fr"));
    }

    #[test]
    fn skips_asset_paths_and_extensions() {
        let list = SkipList::default();
        assert!(list.is_skipped("https://club.fr/images/affiche.jpg"));
        assert!(list.is_skipped("https://club.fr/reglement.pdf"));
        assert!(list.is_skipped("https://club.fr/admin"));
        assert!(!list.is_skipped("https://club.fr/data.json"));
    }

    #[test]
    fn configured_additions_apply() {
        let list = SkipList::from_config(&SkipListConfig {
            hosts: vec!["fftt.com".into()],
            patterns: vec!["/boutique".into()],
        });
        assert!(list.is_skipped("https://www.fftt.com/site/"));
        assert!(list.is_skipped("https://club.fr/boutique/maillots"));
    }

    #[test]
    fn unparseable_input_is_skipped() {
        assert!(SkipList::default().is_skipped("http://"));
    }
}
