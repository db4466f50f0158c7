//! Candidate signup URLs.

use std::collections::HashSet;
use std::fmt;

use crate::utils::normalize_url;

/// Where a candidate URL was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginSignal {
    PdfText,
    PlatformSearch,
    HeaderNavigation,
    PageLinks,
}

impl fmt::Display for OriginSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PdfText => "pdf-text",
            Self::PlatformSearch => "platform-search",
            Self::HeaderNavigation => "header-navigation",
            Self::PageLinks => "page-links",
        };
        f.write_str(s)
    }
}

/// A URL suspected of leading to a registration form.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateUrl {
    /// As found in the source (may lack a scheme).
    pub raw_url: String,
    /// Comparison key, see [`normalize_url`].
    pub normalized_url: String,
    pub origin: OriginSignal,
    pub score: i32,
}

impl CandidateUrl {
    pub fn new(raw_url: impl Into<String>, origin: OriginSignal) -> Self {
        let raw_url = raw_url.into();
        Self {
            normalized_url: normalize_url(&raw_url),
            raw_url,
            origin,
            score: 0,
        }
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = score;
        self
    }
}

/// Ordered, deduplicated candidates of one resolution attempt.
///
/// The first insertion of a normalized URL wins; later duplicates are dropped
/// together with their origin.
#[derive(Debug, Default, Clone)]
pub struct CandidateSet {
    seen: HashSet<String>,
    items: Vec<CandidateUrl>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate. Returns false when it was already present.
    pub fn insert(&mut self, candidate: CandidateUrl) -> bool {
        if candidate.normalized_url.is_empty()
            || !self.seen.insert(candidate.normalized_url.clone())
        {
            return false;
        }
        self.items.push(candidate);
        true
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = CandidateUrl>) {
        for candidate in candidates {
            self.insert(candidate);
        }
    }

    pub fn contains(&self, raw_url: &str) -> bool {
        self.seen.contains(&normalize_url(raw_url))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateUrl> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<CandidateUrl> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_keep_first_origin() {
        let mut set = CandidateSet::new();
        assert!(set.insert(CandidateUrl::new(
            "tournoi.club.fr",
            OriginSignal::PdfText
        )));
        assert!(!set.insert(CandidateUrl::new(
            "http://tournoi.club.fr/?ref=helloasso",
            OriginSignal::PlatformSearch
        )));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().origin, OriginSignal::PdfText);
        assert!(set.contains("HTTPS://TOURNOI.CLUB.FR/"));
    }

    #[test]
    fn empty_urls_are_ignored() {
        let mut set = CandidateSet::new();
        assert!(!set.insert(CandidateUrl::new("https://", OriginSignal::PageLinks)));
        assert!(set.is_empty());
    }
}
