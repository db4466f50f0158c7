//! URL extraction from rules-document text.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{CandidateSet, CandidateUrl, OriginSignal};
use crate::skip_list::SkipList;

/// TLDs recognised on bare domains ("tournoi.club.fr" without a scheme).
const URL_TLDS: &[&str] = &[
    "com", "org", "net", "fr", "io", "co", "app", "dev", "info", "biz", "tv", "me", "uk", "us",
    "ca", "de", "jp", "eu", "be", "ch",
];

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r#"(?i)\b(?:https?://)?(?:www\.)?(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+(?:{})\b(?:/[^\s<>"'\)\]]*)?"#,
        URL_TLDS.join("|")
    );
    Regex::new(&pattern).expect("URL pattern is valid")
});

/// Every URL-shaped substring of `text`, in order of appearance, without
/// trailing punctuation and without e-mail domains. Duplicates are kept.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .filter(|m| !text[..m.start()].ends_with('@'))
        .map(|m| {
            m.as_str()
                .trim_end_matches(|c: char| !(c.is_alphanumeric() || c == '/'))
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Candidates found in a rules document, skip-listed URLs removed.
pub fn candidates_from_text(text: &str, skip_list: &SkipList) -> Vec<CandidateUrl> {
    let mut set = CandidateSet::new();
    for raw in extract_urls(text) {
        if skip_list.is_skipped(&raw) {
            continue;
        }
        set.insert(CandidateUrl::new(raw, OriginSignal::PdfText));
    }
    set.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = "Article 4 - Inscriptions\n\
        Inscriptions sur le site du club : www.asptt-caen-tt.fr.\n\
        Paiement sécurisé en ligne : https://tournoi.asptt-caen-tt.fr/paiement?x=1,\n\
        Contact : juge.arbitre@asptt-caen-tt.fr\n\
        Suivez-nous sur https://www.facebook.com/aspttcaen\n\
        Plan d'accès : https://asptt-caen-tt.fr/images/plan.png";

    #[test]
    fn extracts_bare_domains_and_full_urls() {
        let urls = extract_urls(RULES);
        assert!(urls.contains(&"www.asptt-caen-tt.fr".to_string()));
        assert!(urls.contains(&"https://tournoi.asptt-caen-tt.fr/paiement?x=1".to_string()));
    }

    #[test]
    fn ignores_email_domains() {
        let urls = extract_urls("écrire à contact@club-tt.fr pour toute question");
        assert!(urls.is_empty());
    }

    #[test]
    fn candidates_drop_skip_listed_urls() {
        let candidates = candidates_from_text(RULES, &SkipList::default());
        let raws: Vec<_> = candidates.iter().map(|c| c.raw_url.as_str()).collect();
        assert_eq!(
            raws,
            vec![
                "www.asptt-caen-tt.fr",
                "https://tournoi.asptt-caen-tt.fr/paiement?x=1"
            ]
        );
        assert!(candidates.iter().all(|c| c.origin == OriginSignal::PdfText));
    }

    #[test]
    fn discovery_is_stable_across_runs() {
        let first = candidates_from_text(RULES, &SkipList::default());
        let second = candidates_from_text(RULES, &SkipList::default());
        let mut a: Vec<_> = first.into_iter().map(|c| c.normalized_url).collect();
        let mut b: Vec<_> = second.into_iter().map(|c| c.normalized_url).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }
}
