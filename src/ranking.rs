//! Candidate ranking.
//!
//! Scores are additive and deterministic: the same text and candidates always
//! produce the same order. Signal weights keep the ordering payment context >
//! subdomain keyword > URL keyword > secure scheme.

use crate::models::CandidateUrl;
use crate::utils::{host_of, subdomain_labels};

/// Registration stems looked for in candidate URLs.
const URL_KEYWORDS: &[&str] = &[
    "tournoi",
    "inscription",
    "inscrire",
    "competition",
    "paiement",
    "engage",
    "tarif",
    "particip",
    "reserv",
];

const URL_KEYWORD_SCORE: i32 = 2;
const SUBDOMAIN_KEYWORD_SCORE: i32 = 5;
const SUBDOMAIN_SCORE: i32 = 3;
const HTTPS_SCORE: i32 = 1;
const PAYMENT_CONTEXT_SCORE: i32 = 8;
const TOURNAMENT_PAYMENT_SCORE: i32 = 10;
const GENERIC_TERM_SCORE: i32 = 1;
const COLON_SCORE: i32 = 2;

/// Window before a mention searched for "register here" phrasing.
const CONTEXT_WINDOW: usize = 150;
/// Mentions closer than this get the higher phrase score.
const NEAR_DISTANCE: usize = 100;
const PAYMENT_WINDOW: usize = 100;
const GENERIC_WINDOW: usize = 50;
const COLON_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy)]
enum Strength {
    /// Club-site recommendation idioms.
    Strong,
    /// Direct signup or payment instructions.
    Direct,
    /// Pointers to a website.
    Site,
}

impl Strength {
    fn score(self, distance: usize) -> i32 {
        let near = distance < NEAR_DISTANCE;
        match (self, near) {
            (Strength::Strong, true) => 8,
            (Strength::Strong, false) => 6,
            (Strength::Direct, true) => 6,
            (Strength::Direct, false) => 5,
            (Strength::Site, true) => 5,
            (Strength::Site, false) => 4,
        }
    }
}

const CONTEXT_PHRASES: &[(&str, Strength)] = &[
    ("inscriptions sur le site du club", Strength::Strong),
    ("inscription sur le site du club", Strength::Strong),
    ("à privilégier", Strength::Strong),
    ("a privilegier", Strength::Strong),
    ("privilégiez", Strength::Strong),
    ("de préférence", Strength::Strong),
    ("recommandé", Strength::Strong),
    ("inscription sur", Strength::Direct),
    ("inscriptions sur", Strength::Direct),
    ("s'inscrire sur", Strength::Direct),
    ("inscrivez-vous", Strength::Direct),
    ("inscription en ligne", Strength::Direct),
    ("inscriptions en ligne", Strength::Direct),
    ("inscription via", Strength::Direct),
    ("inscriptions via", Strength::Direct),
    ("s'inscrire via", Strength::Direct),
    ("engagements sur", Strength::Direct),
    ("engagements en ligne", Strength::Direct),
    ("paiement en ligne", Strength::Direct),
    ("paiement sécurisé", Strength::Direct),
    ("paiement sur", Strength::Direct),
    ("payer en ligne", Strength::Direct),
    ("règlement en ligne", Strength::Direct),
    ("site du club", Strength::Site),
    ("site internet", Strength::Site),
    ("site web", Strength::Site),
    ("site officiel", Strength::Site),
    ("site du tournoi", Strength::Site),
    ("en ligne sur", Strength::Site),
    ("accessible sur", Strength::Site),
    ("disponible sur", Strength::Site),
    ("à l'adresse", Strength::Site),
    ("rendez-vous sur", Strength::Site),
    ("plus d'informations sur", Strength::Site),
    ("infos sur", Strength::Site),
];

const PAYMENT_PHRASES: &[&str] = &[
    "paiement sécurisé en ligne",
    "paiement en ligne",
    "paiement anticipé",
    "payer en ligne",
    "règlement en ligne",
    "paiement par carte",
    "paiement par cb",
    "carte bancaire",
    "paiement sécurisé",
];

const GENERIC_TERMS: &[&str] = &[
    "paiement",
    "inscription",
    "renseignement",
    "information",
    "détail",
    "consulter",
    "visiter",
    "accéder",
    "disponible",
    "réservation",
];

const TOURNAMENT_KEYWORDS: &[&str] = &["tournoi", "tournament"];

/// Score every candidate against `text` and sort best first.
///
/// Ties keep discovery order.
pub fn rank_candidates(candidates: Vec<CandidateUrl>, text: &str) -> Vec<CandidateUrl> {
    let lower = text.to_lowercase();
    let mut scored: Vec<CandidateUrl> = candidates
        .into_iter()
        .map(|c| {
            let score = score_candidate(&c.raw_url, &lower);
            c.with_score(score)
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Score of one URL. `lower_text` must already be lowercased.
pub fn score_candidate(raw_url: &str, lower_text: &str) -> i32 {
    let lower_url = raw_url.trim().to_lowercase();
    let mut score = url_score(&lower_url);
    if let Some(mention) = find_mention(lower_text, &lower_url) {
        score += context_score(lower_text, mention, &lower_url);
    }
    score
}

fn url_score(lower_url: &str) -> i32 {
    let host = host_of(lower_url).unwrap_or_default();
    let subdomains = subdomain_labels(&host);

    let mut score = 0;
    for keyword in URL_KEYWORDS {
        if subdomains.iter().any(|label| label.contains(keyword)) {
            score += SUBDOMAIN_KEYWORD_SCORE;
        } else if lower_url.contains(keyword) {
            score += URL_KEYWORD_SCORE;
        }
    }
    if !subdomains.is_empty() {
        score += SUBDOMAIN_SCORE;
    }
    if lower_url.starts_with("https://") {
        score += HTTPS_SCORE;
    }
    score
}

/// Byte offset of the first mention of the URL in the text.
fn find_mention(lower_text: &str, lower_url: &str) -> Option<usize> {
    if lower_url.is_empty() {
        return None;
    }
    lower_text.find(lower_url).or_else(|| {
        let bare = lower_url
            .strip_prefix("https://")
            .or_else(|| lower_url.strip_prefix("http://"))?;
        lower_text.find(bare)
    })
}

fn context_score(lower_text: &str, mention: usize, lower_url: &str) -> i32 {
    let mut score = 0;

    // Payment phrasing right before the URL.
    let payment_start = floor_boundary(lower_text, mention.saturating_sub(PAYMENT_WINDOW));
    let payment_before = &lower_text[payment_start..mention];
    if PAYMENT_PHRASES.iter().any(|p| payment_before.contains(p)) {
        score += PAYMENT_CONTEXT_SCORE;
    }

    // Tournament URL discussed next to a payment.
    if TOURNAMENT_KEYWORDS.iter().any(|k| lower_url.contains(k))
        && PAYMENT_PHRASES
            .iter()
            .chain(std::iter::once(&"paiement"))
            .flat_map(|p| lower_text.match_indices(*p))
            .any(|(idx, _)| idx.abs_diff(mention) < PAYMENT_WINDOW)
    {
        score += TOURNAMENT_PAYMENT_SCORE;
    }

    // Remaining signals are measured from before any payment phrase that
    // directly precedes the mention, so that phrase never pushes them away.
    let anchor = context_anchor(&lower_text[..mention]);
    let before = &lower_text[floor_boundary(lower_text, anchor.saturating_sub(CONTEXT_WINDOW))..anchor];

    score += CONTEXT_PHRASES
        .iter()
        .filter_map(|(phrase, strength)| {
            before
                .rfind(phrase)
                .map(|idx| strength.score(before.len() - idx))
        })
        .max()
        .unwrap_or(0);

    let generic = tail(before, GENERIC_WINDOW);
    if GENERIC_TERMS.iter().any(|t| generic.contains(t)) {
        score += GENERIC_TERM_SCORE;
    }
    if tail(before, COLON_WINDOW).contains(':') {
        score += COLON_SCORE;
    }

    score
}

/// End of the text that context signals look back from.
fn context_anchor(before: &str) -> usize {
    let mut end = before.len();
    loop {
        let trimmed = before[..end].trim_end_matches(|c: char| c.is_whitespace() || c == ':');
        match PAYMENT_PHRASES.iter().find(|p| trimmed.ends_with(*p)) {
            Some(p) => end = trimmed.len() - p.len(),
            None => return end,
        }
    }
}

fn tail(s: &str, max_bytes: usize) -> &str {
    &s[floor_boundary(s, s.len().saturating_sub(max_bytes))..]
}

/// Move `idx` forward to the next char boundary.
fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

const LINK_REGISTRATION_KEYWORDS: &[&str] = &[
    "inscription",
    "register",
    "signup",
    "sign-up",
    "enroll",
    "particip",
    "engagement",
];

const LINK_TOURNAMENT_KEYWORDS: &[&str] = &[
    "tournoi",
    "tournament",
    "competition",
    "championnat",
    "championship",
];

/// Relevance of a link found while crawling, judged on the URL alone.
pub fn link_relevance(url: &str) -> i32 {
    let lower = url.to_lowercase();
    let mut score = 0;

    score += 10
        * LINK_REGISTRATION_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .count() as i32;
    if lower.contains("form") {
        score += 5;
    }

    let path = lower
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    if last_segment.ends_with(".html")
        || last_segment.ends_with(".php")
        || !last_segment.contains('.')
    {
        score += 3;
    }

    score += 3
        * LINK_TOURNAMENT_KEYWORDS
            .iter()
            .filter(|k| lower.contains(*k))
            .count() as i32;
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OriginSignal;

    fn candidates(urls: &[&str]) -> Vec<CandidateUrl> {
        urls.iter()
            .map(|u| CandidateUrl::new(*u, OriginSignal::PdfText))
            .collect()
    }

    #[test]
    fn club_site_phrase_outranks_unrelated_url() {
        let text = "Hébergement : voir www.hotel-caen.com pour les tarifs.\n\
                    Inscriptions sur le site du club : www.example-club.fr avant le 10 mars.";
        let ranked = rank_candidates(
            candidates(&["www.hotel-caen.com", "www.example-club.fr"]),
            text,
        );
        assert_eq!(ranked[0].raw_url, "www.example-club.fr");
        assert!(ranked[0].score >= 8);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn subdomain_keyword_beats_path_keyword() {
        let sub = score_candidate("https://tournoi.club.fr", "");
        let path = score_candidate("https://club.fr/tournoi", "");
        assert!(sub > path, "{sub} <= {path}");
    }

    #[test]
    fn ties_keep_discovery_order() {
        let ranked = rank_candidates(candidates(&["club-a.fr", "club-b.fr", "club-c.fr"]), "");
        let order: Vec<_> = ranked.iter().map(|c| c.raw_url.as_str()).collect();
        assert_eq!(order, vec!["club-a.fr", "club-b.fr", "club-c.fr"]);
    }

    #[test]
    fn payment_context_is_the_strongest_text_signal() {
        let paid = score_candidate(
            "https://tournoi.club.fr",
            "paiement sécurisé en ligne https://tournoi.club.fr",
        );
        let plain = score_candidate("https://tournoi.club.fr", "https://tournoi.club.fr");
        assert!(paid >= plain + PAYMENT_CONTEXT_SCORE);
    }

    #[test]
    fn inserting_payment_phrase_never_lowers_score() {
        let texts = [
            "Inscriptions sur le site du club : www.tt-caen.fr",
            "Tournoi à privilégier: tournoi.tt-caen.fr - paiement par cb accepté",
            "Infos sur https://tt-caen.fr/tournoi, paiement anticipé possible. Réservation des repas.",
            "Règlement en ligne : https://www.helloasso.com/associations/tt-caen",
            "www.tt-caen.fr",
        ];
        let urls = [
            "www.tt-caen.fr",
            "tournoi.tt-caen.fr",
            "https://tt-caen.fr/tournoi",
            "https://www.helloasso.com/associations/tt-caen",
            "www.tt-caen.fr",
        ];
        for (text, url) in texts.iter().zip(urls) {
            let lower = text.to_lowercase();
            let idx = lower.find(url).unwrap();
            for phrase in PAYMENT_PHRASES {
                let with_phrase = format!("{}{} {}", &lower[..idx], phrase, &lower[idx..]);
                assert!(
                    score_candidate(url, &with_phrase) >= score_candidate(url, &lower),
                    "{phrase:?} lowered {url} in {text:?}"
                );
            }
        }
    }

    #[test]
    fn scoring_is_deterministic() {
        let text = "Paiement en ligne : https://tournoi.club.fr";
        assert_eq!(
            score_candidate("https://tournoi.club.fr", text),
            score_candidate("https://tournoi.club.fr", text)
        );
    }

    #[test]
    fn link_relevance_prefers_registration_links() {
        let signup = link_relevance("https://club.fr/inscription-tournoi.php");
        let news = link_relevance("https://club.fr/actualites/photos.jpg");
        assert_eq!(signup, 10 + 3 + 3);
        assert_eq!(news, 0);
        assert!(link_relevance("https://club.fr/formulaire") > link_relevance("https://club.fr/"));
    }
}
