//! Link gathering on crawled pages.

use scraper::{ElementRef, Html};
use url::Url;

use crate::error::ResolveError;
use crate::models::{CandidateSet, CandidateUrl, OriginSignal};
use crate::ranking::link_relevance;
use crate::skip_list::SkipList;
use crate::utils::{normalize_url, resolve_link, selector};

/// Regions where sites usually put their main navigation.
const HEADER_SELECTORS: &str = "header, nav, .header, .navigation, .menu, .navbar, .nav-bar, \
     #header, #nav, #main-menu, #top-menu, .top-menu, #primary-menu, .site-navigation, \
     .main-navigation";

const SIGNUP_LINK_KEYWORDS: &[&str] = &[
    "inscription",
    "inscrivez",
    "inscrire",
    "enregistrement",
    "signup",
    "sign up",
    "sign-up",
    "register",
    "registration",
    "enroll",
    "participer",
    "participation",
    "engagement",
];

fn is_signup_link(link: ElementRef<'_>) -> bool {
    let text = link.text().collect::<String>();
    let labelled = [
        Some(text.as_str()),
        link.value().attr("title"),
        link.value().attr("aria-label"),
    ]
    .into_iter()
    .flatten()
    .map(str::to_lowercase)
    .any(|label| SIGNUP_LINK_KEYWORDS.iter().any(|k| label.contains(k)));
    labelled
}

/// Navigation links labelled as registration, in document order.
pub fn header_links(
    html: &str,
    base: &Url,
    skip_list: &SkipList,
) -> Result<Vec<CandidateUrl>, ResolveError> {
    let document = Html::parse_document(html);
    let link_selector = selector("a[href]")?;
    let own = normalize_url(base.as_str());

    let mut set = CandidateSet::new();
    for region in document.select(&selector(HEADER_SELECTORS)?) {
        for link in region.select(&link_selector).filter(|l| is_signup_link(*l)) {
            let Some(url) = link
                .value()
                .attr("href")
                .and_then(|href| resolve_link(base, href))
            else {
                continue;
            };
            if skip_list.is_skipped_url(&url) {
                continue;
            }
            let candidate = CandidateUrl::new(url.to_string(), OriginSignal::HeaderNavigation);
            if candidate.normalized_url != own {
                set.insert(candidate);
            }
        }
    }
    Ok(set.into_vec())
}

/// Every link on the page, ranked by URL relevance, best `limit` kept.
///
/// Links for which `exclude` returns true are dropped before the cut.
pub fn page_links(
    html: &str,
    base: &Url,
    skip_list: &SkipList,
    limit: usize,
    exclude: impl Fn(&CandidateUrl) -> bool,
) -> Result<Vec<CandidateUrl>, ResolveError> {
    let document = Html::parse_document(html);
    let own = normalize_url(base.as_str());

    let mut set = CandidateSet::new();
    for link in document.select(&selector("a[href]")?) {
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|href| resolve_link(base, href))
        else {
            continue;
        };
        if skip_list.is_skipped_url(&url) {
            continue;
        }
        let candidate = CandidateUrl::new(url.to_string(), OriginSignal::PageLinks);
        if candidate.normalized_url != own && !exclude(&candidate) {
            set.insert(candidate);
        }
    }

    let mut ranked: Vec<CandidateUrl> = set
        .into_vec()
        .into_iter()
        .map(|c| {
            let score = link_relevance(&c.raw_url);
            c.with_score(score)
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(limit);
    Ok(ranked)
}
