//! Per-tournament resolution pipeline.
//!
//! Discovery, ranking and validation of direct candidates, then crawling of
//! the club's site when none of them is a live form.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::browser::PageFetcher;
use crate::crawler::{CrawlSession, SiteCrawler};
use crate::discovery::{candidates_from_platform, candidates_from_text};
use crate::documents::{DocumentSource, TextExtractor};
use crate::error::ResolveError;
use crate::models::{CandidateSet, CandidateUrl, OriginSignal, ResolutionOutcome, TournamentTarget};
use crate::platform::PlatformSearch;
use crate::ranking::rank_candidates;
use crate::skip_list::SkipList;
use crate::utils::{normalize_url, parse_candidate, site_root};
use crate::validation::FormValidator;

/// Exploration budgets of one tournament.
#[derive(Debug, Clone, Copy)]
pub struct ResolverLimits {
    pub max_depth: usize,
    pub max_candidates_per_level: usize,
    /// Sites crawled when no direct candidate validates.
    pub max_crawl_seeds: usize,
}

impl Default for ResolverLimits {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_candidates_per_level: 10,
            max_crawl_seeds: 3,
        }
    }
}

/// Runs the resolution pipeline on one worker's browser session.
pub struct TournamentResolver {
    documents: Arc<dyn DocumentSource>,
    extractor: Arc<dyn TextExtractor>,
    search: Arc<dyn PlatformSearch>,
    skip_list: Arc<SkipList>,
    validator: FormValidator,
    crawler: SiteCrawler,
    limits: ResolverLimits,
}

impl TournamentResolver {
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        extractor: Arc<dyn TextExtractor>,
        search: Arc<dyn PlatformSearch>,
        skip_list: Arc<SkipList>,
        limits: ResolverLimits,
        screenshot_dir: Option<PathBuf>,
    ) -> Self {
        let validator =
            FormValidator::new(skip_list.clone()).with_screenshot_dir(screenshot_dir);
        Self {
            documents,
            extractor,
            search,
            skip_list,
            crawler: SiteCrawler::new(validator.clone()),
            validator,
            limits,
        }
    }

    /// Resolve one tournament to a terminal outcome. Never fails: fatal
    /// errors become [`ResolutionOutcome::Error`].
    pub async fn resolve(&self, fetcher: &PageFetcher, target: &TournamentTarget) -> ResolutionOutcome {
        match self.try_resolve(fetcher, target).await {
            Ok(Some(url)) => ResolutionOutcome::Found(url),
            Ok(None) => ResolutionOutcome::NotFound,
            Err(e) => {
                error!("{}: resolution aborted: {}", target.label(), e);
                ResolutionOutcome::Error(e.to_string())
            }
        }
    }

    async fn try_resolve(
        &self,
        fetcher: &PageFetcher,
        target: &TournamentTarget,
    ) -> Result<Option<String>, ResolveError> {
        let rules_text = self.rules_text(fetcher, target).await?;
        let text = rules_text.as_deref().unwrap_or_default();

        let mut set = CandidateSet::new();
        set.extend(candidates_from_text(text, &self.skip_list));
        set.extend(candidates_from_platform(self.search.as_ref(), fetcher, target).await?);
        let ranked = rank_candidates(set.into_vec(), text);
        info!("{}: {} candidate(s)", target.label(), ranked.len());

        let mut session = CrawlSession::new(
            self.limits.max_depth,
            self.limits.max_candidates_per_level,
        );

        for candidate in &ranked {
            if !session.mark(&candidate.raw_url) {
                continue;
            }
            match self.validator.validate(fetcher, &candidate.raw_url, target).await {
                Ok(outcome) if outcome.matched => {
                    info!(
                        "{}: {} found via {} (score {})",
                        target.label(),
                        outcome.resolved_url,
                        candidate.origin,
                        candidate.score
                    );
                    return Ok(Some(outcome.resolved_url));
                }
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("{}: {} rejected: {}", target.label(), candidate.raw_url, e),
            }
        }

        let seeds = self.crawl_seeds(target, &ranked);
        if ranked.is_empty() && seeds.is_empty() {
            info!("{}: no candidates and no site to crawl", target.label());
            return Ok(None);
        }

        for seed in &seeds {
            info!("{}: crawling {}", target.label(), seed);
            if let Some(url) = self.crawler.crawl(fetcher, &mut session, seed, target).await? {
                return Ok(Some(url));
            }
        }

        info!(
            "{}: not found after {} page(s)",
            target.label(),
            session.visited_count()
        );
        Ok(None)
    }

    /// Text of the rules document. Unavailable documents yield `None`.
    async fn rules_text(
        &self,
        fetcher: &PageFetcher,
        target: &TournamentTarget,
    ) -> Result<Option<String>, ResolveError> {
        let Some(url) = target.rules_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };

        let what = format!("rules document {}", url);
        let bytes = match fetcher
            .retry_policy()
            .run(&what, |_| self.documents.fetch(url))
            .await
        {
            Ok(bytes) => bytes,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("{}: rules document unavailable: {}", target.label(), e);
                return Ok(None);
            }
        };

        match self.extractor.extract_text(&bytes).await {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                warn!("{}: rules document unreadable: {}", target.label(), e);
                Ok(None)
            }
        }
    }

    /// Sites to crawl: the website hint, then the roots of the best-ranked
    /// rules-document candidates.
    fn crawl_seeds(&self, target: &TournamentTarget, ranked: &[CandidateUrl]) -> Vec<String> {
        let hint = target
            .website
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .map(str::to_string);
        let roots = ranked
            .iter()
            .filter(|c| c.origin == OriginSignal::PdfText)
            .filter_map(|c| parse_candidate(&c.raw_url).ok())
            .filter_map(|url| site_root(&url));

        let mut seeds: Vec<String> = Vec::new();
        for seed in hint.into_iter().chain(roots) {
            if seeds.len() >= self.limits.max_crawl_seeds {
                break;
            }
            if self.skip_list.is_skipped(&seed) {
                continue;
            }
            let key = normalize_url(&seed);
            if !seeds.iter().any(|s| normalize_url(s) == key) {
                seeds.push(seed);
            }
        }
        seeds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::ExtractionError;
    use crate::models::sample_target;
    use crate::testing::{FakeSearch, FakeWeb};
    use async_trait::async_trait;

    const FORM: &str = r#"<h1>Tournoi National de Mondeville</h1>
        <p>Inscription en ligne</p><form><input name="licence"></form>"#;

    struct TextDocuments(Option<&'static str>);

    #[async_trait]
    impl DocumentSource for TextDocuments {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResolveError> {
            self.0
                .map(|t| t.as_bytes().to_vec())
                .ok_or_else(|| ResolveError::Document(format!("404 for {}", url)))
        }
    }

    struct PlainText;

    #[async_trait]
    impl TextExtractor for PlainText {
        async fn extract_text(&self, document: &[u8]) -> Result<String, ExtractionError> {
            Ok(String::from_utf8_lossy(document).to_string())
        }
    }

    fn resolver(rules: Option<&'static str>, search: FakeSearch) -> TournamentResolver {
        TournamentResolver::new(
            Arc::new(TextDocuments(rules)),
            Arc::new(PlainText),
            Arc::new(search),
            Arc::new(SkipList::default()),
            ResolverLimits::default(),
            None,
        )
    }

    fn target_with_rules() -> TournamentTarget {
        let mut target = sample_target();
        target.rules_url = Some("https://fftt.example/reglement.pdf".to_string());
        target
    }

    #[tokio::test]
    async fn best_ranked_rules_candidate_wins() {
        let web = FakeWeb::new();
        web.page("https://www.hotel-caen.com/", "<p>Hôtel</p>");
        web.page("https://tournoi.asptt-caen-tt.fr/", FORM);
        let rules = "Hébergement : www.hotel-caen.com\n\
                     Inscriptions sur le site du club : tournoi.asptt-caen-tt.fr";

        let outcome = resolver(Some(rules), FakeSearch::default())
            .resolve(&web.fetcher(), &target_with_rules())
            .await;
        assert_eq!(outcome, ResolutionOutcome::Found("https://tournoi.asptt-caen-tt.fr/".into()));
        assert_eq!(web.visits(), vec!["https://tournoi.asptt-caen-tt.fr/"]);
    }

    #[tokio::test]
    async fn platform_candidate_is_used_without_rules() {
        let web = FakeWeb::new();
        let event = "https://www.helloasso.com/associations/asptt-caen/evenements/tournoi-2025";
        web.page(event, r#"<div class="form-container">15 mars 2025</div>"#);
        let search = FakeSearch::default().with_hit("tournoi national de mondeville", event);

        let outcome = resolver(None, search).resolve(&web.fetcher(), &sample_target()).await;
        assert_eq!(outcome, ResolutionOutcome::Found(event.into()));
    }

    #[tokio::test]
    async fn falls_back_to_crawling_the_club_site() {
        let web = FakeWeb::new();
        web.page(
            "https://asptt-caen-tt.fr/",
            r#"<nav><a href="/inscription-2025">Inscription 2025</a></nav>"#,
        );
        web.page("https://asptt-caen-tt.fr/inscription-2025", FORM);
        let mut target = sample_target();
        target.website = Some("https://asptt-caen-tt.fr/".into());

        let outcome = resolver(None, FakeSearch::default())
            .resolve(&web.fetcher(), &target)
            .await;
        assert_eq!(
            outcome,
            ResolutionOutcome::Found("https://asptt-caen-tt.fr/inscription-2025".into())
        );
    }

    #[tokio::test]
    async fn missing_document_and_no_results_is_not_found() {
        let web = FakeWeb::new();
        let outcome = resolver(None, FakeSearch::default())
            .resolve(&web.fetcher(), &target_with_rules())
            .await;
        assert_eq!(outcome, ResolutionOutcome::NotFound);
        assert!(web.visits().is_empty());
    }

    #[tokio::test]
    async fn exhausted_candidates_are_not_found() {
        let web = FakeWeb::new();
        web.page("https://club.fr/", r#"<a href="/a">A</a>"#);
        web.page("https://club.fr/a", r#"<a href="/b">B</a>"#);
        web.page("https://club.fr/b", r#"<a href="/c">C</a>"#);
        web.page("https://club.fr/c", r#"<a href="/d">D</a>"#);
        web.page("https://club.fr/d", FORM);
        let mut target = sample_target();
        target.website = Some("club.fr".into());

        let outcome = resolver(None, FakeSearch::default())
            .resolve(&web.fetcher(), &target)
            .await;
        assert_eq!(outcome, ResolutionOutcome::NotFound);
        assert_eq!(web.unique_visits(), 4);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let web = FakeWeb::new();
        web.page("https://tournoi.club.fr/", FORM);
        web.failing("https://tournoi.club.fr/", 2);

        let fetcher = web.fetcher();
        let outcome = resolver(Some("Inscription : tournoi.club.fr"), FakeSearch::default())
            .resolve(&fetcher, &target_with_rules())
            .await;
        assert!(outcome.is_found());
        assert_eq!(web.visits().len(), 3);
        assert_eq!(fetcher.navigations(), 3);
    }

    #[test]
    fn crawl_seeds_prefer_website_hint() {
        let mut target = sample_target();
        target.website = Some("https://asptt-caen-tt.fr".into());
        let ranked = vec![
            CandidateUrl::new("https://asptt-caen-tt.fr/tournoi", OriginSignal::PdfText),
            CandidateUrl::new("https://www.helloasso.com/e/1", OriginSignal::PlatformSearch),
            CandidateUrl::new("https://www.facebook.com/club", OriginSignal::PdfText),
            CandidateUrl::new("tt-mondeville.fr/page", OriginSignal::PdfText),
        ];
        assert_eq!(
            resolver(None, FakeSearch::default()).crawl_seeds(&target, &ranked),
            vec!["https://asptt-caen-tt.fr", "https://tt-mondeville.fr/"]
        );
    }
}
