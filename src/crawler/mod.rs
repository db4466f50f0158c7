//! Recursive site crawler.
//!
//! Starting from a seed page, tries the registration links of the page's
//! navigation first, then the most relevant links of the page, and descends
//! level by level until a page validates or the session's budgets run out.

mod links;

pub use links::{header_links, page_links};

use std::collections::HashSet;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{LoadedPage, PageFetcher};
use crate::error::ResolveError;
use crate::models::{CandidateUrl, TournamentTarget};
use crate::utils::normalize_url;
use crate::validation::FormValidator;

/// Crawl state of one tournament. Owned by a single worker.
///
/// Every URL is recorded before it is navigated to, so no URL is validated
/// twice and cycles in the link graph terminate. The number of distinct pages
/// is capped at `max_candidates_per_level ^ max_depth`.
#[derive(Debug, Clone)]
pub struct CrawlSession {
    visited: HashSet<String>,
    max_depth: usize,
    max_candidates_per_level: usize,
    max_pages: usize,
}

impl CrawlSession {
    pub fn new(max_depth: usize, max_candidates_per_level: usize) -> Self {
        Self {
            visited: HashSet::new(),
            max_depth,
            max_candidates_per_level,
            max_pages: max_candidates_per_level.saturating_pow(max_depth as u32),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn max_candidates_per_level(&self) -> usize {
        self.max_candidates_per_level
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(&normalize_url(url))
    }

    /// Record a URL about to be visited.
    ///
    /// Returns false when it was already visited or the page budget is spent.
    pub fn mark(&mut self, url: &str) -> bool {
        let key = normalize_url(url);
        if key.is_empty() || self.visited.contains(&key) || self.is_exhausted() {
            return false;
        }
        self.visited.insert(key)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.visited.len() >= self.max_pages
    }
}

/// Explores a site looking for the registration form.
#[derive(Debug, Clone)]
pub struct SiteCrawler {
    validator: FormValidator,
}

impl SiteCrawler {
    pub fn new(validator: FormValidator) -> Self {
        Self { validator }
    }

    /// Crawl from `seed`. Returns the validated URL, if any.
    ///
    /// A seed that was already validated in this session is only explored.
    pub async fn crawl(
        &self,
        fetcher: &PageFetcher,
        session: &mut CrawlSession,
        seed: &str,
        target: &TournamentTarget,
    ) -> Result<Option<String>, ResolveError> {
        let already_validated = session.is_visited(seed);
        if !already_validated && !session.mark(seed) {
            debug!("{}: crawl budget spent before seed {}", target.label(), seed);
            return Ok(None);
        }

        let page = match self.validator.load(fetcher, seed).await {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("{}: crawl seed {} unusable: {}", target.label(), seed, e);
                return Ok(None);
            }
        };

        if !already_validated {
            let outcome = self.validator.validate_page(fetcher, &page, target).await?;
            if outcome.matched {
                return Ok(Some(outcome.resolved_url));
            }
        }

        let found = self.explore(fetcher, session, page, 0, target).await?;
        if found.is_none() {
            info!(
                "{}: crawl from {} found nothing ({} page(s) visited)",
                target.label(),
                seed,
                session.visited_count()
            );
        }
        Ok(found)
    }

    /// Validate the links of `page` (at `depth + 1`) and descend into them.
    fn explore<'a>(
        &'a self,
        fetcher: &'a PageFetcher,
        session: &'a mut CrawlSession,
        page: LoadedPage,
        depth: usize,
        target: &'a TournamentTarget,
    ) -> BoxFuture<'a, Result<Option<String>, ResolveError>> {
        Box::pin(async move {
            let child_depth = depth + 1;
            if child_depth > session.max_depth() || session.is_exhausted() {
                return Ok(None);
            }
            let Ok(base) = Url::parse(&page.final_url) else {
                return Ok(None);
            };
            let skip_list = self.validator.skip_list();

            // Navigation shortcuts first.
            for link in header_links(&page.html, &base, skip_list)? {
                if let Some((_, Some(found))) = self
                    .try_candidate(fetcher, session, &link, child_depth, target)
                    .await?
                {
                    return Ok(Some(found));
                }
            }

            let candidates = page_links(
                &page.html,
                &base,
                skip_list,
                session.max_candidates_per_level(),
                |c| session.is_visited(&c.raw_url),
            )?;
            debug!(
                "{}: {} link(s) to try on {} at depth {}",
                target.label(),
                candidates.len(),
                page.final_url,
                child_depth
            );

            let mut loaded = Vec::new();
            for candidate in &candidates {
                match self
                    .try_candidate(fetcher, session, candidate, child_depth, target)
                    .await?
                {
                    Some((_, Some(found))) => return Ok(Some(found)),
                    Some((page, None)) => loaded.push(page),
                    None => {}
                }
            }

            if child_depth < session.max_depth() {
                for child in loaded {
                    if let Some(found) = self
                        .explore(fetcher, session, child, child_depth, target)
                        .await?
                    {
                        return Ok(Some(found));
                    }
                }
            }
            Ok(None)
        })
    }

    /// Visit one candidate. `None` when it was skipped or failed to load;
    /// otherwise the page and the accepted URL, if it validated.
    async fn try_candidate(
        &self,
        fetcher: &PageFetcher,
        session: &mut CrawlSession,
        candidate: &CandidateUrl,
        depth: usize,
        target: &TournamentTarget,
    ) -> Result<Option<(LoadedPage, Option<String>)>, ResolveError> {
        if !session.mark(&candidate.raw_url) {
            return Ok(None);
        }

        let page = match self.validator.load(fetcher, &candidate.raw_url).await {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!(
                    "{}: {} ({}) failed at depth {}: {}",
                    target.label(),
                    candidate.raw_url,
                    candidate.origin,
                    depth,
                    e
                );
                return Ok(None);
            }
        };

        let outcome = self.validator.validate_page(fetcher, &page, target).await?;
        if outcome.matched {
            info!(
                "{}: {} found via {} at depth {}",
                target.label(),
                outcome.resolved_url,
                candidate.origin,
                depth
            );
            return Ok(Some((page, Some(outcome.resolved_url))));
        }
        Ok(Some((page, None)))
    }
}
