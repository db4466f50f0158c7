//! Form validation: is this URL a live registration form for the tournament?
//!
//! Pages on a known signup platform go through the platform rules in
//! [`platform`]; every other page goes through the heuristic in [`generic`].

mod generic;
mod platform;

use std::path::PathBuf;
use std::sync::Arc;

use scraper::Html;
use tracing::{debug, info, warn};

use crate::browser::{LoadedPage, PageFetcher};
use crate::error::ResolveError;
use crate::models::{TournamentTarget, ValidationOutcome};
use crate::platform::known_platform;
use crate::skip_list::SkipList;
use crate::utils::{fold, host_of, parse_candidate};

pub use generic::classify_page;

/// French markers of a registration that no longer accepts entries.
const CLOSED_MARKERS: &[&str] = &[
    "inscription fermée",
    "inscriptions fermées",
    "inscription terminée",
    "inscriptions terminées",
    "inscriptions closes",
    "inscriptions clôturées",
];

/// Validates candidate URLs through a worker's browser session.
#[derive(Debug, Clone)]
pub struct FormValidator {
    skip_list: Arc<SkipList>,
    screenshot_dir: Option<PathBuf>,
}

impl FormValidator {
    pub fn new(skip_list: Arc<SkipList>) -> Self {
        Self {
            skip_list,
            screenshot_dir: None,
        }
    }

    /// Save a screenshot of every rejected platform page under `dir`.
    pub fn with_screenshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.screenshot_dir = dir;
        self
    }

    pub fn skip_list(&self) -> &SkipList {
        &self.skip_list
    }

    /// Load a candidate page, refusing skip-listed and malformed URLs.
    pub async fn load(
        &self,
        fetcher: &PageFetcher,
        raw_url: &str,
    ) -> Result<LoadedPage, ResolveError> {
        let url = parse_candidate(raw_url)?;
        if self.skip_list.is_skipped_url(&url) {
            return Err(ResolveError::Skipped(raw_url.to_string()));
        }
        fetcher.load(url.as_str()).await
    }

    /// Load and classify one URL.
    pub async fn validate(
        &self,
        fetcher: &PageFetcher,
        raw_url: &str,
        target: &TournamentTarget,
    ) -> Result<ValidationOutcome, ResolveError> {
        let page = self.load(fetcher, raw_url).await?;
        self.validate_page(fetcher, &page, target).await
    }

    /// Classify a page that is the one currently loaded in `fetcher`.
    pub async fn validate_page(
        &self,
        fetcher: &PageFetcher,
        page: &LoadedPage,
        target: &TournamentTarget,
    ) -> Result<ValidationOutcome, ResolveError> {
        let requested_host = host_of(&page.requested_url).unwrap_or_default();

        let outcome = match known_platform(&requested_host) {
            Some(rules) => {
                let outcome = platform::classify(fetcher, page, rules, target).await?;
                if !outcome.matched {
                    self.capture_rejected(fetcher, page, target).await;
                }
                outcome
            }
            None => classify_page(page, target)?,
        };

        if outcome.matched {
            info!(
                "{}: {} accepted ({:?})",
                target.label(),
                outcome.resolved_url,
                outcome.signals
            );
        } else {
            debug!(
                "{}: {} rejected ({:?})",
                target.label(),
                page.requested_url,
                outcome.signals
            );
        }
        Ok(outcome)
    }

    async fn capture_rejected(&self, fetcher: &PageFetcher, page: &LoadedPage, target: &TournamentTarget) {
        let Some(dir) = &self.screenshot_dir else {
            return;
        };
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("Cannot create screenshot directory {}: {}", dir.display(), e);
            return;
        }

        let host = host_of(&page.final_url).unwrap_or_else(|| "page".to_string());
        let path = dir.join(format!("{}-{}.png", target.id, host.replace('.', "_")));
        match fetcher.screenshot(&path).await {
            Ok(()) => debug!("Saved screenshot of rejected page to {}", path.display()),
            Err(e) => warn!("Screenshot of {} failed: {}", page.final_url, e),
        }
    }
}

/// Folded visible text of a parsed document.
pub(crate) fn document_text(document: &Html) -> String {
    fold(&document.root_element().text().collect::<Vec<_>>().join(" "))
}

fn is_closed(text: &str) -> bool {
    CLOSED_MARKERS.iter().any(|m| text.contains(m))
}

/// Whether folded page text mentions the tournament's month and year.
fn mentions_date(text: &str, target: &TournamentTarget) -> bool {
    let month = target.month_name();
    !month.is_empty() && text.contains(month) && text.contains(&target.year().to_string())
}
