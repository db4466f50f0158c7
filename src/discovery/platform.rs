//! Candidates from signup-platform search.

use tracing::{debug, info, warn};

use crate::browser::PageFetcher;
use crate::error::ResolveError;
use crate::models::{CandidateSet, CandidateUrl, OriginSignal, TournamentTarget};
use crate::platform::PlatformSearch;

/// Search strategies for a tournament, most specific first.
pub fn search_queries(target: &TournamentTarget) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    let mut push = |q: String| {
        let q = q.split_whitespace().collect::<Vec<_>>().join(" ");
        if !q.is_empty() && !queries.contains(&q) {
            queries.push(q);
        }
    };

    push(target.name.to_lowercase());
    for place in [Some(target.club.as_str()), target.city.as_deref()]
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
    {
        push(format!("tournoi tennis de table {}", place));
        push(format!("tournoi TT {}", place));
    }
    queries
}

/// Query the platform strategy by strategy and keep the first non-empty
/// result set. Failed strategies are skipped; only fatal errors propagate.
pub async fn candidates_from_platform(
    search: &dyn PlatformSearch,
    fetcher: &PageFetcher,
    target: &TournamentTarget,
) -> Result<Vec<CandidateUrl>, ResolveError> {
    let retry = fetcher.retry_policy();

    for query in search_queries(target) {
        let what = format!("{} search {:?}", search.name(), query);
        match retry.run(&what, |_| search.search(fetcher, &query)).await {
            Ok(hits) if hits.is_empty() => {
                debug!("{}: no results for {:?}", target.label(), query);
            }
            Ok(hits) => {
                info!(
                    "{}: {} result(s) on {} for {:?}",
                    target.label(),
                    hits.len(),
                    search.name(),
                    query
                );
                let mut set = CandidateSet::new();
                set.extend(
                    hits.into_iter()
                        .map(|hit| CandidateUrl::new(hit.url, OriginSignal::PlatformSearch)),
                );
                return Ok(set.into_vec());
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("{}: search {:?} failed: {}", target.label(), query, e);
            }
        }
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_target;
    use crate::testing::{FakeSearch, FakeWeb};

    #[test]
    fn queries_follow_strategy_order() {
        assert_eq!(
            search_queries(&sample_target()),
            vec![
                "tournoi national de mondeville",
                "tournoi tennis de table ASPTT Caen",
                "tournoi TT ASPTT Caen",
                "tournoi tennis de table Mondeville",
                "tournoi TT Mondeville",
            ]
        );
    }

    #[test]
    fn blank_club_and_city_are_skipped() {
        let mut target = sample_target();
        target.club = "  ".into();
        target.city = None;
        assert_eq!(search_queries(&target), vec!["tournoi national de mondeville"]);
    }

    #[tokio::test]
    async fn stops_at_first_non_empty_strategy() {
        let search = FakeSearch::default()
            .with_hit("tournoi TT ASPTT Caen", "https://www.helloasso.com/e/1")
            .with_hit("tournoi TT ASPTT Caen", "https://helloasso.com/e/1/")
            .with_hit("tournoi TT Mondeville", "https://www.helloasso.com/e/2");
        let web = FakeWeb::new();

        let candidates = candidates_from_platform(&search, &web.fetcher(), &sample_target())
            .await
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].origin, OriginSignal::PlatformSearch);
        assert_eq!(search.queries().len(), 3);
    }

    #[tokio::test]
    async fn no_results_anywhere_is_empty() {
        let search = FakeSearch::default();
        let candidates = candidates_from_platform(&search, &FakeWeb::new().fetcher(), &sample_target())
            .await
            .unwrap();
        assert!(candidates.is_empty());
        assert_eq!(search.queries().len(), 5);
    }
}
