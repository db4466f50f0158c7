//! Known signup platforms: container present and registration open.

use scraper::Html;
use tracing::debug;

use super::{document_text, is_closed, mentions_date};
use crate::browser::{LoadedPage, PageFetcher};
use crate::error::ResolveError;
use crate::models::{ConfidenceSignals, TournamentTarget, ValidationOutcome};
use crate::platform::PlatformRules;
use crate::utils::{fold, host_of, mentions_name, selector};

/// Classify a page requested on a signup platform.
///
/// Name and date mentions are recorded but not required: an open form on the
/// platform is a registration page by construction.
pub(super) async fn classify(
    fetcher: &PageFetcher,
    page: &LoadedPage,
    rules: &PlatformRules,
    target: &TournamentTarget,
) -> Result<ValidationOutcome, ResolveError> {
    let mut signals = ConfidenceSignals {
        platform_known: true,
        ..Default::default()
    };

    let final_host = host_of(&page.final_url).unwrap_or_default();
    if !rules.matches_host(&final_host) {
        debug!(
            "{} left {} for {}",
            page.requested_url, rules.name, page.final_url
        );
        return Ok(ValidationOutcome::rejected(&page.final_url, signals));
    }

    let html = page.html.to_lowercase();
    signals.form_present = rules.container_markers.iter().any(|m| html.contains(m));

    // Parsed documents are not Send; keep them out of any await.
    let (text, closed_in_html) = {
        let document = Html::parse_document(&page.html);
        let closed = document
            .select(&selector(rules.closed_selectors)?)
            .next()
            .is_some();
        (document_text(&document), closed)
    };
    signals.name_match = mentions_name(&text, &target.name) || {
        let club = fold(&target.club);
        !club.is_empty() && text.contains(&club)
    };
    signals.date_match = mentions_date(&text, target);

    let closed = closed_in_dom(fetcher, rules)
        .await?
        .unwrap_or(closed_in_html)
        || is_closed(&text);
    if closed {
        debug!("{}: registration closed on {}", target.label(), page.final_url);
    }

    let outcome = if signals.form_present && !closed {
        ValidationOutcome::accepted(&page.final_url, signals)
    } else {
        ValidationOutcome::rejected(&page.final_url, signals)
    };
    Ok(outcome)
}

/// Ask the live DOM for closed markers. `None` when the browser cannot answer.
async fn closed_in_dom(
    fetcher: &PageFetcher,
    rules: &PlatformRules,
) -> Result<Option<bool>, ResolveError> {
    let script = format!(
        "document.querySelectorAll('{}').length",
        rules.closed_selectors
    );
    match fetcher.evaluate(&script).await {
        Ok(value) => Ok(value.as_u64().map(|count| count > 0)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("Closed-marker check fell back to HTML: {}", e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::sample_target;
    use crate::skip_list::SkipList;
    use crate::testing::FakeWeb;
    use crate::validation::FormValidator;
    use std::sync::Arc;

    const EVENT_URL: &str = "https://www.helloasso.com/associations/asptt-caen/evenements/tournoi-2025";

    fn validator() -> FormValidator {
        FormValidator::new(Arc::new(SkipList::default()))
    }

    #[tokio::test]
    async fn container_and_french_month_are_enough() {
        let web = FakeWeb::new();
        web.page(
            EVENT_URL,
            r#"<html><body><div class="form-container">
                <h2>Billetterie ASPTT</h2><p>Samedi 15 mars 2025</p>
               </div></body></html>"#,
        );
        let mut target = sample_target();
        target.name = "Grand Prix Printanier".into();
        target.club = "Club Inconnu".into();

        let outcome = validator()
            .validate(&web.fetcher(), EVENT_URL, &target)
            .await
            .unwrap();
        assert!(outcome.matched);
        assert!(outcome.signals.platform_known);
        assert!(outcome.signals.date_match);
        assert!(!outcome.signals.name_match);
    }

    #[tokio::test]
    async fn closed_marker_rejects() {
        let web = FakeWeb::new();
        web.page(
            EVENT_URL,
            r#"<div class="form-container"><div class="registration-closed">Terminé</div></div>"#,
        );
        let outcome = validator()
            .validate(&web.fetcher(), EVENT_URL, &sample_target())
            .await
            .unwrap();
        assert!(!outcome.matched);
        assert!(outcome.signals.form_present);
    }

    #[tokio::test]
    async fn live_dom_answer_takes_precedence() {
        let web = FakeWeb::new();
        web.page(EVENT_URL, r#"<div class="checkout-container">Tournoi</div>"#);
        web.evaluate_result(serde_json::json!(1));
        let outcome = validator()
            .validate(&web.fetcher(), EVENT_URL, &sample_target())
            .await
            .unwrap();
        assert!(!outcome.matched);
    }

    #[tokio::test]
    async fn closed_text_rejects() {
        let web = FakeWeb::new();
        web.page(
            EVENT_URL,
            r#"<div class="form-container"><p>Inscriptions fermées</p></div>"#,
        );
        let outcome = validator()
            .validate(&web.fetcher(), EVENT_URL, &sample_target())
            .await
            .unwrap();
        assert!(!outcome.matched);
    }

    #[tokio::test]
    async fn redirect_off_platform_rejects() {
        let web = FakeWeb::new();
        web.page(
            "https://asptt-caen-tt.fr/",
            r#"<div class="form-container">Tournoi National de Mondeville</div>"#,
        );
        web.redirect(EVENT_URL, "https://asptt-caen-tt.fr/");
        let outcome = validator()
            .validate(&web.fetcher(), EVENT_URL, &sample_target())
            .await
            .unwrap();
        assert!(!outcome.matched);
        assert_eq!(outcome.resolved_url, "https://asptt-caen-tt.fr/");
    }
}
