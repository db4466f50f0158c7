//! Heuristic classification of pages outside known platforms.

use scraper::Html;

use super::{document_text, is_closed, mentions_date};
use crate::browser::LoadedPage;
use crate::error::ResolveError;
use crate::models::{ConfidenceSignals, TournamentTarget, ValidationOutcome};
use crate::utils::{contains_any, mentions_name, selector};

const REGISTRATION_KEYWORDS: &[&str] = &[
    "inscription",
    "inscrire",
    "formulaire",
    "participer",
    "participation",
    "engagement",
    "enregistrement",
    "register",
    "registration",
    "sign up",
];

const URL_REGISTRATION_KEYWORDS: &[&str] =
    &["inscription", "register", "registration", "signup", "sign-up", "enroll"];

const ACCOUNT_PHRASES: &[&str] = &[
    "créer un compte",
    "creer un compte",
    "créer mon compte",
    "création de compte",
    "create an account",
];

const NEXT_STEP_PHRASES: &[&str] = &[
    "étape suivante",
    "etape suivante",
    "suivant",
    "continuer",
    "next step",
];

/// Fields that make a page look like a form even without a `<form>` element.
const MIN_FORM_FIELDS: usize = 3;

/// Draw-table links that make a page a registration portal.
const MIN_TABLEAU_LINKS: usize = 5;

/// Classify a page by structure and content.
///
/// Accepted when the page is form-like and mentions the tournament together
/// with registration wording or its month and year. Multi-step wizards are
/// caught by account-creation or next-step phrasing plus a name or date
/// mention. A draw-table portal with a name or date mention is accepted
/// without a form.
pub fn classify_page(
    page: &LoadedPage,
    target: &TournamentTarget,
) -> Result<ValidationOutcome, ResolveError> {
    let document = Html::parse_document(&page.html);
    let text = document_text(&document);
    let url = page.final_url.to_lowercase();

    let forms = document.select(&selector("form")?).count();
    let fields = document
        .select(&selector("input, select, textarea")?)
        .filter(|field| {
            !field
                .value()
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
        })
        .count();

    let signals = ConfidenceSignals {
        form_present: forms > 0 || fields >= MIN_FORM_FIELDS,
        name_match: mentions_name(&text, &target.name),
        date_match: mentions_date(&text, target),
        platform_known: false,
    };

    if is_closed(&text) {
        return Ok(ValidationOutcome::rejected(&page.final_url, signals));
    }

    let registration =
        contains_any(&text, REGISTRATION_KEYWORDS) || contains_any(&url, URL_REGISTRATION_KEYWORDS);
    let wizard = contains_any(&text, ACCOUNT_PHRASES) || contains_any(&text, NEXT_STEP_PHRASES);
    let identified = signals.name_match || signals.date_match;

    let form_match = signals.form_present
        && ((signals.name_match && (registration || signals.date_match)) || (wizard && identified));
    let portal = identified && tableau_links(&document)? >= MIN_TABLEAU_LINKS;

    let outcome = if form_match || portal {
        ValidationOutcome::accepted(&page.final_url, signals)
    } else {
        ValidationOutcome::rejected(&page.final_url, signals)
    };
    Ok(outcome)
}

fn tableau_links(document: &Html) -> Result<usize, ResolveError> {
    Ok(document
        .select(&selector("a[href]")?)
        .filter(|a| {
            let href = a.value().attr("href").unwrap_or_default().to_lowercase();
            let text = a.text().collect::<String>().to_lowercase();
            href.contains("tableau") || text.contains("tableau")
        })
        .count())
}
