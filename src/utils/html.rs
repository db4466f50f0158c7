//! HTML querying helpers over `scraper`.

use scraper::{ElementRef, Selector};

use crate::error::ResolveError;

/// Parse a CSS selector, reporting invalid ones as errors.
pub fn selector(css: &str) -> Result<Selector, ResolveError> {
    Selector::parse(css)
        .map_err(|e| ResolveError::Other(anyhow::anyhow!("invalid selector {}: {:?}", css, e)))
}

/// Whitespace-normalized text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
