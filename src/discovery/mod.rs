//! Candidate discovery.
//!
//! Two sources feed the candidate list of a tournament:
//! - the rules document, scanned for URL-shaped text
//! - signup-platform search, driven through the worker's browser

mod platform;
mod text;

pub use platform::{candidates_from_platform, search_queries};
pub use text::{candidates_from_text, extract_urls};
