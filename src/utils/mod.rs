//! Shared utility functions.
//!
//! - `html`: selector parsing and element text
//! - `url`: normalization, parsing and link resolution
//! - `text`: month names and tournament-name matching

mod html;
mod text;
mod url;

pub use self::html::{element_text, selector};
pub use self::text::{contains_any, fold, french_month, mentions_name, name_tokens};
pub use self::url::{
    ensure_scheme, host_of, normalize_url, parse_candidate, resolve_link, site_root,
    subdomain_labels,
};
