//! Validation and resolution results.

use std::fmt;

/// Evidence gathered while classifying a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfidenceSignals {
    pub form_present: bool,
    pub name_match: bool,
    pub date_match: bool,
    pub platform_known: bool,
}

/// Verdict on a single URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub matched: bool,
    pub signals: ConfidenceSignals,
    /// Final URL after redirects.
    pub resolved_url: String,
}

impl ValidationOutcome {
    pub fn accepted(resolved_url: impl Into<String>, signals: ConfidenceSignals) -> Self {
        Self {
            matched: true,
            signals,
            resolved_url: resolved_url.into(),
        }
    }

    pub fn rejected(resolved_url: impl Into<String>, signals: ConfidenceSignals) -> Self {
        Self {
            matched: false,
            signals,
            resolved_url: resolved_url.into(),
        }
    }
}

/// Terminal result of one tournament's pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Found(String),
    NotFound,
    Error(String),
}

impl ResolutionOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Found(url) => Some(url),
            _ => None,
        }
    }
}

impl fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(url) => write!(f, "found {}", url),
            Self::NotFound => f.write_str("not found"),
            Self::Error(cause) => write!(f, "error: {}", cause),
        }
    }
}
