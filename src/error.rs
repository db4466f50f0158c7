//! Resolution errors.
//!
//! Every failure carries its [`ErrorKind`] from the point where it is produced,
//! so retry and candidate handling branch on the variant instead of on text.

use std::time::Duration;

use thiserror::Error;

/// How a failure should be handled by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth retrying (timeouts, dropped connections, navigation faults).
    Transient,
    /// The candidate itself is unusable; move on without retrying.
    Structural,
    /// The operation cannot continue.
    Fatal,
}

/// Errors raised while resolving signup URLs.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("timed out after {after:?} loading {url}")]
    Timeout { url: String, after: Duration },

    #[error("network failure on {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("URL is skip-listed: {0}")]
    Skipped(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("page does not match: {0}")]
    Mismatch(String),

    #[error("document unreadable: {0}")]
    Document(String),

    #[error("browser failure: {0}")]
    Browser(String),

    #[error("store failure: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResolveError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } | Self::Network { .. } | Self::Navigation { .. } => {
                ErrorKind::Transient
            }
            Self::Skipped(_) | Self::InvalidUrl(_) | Self::Mismatch(_) | Self::Document(_) => {
                ErrorKind::Structural
            }
            Self::Browser(_) | Self::Store(_) | Self::Io(_) | Self::Other(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

impl From<url::ParseError> for ResolveError {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl(e.to_string())
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        if e.is_timeout() {
            Self::Timeout {
                url,
                after: Duration::ZERO,
            }
        } else if e.is_connect() || e.is_request() {
            Self::Network {
                url,
                reason: e.to_string(),
            }
        } else {
            Self::Document(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_faults_are_transient() {
        let err = ResolveError::Navigation {
            url: "https://club.fr".into(),
            reason: "net::ERR_CONNECTION_RESET".into(),
        };
        assert!(err.is_transient());
        assert_eq!(
            ResolveError::Timeout {
                url: "https://club.fr".into(),
                after: Duration::from_secs(30)
            }
            .kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn candidate_problems_are_structural() {
        assert_eq!(
            ResolveError::Skipped("https://facebook.com".into()).kind(),
            ErrorKind::Structural
        );
        let parse_err: ResolveError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(parse_err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn infrastructure_failures_are_fatal() {
        assert!(ResolveError::Browser("closed".into()).is_fatal());
        assert!(ResolveError::from(anyhow::anyhow!("boom")).is_fatal());
    }
}
