//! Browser automation seam.
//!
//! The engine only talks to [`BrowserSession`]; each worker owns one session
//! wrapped in a [`PageFetcher`], which adds per-call timeouts and retries.

mod chromium;
mod config;

pub use chromium::ChromiumLauncher;
pub use config::BrowserEngineConfig;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ResolveError;
use crate::retry::RetryPolicy;

/// Extra time granted on top of the navigation timeout before the fetcher
/// gives up on a session that ignores it.
const NAVIGATION_GRACE: Duration = Duration::from_secs(5);

/// One independent browser tab.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate and return the final URL after redirects.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String, ResolveError>;

    /// HTML of the current page.
    async fn content(&mut self) -> Result<String, ResolveError>;

    /// Evaluate a script in the current page.
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, ResolveError>;

    async fn screenshot(&mut self, path: &Path) -> Result<(), ResolveError>;

    async fn close(&mut self) {}
}

/// Opens browser sessions, one per worker.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, ResolveError>;
}

/// A page loaded by the browser.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub requested_url: String,
    pub final_url: String,
    pub html: String,
}

/// A worker's browser session with timeout and retry applied to every load.
pub struct PageFetcher {
    session: Mutex<Box<dyn BrowserSession>>,
    retry: RetryPolicy,
    timeout: Duration,
    navigations: AtomicUsize,
}

impl PageFetcher {
    pub fn new(session: Box<dyn BrowserSession>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            session: Mutex::new(session),
            retry,
            timeout,
            navigations: AtomicUsize::new(0),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Number of navigations issued so far, retries included.
    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::Relaxed)
    }

    /// Load a page, retrying transient failures.
    pub async fn load(&self, url: &str) -> Result<LoadedPage, ResolveError> {
        self.retry.run(url, |_| self.load_once(url)).await
    }

    /// Load a page with a single attempt.
    pub async fn load_once(&self, url: &str) -> Result<LoadedPage, ResolveError> {
        let mut session = self.session.lock().await;
        self.navigations.fetch_add(1, Ordering::Relaxed);
        debug!("Navigating to {}", url);

        let final_url = tokio::time::timeout(
            self.timeout + NAVIGATION_GRACE,
            session.navigate(url, self.timeout),
        )
        .await
        .map_err(|_| ResolveError::Timeout {
            url: url.to_string(),
            after: self.timeout,
        })??;

        let html = session.content().await?;
        Ok(LoadedPage {
            requested_url: url.to_string(),
            final_url,
            html,
        })
    }

    /// Evaluate a script on the page loaded last.
    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ResolveError> {
        self.session.lock().await.evaluate(script).await
    }

    pub async fn screenshot(&self, path: &Path) -> Result<(), ResolveError> {
        self.session.lock().await.screenshot(path).await
    }

    pub async fn close(self) {
        let mut session = self.session.into_inner();
        session.close().await;
    }
}
