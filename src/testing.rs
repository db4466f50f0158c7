//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::browser::{BrowserLauncher, BrowserSession, PageFetcher};
use crate::error::ResolveError;
use crate::platform::{PlatformSearch, SearchHit};
use crate::retry::RetryPolicy;
use crate::utils::normalize_url;

#[derive(Default)]
struct WebState {
    /// Normalized URL -> (canonical URL, HTML).
    pages: HashMap<String, (String, String)>,
    redirects: HashMap<String, String>,
    /// Transient failures left per normalized URL.
    failures: HashMap<String, u32>,
    evaluate_result: Value,
    visits: Vec<String>,
    screenshots: Vec<PathBuf>,
    sessions_opened: usize,
}

/// A scripted web shared by every session opened on it.
#[derive(Clone, Default)]
pub(crate) struct FakeWeb {
    state: Arc<Mutex<WebState>>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, html: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(normalize_url(url), (url.to_string(), html.to_string()));
        self
    }

    pub fn redirect(&self, from: &str, to: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .redirects
            .insert(normalize_url(from), to.to_string());
        self
    }

    /// Fail the next `times` navigations to `url` with a network error.
    pub fn failing(&self, url: &str, times: u32) -> &Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(normalize_url(url), times);
        self
    }

    pub fn evaluate_result(&self, value: Value) -> &Self {
        self.state.lock().unwrap().evaluate_result = value;
        self
    }

    pub fn session(&self) -> Box<dyn BrowserSession> {
        self.state.lock().unwrap().sessions_opened += 1;
        Box::new(FakeSession {
            web: self.clone(),
            current: None,
        })
    }

    /// Fetcher with three attempts and no backoff delay.
    pub fn fetcher(&self) -> PageFetcher {
        PageFetcher::new(
            self.session(),
            RetryPolicy::new(3, Duration::ZERO),
            Duration::from_secs(30),
        )
    }

    /// Every navigation attempt, in order.
    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    /// Distinct normalized URLs navigated to.
    pub fn unique_visits(&self) -> usize {
        let mut seen: Vec<String> = self.visits().iter().map(|u| normalize_url(u)).collect();
        seen.sort();
        seen.dedup();
        seen.len()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().unwrap().sessions_opened
    }
}

struct FakeSession {
    web: FakeWeb,
    current: Option<String>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<String, ResolveError> {
        let mut state = self.web.state.lock().unwrap();
        state.visits.push(url.to_string());

        let mut key = normalize_url(url);
        if let Some(left) = state.failures.get_mut(&key) {
            if *left > 0 {
                *left -= 1;
                return Err(ResolveError::Network {
                    url: url.to_string(),
                    reason: "net::ERR_CONNECTION_RESET".to_string(),
                });
            }
        }
        if let Some(to) = state.redirects.get(&key) {
            key = normalize_url(to);
        }
        match state.pages.get(&key) {
            Some((canonical, _)) => {
                let canonical = canonical.clone();
                self.current = Some(key);
                Ok(canonical)
            }
            None => Err(ResolveError::InvalidUrl(format!(
                "net::ERR_NAME_NOT_RESOLVED at {}",
                url
            ))),
        }
    }

    async fn content(&mut self) -> Result<String, ResolveError> {
        let state = self.web.state.lock().unwrap();
        Ok(self
            .current
            .as_ref()
            .and_then(|key| state.pages.get(key))
            .map(|(_, html)| html.clone())
            .unwrap_or_default())
    }

    async fn evaluate(&mut self, _script: &str) -> Result<Value, ResolveError> {
        Ok(self.web.state.lock().unwrap().evaluate_result.clone())
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), ResolveError> {
        self.web
            .state
            .lock()
            .unwrap()
            .screenshots
            .push(path.to_path_buf());
        Ok(())
    }
}

#[async_trait]
impl BrowserLauncher for FakeWeb {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, ResolveError> {
        Ok(self.session())
    }
}

/// Platform search answering from a fixed table of queries.
#[derive(Default)]
pub(crate) struct FakeSearch {
    pub results: HashMap<String, Vec<SearchHit>>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn with_hit(mut self, query: &str, url: &str) -> Self {
        self.results.entry(query.to_string()).or_default().push(SearchHit {
            title: query.to_string(),
            url: url.to_string(),
            date: None,
            location: None,
        });
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformSearch for FakeSearch {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(
        &self,
        _fetcher: &PageFetcher,
        query: &str,
    ) -> Result<Vec<SearchHit>, ResolveError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}
