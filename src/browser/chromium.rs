//! Chrome DevTools backed sessions.

#[cfg(feature = "browser")]
use std::path::Path;
#[cfg(feature = "browser")]
use std::sync::Arc;
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tokio::sync::Mutex;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::error::CdpError;
#[cfg(feature = "browser")]
use chromiumoxide::page::ScreenshotParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

use super::{BrowserEngineConfig, BrowserLauncher, BrowserSession};
use crate::error::ResolveError;

/// Resolves once the document is interactive.
#[cfg(feature = "browser")]
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// Launches (or attaches to) one Chrome and opens a tab per worker.
pub struct ChromiumLauncher {
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    config: BrowserEngineConfig,
    #[cfg(feature = "browser")]
    browser: Mutex<Option<Arc<Browser>>>,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self {
            config,
            #[cfg(feature = "browser")]
            browser: Mutex::new(None),
        }
    }
}

#[cfg(feature = "browser")]
const EXECUTABLE_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

/// Install locations outside `PATH` (snap, macOS bundles).
#[cfg(feature = "browser")]
const BUNDLE_PATHS: &[&str] = &[
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// Flags every launched browser gets before the configured ones.
#[cfg(feature = "browser")]
const LAUNCH_FLAGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-sandbox",
    "--no-first-run",
    "--no-default-browser-check",
    "--mute-audio",
];

#[cfg(feature = "browser")]
impl ChromiumLauncher {
    /// Configured executable, then `PATH`, then bundle locations.
    fn locate_executable(&self) -> Result<std::path::PathBuf, ResolveError> {
        if let Some(ref configured) = self.config.executable {
            let path = std::path::PathBuf::from(configured);
            return if path.is_file() {
                Ok(path)
            } else {
                Err(ResolveError::Browser(format!(
                    "configured browser {} does not exist",
                    path.display()
                )))
            };
        }

        let in_path = std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths).find_map(|dir| {
                EXECUTABLE_NAMES
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|candidate| candidate.is_file())
            })
        });
        let found = in_path.or_else(|| {
            BUNDLE_PATHS
                .iter()
                .map(Path::new)
                .find(|p| p.is_file())
                .map(Path::to_path_buf)
        });

        match found {
            Some(path) => {
                debug!("Using browser executable {}", path.display());
                Ok(path)
            }
            None => Err(ResolveError::Browser(
                "no Chromium executable found; install one, set browser.executable or browser.remote_url"
                    .to_string(),
            )),
        }
    }

    async fn ensure_browser(&self) -> Result<Arc<Browser>, ResolveError> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(browser.clone());
        }

        let (browser, mut handler) = if let Some(remote_url) = self.config.remote_url.clone() {
            let ws_url = Self::remote_ws_url(&remote_url).await?;
            info!("Connecting to remote browser at {}", ws_url);
            Browser::connect(ws_url)
                .await
                .map_err(|e| ResolveError::Browser(format!("connect failed: {}", e)))?
        } else {
            let executable = self.locate_executable()?;
            info!(
                "Launching {} (headless={})",
                executable.display(),
                self.config.headless
            );
            let mut builder = BrowserConfig::builder()
                .chrome_executable(executable)
                .args(LAUNCH_FLAGS.iter().copied())
                .args(self.config.chrome_args.iter().map(String::as_str));
            if !self.config.headless {
                builder = builder.with_head();
            }
            if let Some(ref proxy) = self.config.proxy {
                builder = builder.arg(format!("--proxy-server={}", proxy));
            }
            let config = builder
                .build()
                .map_err(|e| ResolveError::Browser(format!("invalid browser config: {}", e)))?;
            Browser::launch(config)
                .await
                .map_err(|e| ResolveError::Browser(format!("launch failed: {}", e)))?
        };

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let browser = Arc::new(browser);
        *guard = Some(browser.clone());
        Ok(browser)
    }

    /// WebSocket debugger URL from the DevTools `/json/version` endpoint.
    async fn remote_ws_url(remote_url: &str) -> Result<String, ResolveError> {
        if remote_url.contains("/devtools/browser/") {
            return Ok(remote_url.to_string());
        }
        let http_url = remote_url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::get(&version_url)
            .await
            .map_err(|e| ResolveError::Browser(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| ResolveError::Browser(format!("bad version info: {}", e)))?;

        resp.get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ResolveError::Browser("no webSocketDebuggerUrl in response".into()))
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, ResolveError> {
        let browser = self.ensure_browser().await?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ResolveError::Browser(format!("cannot open tab: {}", e)))?;
        page.execute(SetUserAgentOverrideParams::new(
            self.config.user_agent.clone(),
        ))
        .await
        .map_err(|e| ResolveError::Browser(e.to_string()))?;
        Ok(Box::new(ChromiumSession {
            page,
            current_url: String::new(),
        }))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, ResolveError> {
        Err(ResolveError::Browser(
            "built without the `browser` feature".to_string(),
        ))
    }
}

/// One Chrome tab.
#[cfg(feature = "browser")]
pub struct ChromiumSession {
    page: Page,
    /// Last URL navigated to, for error context.
    current_url: String,
}

/// Map a DevTools failure on `url`.
///
/// Only a lost connection to the browser is fatal. Failures inside the page
/// (script exceptions, destroyed execution contexts, protocol error replies)
/// are navigation faults and go through retry like any other.
#[cfg(feature = "browser")]
fn cdp_error(url: &str, e: CdpError) -> ResolveError {
    match e {
        CdpError::Timeout => ResolveError::Timeout {
            url: url.to_string(),
            after: Duration::ZERO,
        },
        CdpError::Ws(_)
        | CdpError::ChannelSendError(_)
        | CdpError::LaunchExit(..)
        | CdpError::LaunchTimeout(..)
        | CdpError::LaunchIo(..) => ResolveError::Browser(format!("browser connection lost: {}", e)),
        CdpError::Io(_) => ResolveError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        },
        other => ResolveError::Navigation {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Map a Chrome `net::ERR_*` navigation error.
#[cfg(feature = "browser")]
fn navigation_error(url: &str, error_text: &str) -> ResolveError {
    const PERMANENT: &[&str] = &["ERR_NAME_NOT_RESOLVED", "ERR_INVALID_URL", "ERR_UNSAFE_PORT"];
    const CONNECTION: &[&str] = &[
        "ERR_CONNECTION_RESET",
        "ERR_CONNECTION_REFUSED",
        "ERR_CONNECTION_CLOSED",
        "ERR_TIMED_OUT",
    ];

    if PERMANENT.iter().any(|p| error_text.contains(p)) {
        ResolveError::InvalidUrl(format!("{} ({})", url, error_text))
    } else if CONNECTION.iter().any(|p| error_text.contains(p)) {
        ResolveError::Network {
            url: url.to_string(),
            reason: error_text.to_string(),
        }
    } else {
        ResolveError::Navigation {
            url: url.to_string(),
            reason: error_text.to_string(),
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String, ResolveError> {
        self.current_url = url.to_string();
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(ResolveError::InvalidUrl)?;

        let response = tokio::time::timeout(timeout, self.page.execute(nav_params))
            .await
            .map_err(|_| ResolveError::Timeout {
                url: url.to_string(),
                after: timeout,
            })?
            .map_err(|e| cdp_error(url, e))?;

        if let Some(error_text) = response.result.error_text.as_deref() {
            return Err(navigation_error(url, error_text));
        }

        match tokio::time::timeout(timeout, self.page.evaluate(WAIT_FOR_READY_SCRIPT.to_string())).await {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state for {}: {}", url, state);
            }
            Ok(Err(e)) => debug!("Could not check ready state of {}: {}", url, e),
            Err(_) => warn!("Timeout waiting for ready state of {}", url),
        }

        let final_url = self
            .page
            .url()
            .await
            .map_err(|e| cdp_error(url, e))?
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());
        Ok(final_url)
    }

    async fn content(&mut self) -> Result<String, ResolveError> {
        self.page
            .content()
            .await
            .map_err(|e| cdp_error(&self.current_url, e))
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, ResolveError> {
        let result = self
            .page
            .evaluate(script.to_string())
            .await
            .map_err(|e| cdp_error(&self.current_url, e))?;
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), ResolveError> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .map(|_| ())
            .map_err(|e| cdp_error(&self.current_url, e))
    }

    async fn close(&mut self) {
        if let Err(e) = self.page.clone().close().await {
            debug!("Closing tab failed: {}", e);
        }
    }
}

#[cfg(all(test, feature = "browser"))]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_are_transient() {
        assert!(navigation_error("https://club.fr", "net::ERR_CONNECTION_RESET").is_transient());
        assert!(navigation_error("https://club.fr", "net::ERR_ABORTED").is_transient());
    }

    #[test]
    fn page_level_failures_are_retried() {
        let destroyed = CdpError::ChromeMessage(
            "Execution context was destroyed, most likely because of a navigation".to_string(),
        );
        let err = cdp_error("https://club.fr/inscription", destroyed);
        assert!(matches!(err, ResolveError::Navigation { .. }));
        assert!(err.is_transient());

        assert!(cdp_error("https://club.fr", CdpError::NoResponse).is_transient());
        assert!(cdp_error("https://club.fr", CdpError::NotFound).is_transient());
        assert!(matches!(
            cdp_error("https://club.fr", CdpError::Timeout),
            ResolveError::Timeout { .. }
        ));
    }

    #[test]
    fn io_failures_are_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = cdp_error("https://club.fr", CdpError::Io(io));
        assert!(!err.is_fatal());
    }

    #[test]
    fn unresolvable_hosts_are_structural() {
        let err = navigation_error("https://nope.invalid", "net::ERR_NAME_NOT_RESOLVED");
        assert_eq!(err.kind(), crate::error::ErrorKind::Structural);
    }
}
