//! Configuration loading.
//!
//! The config file is discovered with `prefer` (`tournoi-signup.toml`,
//! `tournoi-signup.json`, ... in the usual config locations). Every field has
//! a default, so running without a file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::BrowserEngineConfig;
use crate::platform::helloasso;
use crate::retry::RetryPolicy;
use crate::services::{OrchestratorConfig, ResolverLimits};
use crate::skip_list::SkipListConfig;

/// Application name used for config discovery and the data directory.
pub const APP_NAME: &str = "tournoi-signup";

/// Platform search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the HelloAsso site.
    #[serde(default = "default_platform_base_url")]
    pub base_url: String,

    /// Maximum search results considered per query.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_platform_base_url() -> String {
    helloasso::DEFAULT_BASE_URL.to_string()
}

fn default_max_results() -> usize {
    10
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_platform_base_url(),
            max_results: default_max_results(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON file holding the tournaments.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Concurrent browser sessions.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How many link levels the crawler follows below a seed page.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Links tried per crawled page.
    #[serde(default = "default_max_candidates_per_level")]
    pub max_candidates_per_level: usize,

    /// Sites crawled per tournament once direct candidates fail.
    #[serde(default = "default_max_crawl_seeds")]
    pub max_crawl_seeds: usize,

    /// Per-navigation timeout in seconds.
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Where screenshots of rejected platform pages go. Unset disables them.
    #[serde(default)]
    pub screenshot_dir: Option<String>,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub skip_list: SkipListConfig,

    #[serde(default)]
    pub platform: PlatformConfig,

    #[serde(default)]
    pub browser: BrowserEngineConfig,

    /// File this configuration was read from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_store_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("tournaments.json")
        .display()
        .to_string()
}

fn default_workers() -> usize {
    3
}

fn default_max_depth() -> usize {
    3
}

fn default_max_candidates_per_level() -> usize {
    10
}

fn default_max_crawl_seeds() -> usize {
    3
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            workers: default_workers(),
            max_depth: default_max_depth(),
            max_candidates_per_level: default_max_candidates_per_level(),
            max_crawl_seeds: default_max_crawl_seeds(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            screenshot_dir: None,
            retry: RetryPolicy::default(),
            skip_list: SkipListConfig::default(),
            platform: PlatformConfig::default(),
            browser: BrowserEngineConfig::default(),
            source_path: None,
        }
    }
}

impl Config {
    /// Discover and load the config file, falling back to defaults.
    pub async fn load() -> Self {
        match prefer::load(APP_NAME).await {
            Ok(discovered) => match discovered.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring config {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(e) => {
                debug!("No config file found: {}", e);
                Self::default()
            }
        }
    }

    /// Load from an explicit file; TOML by extension, JSON otherwise.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Expand `~` and anchor relative paths at `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve_path(&self.store_path, &self.base_dir())
    }

    pub fn screenshot_dir(&self) -> Option<PathBuf> {
        self.screenshot_dir
            .as_deref()
            .map(|dir| self.resolve_path(dir, &self.base_dir()))
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn resolver_limits(&self) -> ResolverLimits {
        ResolverLimits {
            max_depth: self.max_depth,
            max_candidates_per_level: self.max_candidates_per_level,
            max_crawl_seeds: self.max_crawl_seeds,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            workers: self.workers,
            navigation_timeout: self.navigation_timeout(),
            retry: self.retry.clone(),
        }
    }
}
