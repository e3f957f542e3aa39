// src/config.rs
// =============================================================================
// Crawl configuration.
//
// Values come from three layers, later ones winning:
// 1. Defaults (CrawlConfig::default)
// 2. An optional JSON input file with camelCase keys
// 3. Command-line flags (applied in main.rs)
//
// validate() runs before anything touches the network. An invalid base URL or
// a zero limit stops the run right there.
// =============================================================================

use crate::crawl::FrontierPolicy;
use crate::error::ConfigError;
use crate::report::ReportStyles;
use crate::url_norm::normalize_page;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MAX_PAGES: usize = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_REQUEST_RETRIES: u32 = 3;
pub const DEFAULT_CHECKPOINT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Proxy settings, passed through to the page fetcher untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyConfig {
    /// Proxy URLs used in rotation, one per request
    pub proxy_urls: Vec<String>,
}

/// Every option the auditor recognizes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlConfig {
    /// Page the crawl starts from; required
    pub base_url: String,
    /// Cap on distinct requests started
    pub max_pages: usize,
    /// Pages fetched in parallel
    pub max_concurrency: usize,
    /// Treat every host under the base's registrable domain as in scope
    pub crawl_subdomains: bool,
    /// Persist reduced records (no link and anchor lists)
    pub save_only_broken_links: bool,
    /// Where to send the broken links notification; empty disables it
    pub notification_emails: Vec<String>,
    pub proxy_config: ProxyConfig,
    pub navigation_timeout_secs: u64,
    /// Retries per request when crawling a single site
    pub max_request_retries: u32,
    /// Retries per request in subdomain mode
    pub max_request_retries_subdomains: u32,
    pub checkpoint_interval_secs: u64,
    /// Continue from the checkpoint of an interrupted crawl of the same site
    pub resume: bool,
    pub output_dir: PathBuf,
    /// HTTP endpoint accepting the email payload as JSON
    pub mailer_endpoint: Option<String>,
    pub styles: ReportStyles,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            max_pages: DEFAULT_MAX_PAGES,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            crawl_subdomains: false,
            save_only_broken_links: false,
            notification_emails: Vec::new(),
            proxy_config: ProxyConfig::default(),
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            max_request_retries: DEFAULT_MAX_REQUEST_RETRIES,
            max_request_retries_subdomains: DEFAULT_MAX_REQUEST_RETRIES,
            checkpoint_interval_secs: DEFAULT_CHECKPOINT_INTERVAL_SECS,
            resume: false,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            mailer_endpoint: None,
            styles: ReportStyles::default(),
        }
    }
}

impl CrawlConfig {
    /// Loads a JSON input file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Checks every option and returns the normalized base URL.
    pub fn validate(&self) -> Result<String, ConfigError> {
        let base_url = self.normalized_base_url()?;

        for (field, value) in [
            ("maxPages", self.max_pages as u64),
            ("maxConcurrency", self.max_concurrency as u64),
            ("navigationTimeoutSecs", self.navigation_timeout_secs),
            ("checkpointIntervalSecs", self.checkpoint_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive { field });
            }
        }

        for email in &self.notification_emails {
            let valid = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.trim().is_empty() && !domain.trim().is_empty());
            if !valid {
                return Err(ConfigError::InvalidEmail(email.clone()));
            }
        }

        for url in &self.proxy_config.proxy_urls {
            reqwest::Proxy::all(url).map_err(|e| ConfigError::InvalidProxy {
                url: url.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(base_url)
    }

    pub fn normalized_base_url(&self) -> Result<String, ConfigError> {
        normalize_page(&self.base_url).ok_or_else(|| ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }

    pub fn frontier_policy(&self) -> FrontierPolicy {
        FrontierPolicy {
            crawl_subdomains: self.crawl_subdomains,
            max_retries: self.max_request_retries,
            max_retries_subdomains: self.max_request_retries_subdomains,
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }
}
