// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// Two subcommands:
// - crawl:  crawl a site, build the link graph, write reports, notify
// - report: rebuild the reports from a saved dataset without crawling
//
// Every crawl flag is optional and overrides the matching key of the JSON
// input file (--input), which in turn overrides the defaults.
// =============================================================================

use crate::config::CrawlConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "link-auditor",
    version,
    about = "Crawl a website and report broken links and missing URL fragments",
    long_about = "link-auditor crawls a website (optionally its subdomains), rebuilds the link graph \
                  from the crawled pages and classifies every link as OK, broken, not crawled or \
                  pointing at a missing fragment."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a website and report its links
    ///
    /// Example: link-auditor crawl https://example.com --max-pages 500
    Crawl(CrawlArgs),

    /// Rebuild the reports from a dataset or checkpoint file
    ///
    /// Example: link-auditor report output/dataset.json https://example.com
    Report {
        /// Page records, as written to dataset.json or state/records.json
        dataset: PathBuf,

        /// Base URL the crawl started from
        base_url: String,

        /// Where OUTPUT.json and OUTPUT.html are written
        #[arg(long, default_value = crate::config::DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Only print broken links
        #[arg(long)]
        broken_only: bool,

        /// Print the results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// URL the crawl starts from (may also come from --input)
    pub base_url: Option<String>,

    /// JSON input file with crawl options (camelCase keys)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Maximum number of pages to crawl
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Maximum number of pages fetched in parallel
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Also crawl subdomains of the base URL's domain
    #[arg(long)]
    pub crawl_subdomains: bool,

    /// Persist only the reduced record fields
    #[arg(long)]
    pub save_only_broken_links: bool,

    /// Send the broken links report to this address (repeatable)
    #[arg(long = "notification-email", value_name = "ADDRESS")]
    pub notification_emails: Vec<String>,

    /// Proxy URL for page requests (repeatable, used in rotation)
    #[arg(long = "proxy-url", value_name = "URL")]
    pub proxy_urls: Vec<String>,

    /// Per page navigation timeout in seconds
    #[arg(long)]
    pub navigation_timeout: Option<u64>,

    /// Where reports, dataset and checkpoint are written
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// HTTP endpoint that delivers the notification email
    #[arg(long)]
    pub mailer_endpoint: Option<String>,

    /// Continue an interrupted crawl of the same site from its checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Print the results as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl CrawlArgs {
    /// Applies the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut CrawlConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.max_concurrency = max_concurrency;
        }
        if self.crawl_subdomains {
            config.crawl_subdomains = true;
        }
        if self.save_only_broken_links {
            config.save_only_broken_links = true;
        }
        if !self.notification_emails.is_empty() {
            config.notification_emails = self.notification_emails.clone();
        }
        if !self.proxy_urls.is_empty() {
            config.proxy_config.proxy_urls = self.proxy_urls.clone();
        }
        if let Some(timeout) = self.navigation_timeout {
            config.navigation_timeout_secs = timeout;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(endpoint) = &self.mailer_endpoint {
            config.mailer_endpoint = Some(endpoint.clone());
        }
        if self.resume {
            config.resume = true;
        }
    }
}
