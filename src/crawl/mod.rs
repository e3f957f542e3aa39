// src/crawl/mod.rs
// =============================================================================
// Crawl orchestration.
//
// Features:
// - Breadth-first dispatch from the base URL through a deduplicating Frontier
// - Up to `max_concurrency` page loads in flight, each under a navigation timeout
// - A hard cap on distinct requests; partial coverage is a normal outcome
// - Retries with a per-mode budget, then a terminal failure record
// - Periodic checkpoints of the record store, and resume from one when asked
//
// The crawl loop owns the frontier. Records go into the shared RecordStore,
// which the graph builder reads once the loop has quiesced.
// =============================================================================

mod fetcher;
mod frontier;
mod store;

pub use fetcher::PageFetcher;
pub use frontier::{CrawlRequest, Frontier, FrontierPolicy};
pub use store::RecordStore;

#[cfg(test)]
pub use fetcher::fake;

use crate::config::CrawlConfig;
use crate::error::{FetchError, StoreError};
use crate::record::{PageObservation, PageRecord};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where and how often the record store is snapshotted.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub path: PathBuf,
    pub interval: Duration,
}

/// Counters for one crawl run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_crawled: usize,
    pub pages_failed: usize,
    pub retries: usize,
    pub links_enqueued: usize,
    /// Requests left behind because the page cap was hit
    pub requests_skipped: usize,
    pub duration: Duration,
}

pub struct Crawler {
    base_url: String,
    policy: FrontierPolicy,
    fetcher: Arc<dyn PageFetcher>,
    store: RecordStore,
    max_pages: usize,
    max_concurrency: usize,
    navigation_timeout: Duration,
    checkpoint: Option<Checkpoint>,
}

type Attempt = (CrawlRequest, Result<PageObservation, FetchError>);

impl Crawler {
    /// `base_url` is fetched as given. Records are keyed by its normalized form.
    pub fn new(base_url: String, policy: FrontierPolicy, fetcher: Arc<dyn PageFetcher>, store: RecordStore) -> Self {
        Self {
            base_url,
            policy,
            fetcher,
            store,
            max_pages: crate::config::DEFAULT_MAX_PAGES,
            max_concurrency: crate::config::DEFAULT_MAX_CONCURRENCY,
            navigation_timeout: Duration::from_secs(crate::config::DEFAULT_NAVIGATION_TIMEOUT_SECS),
            checkpoint: None,
        }
    }

    pub fn from_config(config: &CrawlConfig, fetcher: Arc<dyn PageFetcher>, store: RecordStore) -> Self {
        Self::new(config.base_url.trim().to_string(), config.frontier_policy(), fetcher, store)
            .max_pages(config.max_pages)
            .max_concurrency(config.max_concurrency)
            .navigation_timeout(config.navigation_timeout())
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Crawls until the frontier is exhausted or the page cap is reached and
    /// in-flight pages have finished.
    pub async fn run(&self) -> CrawlStats {
        let started_at = Instant::now();
        let mut stats = CrawlStats::default();
        let mut frontier = self.seed_frontier(&mut stats);
        let mut started = self.store.len();

        info!(
            "Starting crawl of {} (max pages: {}, concurrency: {}, subdomains: {})",
            self.base_url, self.max_pages, self.max_concurrency, self.policy.crawl_subdomains
        );

        let mut in_flight = FuturesUnordered::new();
        let mut ticker = self.checkpoint.as_ref().map(|checkpoint| {
            tokio::time::interval_at(tokio::time::Instant::now() + checkpoint.interval, checkpoint.interval)
        });

        loop {
            while in_flight.len() < self.max_concurrency {
                let Some(request) = frontier.next() else {
                    break;
                };
                // Retries were already counted when first dispatched
                if request.retry_count == 0 {
                    if started >= self.max_pages {
                        debug!("Page limit reached, skipping {}", request.url);
                        stats.requests_skipped += 1;
                        continue;
                    }
                    started += 1;
                }
                in_flight.push(self.attempt(request));
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                Some((request, outcome)) = in_flight.next() => {
                    self.handle(request, outcome, &mut frontier, &mut stats);
                }
                _ = tick(&mut ticker) => {
                    self.save_checkpoint().await;
                }
            }
        }

        self.save_checkpoint().await;
        stats.duration = started_at.elapsed();
        info!(
            "Crawling finished: {} page(s) crawled, {} failed, {} retried, {} skipped by the page limit in {:.2}s",
            stats.pages_crawled,
            stats.pages_failed,
            stats.retries,
            stats.requests_skipped,
            stats.duration.as_secs_f64()
        );
        stats
    }

    // Fresh crawl: just the root. Resumed crawl: everything already recorded is
    // handled, and links harvested before the restart are queued again.
    fn seed_frontier(&self, stats: &mut CrawlStats) -> Frontier {
        let mut frontier = Frontier::new();
        let records = self.store.snapshot();
        for record in &records {
            frontier.mark_handled(&record.url);
        }
        match CrawlRequest::base(&self.base_url) {
            Some(base) => {
                frontier.add_base(base);
            }
            None => warn!("Base URL {} cannot be normalized, nothing to crawl", self.base_url),
        }

        if !records.is_empty() {
            info!("Resuming crawl with {} recorded page(s)", records.len());
        }
        for record in &records {
            if let Some(link_urls) = &record.link_urls {
                stats.links_enqueued += enqueue_links(&mut frontier, link_urls, &record.url);
            }
        }
        frontier
    }

    fn attempt(&self, request: CrawlRequest) -> impl Future<Output = Attempt> {
        let fetcher = Arc::clone(&self.fetcher);
        let timeout = self.navigation_timeout;
        async move {
            debug!("Fetching {} (attempt {})", request.url, request.retry_count + 1);
            let outcome = match tokio::time::timeout(timeout, fetcher.fetch(&request.url)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout(timeout.as_secs())),
            };
            (request, outcome)
        }
    }

    fn handle(
        &self,
        request: CrawlRequest,
        outcome: Result<PageObservation, FetchError>,
        frontier: &mut Frontier,
        stats: &mut CrawlStats,
    ) {
        match outcome {
            Ok(observation) => {
                let scope = self.policy.scope_for(&self.base_url, &request);
                info!(
                    "Processed {} (status: {})",
                    request.url,
                    observation
                        .http_status
                        .map_or_else(|| "none".to_string(), |s| s.to_string())
                );
                let record = PageRecord::from_observation(
                    request.normalized_url.clone(),
                    request.referrer.clone(),
                    scope,
                    observation,
                );
                if let Some(link_urls) = &record.link_urls {
                    stats.links_enqueued += enqueue_links(frontier, link_urls, &record.url);
                }
                self.store.append(record);
                stats.pages_crawled += 1;
            }
            Err(error) if self.policy.should_retry(&request) => {
                warn!(
                    "Attempt {} for {} failed: {}",
                    request.retry_count + 1,
                    request.url,
                    error
                );
                stats.retries += 1;
                frontier.reclaim(request, error.to_string());
            }
            Err(error) => {
                info!(
                    "Page failed {} times, giving up: {}",
                    request.retry_count + 1,
                    request.url
                );
                let mut request = request;
                request.record_error(error.to_string());
                let record = PageRecord::failed(
                    request.normalized_url.clone(),
                    request.referrer.clone(),
                    request.last_error().map(str::to_string),
                );
                self.store.append(record);
                stats.pages_failed += 1;
            }
        }
    }

    async fn save_checkpoint(&self) {
        let Some(checkpoint) = &self.checkpoint else {
            return;
        };
        if let Err(e) = self.store.checkpoint(&checkpoint.path).await {
            warn!("Failed to checkpoint records: {}", e);
        }
    }
}

/// The store a crawl starts from.
///
/// Only a resumed crawl reads the checkpoint, and only one left by a crawl of
/// the same `base_url` (normalized). A fresh crawl discards any old checkpoint
/// so a later resume cannot pick up stale records.
pub async fn initial_store(checkpoint: &Path, base_url: &str, resume: bool) -> Result<RecordStore, StoreError> {
    if resume {
        return RecordStore::restore_for(checkpoint, base_url).await;
    }
    match tokio::fs::remove_file(checkpoint).await {
        Ok(()) => info!("Discarded previous checkpoint {}", checkpoint.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(StoreError::Io {
                path: checkpoint.display().to_string(),
                source,
            })
        }
    }
    Ok(RecordStore::new())
}

// Pending forever when checkpointing is off, so select! never picks it
async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn enqueue_links(frontier: &mut Frontier, link_urls: &[String], referrer: &str) -> usize {
    link_urls
        .iter()
        .filter_map(|link| CrawlRequest::discovered(link, referrer))
        .map(|request| frontier.add(request))
        .filter(|added| *added)
        .count()
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeFetcher, FakePage};
    use super::*;

    fn policy(crawl_subdomains: bool) -> FrontierPolicy {
        FrontierPolicy {
            crawl_subdomains,
            max_retries: 2,
            max_retries_subdomains: 0,
        }
    }

    fn crawler(fetcher: Arc<FakeFetcher>, crawl_subdomains: bool) -> Crawler {
        Crawler::new(
            "http://a.test".to_string(),
            policy(crawl_subdomains),
            fetcher,
            RecordStore::new(),
        )
        .max_concurrency(4)
    }

    fn record<'a>(records: &'a [PageRecord], url: &str) -> &'a PageRecord {
        records
            .iter()
            .find(|r| r.url == url)
            .unwrap_or_else(|| panic!("no record for {url}"))
    }

    #[tokio::test]
    async fn test_crawls_site_and_records_external_targets() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .page("http://a.test", &["http://a.test/b", "https://ext.test/page#x"], &[])
                .page("http://a.test/b", &["http://a.test/", "http://a.test/c"], &["top"])
                .page("https://ext.test/page", &["https://ext.test/deeper"], &[]),
        );
        let crawler = crawler(fetcher.clone(), false);
        let stats = crawler.run().await;
        let records = crawler.store().snapshot();

        assert_eq!(records.len(), 4);
        assert_eq!(stats.pages_crawled, 4);
        assert_eq!(fetcher.attempts("http://a.test"), 1);

        // external page is recorded but never expanded
        let ext = record(&records, "https://ext.test/page");
        assert!(!ext.is_base_website);
        assert_eq!(ext.link_urls, None);
        assert_eq!(fetcher.attempts("https://ext.test/deeper"), 0);

        let c = record(&records, "http://a.test/c");
        assert_eq!(c.http_status, Some(404));
        assert_eq!(c.referrer.as_deref(), Some("http://a.test/b"));
        assert!(record(&records, "http://a.test").is_base_website);
    }

    #[tokio::test]
    async fn test_subdomains_only_expanded_in_subdomain_mode() {
        let build = || {
            Arc::new(
                FakeFetcher::new()
                    .page("http://a.test", &["http://sub.a.test/x"], &[])
                    .page("http://sub.a.test/x", &["http://sub.a.test/y"], &[]),
            )
        };

        let fetcher = build();
        let single = crawler(fetcher.clone(), false);
        single.run().await;
        assert!(!record(&single.store().snapshot(), "http://sub.a.test/x").is_base_website);
        assert_eq!(fetcher.attempts("http://sub.a.test/y"), 0);

        let fetcher = build();
        let multi = crawler(fetcher.clone(), true);
        multi.run().await;
        assert!(record(&multi.store().snapshot(), "http://sub.a.test/x").is_base_website);
        assert_eq!(fetcher.attempts("http://sub.a.test/y"), 1);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .page("http://a.test", &["http://a.test/flaky"], &[])
                .with("http://a.test/flaky", FakePage::FlakyThenOk(2)),
        );
        let crawler = crawler(fetcher.clone(), false);
        let stats = crawler.run().await;

        assert_eq!(stats.retries, 2);
        assert_eq!(fetcher.attempts("http://a.test/flaky"), 3);
        let records = crawler.store().snapshot();
        assert_eq!(record(&records, "http://a.test/flaky").http_status, Some(200));
    }

    #[tokio::test]
    async fn test_retry_exhaustion_produces_failure_record() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .page("http://a.test", &["http://a.test/down"], &[])
                .with("http://a.test/down", FakePage::AlwaysFails("net::ERR_CONNECTION_RESET".into())),
        );
        let crawler = crawler(fetcher.clone(), false);
        let stats = crawler.run().await;

        assert_eq!(stats.pages_failed, 1);
        assert_eq!(fetcher.attempts("http://a.test/down"), 3);
        let records = crawler.store().snapshot();
        let down = record(&records, "http://a.test/down");
        assert_eq!(down.http_status, None);
        assert_eq!(down.error_message.as_deref(), Some("net::ERR_CONNECTION_RESET"));
    }

    #[tokio::test]
    async fn test_subdomain_mode_uses_its_own_retry_budget() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .page("http://a.test", &["http://a.test/down"], &[])
                .with("http://a.test/down", FakePage::AlwaysFails("boom".into())),
        );
        crawler(fetcher.clone(), true).run().await;
        assert_eq!(fetcher.attempts("http://a.test/down"), 1);
    }

    #[tokio::test]
    async fn test_page_cap_stops_dispatching() {
        let fetcher = Arc::new(FakeFetcher::new().page(
            "http://a.test",
            &["http://a.test/1", "http://a.test/2", "http://a.test/3", "http://a.test/4"],
            &[],
        ));
        let crawler = crawler(fetcher.clone(), false).max_pages(3);
        let stats = crawler.run().await;

        assert_eq!(crawler.store().len(), 3);
        assert_eq!(fetcher.total_attempts(), 3);
        assert_eq!(stats.requests_skipped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_timeout_counts_as_failure() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .page("http://a.test", &["http://a.test/slow"], &[])
                .with("http://a.test/slow", FakePage::Hangs),
        );
        let crawler = crawler(fetcher.clone(), false).navigation_timeout(Duration::from_secs(5));
        crawler.run().await;

        let records = crawler.store().snapshot();
        let slow = record(&records, "http://a.test/slow");
        assert_eq!(slow.http_status, None);
        assert_eq!(
            slow.error_message.as_deref(),
            Some("Navigation timed out after 5 seconds")
        );
        assert_eq!(fetcher.attempts("http://a.test/slow"), 3);
    }

    #[tokio::test]
    async fn test_checkpoint_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let site = || {
            Arc::new(
                FakeFetcher::new()
                    .page("http://a.test", &["http://a.test/1", "http://a.test/2"], &[])
                    .page("http://a.test/1", &["http://a.test/3"], &[])
                    .page("http://a.test/2", &[], &[])
                    .page("http://a.test/3", &[], &[]),
            )
        };
        let checkpoint = Checkpoint {
            path: path.clone(),
            interval: Duration::from_secs(60),
        };

        // first run is cut short by the page cap
        let first = crawler(site(), false).max_pages(2).checkpoint(checkpoint.clone());
        first.run().await;
        assert_eq!(first.store().len(), 2);

        // the second run picks up where the first stopped, without refetching
        let fetcher = site();
        let store = initial_store(&path, "http://a.test", true).await.unwrap();
        let second = Crawler::new("http://a.test".into(), policy(false), fetcher.clone(), store)
            .checkpoint(checkpoint);
        second.run().await;

        assert_eq!(fetcher.attempts("http://a.test"), 0);
        let restored = RecordStore::restore(&path).await.unwrap();
        let mut urls: Vec<_> = restored.snapshot().into_iter().map(|r| r.url).collect();
        urls.sort();
        assert_eq!(
            urls,
            vec!["http://a.test", "http://a.test/1", "http://a.test/2", "http://a.test/3"]
        );
    }

    #[tokio::test]
    async fn test_fresh_crawl_ignores_finished_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let checkpoint = Checkpoint {
            path: path.clone(),
            interval: Duration::from_secs(60),
        };

        let down = Arc::new(
            FakeFetcher::new()
                .page("http://a.test", &["http://a.test/x"], &[])
                .with(
                    "http://a.test/x",
                    FakePage::Page {
                        status: 500,
                        links: vec![],
                        anchors: vec![],
                    },
                ),
        );
        crawler(down, false).checkpoint(checkpoint.clone()).run().await;
        assert!(path.exists());

        // the link was fixed in between; a new crawl must see that
        let fixed = Arc::new(
            FakeFetcher::new()
                .page("http://a.test", &["http://a.test/x"], &[])
                .page("http://a.test/x", &[], &[]),
        );
        let store = initial_store(&path, "http://a.test", false).await.unwrap();
        let second = Crawler::new("http://a.test".into(), policy(false), fixed.clone(), store)
            .checkpoint(checkpoint);
        second.run().await;

        assert_eq!(fixed.attempts("http://a.test/x"), 1);
        let records = second.store().snapshot();
        assert_eq!(record(&records, "http://a.test/x").http_status, Some(200));
    }

    #[tokio::test]
    async fn test_resume_refuses_checkpoint_of_another_site() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let fetcher = Arc::new(FakeFetcher::new().page("http://a.test", &[], &[]));
        crawler(fetcher, false)
            .checkpoint(Checkpoint {
                path: path.clone(),
                interval: Duration::from_secs(60),
            })
            .run()
            .await;

        assert!(matches!(
            initial_store(&path, "http://b.test", true).await,
            Err(StoreError::ForeignCheckpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_port_is_fetched_but_not_part_of_identity() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .page("http://a.test:8080", &["http://a.test:8080/b/"], &[])
                .page("http://a.test:8080/b/", &["http://a.test:8080/"], &[]),
        );
        let crawler = Crawler::new("http://a.test:8080".into(), policy(false), fetcher.clone(), RecordStore::new());
        crawler.run().await;

        assert_eq!(fetcher.attempts("http://a.test:8080/b/"), 1);
        assert_eq!(fetcher.total_attempts(), 2);
        let records = crawler.store().snapshot();
        assert_eq!(record(&records, "http://a.test/b").http_status, Some(200));
        assert_eq!(record(&records, "http://a.test").http_status, Some(200));
    }

    #[tokio::test]
    async fn test_failure_record_keeps_last_error() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .page("http://a.test", &["http://a.test/flaky"], &[])
                .with("http://a.test/flaky", FakePage::FlakyThenOk(10)),
        );
        let crawler = crawler(fetcher, false);
        crawler.run().await;

        let records = crawler.store().snapshot();
        let flaky = record(&records, "http://a.test/flaky");
        assert_eq!(flaky.http_status, None);
        assert_eq!(flaky.error_message.as_deref(), Some("Connection failed: attempt 3 failed"));
    }
}
