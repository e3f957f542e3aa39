// src/crawl/frontier.rs
// =============================================================================
// The to-be-crawled request set and the policy around it.
//
// The policy decides:
// - request identity (unique keys, with a special key for the root request)
// - which hosts count as the base website
// - which pages get their outbound links harvested
// - how many times a failed request is retried
//
// The Frontier itself is a plain FIFO with dedup by unique key. It is owned by
// the crawl loop, so it needs no locking.
// =============================================================================

use crate::record::RecordScope;
use crate::url_norm::{host_of, normalize_page, registrable_domain};
use std::collections::{HashSet, VecDeque};

/// Appended to the root request's unique key so the root can always be added,
/// even when an earlier page already linked to the same URL.
pub const BASE_KEY_SUFFIX: &str = "#base-url";

/// Distinguishes the designated root request from organically discovered ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLabel {
    BaseUrl,
    Discovered,
}

/// A URL waiting to be fetched, plus its retry history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// URL as discovered, without its fragment; this is what gets fetched
    pub url: String,
    /// Page identity; records are keyed by it
    pub normalized_url: String,
    pub unique_key: String,
    pub label: RequestLabel,
    /// Page this URL was discovered on
    pub referrer: Option<String>,
    pub retry_count: u32,
    /// One entry per failed attempt, oldest first
    pub error_messages: Vec<String>,
}

impl CrawlRequest {
    /// The root request. None if `url` does not normalize.
    pub fn base(url: &str) -> Option<Self> {
        let (url, normalized_url) = fetch_and_identity(url)?;
        Some(Self {
            unique_key: format!("{normalized_url}{BASE_KEY_SUFFIX}"),
            url,
            normalized_url,
            label: RequestLabel::BaseUrl,
            referrer: None,
            retry_count: 0,
            error_messages: Vec::new(),
        })
    }

    /// A link harvested from `referrer`. None if `url` does not normalize.
    pub fn discovered(url: &str, referrer: &str) -> Option<Self> {
        let (url, normalized_url) = fetch_and_identity(url)?;
        Some(Self {
            unique_key: normalized_url.clone(),
            url,
            normalized_url,
            label: RequestLabel::Discovered,
            referrer: Some(referrer.to_string()),
            retry_count: 0,
            error_messages: Vec::new(),
        })
    }

    pub fn record_error(&mut self, error: String) {
        self.error_messages.push(error);
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error_messages.last().map(String::as_str)
    }
}

fn fetch_and_identity(raw: &str) -> Option<(String, String)> {
    let normalized = normalize_page(raw)?;
    let raw = raw.trim();
    let url = raw.split_once('#').map_or(raw, |(url, _)| url);
    Some((url.to_string(), normalized))
}

/// Scope and retry rules for one crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierPolicy {
    pub crawl_subdomains: bool,
    /// Retry bound in single-site mode
    pub max_retries: u32,
    /// Retry bound in subdomain mode, where many independent hosts are hit and
    /// failing fast keeps the page budget for pages that answer
    pub max_retries_subdomains: u32,
}

impl FrontierPolicy {
    pub fn max_retries(&self) -> u32 {
        if self.crawl_subdomains {
            self.max_retries_subdomains
        } else {
            self.max_retries
        }
    }

    /// Whether a failed request gets another attempt.
    pub fn should_retry(&self, request: &CrawlRequest) -> bool {
        request.retry_count < self.max_retries()
    }

    /// True if `url` is on the base host, or in subdomain mode shares the
    /// base's registrable domain.
    pub fn in_scope(&self, base_url: &str, url: &str) -> bool {
        let (Some(base_host), Some(host)) = (host_of(base_url), host_of(url)) else {
            return false;
        };
        if base_host == host {
            return true;
        }
        self.crawl_subdomains && registrable_domain(&base_host) == registrable_domain(&host)
    }

    /// How the record for `request` is flagged.
    ///
    /// The base website is the root plus everything in scope, which in
    /// subdomain mode already covers the sibling hosts. Pages outside scope
    /// are still recorded, because links pointing at them need a status, but
    /// their own links are never harvested.
    pub fn scope_for(&self, base_url: &str, request: &CrawlRequest) -> RecordScope {
        let is_base_website =
            request.label == RequestLabel::BaseUrl || self.in_scope(base_url, &request.url);
        RecordScope {
            is_base_website,
            extract_links: is_base_website,
        }
    }
}

/// FIFO of pending requests, deduplicated by unique key.
#[derive(Debug, Default)]
pub struct Frontier {
    pending: VecDeque<CrawlRequest>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the root request. Its plain URL is marked as seen as well, so
    /// pages linking back to the root do not enqueue it a second time.
    pub fn add_base(&mut self, request: CrawlRequest) -> bool {
        self.seen.insert(request.normalized_url.clone());
        self.add(request)
    }

    /// Returns false if a request with the same unique key was already added.
    pub fn add(&mut self, request: CrawlRequest) -> bool {
        if !self.seen.insert(request.unique_key.clone()) {
            return false;
        }
        self.pending.push_back(request);
        true
    }

    /// Puts a failed request back for another attempt.
    pub fn reclaim(&mut self, mut request: CrawlRequest, error: String) {
        request.retry_count += 1;
        request.record_error(error);
        self.pending.push_back(request);
    }

    /// Marks a URL as already handled, e.g. after restoring a checkpoint.
    pub fn mark_handled(&mut self, url: &str) {
        self.seen.insert(url.to_string());
        self.seen.insert(format!("{url}{BASE_KEY_SUFFIX}"));
    }

    pub fn next(&mut self) -> Option<CrawlRequest> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy(crawl_subdomains: bool) -> FrontierPolicy {
        FrontierPolicy {
            crawl_subdomains,
            max_retries: 3,
            max_retries_subdomains: 1,
        }
    }

    #[rstest]
    #[case(false, "http://a.test/x", true)]
    #[case(false, "https://A.test:8443/y", true)]
    #[case(false, "http://sub.a.test/x", false)]
    #[case(true, "http://sub.a.test/x", true)]
    #[case(true, "http://deep.sub.a.test", true)]
    #[case(true, "http://b.test/x", false)]
    #[case(true, "http://nota.test/x", false)]
    #[case(true, "not a url", false)]
    fn test_in_scope(#[case] subdomains: bool, #[case] url: &str, #[case] expected: bool) {
        assert_eq!(policy(subdomains).in_scope("http://a.test", url), expected);
    }

    #[rstest]
    #[case("http://example.co.uk/x", true)]
    #[case("http://a.example.co.uk/x", true)]
    #[case("http://unrelated-site.co.uk/x", false)]
    #[case("http://co.uk/x", false)]
    fn test_in_scope_respects_public_suffixes(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(policy(true).in_scope("http://example.co.uk", url), expected);
        assert_eq!(policy(true).in_scope("http://a.example.co.uk", url), expected);
    }

    #[test]
    fn test_request_fetches_discovered_url_but_is_keyed_by_identity() {
        let request = CrawlRequest::discovered("http://a.test:8080/x/#frag", "http://a.test").unwrap();
        assert_eq!(request.url, "http://a.test:8080/x/");
        assert_eq!(request.normalized_url, "http://a.test/x");
        assert_eq!(request.unique_key, "http://a.test/x");
        assert!(CrawlRequest::discovered("/relative", "http://a.test").is_none());
    }

    #[test]
    fn test_subdomain_page_is_not_base_website_without_subdomain_mode() {
        let request = CrawlRequest::discovered("http://sub.a.test/x", "http://a.test").unwrap();
        let scope = policy(false).scope_for("http://a.test", &request);
        assert!(!scope.is_base_website);
        assert!(!scope.extract_links);

        let scope = policy(true).scope_for("http://a.test", &request);
        assert!(scope.is_base_website);
        assert!(scope.extract_links);
    }

    #[test]
    fn test_root_is_always_base_website() {
        let request = CrawlRequest::base("http://a.test").unwrap();
        let scope = policy(false).scope_for("http://a.test", &request);
        assert!(scope.is_base_website);
        assert!(scope.extract_links);
    }

    #[test]
    fn test_retry_budget_by_mode() {
        let mut request = CrawlRequest::base("http://a.test").unwrap();
        assert!(policy(true).should_retry(&request));
        request.retry_count = 1;
        assert!(!policy(true).should_retry(&request));
        assert!(policy(false).should_retry(&request));
        request.retry_count = 3;
        assert!(!policy(false).should_retry(&request));
    }

    #[test]
    fn test_frontier_dedups_by_unique_key() {
        let mut frontier = Frontier::new();
        let link = |url: &str| CrawlRequest::discovered(url, "http://a.test").unwrap();
        assert!(frontier.add(link("http://a.test/x")));
        assert!(!frontier.add(link("HTTP://A.test/x/")));
        assert!(frontier.next().is_some());
        assert!(frontier.next().is_none());
    }

    #[test]
    fn test_base_can_be_added_after_it_was_linked() {
        let mut frontier = Frontier::new();
        frontier.add(CrawlRequest::discovered("http://a.test", "http://a.test/x").unwrap());
        assert!(frontier.add_base(CrawlRequest::base("http://a.test").unwrap()));
        assert_eq!(frontier.next().unwrap().label, RequestLabel::Discovered);
        assert_eq!(frontier.next().unwrap().label, RequestLabel::BaseUrl);
    }

    #[test]
    fn test_links_back_to_base_are_not_enqueued_again() {
        let mut frontier = Frontier::new();
        frontier.add_base(CrawlRequest::base("http://a.test").unwrap());
        assert!(!frontier.add(CrawlRequest::discovered("http://a.test/", "http://a.test/x").unwrap()));

        let base = frontier.next().unwrap();
        assert_eq!(base.label, RequestLabel::BaseUrl);
        assert_eq!(base.unique_key, format!("http://a.test{BASE_KEY_SUFFIX}"));
        assert!(frontier.next().is_none());
    }

    #[test]
    fn test_reclaim_records_error_and_bumps_retry() {
        let mut frontier = Frontier::new();
        frontier.add_base(CrawlRequest::base("http://a.test").unwrap());
        let request = frontier.next().unwrap();
        frontier.reclaim(request, "timeout".into());

        let request = frontier.next().unwrap();
        assert_eq!(request.retry_count, 1);
        assert_eq!(request.last_error(), Some("timeout"));
    }

    #[test]
    fn test_mark_handled_blocks_both_keys() {
        let mut frontier = Frontier::new();
        frontier.mark_handled("http://a.test");
        assert!(!frontier.add_base(CrawlRequest::base("http://a.test").unwrap()));
        assert!(!frontier.add(CrawlRequest::discovered("http://a.test", "x").unwrap()));
    }
}
