// src/graph.rs
// =============================================================================
// Rebuilds the link graph from the flat set of crawled page records.
//
// How it works (breadth-first from the base URL):
// 1. Index the records by normalized URL, with an anchor set per record
// 2. Pop a URL from the queue; skip it if it already produced a Result
// 3. Turn each of its outbound hrefs into a Link, looking up the target record
// 4. Queue targets that exist and belong to the base website
// 5. Repeat until the queue is empty
//
// Only base-website pages are expanded. Links to external, out-of-scope or
// uncrawled pages still show up in the report, as leaves.
//
// Output is in BFS order from the root, so the same records always give the
// same report no matter in which order the crawl finished them.
// =============================================================================

use crate::checker::{classify, is_broken, LinkCategory};
use crate::record::PageRecord;
use crate::url_norm::{fragment_of, normalize_page};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// One outbound link of a page, annotated with the target's crawl outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// href as found on the source page
    pub url: String,
    /// None when the href could not be normalized
    pub normalized_url: Option<String>,
    /// Part after '#', empty if none
    pub fragment: String,
    /// A record exists for `normalized_url`
    pub crawled: bool,
    pub http_status: Option<u16>,
    pub error_message: Option<String>,
    /// Fragment is empty or names an anchor on the target page
    pub fragment_valid: bool,
}

impl Link {
    pub fn is_broken(&self) -> bool {
        is_broken(self)
    }

    pub fn category(&self) -> LinkCategory {
        classify(self)
    }
}

/// A page reachable from the base URL with its classified links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,
    pub title: Option<String>,
    pub links: Vec<Link>,
}

struct IndexedRecord<'a> {
    record: &'a PageRecord,
    anchors: HashSet<&'a str>,
}

// First record wins if a URL somehow appears twice
fn index_records(records: &[PageRecord]) -> HashMap<&str, IndexedRecord<'_>> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        index.entry(record.url.as_str()).or_insert_with(|| IndexedRecord {
            record,
            anchors: record.anchor_set(),
        });
    }
    index
}

fn build_link(raw: &str, index: &HashMap<&str, IndexedRecord<'_>>) -> Link {
    let fragment = fragment_of(raw).to_string();
    let normalized_url = normalize_page(raw);
    if normalized_url.is_none() {
        debug!("Cannot normalize link {}, treating it as not crawled", raw);
    }

    let mut link = Link {
        url: raw.to_string(),
        normalized_url,
        fragment,
        crawled: false,
        http_status: None,
        error_message: None,
        fragment_valid: false,
    };

    let target = link
        .normalized_url
        .as_deref()
        .and_then(|url| index.get(url));
    if let Some(target) = target {
        link.crawled = true;
        link.http_status = target.record.http_status;
        link.error_message = target.record.error_message.clone();
        link.fragment_valid =
            link.fragment.is_empty() || target.anchors.contains(link.fragment.as_str());
    }

    link
}

/// Breadth-first reconstruction of every page reachable from `base_url`.
///
/// `base_url` must already be normalized. A base URL without a record still
/// yields one Result, with no title and no links.
pub fn build_results(base_url: &str, records: &[PageRecord]) -> Vec<PageResult> {
    let index = index_records(records);

    let mut pending: VecDeque<&str> = VecDeque::from([base_url]);
    let mut done: HashSet<&str> = HashSet::new();
    let mut results = Vec::new();

    while let Some(url) = pending.pop_front() {
        // Diamonds in the graph can queue a page more than once
        if !done.insert(url) {
            continue;
        }
        debug!("Processing result: {}", url);

        let Some(entry) = index.get(url) else {
            warn!("No record for {}, reporting it without links", url);
            results.push(PageResult {
                url: url.to_string(),
                title: None,
                links: Vec::new(),
            });
            continue;
        };

        let record = entry.record;
        let link_urls = record.link_urls.as_deref().unwrap_or_default();
        let mut links = Vec::with_capacity(link_urls.len());

        for raw in link_urls {
            let link = build_link(raw, &index);

            if let Some((target_url, target)) = link
                .normalized_url
                .as_deref()
                .and_then(|url| index.get_key_value(url))
            {
                if target.record.is_base_website && !done.contains(target_url) {
                    pending.push_back(*target_url);
                }
            }
            links.push(link);
        }

        results.push(PageResult {
            url: url.to_string(),
            title: record.title.clone(),
            links,
        });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, links: &[&str], anchors: &[&str]) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            is_base_website: true,
            http_status: Some(200),
            title: Some(format!("Title of {url}")),
            link_urls: Some(links.iter().map(|l| l.to_string()).collect()),
            anchors: anchors.iter().map(|a| a.to_string()).collect(),
            error_message: None,
            referrer: None,
        }
    }

    fn external(url: &str, status: Option<u16>) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            is_base_website: false,
            http_status: status,
            title: None,
            link_urls: None,
            anchors: Vec::new(),
            error_message: None,
            referrer: None,
        }
    }

    fn urls(results: &[PageResult]) -> Vec<&str> {
        results.iter().map(|r| r.url.as_str()).collect()
    }

    #[test]
    fn test_base_links_to_ok_and_missing() {
        let records = vec![
            page("http://a.test", &["http://a.test/ok", "http://a.test/missing#nope"], &[]),
            page("http://a.test/ok", &[], &["top"]),
        ];
        let results = build_results("http://a.test", &records);

        assert_eq!(urls(&results), vec!["http://a.test", "http://a.test/ok"]);
        let links = &results[0].links;
        assert_eq!(links.len(), 2);

        assert_eq!(links[0].url, "http://a.test/ok");
        assert!(links[0].crawled);
        assert!(links[0].fragment_valid);
        assert_eq!(links[0].category(), LinkCategory::Ok);

        assert_eq!(links[1].url, "http://a.test/missing#nope");
        assert_eq!(links[1].normalized_url.as_deref(), Some("http://a.test/missing"));
        assert_eq!(links[1].fragment, "nope");
        assert!(!links[1].crawled);
        assert!(!links[1].fragment_valid);
        assert!(!links[1].is_broken());
        assert_eq!(links[1].category(), LinkCategory::NotCrawled);
    }

    #[test]
    fn test_cycle_produces_each_page_once() {
        let records = vec![
            page("http://a.test", &["http://a.test/b"], &[]),
            page("http://a.test/b", &["http://a.test", "http://a.test/"], &[]),
        ];
        let results = build_results("http://a.test", &records);

        assert_eq!(urls(&results), vec!["http://a.test", "http://a.test/b"]);
        assert_eq!(results[1].links.len(), 2);
        assert!(results[1].links.iter().all(|l| l.crawled));
    }

    #[test]
    fn test_diamond_is_deduplicated_in_bfs_order() {
        let records = vec![
            page("http://a.test", &["http://a.test/l", "http://a.test/r"], &[]),
            page("http://a.test/l", &["http://a.test/z"], &[]),
            page("http://a.test/r", &["http://a.test/z"], &[]),
            page("http://a.test/z", &[], &[]),
        ];
        let results = build_results("http://a.test", &records);
        assert_eq!(
            urls(&results),
            vec!["http://a.test", "http://a.test/l", "http://a.test/r", "http://a.test/z"]
        );
    }

    #[test]
    fn test_self_link_is_an_edge_not_a_loop() {
        let records = vec![page("http://a.test", &["http://a.test#top"], &["top"])];
        let results = build_results("http://a.test", &records);

        assert_eq!(results.len(), 1);
        let link = &results[0].links[0];
        assert!(link.crawled);
        assert!(link.fragment_valid);
    }

    #[test]
    fn test_fragment_checked_against_target_anchors() {
        let records = vec![
            page("http://a.test", &["http://a.test/doc#intro", "http://a.test/doc#gone"], &[]),
            page("http://a.test/doc", &[], &["intro"]),
        ];
        let results = build_results("http://a.test", &records);
        let links = &results[0].links;

        assert!(links[0].fragment_valid);
        assert!(!links[1].fragment_valid);
        assert_eq!(links[1].category(), LinkCategory::InvalidFragment);
    }

    #[test]
    fn test_out_of_scope_targets_are_leaves() {
        let mut sub = page("http://sub.a.test/x", &["http://a.test/hidden"], &[]);
        sub.is_base_website = false;
        let records = vec![
            page("http://a.test", &["http://sub.a.test/x", "https://ext.test/"], &[]),
            sub,
            external("https://ext.test", Some(404)),
            page("http://a.test/hidden", &[], &[]),
        ];
        let results = build_results("http://a.test", &records);

        assert_eq!(urls(&results), vec!["http://a.test"]);
        let links = &results[0].links;
        assert!(links[0].crawled);
        assert!(links[1].crawled);
        assert_eq!(links[1].http_status, Some(404));
        assert!(links[1].is_broken());
    }

    #[test]
    fn test_failed_target_is_broken() {
        let mut failed = PageRecord::failed("http://a.test/down".into(), None, Some("net::ERR_TIMED_OUT".into()));
        failed.is_base_website = true;
        let records = vec![page("http://a.test", &["http://a.test/down"], &[]), failed];
        let results = build_results("http://a.test", &records);

        // the failed page is expanded but has no links of its own
        assert_eq!(urls(&results), vec!["http://a.test", "http://a.test/down"]);
        let link = &results[0].links[0];
        assert!(link.is_broken());
        assert_eq!(link.http_status, None);
        assert!(results[1].links.is_empty());
    }

    #[test]
    fn test_missing_base_record() {
        let results = build_results("http://a.test", &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, None);
        assert!(results[0].links.is_empty());
    }

    #[test]
    fn test_unnormalizable_link_is_not_crawled() {
        let records = vec![page("http://a.test", &["not-a-url#frag"], &[])];
        let results = build_results("http://a.test", &records);
        let link = &results[0].links[0];

        assert_eq!(link.normalized_url, None);
        assert_eq!(link.fragment, "frag");
        assert!(!link.crawled);
        assert!(!link.fragment_valid);
    }

    #[test]
    fn test_tracking_params_resolve_to_same_record() {
        let records = vec![
            page("http://a.test", &["http://A.test/p/?utm_source=mail&b=2"], &[]),
            page("http://a.test/p?b=2", &[], &[]),
        ];
        let results = build_results("http://a.test", &records);
        assert!(results[0].links[0].crawled);
        assert_eq!(results.len(), 2);
    }
}
