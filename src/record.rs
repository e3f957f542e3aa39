// src/record.rs
// =============================================================================
// The per-URL fact sheet produced once for every crawled request.
//
// A PageRecord is created when a request resolves, successfully or not, and is
// never mutated afterwards. The graph builder reads the complete set of records
// once crawling is over.
//
// Two inputs feed a record:
// - the request itself (its normalized URL, referrer and scope flags)
// - a PageObservation yielded by the page fetcher (status, title, DOM facts)
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Error text used when a request failed without leaving any message behind.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// What the page fetcher saw when loading a page.
///
/// `anchors` and `links` are raw: duplicates and ordering are whatever the DOM
/// gave us. `PageRecord::from_observation` canonicalizes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageObservation {
    /// URL after redirects
    pub final_url: String,
    /// Status of the main document response, None if navigation never completed
    pub http_status: Option<u16>,
    pub title: Option<String>,
    /// Navigation error, set when the page loaded only partially
    pub error_message: Option<String>,
    /// Every `<a name>` and non-empty `id` attribute in the body
    pub anchors: Vec<String>,
    /// Absolute outbound hrefs, fragments included
    pub links: Vec<String>,
}

/// Where a record sits relative to the crawl scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordScope {
    /// The page belongs to the base website and may be expanded by the graph builder
    pub is_base_website: bool,
    /// The page's outbound links were harvested
    pub extract_links: bool,
}

/// Canonical crawl outcome for one normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub url: String,
    #[serde(default)]
    pub is_base_website: bool,
    pub http_status: Option<u16>,
    #[serde(default)]
    pub title: Option<String>,
    /// Distinct outbound hrefs, sorted; None when links were not harvested
    #[serde(default)]
    pub link_urls: Option<Vec<String>>,
    /// Distinct fragment identifiers, sorted
    #[serde(default)]
    pub anchors: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
}

impl PageRecord {
    /// Builds the record for a request that loaded.
    ///
    /// `url` is the normalized URL the request was made for, not the final
    /// URL: links pointing at a redirecting page must still find this record.
    pub fn from_observation(
        url: String,
        referrer: Option<String>,
        scope: RecordScope,
        observation: PageObservation,
    ) -> Self {
        let link_urls = scope
            .extract_links
            .then(|| sorted_unique(observation.links));

        Self {
            url,
            is_base_website: scope.is_base_website,
            http_status: observation.http_status,
            title: observation.title,
            link_urls,
            anchors: canonical_anchors(observation.anchors),
            error_message: observation.error_message,
            referrer,
        }
    }

    /// Builds the terminal record for a request whose retries ran out.
    pub fn failed(url: String, referrer: Option<String>, error_message: Option<String>) -> Self {
        Self {
            url,
            is_base_website: false,
            http_status: None,
            title: None,
            link_urls: None,
            anchors: Vec::new(),
            error_message: Some(error_message.unwrap_or_else(|| UNKNOWN_ERROR.to_string())),
            referrer,
        }
    }

    /// Anchor membership set used for fragment validation.
    pub fn anchor_set(&self) -> HashSet<&str> {
        self.anchors.iter().map(String::as_str).collect()
    }

    /// The reduced form written to the dataset when only broken links matter.
    pub fn reduced(&self) -> ReducedRecord {
        ReducedRecord {
            url: self.url.clone(),
            is_base_website: self.is_base_website,
            http_status: self.http_status,
            title: self.title.clone(),
            error_message: self.error_message.clone(),
            referrer: self.referrer.clone(),
        }
    }
}

/// A PageRecord without its link and anchor lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducedRecord {
    pub url: String,
    pub is_base_website: bool,
    pub http_status: Option<u16>,
    pub title: Option<String>,
    pub error_message: Option<String>,
    pub referrer: Option<String>,
}

/// Deduplicates and sorts fragment identifiers, dropping empty ones, so that
/// membership checks do not depend on DOM order or repeats.
pub fn canonical_anchors<I, S>(anchors: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    anchors
        .into_iter()
        .map(Into::into)
        .filter(|anchor| !anchor.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn sorted_unique(items: Vec<String>) -> Vec<String> {
    items.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}
