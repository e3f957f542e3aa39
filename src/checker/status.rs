// src/checker/status.rs
// =============================================================================
// Link classification.
//
// A link is broken iff it was crawled and either carries an error message or
// an error status. Error statuses are: no status at all, anything below 200,
// and anything from 300 up except 304 Not Modified.
//
// Redirects other than 304 count as broken on purpose: a link that ends on a
// redirect is surfaced to the site owner instead of being silently followed.
//
// An uncrawled link is never broken; it gets its own "not crawled" category.
// =============================================================================

use crate::graph::Link;
use serde::{Deserialize, Serialize};

pub const STATUS_OK: u16 = 200;
pub const STATUS_REDIRECTION: u16 = 300;
pub const STATUS_NOT_MODIFIED: u16 = 304;

/// The four mutually exclusive outcomes of a link, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkCategory {
    NotCrawled,
    Broken,
    InvalidFragment,
    Ok,
}

impl LinkCategory {
    #[cfg(test)]
    pub const ALL: [LinkCategory; 4] = [
        LinkCategory::NotCrawled,
        LinkCategory::Broken,
        LinkCategory::InvalidFragment,
        LinkCategory::Ok,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LinkCategory::NotCrawled => "not_crawled",
            LinkCategory::Broken => "broken",
            LinkCategory::InvalidFragment => "invalid_fragment",
            LinkCategory::Ok => "ok",
        }
    }
}

pub fn is_error_status(status: Option<u16>) -> bool {
    match status {
        None => true,
        Some(STATUS_NOT_MODIFIED) => false,
        Some(status) => !(STATUS_OK..STATUS_REDIRECTION).contains(&status),
    }
}

pub fn is_broken(link: &Link) -> bool {
    let has_error = link
        .error_message
        .as_deref()
        .is_some_and(|message| !message.is_empty());
    link.crawled && (has_error || is_error_status(link.http_status))
}

pub fn classify(link: &Link) -> LinkCategory {
    if !link.crawled {
        LinkCategory::NotCrawled
    } else if is_broken(link) {
        LinkCategory::Broken
    } else if !link.fragment_valid {
        LinkCategory::InvalidFragment
    } else {
        LinkCategory::Ok
    }
}

/// Human readable description shown in the report's Description column.
pub fn describe(link: &Link, category: LinkCategory) -> String {
    match category {
        LinkCategory::NotCrawled => "Page not crawled".to_string(),
        LinkCategory::Broken => match link.error_message.as_deref() {
            Some(message) if !message.is_empty() => format!("Error: {message}"),
            _ => "Invalid HTTP status".to_string(),
        },
        LinkCategory::InvalidFragment => "URL fragment not found".to_string(),
        LinkCategory::Ok => "OK".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn link(crawled: bool, http_status: Option<u16>, error: Option<&str>, fragment_valid: bool) -> Link {
        Link {
            url: "http://a.test/x".to_string(),
            normalized_url: Some("http://a.test/x".to_string()),
            fragment: String::new(),
            crawled,
            http_status,
            error_message: error.map(str::to_string),
            fragment_valid,
        }
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some(100), true)]
    #[case(Some(199), true)]
    #[case(Some(200), false)]
    #[case(Some(204), false)]
    #[case(Some(299), false)]
    #[case(Some(300), true)]
    #[case(Some(301), true)]
    #[case(Some(302), true)]
    #[case(Some(304), false)]
    #[case(Some(404), true)]
    #[case(Some(500), true)]
    fn test_is_error_status(#[case] status: Option<u16>, #[case] expected: bool) {
        assert_eq!(is_error_status(status), expected);
    }

    #[test]
    fn test_not_modified_is_not_broken_but_moved_is() {
        assert!(!is_broken(&link(true, Some(304), None, true)));
        assert!(is_broken(&link(true, Some(301), None, true)));
    }

    #[test]
    fn test_error_message_breaks_regardless_of_status() {
        assert!(is_broken(&link(true, Some(200), Some("net::ERR_ABORTED"), true)));
        assert!(!is_broken(&link(true, Some(200), Some(""), true)));
    }

    #[test]
    fn test_uncrawled_is_never_broken() {
        assert!(!is_broken(&link(false, None, Some("boom"), false)));
        assert_eq!(classify(&link(false, None, Some("boom"), false)), LinkCategory::NotCrawled);
    }

    #[rstest]
    #[case(link(false, None, None, false), LinkCategory::NotCrawled, "Page not crawled")]
    #[case(link(true, Some(500), None, true), LinkCategory::Broken, "Invalid HTTP status")]
    #[case(link(true, None, Some("timeout"), false), LinkCategory::Broken, "Error: timeout")]
    #[case(link(true, Some(200), None, false), LinkCategory::InvalidFragment, "URL fragment not found")]
    #[case(link(true, Some(200), None, true), LinkCategory::Ok, "OK")]
    fn test_classify_and_describe(
        #[case] link: Link,
        #[case] category: LinkCategory,
        #[case] description: &str,
    ) {
        assert_eq!(classify(&link), category);
        assert_eq!(describe(&link, category), description);
    }

    #[test]
    fn test_category_names_match_serde() {
        for category in LinkCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }
}
