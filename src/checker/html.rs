// src/checker/html.rs
// =============================================================================
// Pulls the facts the auditor needs out of a rendered HTML page.
//
// We use the `scraper` crate to parse the document and query it with CSS
// selectors, and the `url` crate to resolve relative hrefs against the page.
//
// Extracted per page:
// - the <title> text
// - every outbound <a href>, absolute, fragment kept (fragments are checked
//   against the target page later)
// - every fragment identifier: <a name> in the body and any non-empty id
// =============================================================================

use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid 'title' selector"));
static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid 'a[href]' selector"));
static NAMED_ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body a[name]").expect("valid 'body a[name]' selector"));
static IDS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body [id]").expect("valid 'body [id]' selector"));

/// What a page exposes to the link graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageDom {
    pub title: Option<String>,
    pub links: Vec<String>,
    /// Raw, in document order; the record model canonicalizes them
    pub anchors: Vec<String>,
}

/// Parses `html` served at `page_url`.
pub fn inspect_html(html: &str, page_url: &str) -> PageDom {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());

    PageDom {
        title,
        links: extract_html_links(&document, page_url),
        anchors: extract_anchors(&document),
    }
}

// Absolute http(s) hrefs in document order
fn extract_html_links(document: &Html, page_url: &str) -> Vec<String> {
    let base = match Url::parse(page_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot resolve links on invalid page URL {}: {}", page_url, e);
            return Vec::new();
        }
    };

    document
        .select(&LINKS)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_url(&base, href))
        .filter(|url| is_checkable_link(url))
        .collect()
}

fn extract_anchors(document: &Html) -> Vec<String> {
    let names = document
        .select(&NAMED_ANCHORS)
        .filter_map(|element| element.value().attr("name"));
    let ids = document
        .select(&IDS)
        .filter_map(|element| element.value().attr("id"));

    names
        .chain(ids)
        .filter(|anchor| !anchor.is_empty())
        .map(str::to_string)
        .collect()
}

// Resolves a possibly-relative href against the page URL.
//
// Examples with base "https://example.com/page":
//   "/docs"            -> Some("https://example.com/docs")
//   "#top"             -> Some("https://example.com/page#top")
//   "https://other.com" -> Some("https://other.com/")
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(|url| url.to_string())
}

// mailto:, tel:, javascript: and friends cannot be crawled
fn is_checkable_link(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
