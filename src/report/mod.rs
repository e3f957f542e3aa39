// src/report/mod.rs
// =============================================================================
// Turns the classified link graph into report rows.
//
// One row per link, in result order. Every row gets exactly one category:
// not crawled, broken, invalid fragment or OK, checked in that order.
//
// The broken-only variant filters the very same rows, so the notification can
// never disagree with the full report about what is broken.
// =============================================================================

mod html;
mod style;

pub use html::render_html;
pub use style::ReportStyles;

use crate::checker::{describe, LinkCategory};
use crate::graph::PageResult;
use serde::Serialize;

/// One From -> To line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub from: String,
    pub to: String,
    pub http_status: Option<u16>,
    pub category: LinkCategory,
    pub description: String,
}

pub fn build_rows(results: &[PageResult], broken_only: bool) -> Vec<ReportRow> {
    results
        .iter()
        .flat_map(|result| {
            result.links.iter().map(move |link| {
                let category = link.category();
                ReportRow {
                    from: result.url.clone(),
                    to: link.url.clone(),
                    http_status: link.http_status,
                    category,
                    description: describe(link, category),
                }
            })
        })
        .filter(|row| !broken_only || row.category == LinkCategory::Broken)
        .collect()
}

/// Row counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub pages: usize,
    pub ok: usize,
    pub broken: usize,
    pub invalid_fragment: usize,
    pub not_crawled: usize,
}

impl ReportSummary {
    pub fn new(results: &[PageResult], rows: &[ReportRow]) -> Self {
        let mut summary = Self {
            pages: results.len(),
            ..Default::default()
        };
        for row in rows {
            match row.category {
                LinkCategory::Ok => summary.ok += 1,
                LinkCategory::Broken => summary.broken += 1,
                LinkCategory::InvalidFragment => summary.invalid_fragment += 1,
                LinkCategory::NotCrawled => summary.not_crawled += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.ok + self.broken + self.invalid_fragment + self.not_crawled
    }
}
