// src/report/style.rs
// =============================================================================
// Category -> presentation lookup.
//
// The renderer never picks a color itself; it asks this table. Defaults are the
// classic palette, and every entry can be overridden from the input file.
// =============================================================================

use crate::checker::LinkCategory;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryStyle {
    /// CSS background color of the row
    pub color: String,
    /// Short label, shown as the row tooltip and in terminal output
    pub label: String,
}

impl CategoryStyle {
    fn new(color: &str, label: &str) -> Self {
        Self {
            color: color.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportStyles {
    pub ok: CategoryStyle,
    pub not_crawled: CategoryStyle,
    pub broken: CategoryStyle,
    pub invalid_fragment: CategoryStyle,
}

impl Default for ReportStyles {
    fn default() -> Self {
        Self {
            ok: CategoryStyle::new("#90EE90", "OK"),
            not_crawled: CategoryStyle::new("#F0E68C", "NOT CRAWLED"),
            broken: CategoryStyle::new("#DD6766", "BROKEN"),
            invalid_fragment: CategoryStyle::new("#FEA95E", "INVALID FRAGMENT"),
        }
    }
}

impl ReportStyles {
    pub fn style(&self, category: LinkCategory) -> &CategoryStyle {
        match category {
            LinkCategory::Ok => &self.ok,
            LinkCategory::NotCrawled => &self.not_crawled,
            LinkCategory::Broken => &self.broken,
            LinkCategory::InvalidFragment => &self.invalid_fragment,
        }
    }
}
