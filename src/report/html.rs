// src/report/html.rs
// =============================================================================
// HTML rendering of the report: one table, columns From / To / HTTP status /
// Description, one color-coded row per link. Source and target cells link to
// the pages they name.
// =============================================================================

use super::{build_rows, ReportStyles};
use crate::graph::PageResult;
use std::fmt::Write;

/// Renders the report. With `broken_only`, only broken rows are kept; this is
/// the body of the notification email.
pub fn render_html(results: &[PageResult], base_url: &str, broken_only: bool, styles: &ReportStyles) -> String {
    let mut html = format!(
        r#"<html>
  <head>
    <title>Broken link report for {base}</title>
    <style>
        body {{
            font-family: Sans-serif;
        }}
        th {{
            text-align: left;
        }}
    </style>
  </head>
  <body>
    <table>
      <tr>
        <th>From</th>
        <th>To</th>
        <th>HTTP&nbsp;status</th>
        <th>Description</th>
      </tr>
"#,
        base = escape(base_url)
    );

    for row in build_rows(results, broken_only) {
        let style = styles.style(row.category);
        let status = row.http_status.map(|s| s.to_string()).unwrap_or_default();
        // Writing into a String cannot fail
        let _ = write!(
            html,
            r#"      <tr style="background-color: {color}" data-category="{category}" title="{label}">
        <td><a href="{from}" target="_blank">{from}</a></td>
        <td><a href="{to}" target="_blank">{to}</a></td>
        <td>{status}</td>
        <td>{description}</td>
      </tr>
"#,
            color = escape(&style.color),
            category = row.category.as_str(),
            label = escape(&style.label),
            from = escape(&row.from),
            to = escape(&row.to),
            description = escape(&row.description),
        );
    }

    html.push_str(
        "    </table>
  </body>
</html>
",
    );
    html
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
