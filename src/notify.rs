// src/notify.rs
// =============================================================================
// Broken-link notification.
//
// collect_broken() flattens every broken link with the page it was found on.
// A notification goes out only when that list is non-empty AND at least one
// recipient is configured; otherwise nothing happens.
//
// The email body is the broken-only rendering of the HTML report, plus a plain
// text version grouped by source page. Delivery is someone else's job: the
// payload is handed to a Mailer.
// =============================================================================

use crate::error::NotifyError;
use crate::graph::PageResult;
use crate::report::{render_html, ReportStyles};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

pub const NOTIFICATION_SUBJECT: &str = "Broken links notification";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    /// href as found on the source page
    pub link: String,
    pub source_page_url: String,
}

/// What the mail transport receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailPayload {
    /// Comma-joined addresses
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, payload: &EmailPayload) -> Result<(), NotifyError>;
}

/// Posts the payload as JSON to an HTTP endpoint.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMailer {
    pub fn new(endpoint: &str) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, payload: &EmailPayload) -> Result<(), NotifyError> {
        let response = self.client.post(&self.endpoint).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

pub fn collect_broken(results: &[PageResult]) -> Vec<BrokenLink> {
    results
        .iter()
        .flat_map(|result| {
            result
                .links
                .iter()
                .filter(|link| link.is_broken())
                .map(|link| BrokenLink {
                    link: link.url.clone(),
                    source_page_url: result.url.clone(),
                })
        })
        .collect()
}

// "Detected from <page>:" followed by its broken links, pages in first-seen order
fn text_body(broken_links: &[BrokenLink]) -> String {
    let mut pages: Vec<(&str, Vec<&str>)> = Vec::new();
    for broken in broken_links {
        match pages.iter_mut().find(|(page, _)| *page == broken.source_page_url) {
            Some((_, links)) => links.push(broken.link.as_str()),
            None => pages.push((broken.source_page_url.as_str(), vec![broken.link.as_str()])),
        }
    }

    let mut text = String::from("Broken links");
    for (page, links) in pages {
        text.push_str(&format!("\n\nDetected from {page}:\n"));
        for link in links {
            text.push('\n');
            text.push_str(link);
        }
    }
    text
}

pub fn build_payload(
    results: &[PageResult],
    broken_links: &[BrokenLink],
    base_url: &str,
    emails: &[String],
    styles: &ReportStyles,
) -> EmailPayload {
    EmailPayload {
        to: emails.join(", "),
        subject: NOTIFICATION_SUBJECT.to_string(),
        html: render_html(results, base_url, true, styles),
        text: text_body(broken_links),
    }
}

/// Sends the notification if there is anything to report and anyone to tell.
/// Returns whether a payload was handed to the mailer.
pub async fn notify_broken_links(
    results: &[PageResult],
    base_url: &str,
    emails: &[String],
    styles: &ReportStyles,
    mailer: Option<&dyn Mailer>,
) -> Result<bool, NotifyError> {
    let broken_links = collect_broken(results);
    if broken_links.is_empty() || emails.is_empty() {
        return Ok(false);
    }

    let payload = build_payload(results, &broken_links, base_url, emails, styles);
    let Some(mailer) = mailer else {
        warn!(
            "{} broken link(s) found but no mailer endpoint is configured, not notifying {}",
            broken_links.len(),
            payload.to
        );
        info!("{}", payload.text);
        return Ok(false);
    };

    info!("Sending email notification to {}...", payload.to);
    mailer.send(&payload).await?;
    Ok(true)
}
