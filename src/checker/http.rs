// src/checker/http.rs
// =============================================================================
// Default page fetcher: loads pages over plain HTTP with reqwest.
//
// Key behavior:
// - GET the page, following redirects like a browser would
// - Report the final status; a 404 is a successful observation, not an error
// - Parse HTML bodies for title, links and anchors
// - Rotate through the configured proxies, one client per proxy
//
// Transport failures (timeout, DNS, TLS, redirect loops) become FetchErrors,
// which the crawler retries.
// =============================================================================

use crate::checker::html::inspect_html;
use crate::config::ProxyConfig;
use crate::crawl::PageFetcher;
use crate::error::FetchError;
use crate::record::PageObservation;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client, Proxy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const USER_AGENT: &str = concat!("link-auditor/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

pub struct HttpPageFetcher {
    // never empty
    clients: Vec<Client>,
    next_client: AtomicUsize,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, proxy_config: &ProxyConfig) -> Result<Self, FetchError> {
        let clients = if proxy_config.proxy_urls.is_empty() {
            vec![build_client(timeout, None)?]
        } else {
            proxy_config
                .proxy_urls
                .iter()
                .map(|url| {
                    let proxy = Proxy::all(url)
                        .map_err(|e| FetchError::Other(format!("Invalid proxy '{url}': {e}")))?;
                    build_client(timeout, Some(proxy))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            clients,
            next_client: AtomicUsize::new(0),
            timeout,
        })
    }

    fn client(&self) -> &Client {
        let index = self.next_client.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }
}

fn build_client(timeout: Duration, proxy: Option<Proxy>) -> Result<Client, FetchError> {
    let mut builder = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS));
    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| FetchError::Other(format!("Failed to create HTTP client: {e}")))
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageObservation, FetchError> {
        let response = self
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| categorize_error(e, self.timeout))?;

        let http_status = response.status().as_u16();
        let final_url = response.url().to_string();
        // Only HTML has links and anchors; skip downloading images, PDFs, ...
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|content_type| content_type.contains("html"));

        let dom = if is_html {
            let body = response
                .text()
                .await
                .map_err(|e| categorize_error(e, self.timeout))?;
            inspect_html(&body, &final_url)
        } else {
            Default::default()
        };

        Ok(PageObservation {
            final_url,
            http_status: Some(http_status),
            title: dom.title,
            error_message: None,
            anchors: dom.anchors,
            links: dom.links,
        })
    }
}

// Maps reqwest's error kinds onto our FetchError variants
fn categorize_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    let error_string = error.to_string();

    if error.is_timeout() {
        FetchError::Timeout(timeout.as_secs())
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error.is_connect() {
        if error_string.contains("dns") {
            FetchError::Connect("Could not resolve hostname".to_string())
        } else {
            FetchError::Connect(error_string)
        }
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        FetchError::Other("SSL certificate error".to_string())
    } else {
        FetchError::Other(error_string)
    }
}
