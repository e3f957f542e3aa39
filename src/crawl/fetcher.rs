// src/crawl/fetcher.rs
// =============================================================================
// The capability the crawler needs from a browser: load a URL, report what
// came back. The crawler never depends on a concrete engine, only on this
// trait, so tests drive it with an in-memory fake.
// =============================================================================

use crate::error::FetchError;
use crate::record::PageObservation;
use async_trait::async_trait;

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Loads `url`. An HTTP error status is a successful observation; Err is
    /// reserved for attempts that should be retried.
    async fn fetch(&self, url: &str) -> Result<PageObservation, FetchError>;
}
