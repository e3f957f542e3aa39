// src/checker/mod.rs
// =============================================================================
// Everything that looks at a single page or a single link.
//
// Submodules:
// - html: title, links and fragment anchors of a rendered page
// - http: the default page fetcher over HTTP
// - status: broken-link rules and the four link categories
// =============================================================================

mod html;
mod http;
mod status;

pub use http::HttpPageFetcher;
pub use status::{classify, describe, is_broken, LinkCategory};
