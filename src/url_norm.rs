// src/url_norm.rs
// =============================================================================
// Canonical URL form used to decide whether two links point at the same page.
//
// normalize() is deliberately not the `url` crate's serialization: the host and
// path are treated as opaque strings (no percent-decoding, no IDN handling),
// only case-folded and trimmed. What it does, in order:
// 1. Trim the input and split it into scheme, host, path, query, fragment
//    (userinfo and port are not part of a page's identity)
// 2. Reject anything without a scheme and a host
// 3. Drop trailing slashes from the path
// 4. Drop `utm_*` query parameters, sort the rest, rejoin with '&'
// 5. Lower-case scheme and host
// 6. Drop the fragment unless the caller asks to keep it
//
// The result is idempotent: normalize(normalize(u)) == normalize(u).
// =============================================================================

/// Query parameters with this prefix are tracking noise and never part of a
/// page's identity.
const TRACKING_PARAM_PREFIX: &str = "utm_";

/// Whether the fragment survives normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Drop,
    Keep,
}

// The pieces of a URL as they appear in the raw string
#[derive(Debug, PartialEq, Eq)]
struct UrlParts<'a> {
    scheme: &'a str,
    host: &'a str,
    path: &'a str,
    query: &'a str,
    fragment: &'a str,
}

impl<'a> UrlParts<'a> {
    fn parse(input: &'a str) -> Option<Self> {
        let (scheme, rest) = input.split_once(':')?;
        if !is_valid_scheme(scheme) {
            return None;
        }
        let rest = rest.strip_prefix("//")?;

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, rest) = rest.split_at(authority_end);
        // user:password@ never takes part in identity
        let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        if host_name(host).trim().is_empty() {
            return None;
        }

        let (rest, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

        Some(Self {
            scheme,
            host,
            path,
            query,
            fragment,
        })
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
}

// Host without the port, e.g. "example.com:8080" -> "example.com"
fn host_name(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal, keep the brackets
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}

/// Canonicalizes `raw` for identity comparison.
///
/// Returns `None` when the input is not an absolute URL with both a scheme
/// and a host. Callers must treat that as "cannot process this URL".
///
/// ```ignore
/// assert_eq!(
///     normalize("HTTP://Example.com/a/?utm_source=x&b=2", Fragment::Drop),
///     Some("http://example.com/a?b=2".to_string())
/// );
/// ```
pub fn normalize(raw: &str, fragment: Fragment) -> Option<String> {
    let parts = UrlParts::parse(raw.trim())?;

    let scheme = parts.scheme.trim().to_lowercase();
    let host = host_name(parts.host).trim().to_lowercase();
    let path = parts
        .path
        .trim()
        .trim_end_matches(|c: char| c == '/' || c.is_whitespace());

    // Empty pairs are kept, so "?a=1&" and "?a=1" stay distinct pages
    let mut params: Vec<&str> = if parts.query.trim().is_empty() {
        Vec::new()
    } else {
        parts
            .query
            .split('&')
            .map(str::trim)
            .filter(|param| !param.starts_with(TRACKING_PARAM_PREFIX))
            .collect()
    };
    params.sort_unstable();
    let query = params.join("&");

    let mut normalized = format!("{scheme}://{host}{path}");
    if !query.is_empty() {
        normalized.push('?');
        normalized.push_str(&query);
    }
    let kept_fragment = parts.fragment.trim();
    if fragment == Fragment::Keep && !kept_fragment.is_empty() {
        normalized.push('#');
        normalized.push_str(kept_fragment);
    }

    Some(normalized)
}

/// Shorthand for the common case: page identity, fragment discarded.
pub fn normalize_page(raw: &str) -> Option<String> {
    normalize(raw, Fragment::Drop)
}

/// Fragment of a raw href, taken before any normalization.
///
/// Empty when there is no '#', or when the href is nothing but a fragment.
pub fn fragment_of(raw: &str) -> &str {
    match raw.find('#') {
        Some(index) if index > 0 => &raw[index + 1..],
        _ => "",
    }
}

/// Lower-cased host of a URL without port or userinfo.
pub fn host_of(raw: &str) -> Option<String> {
    let parts = UrlParts::parse(raw.trim())?;
    Some(host_name(parts.host).trim().to_lowercase())
}

/// Registrable parent domain of a host per the public suffix list:
/// "docs.blog.example.com" -> "example.com", "a.example.co.uk" -> "example.co.uk".
///
/// IP literals, bare suffixes and single-label hosts are returned unchanged.
pub fn registrable_domain(host: &str) -> &str {
    let host = host.trim_end_matches('.');
    if host.starts_with('[') || host.parse::<std::net::Ipv4Addr>().is_ok() {
        return host;
    }
    psl::domain_str(host).unwrap_or(host)
}
