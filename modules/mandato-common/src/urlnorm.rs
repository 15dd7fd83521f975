//! Canonical URL handling for cross-source deduplication.

use url::Url;

/// Hosts that wrap the real article URL in a query parameter.
fn is_aggregator_host(host: &str) -> bool {
    host.contains("news.google.")
}

/// Query parameters aggregator wrappers use for the real URL.
const WRAPPED_URL_PARAMS: [&str; 3] = ["url", "q", "u"];

/// Compute the canonical form of a news URL: aggregator wrappers unwrapped,
/// host lowercased with `www.` stripped, trailing slash trimmed from the
/// path. The canonical key is `host + path`.
///
/// Unparseable input falls back to the lowercased raw string.
pub fn canonical_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let parsed = match Url::parse(raw) {
        Ok(u) => u,
        Err(_) => return raw.to_lowercase(),
    };

    let parsed = unwrap_aggregator(parsed);

    let host = parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .map(|h| h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
        .unwrap_or_default();

    let path = parsed.path().trim_end_matches('/');
    format!("{host}{path}").to_lowercase()
}

/// If the URL points at a known news-aggregator wrapper, extract the real
/// article URL from its query string when present.
fn unwrap_aggregator(parsed: Url) -> Url {
    let host = match parsed.host_str() {
        Some(h) => h.to_lowercase(),
        None => return parsed,
    };
    if !is_aggregator_host(&host) {
        return parsed;
    }

    for (key, value) in parsed.query_pairs() {
        if WRAPPED_URL_PARAMS.contains(&key.as_ref()) && value.starts_with("http") {
            if let Ok(real) = Url::parse(&value) {
                return real;
            }
        }
    }
    parsed
}

/// Extract the portal domain from a URL: lowercased host minus `www.`.
///
/// ```
/// assert_eq!(mandato_common::extract_domain("https://www.G1.globo.com/x"), "g1.globo.com");
/// assert_eq!(mandato_common::extract_domain("not a url"), "");
/// ```
pub fn extract_domain(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.to_lowercase())
            .map(|h| h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}
