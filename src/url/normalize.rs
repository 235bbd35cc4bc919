use crate::UrlError;
use url::{form_urlencoded, Position, Url};

/// Tracking query parameters dropped during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a URL into the canonical form used as the store key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed, not HTTP(S), or hostless
/// 2. Lowercase scheme and host, drop the default port (done by the parser)
/// 3. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse empty segments from repeated slashes
///    - Remove the trailing slash, the root included
/// 4. Remove fragment
/// 5. Remove tracking query parameters
/// 6. Sort remaining query parameters by key
/// 7. Remove empty query string
///
/// The result is stable under re-normalization.
///
/// # Examples
///
/// ```
/// use crawl_ledger::url::normalize_url;
///
/// assert_eq!(normalize_url("HTTPS://Example.COM/").unwrap(), "https://example.com");
/// assert_eq!(normalize_url("https://example.com/a/b/").unwrap(), "https://example.com/a/b");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    // scheme://[userinfo@]host[:port]
    let mut canonical = url[..Position::AfterPort].to_string();
    canonical.push_str(&normalize_path(url.path()));

    if let Some(query) = normalize_query(&url) {
        canonical.push('?');
        canonical.push_str(&query);
    }

    Ok(canonical)
}

/// Normalizes a URL path; the root path becomes the empty string
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return String::new();
    }

    format!("/{}", segments.join("/"))
}

/// Filters tracking parameters and sorts the rest; `None` when nothing is left
fn normalize_query(url: &Url) -> Option<String> {
    url.query()?;

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if params.is_empty() {
        return None;
    }

    // Stable: repeated keys keep their relative order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    Some(
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish(),
    )
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
