use url::Url;

/// Extracts the lowercase host (without port) from a URL string
///
/// # Examples
///
/// ```
/// use crawl_ledger::url::extract_host;
///
/// assert_eq!(extract_host("https://EXAMPLE.COM/path"), Some("example.com".to_string()));
/// assert_eq!(extract_host("not a url"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Returns true if both URLs point at the same host (port ignored)
pub fn same_host(a: &str, b: &str) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Returns the path of a URL, `/` for the site root
pub fn url_path(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|u| u.path().to_string())
}
