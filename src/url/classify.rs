//! Page classification by path extension, with a content-type probe for
//! extensions that say nothing either way

use crate::crawler::CrawlCollaborator;
use crate::retry::RetryPolicy;
use url::Url;

/// Extensions that never name an HTML page
const NON_PAGE_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico", "tif", "tiff", "avif",
    // audio / video
    "mp3", "wav", "ogg", "flac", "m4a", "mp4", "avi", "mov", "wmv", "mkv", "webm",
    // archives
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2", "xz",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "csv", "txt", "rtf",
    // web assets and feeds
    "css", "js", "mjs", "json", "xml", "rss", "atom", "map", "woff", "woff2", "ttf", "otf", "eot",
    // binaries
    "exe", "msi", "dmg", "iso", "apk", "bin", "deb", "rpm",
];

/// Extensions served as HTML by common server stacks
const PAGE_EXTENSIONS: &[&str] = &[
    "html", "htm", "xhtml", "php", "asp", "aspx", "jsp", "cfm", "shtml",
];

/// Outcome of the network-free classification step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Page,
    NotAPage,
    /// Unknown extension; needs a content-type probe
    NeedsProbe,
}

/// Classifies a URL by the extension of its last path segment
pub fn classify_by_extension(url: &str) -> Classification {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(_) => return Classification::NotAPage,
    };

    let last_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    let extension = match last_segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => return Classification::Page,
    };

    if NON_PAGE_EXTENSIONS.contains(&extension.as_str()) {
        Classification::NotAPage
    } else if PAGE_EXTENSIONS.contains(&extension.as_str()) {
        Classification::Page
    } else {
        Classification::NeedsProbe
    }
}

/// Returns true for HTML-family content types
pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.trim().to_ascii_lowercase();
    lower.starts_with("text/html") || lower.starts_with("application/xhtml+xml")
}

/// Decides whether a URL is a crawlable page
///
/// Known extensions are decided locally. Anything else is probed through the
/// collaborator; a failed or empty probe counts as "not a page".
pub async fn is_page<C>(url: &str, collaborator: &C, retry: &RetryPolicy) -> bool
where
    C: CrawlCollaborator + ?Sized,
{
    match classify_by_extension(url) {
        Classification::Page => true,
        Classification::NotAPage => false,
        Classification::NeedsProbe => {
            match retry
                .run_async(|| collaborator.probe_content_type(url))
                .await
            {
                Ok(Some(content_type)) => is_html_content_type(&content_type),
                Ok(None) => false,
                Err(e) => {
                    tracing::debug!("Content-type probe failed for {}: {}", url, e);
                    false
                }
            }
        }
    }
}
