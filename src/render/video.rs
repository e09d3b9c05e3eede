//! Video embed URLs
//!
//! YouTube and Vimeo links are turned into their player URLs; any other
//! http(s) URL is linked as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use url::{Host, Url};

static YOUTUBE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{6,})",
    )
    .expect("valid regex literal")
});

static VIMEO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.|player\.)?vimeo\.com/(?:video/)?(\d+)")
        .expect("valid regex literal")
});

/// Player URL for a recognised video host, `None` otherwise
pub fn embed_url(url: &str) -> Option<String> {
    let url = url.trim();
    if let Some(caps) = YOUTUBE_RE.captures(url) {
        return Some(format!("https://www.youtube.com/embed/{}", &caps[1]));
    }
    if let Some(caps) = VIMEO_RE.captures(url) {
        return Some(format!("https://player.vimeo.com/video/{}", &caps[1]));
    }
    None
}

/// Whether `url` is an absolute http or https URL with a plain host name
pub fn is_http_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    match parsed.host() {
        Some(Host::Domain(domain)) => domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        None => false,
    }
}
