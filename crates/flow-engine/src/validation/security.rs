//! SSRF guard for user-supplied request URLs

use url::Url;

/// Hostname prefixes that may point at the local machine, cloud metadata
/// endpoints or private networks. Matching is by prefix only, so e.g.
/// `172.20.0.1` is not covered.
const BLOCKED_HOST_PREFIXES: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "169.254.169.254",
    "metadata.google.internal",
    "10.",
    "172.16.",
    "192.168.",
];

/// Whether `url` may be requested on behalf of a workflow
///
/// Unparseable URLs, non-http(s) schemes and blocked hosts are unsafe.
pub fn is_url_safe(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    if BLOCKED_HOST_PREFIXES.iter().any(|prefix| host.starts_with(prefix)) {
        return false;
    }

    matches!(parsed.scheme(), "http" | "https")
}
