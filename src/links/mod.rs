//! Anchor extraction, URL normalization and same-domain filtering.
//!
//! Turns raw `href` values from an HTML body into canonical, same-domain,
//! crawlable URLs. Normalization resolves relative references against the
//! page URL, strips query strings and fragments, lower-cases and drops a
//! single trailing slash, so every page has exactly one canonical spelling
//! for deduplication.

use log::debug;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extensions that are explicitly crawlable (besides extension-less paths).
/// Everything else - images, media, feeds, archives - is rejected.
const PAGE_EXTENSIONS: &[&str] = &["html", "htm"];

/// CDN/management paths are never pages.
const ADMIN_PATH_SEGMENT: &str = "/cdn-cgi/";

/// Extract the canonical, same-domain, crawlable URLs linked from `html`.
///
/// Parser failures and unparseable hrefs are skipped, never propagated. The
/// returned list preserves document order and contains no duplicates.
#[must_use]
pub fn extract(html: &str, base_url: &str) -> Vec<String> {
    let base = match Url::parse(base_url) {
        Ok(base) => base,
        Err(e) => {
            debug!("cannot extract links, base URL {base_url} invalid: {e}");
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(candidate) = normalize(href, &base) else {
            continue;
        };
        if !is_crawlable(&candidate) {
            continue;
        }
        if !is_same_domain(&candidate, &base) {
            continue;
        }
        if seen.insert(candidate.clone()) {
            links.push(candidate);
        }
    }
    links
}

/// Canonicalize one href against a base URL.
///
/// Returns `None` for empty values, unparseable references and non-http(s)
/// schemes (mailto, javascript, ftp, data and friends are never pages).
/// Protocol-relative references (`//host/path`) inherit the base scheme.
#[must_use]
pub fn normalize(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_query(None);
    resolved.set_fragment(None);

    let mut canonical = resolved.to_string().to_lowercase();
    if canonical.ends_with('/') {
        canonical.pop();
    }
    Some(canonical)
}

/// Whether a normalized URL looks like a fetchable HTML page.
#[must_use]
pub fn is_crawlable(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path();

    if path.contains(ADMIN_PATH_SEGMENT) {
        return false;
    }

    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        None => true,
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            PAGE_EXTENSIONS.contains(&extension.as_str())
        }
    }
}

/// Whether a normalized URL points at the same host as the base URL, with a
/// real path. The bare domain root is excluded so the start page is never
/// re-discovered through `/` links.
#[must_use]
pub fn is_same_domain(url: &str, base: &Url) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let (Some(host), Some(base_host)) = (parsed.host_str(), base.host_str()) else {
        return false;
    };
    if !host.eq_ignore_ascii_case(base_host) {
        return false;
    }
    !matches!(parsed.path(), "" | "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com";

    fn base() -> Url {
        Url::parse(BASE).expect("base URL parses")
    }

    #[test]
    fn normalize_strips_query_and_fragment() {
        assert_eq!(
            normalize("/page?x=1#top", &base()).as_deref(),
            Some("https://example.com/page")
        );
    }

    #[test]
    fn normalize_lowercases_and_trims_trailing_slash() {
        assert_eq!(
            normalize("/Docs/Guide/", &base()).as_deref(),
            Some("https://example.com/docs/guide")
        );
    }

    #[test]
    fn normalize_rewrites_protocol_relative_to_base_scheme() {
        assert_eq!(
            normalize("//example.com/page", &base()).as_deref(),
            Some("https://example.com/page")
        );
    }

    #[test]
    fn normalize_rejects_non_http_schemes() {
        assert!(normalize("mailto:someone@example.com", &base()).is_none());
        assert!(normalize("javascript:void(0)", &base()).is_none());
        assert!(normalize("ftp://example.com/file", &base()).is_none());
        assert!(normalize("data:text/plain,hello", &base()).is_none());
    }

    #[test]
    fn html_pages_are_crawlable() {
        assert!(is_crawlable("https://example.com/page.html"));
        assert!(is_crawlable("https://example.com/page.htm"));
        assert!(is_crawlable("https://example.com/docs/guide"));
    }

    #[test]
    fn media_and_feeds_are_not_crawlable() {
        assert!(!is_crawlable("https://example.com/image.png"));
        assert!(!is_crawlable("https://example.com/media/clip.mp4"));
        assert!(!is_crawlable("https://example.com/feed.xml"));
    }

    #[test]
    fn management_paths_are_not_crawlable() {
        assert!(!is_crawlable("https://example.com/cdn-cgi/login"));
    }

    #[test]
    fn relative_links_stay_on_domain() {
        assert!(is_same_domain("https://example.com/page", &base()));
        assert!(!is_same_domain("https://otherdomain.com/page", &base()));
    }

    #[test]
    fn host_comparison_is_case_insensitive() {
        let upper = Url::parse("https://EXAMPLE.com").expect("URL parses");
        assert!(is_same_domain("https://example.com/page", &upper));
    }

    #[test]
    fn bare_root_is_excluded() {
        assert!(!is_same_domain("https://example.com", &base()));
        assert!(!is_same_domain("https://example.com/", &base()));
    }

    #[test]
    fn extract_dedups_within_one_pass() {
        let html = r##"
            <html><body>
                <a href="/page">one</a>
                <a href="/page#section">two</a>
                <a href="/page?utm=x">three</a>
                <a href="/other">four</a>
            </body></html>
        "##;
        let links = extract(html, BASE);
        assert_eq!(
            links,
            vec![
                "https://example.com/page".to_string(),
                "https://example.com/other".to_string()
            ]
        );
    }

    #[test]
    fn extract_filters_foreign_and_non_page_links() {
        let html = r##"
            <html><body>
                <a href="https://elsewhere.com/page">foreign</a>
                <a href="/logo.png">image</a>
                <a href="mailto:a@b.c">mail</a>
                <a href="/cdn-cgi/login">admin</a>
                <a href="/about.html">about</a>
                <a href="/">root</a>
            </body></html>
        "##;
        assert_eq!(extract(html, BASE), vec!["https://example.com/about.html"]);
    }

    #[test]
    fn extract_survives_broken_markup() {
        let html = "<a href='/ok'>fine</a><div><a href=";
        assert_eq!(extract(html, BASE), vec!["https://example.com/ok"]);
    }
}
