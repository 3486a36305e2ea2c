//! Filesystem naming and link rewriting for saved pages.

use anyhow::{Context, Result};
use lol_html::{element, HtmlRewriter, Settings};
use url::Url;

const MAX_FILE_NAME_LEN: usize = 150;
const FALLBACK_FILE_NAME: &str = "page.html";

/// Derive a filesystem-safe file name from a page URL.
///
/// The URL path (query and fragment excluded) is percent-encoded and every
/// `%` replaced with `_`, so the name contains no path separators or shell
/// metacharacters. Names are capped at 150 characters and always end in
/// `.html`; the site root becomes `index.html`.
#[must_use]
pub fn safe_file_name(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return FALLBACK_FILE_NAME.to_string();
    };

    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        return "index.html".to_string();
    }

    let mut name = urlencoding::encode(path).replace('%', "_");
    name.truncate(MAX_FILE_NAME_LEN);

    if !name.to_lowercase().ends_with(".html") {
        name.push_str(".html");
    }
    name
}

/// Rewrite relative `href`/`src`/`action` attributes to absolute URLs so a
/// saved page renders against the live site.
///
/// # Errors
///
/// Fails when the base URL does not parse or the rewriter rejects the input.
pub fn rewrite_links_absolute(html: &str, base_url: &str) -> Result<String> {
    let base = Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url}"))?;

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("a[href], link[href]", |el| {
                    rewrite_attr(el, "href", &base);
                    Ok(())
                }),
                element!("img[src], script[src]", |el| {
                    rewrite_attr(el, "src", &base);
                    Ok(())
                }),
                element!("form[action]", |el| {
                    rewrite_attr(el, "action", &base);
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );

    rewriter
        .write(html.as_bytes())
        .context("failed to rewrite HTML links")?;
    rewriter.end().context("failed to finish HTML rewrite")?;

    String::from_utf8(output).context("rewritten HTML is not valid UTF-8")
}

fn rewrite_attr(el: &mut lol_html::html_content::Element<'_, '_>, attr: &str, base: &Url) {
    let Some(value) = el.get_attribute(attr) else {
        return;
    };
    let trimmed = value.trim();
    // Leave anchors, javascript: pseudo-links and already-absolute URLs alone.
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with("javascript:")
        || trimmed.starts_with("mailto:")
        || Url::parse(trimmed).is_ok()
    {
        return;
    }
    if let Ok(absolute) = base.join(trimmed) {
        // Attribute came from parsed HTML, so it re-serializes cleanly.
        let _ = el.set_attribute(attr, absolute.as_str());
    }
}
