use std::sync::LazyLock;

use indexmap::IndexSet;
use scraper::Selector;
use url::Url;

use super::Document;

// Links in narrative prose only; tables, info-boxes and navigation are skipped.
static PARAGRAPH_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.mw-parser-output > p > a").unwrap());

/// Resolve a raw `href` to an absolute URL string.
///
/// `/path` is prefixed with `origin`, `//host/path` gets `https:`, absolute
/// http(s) URLs pass through byte-for-byte. Empty targets, fragments and
/// non-http schemes are not links.
pub fn normalize_link(origin: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    if raw.starts_with("//") {
        return Some(format!("https:{}", raw));
    }
    if raw.starts_with('/') {
        return Some(format!("{}{}", origin.trim_end_matches('/'), raw));
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(raw.to_string()),
        Ok(_) => None,
        Err(_) => Url::parse(origin)
            .and_then(|base| base.join(raw))
            .ok()
            .map(String::from),
    }
}

/// Every paragraph link on the page, normalized, deduplicated, first-seen order.
pub fn extract_links(doc: &Document, origin: &str) -> Vec<String> {
    let links: IndexSet<String> = doc
        .select(&PARAGRAPH_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| normalize_link(origin, href))
        .collect();
    links.into_iter().collect()
}
