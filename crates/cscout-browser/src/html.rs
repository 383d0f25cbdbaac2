//! Target-link scanning over raw HTML.

use regex::Regex;
use scraper::{Html, Selector};

/// Hrefs of `<a>` elements starting with `prefix`, in document order, without duplicates.
pub fn anchor_hrefs(html: &str, prefix: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut out: Vec<String> = Vec::new();
    for a in document.select(&sel) {
        let Some(href) = a.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.starts_with(prefix) && !out.iter().any(|h| h == href) {
            out.push(href.to_string());
        }
    }
    out
}

/// Fallback for pages that only carry the target in scripts or data
/// attributes: regex-scan the raw source for URLs starting with `prefix`.
pub fn inline_urls(html: &str, prefix: &str) -> Vec<String> {
    let Ok(re) = Regex::new(&format!(r#"{}[^\s"'<>\\]+"#, regex::escape(prefix))) else {
        return Vec::new();
    };

    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(html) {
        let url = m.as_str().replace("&amp;", "&");
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}
