//! HTML metadata extraction.
//!
//! 从网页中提取标题、缩略图和 favicon。

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

const ICON_RELS: [&str; 4] = [
    "icon",
    "shortcut icon",
    "apple-touch-icon",
    "apple-touch-icon-precomposed",
];

/// Touch icons outrank plain icons of the same size.
const TOUCH_ICON_WEIGHT: u64 = 100;
const UNSIZED_TOUCH_RANK: u64 = 10;
const UNSIZED_ICON_RANK: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: Option<String>,
    /// Absolute url of the og:image style thumbnail.
    pub thumbnail: Option<String>,
    /// Absolute url of the best favicon; `/favicon.ico` when none is declared.
    pub favicon: String,
}

pub fn parse_page(body: &str, base: &Url) -> PageMetadata {
    let html = Html::parse_document(body);

    let title = select_attr(&html, r#"meta[property="og:title"]"#, "content")
        .or_else(|| select_title(&html))
        .or_else(|| regex_title(body));

    let thumbnail = select_attr(&html, r#"meta[property="og:image"]"#, "content")
        .or_else(|| select_attr(&html, r#"meta[name="thumbnail"]"#, "content"))
        .or_else(|| select_attr(&html, r#"meta[name="image"]"#, "content"))
        .and_then(|href| repair_path(base, &href));

    let favicon = best_favicon(&html)
        .and_then(|href| repair_path(base, &href))
        .or_else(|| repair_path(base, "/favicon.ico"))
        .unwrap_or_else(|| base.to_string());

    PageMetadata {
        title,
        thumbnail,
        favicon,
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn select_attr(html: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    html.select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .find_map(non_blank)
}

fn select_title(html: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let element = html.select(&selector).next()?;
    non_blank(&element.text().collect::<String>())
}

fn regex_title(body: &str) -> Option<String> {
    static TITLE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = TITLE
        .get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.+?)</title>").ok())
        .as_ref()?;
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| non_blank(m.as_str()))
}

/// `sizes="180x180"` → 32400. Only the first size token is used; an area
/// that does not fit in a `u64` counts as undeclared.
fn declared_area(sizes: &str) -> Option<u64> {
    let first = sizes.split_whitespace().next()?.to_ascii_lowercase();
    let (w, h) = first.split_once('x')?;
    w.parse::<u64>().ok()?.checked_mul(h.parse::<u64>().ok()?)
}

fn best_favicon(html: &Html) -> Option<String> {
    let selector = Selector::parse("link[rel][href]").ok()?;
    let mut best: Option<(u64, String)> = None;

    for element in html.select(&selector) {
        let el = element.value();
        let rel = el.attr("rel").unwrap_or_default().trim().to_ascii_lowercase();
        if !ICON_RELS.contains(&rel.as_str()) {
            continue;
        }
        let Some(href) = el.attr("href").and_then(non_blank) else {
            continue;
        };
        let touch = rel.starts_with("apple-touch-icon");
        let rank = match el.attr("sizes").and_then(declared_area) {
            Some(area) if touch => area.saturating_mul(TOUCH_ICON_WEIGHT),
            Some(area) => area,
            None if touch => UNSIZED_TOUCH_RANK,
            None => UNSIZED_ICON_RANK,
        };
        if best.as_ref().map_or(true, |(current, _)| rank > *current) {
            best = Some((rank, href));
        }
    }

    best.map(|(_, href)| href)
}

/// Makes a page-relative reference absolute.
pub fn repair_path(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.starts_with("http") {
        return Some(reference.to_string());
    }
    if let Some(rest) = reference.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    let origin = base.origin();
    if !origin.is_tuple() {
        return None;
    }
    let origin = origin.ascii_serialization();
    match reference.strip_prefix('/') {
        Some(path) => Some(format!("{origin}/{path}")),
        None => Some(format!("{origin}/{reference}")),
    }
}
