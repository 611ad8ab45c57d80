use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::SiteConfig;
use crate::models::Candidate;

/// Anchor preference inside a listing row: post-like URL hints first,
/// then any anchor at all.
const ANCHOR_PREFERENCE: &[&str] = &[
    "a[href*='view']",
    "a[href*='thread']",
    "a[href*='post']",
    "a",
];

/// Parse a listing page into candidate (title, url) pairs.
///
/// Rows come from the site's configured row selector. Rows without a
/// usable anchor, or with an empty title or href, are dropped. Some
/// sites make the row element itself the anchor rather than nesting
/// one; both shapes are handled.
pub fn extract_candidates(html: &str, site: &SiteConfig) -> Vec<Candidate> {
    let document = Html::parse_document(html);

    // Selectors are validated at config load; a parse failure here means
    // the config was constructed by hand, so just yield nothing.
    let Ok(row_selector) = Selector::parse(&site.row_selector) else {
        return Vec::new();
    };
    let anchor_selectors: Vec<Selector> = ANCHOR_PREFERENCE
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect();

    // HH:MM, MM-DD or YYYY-MM-DD, whichever the listing happens to show.
    let time_re = Regex::new(r"(\d{4}-\d{2}-\d{2}|\d{2}-\d{2}|\d{2}:\d{2})").ok();

    let mut candidates = Vec::new();
    for row in document.select(&row_selector) {
        let Some(anchor) = find_anchor(row, &anchor_selectors) else {
            continue;
        };

        let title = collapse_whitespace(&anchor.text().collect::<String>());
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if title.is_empty() || href.trim().is_empty() {
            continue;
        }

        let url = resolve_url(href.trim(), &site.domain);
        let original_time = extract_time(row, &title, time_re.as_ref());

        candidates.push(Candidate {
            title,
            url,
            original_time,
        });
    }
    candidates
}

fn find_anchor<'a>(row: ElementRef<'a>, preference: &[Selector]) -> Option<ElementRef<'a>> {
    // The row may itself be the anchor.
    if row.value().name() == "a" {
        return Some(row);
    }
    preference.iter().find_map(|sel| row.select(sel).next())
}

/// Best-effort display time: a time-ish token from the row text with the
/// title removed, else the scrape wall clock. Not an event timestamp.
fn extract_time(row: ElementRef, title: &str, time_re: Option<&Regex>) -> String {
    let row_text = collapse_whitespace(&row.text().collect::<Vec<_>>().join(" "));
    let without_title = row_text.replace(title, "");
    time_re
        .and_then(|re| re.captures(&without_title))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| chrono::Local::now().format("%H:%M").to_string())
}

/// Resolve a possibly-relative href against the site's declared domain.
pub fn resolve_url(href: &str, domain: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    if let Ok(base) = url::Url::parse(domain) {
        if let Ok(resolved) = base.join(href) {
            return resolved.to_string();
        }
    }

    href.to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
