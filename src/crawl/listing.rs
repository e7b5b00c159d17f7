//! Publication server endpoints and listing page parsing.

use std::collections::HashSet;

use chrono::NaiveDate;
use scraper::{Html, Selector};
use url::Url;

use super::CrawlError;

pub const DEFAULT_BASE_URL: &str = "https://data.epo.org/publication-server/rest/v1.2";

/// Path appended to a listing link to reach the document body.
const DOCUMENT_PATH: &str = "document.xml";

/// REST root of an EPO publication server.
#[derive(Debug, Clone)]
pub struct PublicationServer {
    base: String,
}

impl PublicationServer {
    pub fn new(base_url: &str) -> Result<Self, CrawlError> {
        let url = Url::parse(base_url).map_err(|e| CrawlError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(CrawlError::BaseUrl {
                url: base_url.to_string(),
                reason: "not a hierarchical URL".to_string(),
            });
        }
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Listing of all publication dates.
    pub fn dates_url(&self) -> String {
        format!("{}/publication-dates/", self.base)
    }

    /// Listing of the documents published on `date` (YYYYMMDD).
    pub fn patents_url(&self, date: &str) -> String {
        format!("{}/publication-dates/{}/patents", self.base, date)
    }
}

/// A document link found on a date's listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub url: String,
    pub doc_id: String,
}

/// `href` values of all anchors, in page order.
pub fn anchor_hrefs(page: &[u8]) -> Vec<String> {
    let html = String::from_utf8_lossy(page);
    let document = Html::parse_document(&html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

/// Last non-empty path segment, ignoring any query or fragment.
pub fn last_segment(href: &str) -> Option<&str> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.split('/').rev().find(|segment| !segment.is_empty())
}

/// Parse a `YYYYMMDD` key.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    if key.len() != 8 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(key, "%Y%m%d").ok()
}

/// Publication dates linked from the date listing, in page order, without
/// repeats. Links whose last segment is not a date are skipped.
pub fn date_entries(page: &[u8]) -> Vec<NaiveDate> {
    let mut seen = HashSet::new();
    anchor_hrefs(page)
        .iter()
        .filter_map(|href| last_segment(href).and_then(parse_date_key))
        .filter(|date| seen.insert(*date))
        .collect()
}

/// Document links on a date listing whose href ends with `suffix`.
///
/// Links are resolved against `page_url`. Repeats on the same page are
/// dropped, keeping the first.
pub fn document_links(page_url: &str, page: &[u8], suffix: &str) -> Vec<DocumentLink> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for href in anchor_hrefs(page) {
        if !href.ends_with(suffix) {
            continue;
        }
        let Some(doc_id) = last_segment(&href) else {
            continue;
        };
        let Ok(resolved) = base.join(&href) else {
            continue;
        };
        let url = format!(
            "{}/{}",
            resolved.as_str().trim_end_matches('/'),
            DOCUMENT_PATH
        );
        if seen.insert(url.clone()) {
            links.push(DocumentLink {
                url,
                doc_id: doc_id.to_string(),
            });
        }
    }
    links
}
