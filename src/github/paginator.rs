use reqwest::header::{HeaderMap, LINK};
use reqwest::Url;
use serde_json::Value;

use crate::github::executor::ApiResponse;

/// One entry of an RFC 8288 `Link` header.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    pub rel: String,
    pub url: String,
}

pub fn parse_link_header(value: &str) -> Vec<PageLink> {
    value
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let url = parts
                .next()?
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string();
            let rel = parts.find_map(|param| {
                let (key, value) = param.split_once('=')?;
                (key.trim() == "rel").then(|| value.trim().trim_matches('"').to_string())
            })?;
            Some(PageLink { rel, url })
        })
        .collect()
}

fn links(headers: &HeaderMap) -> Vec<PageLink> {
    headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .map(parse_link_header)
        .unwrap_or_default()
}

pub fn has_next(headers: &HeaderMap) -> bool {
    links(headers).iter().any(|link| link.rel == "next")
}

/// Page number of the `rel="last"` link, if there is one and it parses.
pub fn last_page(headers: &HeaderMap) -> Option<u64> {
    let links = links(headers);
    let last = links.iter().find(|link| link.rel == "last")?;
    let page = Url::parse(&last.url).ok().and_then(|url| {
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    });
    if page.is_none() {
        tracing::warn!("Could not parse page number from 'last' link: {}", last.url);
    }
    page
}

/// Total collection size implied by a one-item page's `rel="last"` link.
///
/// Only meaningful when the request used `per_page=1`, since only then does
/// each page hold exactly one item. With no `last` link the collection fits on
/// the returned page and the caller should count the body instead.
pub fn estimate_count(response: &ApiResponse, requested_page_size: u32) -> Option<u64> {
    let last = last_page(&response.headers)?;
    if requested_page_size != 1 {
        tracing::warn!(
            "Link header found, but request used per_page={} (expected 1 for count estimation)",
            requested_page_size
        );
        return None;
    }
    Some(last)
}

/// Items in the returned page; anything other than an array counts as empty.
pub fn fallback_count(body: &Value) -> u64 {
    body.as_array().map(|items| items.len() as u64).unwrap_or(0)
}

pub fn count_or_fallback(response: &ApiResponse, requested_page_size: u32) -> u64 {
    estimate_count(response, requested_page_size).unwrap_or_else(|| fallback_count(&response.body))
}
