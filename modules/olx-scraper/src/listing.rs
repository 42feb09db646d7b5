//! Search-results extraction. The embedded-state path is preferred
//! because it carries fully-resolved image URLs and richer fields; the
//! markup path only runs when the state yields nothing.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use olx_common::{Listing, SearchPage};

use crate::markup::{own_text, strip_style_blocks, text_of};
use crate::{absolutize, json, state};

/// Parse one retrieved page of search results. `page` is 1-based.
pub fn parse_search_page(html: &str, page: u32) -> SearchPage {
    if let Some(parsed) = parse_from_state(html, page) {
        if !parsed.results.is_empty() {
            return parsed;
        }
        debug!(page, "Embedded state yielded no results, falling back to markup");
    }
    parse_from_html(html, page)
}

fn parse_from_state(html: &str, page: u32) -> Option<SearchPage> {
    let state = state::extract_state(html)?;
    let ads = state::listing_ads(&state)?;

    let total_count = if page == 1 {
        state::listing_total_count(&state)
    } else {
        0
    };
    let results = ads.iter().filter_map(listing_from_ad).collect();

    Some(SearchPage {
        total_count,
        page,
        results,
    })
}

fn listing_from_ad(ad: &Value) -> Option<Listing> {
    let id = ad.get("id").map(json::id_string).unwrap_or_default();

    // Promoted banner slots carry no id; drop them.
    let promoted = ad.get("isHighlighted").and_then(Value::as_bool).unwrap_or(false);
    if promoted && id.is_empty() {
        return None;
    }

    let price = json::str_at(ad, "/price/displayValue")
        .or_else(|| json::str_at(ad, "/price/regularPrice/displayValue"))
        .unwrap_or_default()
        .to_string();

    let location = json::join_location(
        json::str_at(ad, "/location/city/name"),
        json::str_at(ad, "/location/region/name"),
    );

    let date = json::str_field(ad, "lastRefreshTime")
        .or_else(|| json::str_field(ad, "createdTime"))
        .unwrap_or_default()
        .to_string();

    Some(Listing {
        id,
        title: json::str_field(ad, "title").unwrap_or_default().to_string(),
        price,
        location,
        date,
        has_delivery: delivery_active(ad),
        url: ad
            .get("url")
            .and_then(Value::as_str)
            .map(absolutize)
            .unwrap_or_default(),
    })
}

/// Delivery is on when any delivery-channel entry is active, or when
/// the safe-transaction flag is.
fn delivery_active(ad: &Value) -> bool {
    if let Some(Value::Array(channels)) = ad.get("delivery") {
        return channels.iter().any(|c| json::bool_at(c, "/active"));
    }
    json::bool_at(ad, "/delivery/active") || json::bool_at(ad, "/safedeal/active")
}

// --- Markup fallback ---

static RE_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d\s]*").unwrap());

fn parse_from_html(html: &str, page: u32) -> SearchPage {
    let html = strip_style_blocks(html);
    let document = Html::parse_document(&html);

    // Stable structural attributes; the tag nesting around them varies.
    let card_sel = Selector::parse(r#"[data-testid="l-card"]"#).unwrap();
    let link_sel = Selector::parse("a").unwrap();
    let title_sel = Selector::parse(
        r#"[data-testid="ad-card-title"] h4, [data-testid="ad-card-title"] h6"#,
    )
    .unwrap();
    let price_sel = Selector::parse(r#"[data-testid="ad-price"]"#).unwrap();
    let location_date_sel = Selector::parse(r#"[data-testid="location-date"]"#).unwrap();
    let delivery_sel = Selector::parse(
        r#"[data-testid="card-delivery-badge"], [data-testid="free-delivery-tag"]"#,
    )
    .unwrap();

    let total_count = if page == 1 {
        displayed_total_count(&document)
    } else {
        0
    };

    let mut results = Vec::new();
    for card in document.select(&card_sel) {
        let id = card.attr("id").unwrap_or_default().to_string();
        let href = card
            .select(&link_sel)
            .next()
            .and_then(|a| a.attr("href"))
            .unwrap_or_default();

        let title = card.select(&title_sel).next().map(text_of).unwrap_or_default();

        // Prefer the price cell's own text nodes; nested elements hold
        // the negotiation sub-label.
        let price = card
            .select(&price_sel)
            .next()
            .map(|el| {
                let own = own_text(el);
                if own.is_empty() { text_of(el) } else { own }
            })
            .unwrap_or_default();

        let location_date = card
            .select(&location_date_sel)
            .next()
            .map(text_of)
            .unwrap_or_default();
        let (location, date) = split_location_date(&location_date);

        let has_delivery = card.select(&delivery_sel).next().is_some();

        if id.is_empty() && title.is_empty() {
            continue;
        }
        results.push(Listing {
            id,
            title,
            price,
            location,
            date,
            has_delivery,
            url: absolutize(href),
        });
    }

    SearchPage {
        total_count,
        page,
        results,
    }
}

/// The displayed count uses embedded spaces as thousands separators
/// ("2 344 ogłoszeń").
fn displayed_total_count(document: &Html) -> u64 {
    let sel = Selector::parse(r#"[data-testid="total-count"]"#).unwrap();
    let text = match document.select(&sel).next() {
        Some(el) => text_of(el),
        None => return 0,
    };
    RE_COUNT
        .find(&text)
        .and_then(|m| m.as_str().replace(' ', "").parse().ok())
        .unwrap_or(0)
}

fn split_location_date(joined: &str) -> (String, String) {
    match joined.split_once(" - ") {
        Some((location, date)) => (location.trim().to_string(), date.trim().to_string()),
        None => (joined.trim().to_string(), String::new()),
    }
}
