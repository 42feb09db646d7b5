use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One search result card. `id` may be empty for promotional entries
/// that survive filtering via a non-empty title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    /// Display string as shown on the page ("1 200 zł", "Za darmo", ...).
    pub price: String,
    /// "City" or "City, Region".
    pub location: String,
    pub date: String,
    pub has_delivery: bool,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub name: String,
    pub member_since: String,
}

/// Full product record. "Not found" is an empty `title`, never an
/// absent object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: String,
    pub title: String,
    /// Plain text: `<br>` mapped to newline, all other tags stripped.
    pub description: String,
    pub price: String,
    pub negotiable: bool,
    /// Label → value. Price-labeled entries are diverted to `price`.
    pub parameters: BTreeMap<String, String>,
    /// Fully-resolved image URLs with size/quality tokens removed.
    pub photos: Vec<String>,
    pub location: String,
    pub posted_at: String,
    pub seller: Seller,
    pub url: String,
}

/// One parsed page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Meaningful only on page 1; later pages carry whatever the
    /// source echoes and the aggregator ignores it.
    pub total_count: u64,
    /// 1-based.
    pub page: u32,
    pub results: Vec<Listing>,
}

/// Aggregated response returned to the route layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub total_count: u64,
    pub limit: usize,
    pub results: Vec<Listing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// Path without leading/trailing slash, e.g. "elektronika".
    pub slug: String,
    pub url: String,
}
