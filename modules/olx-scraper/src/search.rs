//! Pagination aggregation: drives retrieval + extraction across
//! successive result pages until the requested count is reached.

use tracing::info;

use olx_common::{ScrapeError, SearchResponse};

use crate::fetcher::PageFetcher;
use crate::listing;
use crate::BASE_URL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Condition::New),
            "used" => Some(Condition::Used),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub has_delivery: bool,
    pub condition: Option<Condition>,
    /// Category slug, e.g. "elektronika". Changes the search path.
    pub category: Option<String>,
}

/// Collapse query whitespace into the hyphenated slug the search path
/// expects.
fn query_slug(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Build the URL for one result page. Filter parameters appear only
/// when supplied; the page parameter only past page 1.
pub fn build_search_url(query: &str, filters: &SearchFilters, page: u32) -> String {
    let slug = query_slug(query);
    let base = match &filters.category {
        Some(category) => format!("{BASE_URL}/{category}/q-{slug}/"),
        None => format!("{BASE_URL}/oferty/q-{slug}/"),
    };

    let mut params = Vec::new();
    if let Some(from) = filters.min_price {
        params.push(format!("search[filter_float_price:from]={from}"));
    }
    if let Some(to) = filters.max_price {
        params.push(format!("search[filter_float_price:to]={to}"));
    }
    if filters.has_delivery {
        params.push("search[filter_enum_delivery:0]=courier".to_string());
    }
    if let Some(condition) = filters.condition {
        params.push(format!("search[filter_enum_state:0]={}", condition.as_str()));
    }
    if page > 1 {
        params.push(format!("page={page}"));
    }

    if params.is_empty() {
        base
    } else {
        format!("{base}?{}", params.join("&"))
    }
}

/// Retrieve and parse pages until `limit` results are accumulated,
/// then truncate to exactly `limit`. The total count is taken from
/// page 1 only, and an empty page ends the loop regardless of how many
/// results are still missing — the upstream total is not trusted.
pub async fn search_listings(
    fetcher: &dyn PageFetcher,
    query: &str,
    filters: &SearchFilters,
    limit: usize,
) -> Result<SearchResponse, ScrapeError> {
    let mut results = Vec::new();
    let mut total_count = 0;
    let mut page: u32 = 1;

    while results.len() < limit {
        let url = build_search_url(query, filters, page);
        let html = fetcher.retrieve(&url).await?;
        let parsed = listing::parse_search_page(&html, page);

        if page == 1 {
            total_count = parsed.total_count;
        }
        if parsed.results.is_empty() {
            break;
        }
        results.extend(parsed.results);
        page += 1;
    }

    results.truncate(limit);
    info!(query, limit, returned = results.len(), total_count, "Search aggregated");

    Ok(SearchResponse {
        total_count,
        limit,
        results,
    })
}
