pub mod categories;
pub mod detail;
pub mod fetcher;
mod json;
pub mod listing;
mod markup;
pub mod renderer;
pub mod search;
pub mod state;

pub use categories::{fetch_categories, parse_categories};
pub use detail::{
    fetch_product, parse_detail_from_api, parse_detail_from_html, parse_detail_from_state,
    parse_detail_page,
};
pub use fetcher::{Fetcher, PageFetcher};
pub use listing::parse_search_page;
pub use search::{build_search_url, search_listings, Condition, SearchFilters};

pub const BASE_URL: &str = "https://www.olx.pl";

/// Resolve a possibly-relative marketplace href against the site root.
pub(crate) fn absolutize(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{BASE_URL}{href}")
    }
}
