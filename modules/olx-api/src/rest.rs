//! Route handlers. Thin by design: parameter extraction, one core
//! call, and result/error translation into responses.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use olx_common::ProductDetail;
use olx_scraper::{fetch_categories, fetch_product, search_listings, Condition, SearchFilters};

use crate::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    limit: Option<usize>,
    min_price: Option<u64>,
    max_price: Option<u64>,
    has_delivery: Option<bool>,
    condition: Option<String>,
    category: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
    Query(params): Query<SearchQuery>,
) -> Response {
    let limit = params.limit.unwrap_or(40).max(1);
    let filters = SearchFilters {
        min_price: params.min_price,
        max_price: params.max_price,
        has_delivery: params.has_delivery.unwrap_or(false),
        condition: params.condition.as_deref().and_then(Condition::parse),
        category: params.category,
    };

    match search_listings(&state.fetcher, &query, &filters, limit).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            error!(error = %e, query, "Search failed");
            failure("Failed to fetch search results", &e)
        }
    }
}

pub async fn product(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match product_or_not_found(&state, &id).await {
        Ok(product) => Json(product).into_response(),
        Err(response) => response,
    }
}

pub async fn product_photos(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match product_or_not_found(&state, &id).await {
        Ok(product) => Json(json!({"id": product.id, "photos": product.photos})).into_response(),
        Err(response) => response,
    }
}

pub async fn product_price(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match product_or_not_found(&state, &id).await {
        Ok(product) => Json(json!({
            "id": product.id,
            "price": product.price,
            "negotiable": product.negotiable,
        }))
        .into_response(),
        Err(response) => response,
    }
}

pub async fn product_seller(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match product_or_not_found(&state, &id).await {
        Ok(product) => Json(json!({"id": product.id, "seller": product.seller})).into_response(),
        Err(response) => response,
    }
}

pub async fn product_description(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match product_or_not_found(&state, &id).await {
        Ok(product) => Json(json!({
            "id": product.id,
            "description": product.description,
            "parameters": product.parameters,
        }))
        .into_response(),
        Err(response) => response,
    }
}

pub async fn categories(State(state): State<Arc<AppState>>) -> Response {
    match fetch_categories(&state.fetcher).await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => {
            error!(error = %e, "Categories fetch failed");
            failure("Failed to fetch categories", &e)
        }
    }
}

/// Fetch a product, mapping "does not exist" (absent payload, empty
/// title, or an upstream 404) onto a not-found response.
async fn product_or_not_found(state: &AppState, id: &str) -> Result<ProductDetail, Response> {
    match fetch_product(&state.fetcher, id).await {
        Ok(Some(product)) if !product.title.is_empty() => Ok(product),
        Ok(_) => Err(not_found()),
        Err(e) if e.status_code() == Some(404) => Err(not_found()),
        Err(e) => {
            error!(error = %e, id, "Product fetch failed");
            Err(failure("Failed to fetch product details", &e))
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Product not found"}))).into_response()
}

fn failure(message: &str, err: &olx_common::ScrapeError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": message, "details": err.to_string()})),
    )
        .into_response()
}
