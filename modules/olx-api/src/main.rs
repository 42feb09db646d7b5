use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use olx_common::Config;
use olx_scraper::Fetcher;

mod rest;

pub struct AppState {
    pub fetcher: Fetcher,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("olx_api=info".parse()?)
                .add_directive("olx_scraper=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    let state = Arc::new(AppState {
        fetcher: Fetcher::new(&config),
    });

    let app = Router::new()
        .route("/health", get(rest::health))
        .route("/olx/v1/search/{query}", get(rest::search))
        .route("/olx/v1/product/{id}", get(rest::product))
        .route("/olx/v1/product/{id}/photos", get(rest::product_photos))
        .route("/olx/v1/product/{id}/price", get(rest::product_price))
        .route("/olx/v1/product/{id}/seller", get(rest::product_seller))
        .route("/olx/v1/product/{id}/description", get(rest::product_description))
        .route("/olx/v1/categories", get(rest::categories))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!(host = %config.host, port = config.port, "olx-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
