//! HTTP API consumed by the dashboard.
//!
//! - `GET  /api/init`: analysis table, recent macro/sentiment rows, portfolio
//! - `POST /api/portfolio/save`: store the dashboard portfolio
//! - `POST /api/deep-analyze`: AI report over the insight pack for one ticker or a portfolio
//! - `GET  /api/analyze/latest`: analysis table only
//! - `POST /api/ai-strategy`: AI strategy for a single analysis row

pub mod routes;
pub mod state;

use crate::config::ServerConfig;
use crate::errors::Result;
use crate::llm::GeminiClient;
use crate::storage::GithubStore;
use axum::http::{header, Method};
use axum::Router;
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use routes::router;
pub use state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        warn!("CORS_ORIGINS not set, allowing any origin");
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();
        if parsed.is_empty() {
            warn!("CORS_ORIGINS contains no valid origins, allowing any");
            AllowOrigin::any()
        } else {
            info!("CORS configured with {} allowed origins", parsed.len());
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Router with CORS applied, ready to serve.
pub fn app(state: Arc<AppState>, config: &ServerConfig) -> Router {
    router(state).layer(cors_layer(&config.cors_origins))
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let store = GithubStore::from_config(&config)?;
    let llm = GeminiClient::new(&config.gemini_api_key, &config.gemini_model)?;
    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY is empty, AI endpoints will report errors");
    }
    if !store.can_write() {
        info!("GITHUB_TOKEN not set, saved portfolios stay in memory");
    }

    let state = Arc::new(AppState::new(store, Arc::new(llm)));
    let app = app(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
