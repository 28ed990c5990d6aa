//! REST API server module
//!
//! Exposes the downloader over HTTP: format discovery, asynchronous job
//! creation, live progress streaming (SSE), result delivery, and the
//! legacy synchronous download path.

use crate::{Config, MediaDownloader, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Formats
/// - `GET /api/formats` - List selectable formats for a URL
///
/// ## Jobs
/// - `POST /api/download/start` - Create a download job
/// - `GET /api/progress/:job_id` - Live progress stream (SSE)
/// - `GET /api/download/result/:job_id` - Fetch the produced file
///
/// ## Legacy
/// - `GET /api/download` - Synchronous download in one request
///
/// ## System
/// - `GET /api/health` - Health check
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive documentation (if enabled)
///
/// A configured static web directory is served as the router fallback.
pub fn create_router(downloader: Arc<MediaDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        // Formats
        .route("/api/formats", get(routes::list_formats))
        // Jobs
        .route("/api/download/start", post(routes::start_download))
        .route("/api/progress/:job_id", get(routes::stream_progress))
        .route("/api/download/result/:job_id", get(routes::download_result))
        // Legacy
        .route("/api/download", get(routes::legacy_download))
        // System
        .route("/api/health", get(routes::health_check))
        .route("/api/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state)
    // Note: SwaggerUi will use the existing /api/openapi.json endpoint we already defined
    let router = if config.server.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    // Add state to all routes
    let router = router.with_state(state);

    // Serve the static client UI as the fallback, when configured
    let router = if let Some(ref web_dir) = config.server.web_dir {
        router.fallback_service(ServeDir::new(web_dir).append_index_html_on_directories(true))
    } else {
        router
    };

    // Apply CORS middleware if enabled in config
    if config.server.cors_enabled {
        let cors = build_cors_layer(&config.server.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// Allows the specified origins ("*" for any), all methods, and all
/// headers for cross-origin requests from the local client UI.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Creates a TCP listener, binds it to the configured address, and serves
/// the API router until the server is shut down.
pub async fn start_api_server(
    downloader: Arc<MediaDownloader>,
    config: Arc<Config>,
) -> Result<()> {
    let bind_address = config.server.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServer(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
