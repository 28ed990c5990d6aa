//! Format discovery handler.

use crate::api::AppState;
use crate::error::Error;
use crate::types::FormatListing;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

/// Query parameters for GET /api/formats
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct FormatsQuery {
    /// Source URL to probe (required)
    pub url: Option<String>,
}

/// GET /api/formats - List selectable formats for a URL
///
/// Probes the extraction engine for metadata only and returns the
/// deduplicated video and audio candidate lists.
#[utoipa::path(
    get,
    path = "/api/formats",
    tag = "formats",
    params(
        ("url" = String, Query, description = "Source URL")
    ),
    responses(
        (status = 200, description = "Available formats", body = FormatListing),
        (status = 400, description = "Missing URL"),
        (status = 502, description = "Extraction engine failure")
    )
)]
pub async fn list_formats(
    State(state): State<AppState>,
    Query(query): Query<FormatsQuery>,
) -> Result<Json<FormatListing>, Error> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::BadRequest("missing required parameter: url".to_string()))?;

    let listing = state.downloader.list_formats(&url).await.inspect_err(|e| {
        tracing::error!(url, error = %e, "format listing failed");
    })?;

    Ok(Json(listing))
}
