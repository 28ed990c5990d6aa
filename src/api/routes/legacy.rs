//! Legacy synchronous download handler.
//!
//! The whole pipeline runs inside one request/response cycle: no job, no
//! event queue, no streaming progress. Useful for simple clients; the
//! asynchronous job endpoints are the primary surface.

use super::DownloadQuery;
use super::delivery::file_response;
use crate::api::AppState;
use crate::error::Error;
use axum::{
    extract::{Query, State},
    response::Response,
};

/// GET /api/download - Download synchronously and return the file
#[utoipa::path(
    get,
    path = "/api/download",
    tag = "legacy",
    params(
        ("url" = String, Query, description = "Source URL"),
        ("kind" = Option<String>, Query, description = "Media kind: video or audio (default video)"),
        ("format_id" = Option<String>, Query, description = "Engine format selector")
    ),
    responses(
        (status = 200, description = "Downloaded file", content_type = "application/octet-stream"),
        (status = 400, description = "Missing URL or malformed kind"),
        (status = 500, description = "No output produced"),
        (status = 502, description = "Extraction engine failure")
    )
)]
pub async fn legacy_download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, Error> {
    let metadata = query.into_metadata()?;

    let path = state
        .downloader
        .download_sync(&metadata)
        .await
        .inspect_err(|e| {
            tracing::error!(url = %metadata.url, error = %e, "synchronous download failed");
        })?;

    // No cleanup guard here: the legacy path leaves the directory alone
    file_response(&path, None).await
}
