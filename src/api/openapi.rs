//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (if enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.2.0",
        description = "Local media download orchestration: format discovery, asynchronous download/transcode jobs, and live progress streaming",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development server")
    ),
    paths(
        // Formats
        crate::api::routes::list_formats,

        // Jobs
        crate::api::routes::start_download,
        crate::api::routes::stream_progress,
        crate::api::routes::download_result,

        // Legacy
        crate::api::routes::legacy_download,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(
        schemas(
            crate::types::JobId,
            crate::types::MediaKind,
            crate::types::JobState,
            crate::types::TransferPhase,
            crate::types::JobEvent,
            crate::types::JobMetadata,
            crate::types::JobInfo,
            crate::types::FormatEntry,
            crate::types::FormatListing,
            crate::types::StartJobResponse,
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "formats", description = "Format discovery"),
        (name = "jobs", description = "Asynchronous download jobs"),
        (name = "legacy", description = "Synchronous download"),
        (name = "system", description = "Health and API metadata")
    )
)]
pub struct ApiDoc;
