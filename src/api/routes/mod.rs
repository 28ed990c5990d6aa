//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`system`] — Health check and OpenAPI spec
//! - [`formats`] — Format discovery
//! - [`jobs`] — Asynchronous job lifecycle (start, progress stream, result)
//! - [`legacy`] — Synchronous single-request download

use crate::error::Error;
use crate::types::{JobMetadata, MediaKind};
use serde::Deserialize;

mod delivery;
mod formats;
mod jobs;
mod legacy;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use formats::*;
pub use jobs::*;
pub use legacy::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters shared by job creation and the legacy synchronous download
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DownloadQuery {
    /// Source URL (required)
    pub url: Option<String>,

    /// Media kind: "video" or "audio" (default: "video")
    pub kind: Option<String>,

    /// Engine format selector; omit to apply the kind-specific default chain
    pub format_id: Option<String>,
}

impl DownloadQuery {
    /// Validate into job metadata, rejecting malformed input before any
    /// job is created
    pub(crate) fn into_metadata(self) -> Result<JobMetadata, Error> {
        let url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::BadRequest("missing required parameter: url".to_string()))?;

        let kind = match self.kind.as_deref() {
            None => MediaKind::Video,
            Some(raw) => MediaKind::parse_param(raw).ok_or_else(|| {
                Error::BadRequest(format!("kind must be \"video\" or \"audio\", got \"{raw}\""))
            })?,
        };

        Ok(JobMetadata {
            url,
            kind,
            format_id: self.format_id.filter(|f| !f.trim().is_empty()),
        })
    }
}
