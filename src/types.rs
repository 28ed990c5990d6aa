//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for a download job
///
/// Generated at job creation (UUID v4) and used as the sole external handle
/// for streaming progress and fetching the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub uuid::Uuid);

impl JobId {
    /// Generate a fresh random JobId
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID value
    pub fn get(&self) -> uuid::Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Requested media kind for a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Video download (remuxed into a single container)
    Video,
    /// Audio-only download (transcoded to the configured codec)
    Audio,
}

impl MediaKind {
    /// Parse a request parameter into a MediaKind
    ///
    /// Returns `None` for anything other than the literal strings
    /// `"video"` and `"audio"`; callers map that to a bad-request error
    /// before any job is created.
    pub fn parse_param(s: &str) -> Option<Self> {
        match s {
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// Job lifecycle state
///
/// `Running` is the only initial state; `Completed` and `Failed` are
/// terminal. A job transitions at most once out of `Running`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Worker is still driving the extraction engine
    Running,
    /// Result file produced and recorded
    Completed,
    /// Engine failed and fallback discovery found nothing
    Failed,
}

impl JobState {
    /// Whether this state admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Transfer phase reported by the extraction engine's progress callback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransferPhase {
    /// Bytes are being transferred
    Downloading,
    /// The transfer (or a merge/transcode step) finished
    Finished,
}

/// Event emitted during a job's lifecycle
///
/// Produced by the Download Worker, consumed in order by the progress
/// stream. Exactly one terminal event (`Completed` or `Error`) is ever
/// enqueued per job.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobEvent {
    /// Transfer progress relayed from the engine's progress callback
    #[serde(rename_all = "camelCase")]
    Progress {
        /// Engine transfer phase
        status: TransferPhase,
        /// Bytes transferred so far
        #[serde(skip_serializing_if = "Option::is_none")]
        downloaded_bytes: Option<u64>,
        /// Total bytes, when the engine knows it
        #[serde(skip_serializing_if = "Option::is_none")]
        total_bytes: Option<u64>,
        /// downloaded/total × 100, clamped to [0, 100]; absent when total is unknown
        #[serde(skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
        /// Transfer speed in bytes per second
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
        /// Estimated seconds remaining
        #[serde(skip_serializing_if = "Option::is_none")]
        eta: Option<u64>,
    },

    /// Job reached `Completed`; the result can now be fetched
    Completed {
        /// Bare filename of the produced artifact (no directory)
        filename: String,
    },

    /// Job reached `Failed`
    Error {
        /// Generic user-facing message (engine detail stays in the server log)
        message: String,
    },
}

impl JobEvent {
    /// SSE event name for this variant
    pub fn sse_name(&self) -> &'static str {
        match self {
            JobEvent::Progress { .. } => "progress",
            JobEvent::Completed { .. } => "completed",
            JobEvent::Error { .. } => "error",
        }
    }

    /// Whether this event marks the end of the job's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Completed { .. } | JobEvent::Error { .. })
    }
}

/// Immutable snapshot of the request parameters a job was created with
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobMetadata {
    /// Source URL
    pub url: String,

    /// Requested media kind
    pub kind: MediaKind,

    /// Engine format selector supplied by the caller (None = apply defaults)
    #[serde(default)]
    pub format_id: Option<String>,
}

/// Point-in-time view of a job, for lookups and logging
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobInfo {
    /// Job identifier
    pub id: JobId,

    /// Current lifecycle state
    pub state: JobState,

    /// Result path, set only once the job completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<PathBuf>,

    /// Generic failure message, set only once the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Request parameters captured at creation
    pub metadata: JobMetadata,

    /// When the job was created
    pub created_at: DateTime<Utc>,
}

/// One selectable format in a listing response
///
/// Field names follow the wire format the client UI expects
/// (`format_id` stays snake_case, `hasAudio` is camelCase).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FormatEntry {
    /// Engine-specific format identifier
    pub format_id: String,

    /// Container extension (mp4, m4a, webm, ...)
    pub ext: String,

    /// Whether the stream carries an audio track
    #[serde(rename = "hasAudio")]
    pub has_audio: bool,

    /// Frame width in pixels (video entries only)
    pub width: Option<u32>,

    /// Frame height in pixels (video entries only)
    pub height: Option<u32>,

    /// Frames per second (video entries only)
    pub fps: Option<f64>,

    /// Total bitrate in kbit/s as reported by the engine
    pub tbr: Option<f64>,

    /// Video codec string
    pub vcodec: Option<String>,

    /// Audio codec string
    pub acodec: Option<String>,
}

/// Response for the format listing endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FormatListing {
    /// Canonical content identifier
    pub id: String,

    /// Content title
    pub title: String,

    /// Duration in seconds, when known
    #[serde(rename = "durationSec")]
    pub duration_sec: Option<f64>,

    /// Video candidates, one per resolution, ascending by resolution then bitrate
    pub video: Vec<FormatEntry>,

    /// Audio candidates, one per integer bitrate, ascending by bitrate
    pub audio: Vec<FormatEntry>,
}

/// Response for the start-job endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StartJobResponse {
    /// Identifier of the freshly created job
    pub job_id: JobId,
}
