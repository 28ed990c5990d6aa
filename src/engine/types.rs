//! Fixed payload types exchanged with the extraction engine
//!
//! The engine's callback data is modeled as tagged structures with
//! explicitly optional fields (total bytes, speed, eta may be unknown),
//! never as open-ended dynamic records.

use crate::types::TransferPhase;
use serde::Deserialize;
use std::path::PathBuf;

/// One raw format as reported by the engine's metadata probe
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawFormat {
    /// Engine-specific format identifier
    #[serde(default)]
    pub format_id: Option<String>,

    /// Container extension
    #[serde(default)]
    pub ext: Option<String>,

    /// Audio codec ("none" for video-only streams)
    #[serde(default)]
    pub acodec: Option<String>,

    /// Video codec ("none" for audio-only streams)
    #[serde(default)]
    pub vcodec: Option<String>,

    /// Frame width in pixels
    #[serde(default)]
    pub width: Option<u32>,

    /// Frame height in pixels
    #[serde(default)]
    pub height: Option<u32>,

    /// Frames per second
    #[serde(default)]
    pub fps: Option<f64>,

    /// Total bitrate in kbit/s
    #[serde(default)]
    pub tbr: Option<f64>,
}

/// Metadata-only probe result: canonical id, title, and the raw format dump
#[derive(Clone, Debug, Deserialize)]
pub struct MediaProbe {
    /// Canonical content identifier
    pub id: String,

    /// Content title (may be empty; naming falls back to a placeholder)
    #[serde(default)]
    pub title: String,

    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,

    /// Raw formats available for this content
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// Post-transfer processing the engine is asked to perform
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostProcessing {
    /// Remux/merge the streams into a single container
    Remux {
        /// Target container, e.g. "mp4"
        container: String,
    },

    /// Extract the audio track and transcode it via the external transcoder
    ExtractAudio {
        /// Target codec, e.g. "mp3"
        codec: String,
        /// Target quality, e.g. "192K"
        quality: String,
    },
}

/// A fully specified download request for the engine
#[derive(Clone, Debug)]
pub struct DownloadSpec {
    /// Source URL
    pub url: String,

    /// Concrete format selector (caller-supplied or defaulted)
    pub format: String,

    /// Output template with the `.%(ext)s` placeholder
    pub output_template: String,

    /// Requested postprocessing step
    pub post: PostProcessing,
}

/// One progress callback payload from the engine
#[derive(Clone, Debug)]
pub struct TransferProgress {
    /// Transfer phase
    pub phase: TransferPhase,

    /// Bytes transferred so far
    pub downloaded_bytes: Option<u64>,

    /// Total bytes, when the engine knows it
    pub total_bytes: Option<u64>,

    /// Transfer speed in bytes per second
    pub speed: Option<f64>,

    /// Estimated seconds remaining
    pub eta: Option<u64>,
}

/// What the engine reports once a download invocation returns normally
#[derive(Clone, Debug, Default)]
pub struct EngineOutcome {
    /// Final artifact path from the postprocessing step, when the engine
    /// reported one; callers fall back to directory discovery otherwise
    pub final_path: Option<PathBuf>,
}

/// Callback invoked repeatedly during transfer
///
/// Must never block: the worker relays each payload into the job's
/// unbounded event queue without waiting on any consumer.
pub type ProgressHook = Box<dyn Fn(TransferProgress) + Send + Sync>;
