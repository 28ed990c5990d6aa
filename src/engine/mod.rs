//! Extraction engine abstraction
//!
//! The engine is an external collaborator: given a URL and a format
//! selector it produces a media file at a target path, optionally invoking
//! an external transcoder, and reports transfer progress along the way.
//! The [`MediaEngine`] trait is the seam; [`CliMediaEngine`] drives the
//! yt-dlp binary, and tests substitute their own stub implementations.

mod cli;
mod types;

pub use cli::CliMediaEngine;
pub use types::{
    DownloadSpec, EngineOutcome, MediaProbe, PostProcessing, ProgressHook, RawFormat,
    TransferProgress,
};

use crate::error::EngineError;
use async_trait::async_trait;

/// Interface to the media extraction/transcoding engine
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Human-readable engine name, for logs
    fn name(&self) -> &str;

    /// Query metadata only — no download is performed
    async fn probe(&self, url: &str) -> Result<MediaProbe, EngineError>;

    /// Perform the transfer and postprocessing described by `spec`
    ///
    /// `on_progress` is invoked repeatedly during the transfer. A normal
    /// return does not guarantee a reported final path: some outputs are
    /// only discoverable by scanning for the template afterwards.
    async fn download(
        &self,
        spec: &DownloadSpec,
        on_progress: ProgressHook,
    ) -> Result<EngineOutcome, EngineError>;
}
