//! # media-dl
//!
//! Local media download orchestration library: format discovery plus
//! asynchronous download/transcode jobs with live progress streaming.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Engine-agnostic** - The extraction engine is a trait; the bundled
//!   implementation drives the yt-dlp binary
//! - **Non-blocking** - One worker task per job; the request loop never
//!   waits on a download
//! - **Sensible defaults** - Works out of the box with zero configuration
//!   for a local single-user deployment
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaDownloader, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = Arc::new(MediaDownloader::new(Config::default()).await?);
//!
//!     // Serve the REST API (formats, jobs, progress SSE, results)
//!     downloader.spawn_api_server();
//!
//!     // Evict stale terminal jobs in the background
//!     downloader.spawn_retention_sweeper();
//!
//!     // Run until SIGINT/SIGTERM
//!     run_with_shutdown().await;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Core downloader implementation (registry, workers, retention)
pub mod downloader;
/// Extraction engine abstraction and the yt-dlp CLI implementation
pub mod engine;
/// Error types
pub mod error;
/// Format listing rules
pub mod formats;
/// Output naming and collision-free template resolution
pub mod naming;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DownloadConfig, EngineConfig, JobsConfig, ServerConfig};
pub use downloader::{Job, MediaDownloader};
pub use engine::{CliMediaEngine, MediaEngine};
pub use error::{ApiError, EngineError, Error, ErrorDetail, Result, ToHttpStatus};
pub use types::{
    FormatEntry, FormatListing, JobEvent, JobId, JobInfo, JobMetadata, JobState, MediaKind,
    TransferPhase,
};

/// Block until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Workers in flight are not cancelled; the process exits with whatever
/// the embedder does after this returns.
pub async fn run_with_shutdown() {
    wait_for_signal().await;
    tracing::info!("shutting down");
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
