//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`jobs`] - Job records and the synchronized registry
//! - [`worker`] - Per-job download execution
//! - [`retention`] - Stale terminal-job eviction

pub(crate) mod jobs;
mod retention;
pub(crate) mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use jobs::Job;

use crate::config::Config;
use crate::engine::{CliMediaEngine, MediaEngine};
use crate::error::{Error, Result};
use crate::formats::build_format_listing;
use crate::types::{FormatListing, JobId, JobMetadata};
use jobs::JobRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Main downloader instance (cheaply cloneable - all fields are Arc-wrapped)
///
/// Owns the job registry, the extraction engine, and the download
/// directory. One worker task is spawned per job; the request-handling
/// loop itself never blocks on a download.
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    config: Arc<Config>,
    /// Extraction engine (trait object for pluggable implementations)
    engine: Arc<dyn MediaEngine>,
    /// Synchronized job table; lifecycle owner of all jobs
    registry: Arc<JobRegistry>,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// This prepares the download directory and resolves the extraction
    /// engine binary: an explicitly configured path wins, otherwise PATH
    /// is searched (unless disabled). A missing engine is a configuration
    /// error — this server cannot degrade gracefully without it.
    pub async fn new(config: Config) -> Result<Self> {
        let engine: Arc<dyn MediaEngine> = if let Some(ref path) = config.engine.ytdlp_path {
            Arc::new(CliMediaEngine::new(path.clone()))
        } else if config.engine.search_path {
            match CliMediaEngine::from_path() {
                Some(engine) => Arc::new(engine),
                None => {
                    return Err(Error::Config {
                        message: "yt-dlp binary not found on PATH".to_string(),
                        key: Some("engine.ytdlp_path".to_string()),
                    });
                }
            }
        } else {
            return Err(Error::Config {
                message: "no engine binary configured and PATH search is disabled".to_string(),
                key: Some("engine.ytdlp_path".to_string()),
            });
        };

        Self::with_engine(config, engine).await
    }

    /// Create a MediaDownloader around an explicit engine implementation
    ///
    /// Used by embedders supplying their own engine and by tests
    /// substituting a stub.
    pub async fn with_engine(config: Config, engine: Arc<dyn MediaEngine>) -> Result<Self> {
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        tracing::info!(
            engine = engine.name(),
            download_dir = %config.download.download_dir.display(),
            "downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            engine,
            registry: Arc::new(JobRegistry::new()),
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Name of the extraction engine in use
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Query available formats for a URL (metadata only, no download)
    ///
    /// Returns the deduplicated, sorted candidate lists described by the
    /// format listing rules.
    pub async fn list_formats(&self, url: &str) -> Result<FormatListing> {
        let probe = self.engine.probe(url).await?;
        Ok(build_format_listing(&probe))
    }

    /// Create a job and spawn its worker; returns immediately
    ///
    /// The job is visible via [`MediaDownloader::job`] in `Running` state
    /// before this method returns. Must be called from within a tokio
    /// runtime.
    pub fn start_job(&self, metadata: JobMetadata) -> JobId {
        let job = Job::new(metadata);
        let id = job.id();
        self.registry.insert(job.clone());

        let handle = tokio::spawn(worker::run_job(
            self.engine.clone(),
            self.config.download.clone(),
            job.clone(),
        ));
        job.attach_worker(handle);

        tracing::info!(job_id = %id, "job created");
        id
    }

    /// Look up a job by id
    pub fn job(&self, id: JobId) -> Option<Arc<Job>> {
        self.registry.get(id)
    }

    /// Remove a job record; idempotent no-op when absent
    pub fn remove_job(&self, id: JobId) {
        if self.registry.remove(id).is_some() {
            tracing::debug!(job_id = %id, "job removed from registry");
        }
    }

    /// Number of currently tracked jobs
    pub fn job_count(&self) -> usize {
        self.registry.len()
    }

    /// Legacy synchronous download: the full pipeline inside one call
    ///
    /// No job or event queue is involved; progress callbacks are logged
    /// and discarded. Returns the final artifact path.
    pub async fn download_sync(&self, metadata: &JobMetadata) -> Result<PathBuf> {
        let probe = self.engine.probe(&metadata.url).await?;
        let template = worker::resolve_template(&self.config.download, &probe, metadata);
        let spec = worker::build_spec(&self.config.download, metadata, &template);

        let hook: crate::engine::ProgressHook = Box::new(|progress| {
            tracing::debug!(
                downloaded = ?progress.downloaded_bytes,
                total = ?progress.total_bytes,
                "synchronous download progress"
            );
        });

        match self.engine.download(&spec, hook).await {
            Ok(outcome) => worker::resolve_final_path(outcome.final_path, &template).ok_or_else(
                || Error::OutputMissing {
                    template: template.stem().to_string(),
                },
            ),
            Err(e) => {
                // Same one-shot recovery as the worker: a usable file may
                // exist despite the reported failure.
                tracing::warn!(error = %e, "engine failed, searching for a usable output file");
                template.newest_existing().ok_or(Error::Engine(e))
            }
        }
    }

    /// Delete every file in the shared download directory
    ///
    /// Triggered after a job's result is delivered. The deletion is
    /// directory-wide, not scoped to the delivering job: concurrent jobs
    /// sharing the directory can lose their artifacts. Acceptable only
    /// for a single-user local deployment; documented limitation.
    /// Failures are logged, never surfaced.
    pub async fn cleanup_download_dir(&self) {
        let dir = &self.config.download.download_dir;
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "download dir cleanup failed");
                return;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to delete file");
            }
        }
    }

    /// Spawn the periodic stale-job sweep, if retention is configured
    ///
    /// Evicts terminal jobs older than `jobs.retention_secs`; returns
    /// `None` when retention is disabled.
    pub fn spawn_retention_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let retention = Duration::from_secs(self.config.jobs.retention_secs?);
        let sweep_interval = Duration::from_secs(self.config.jobs.sweep_interval_secs.max(1));
        Some(retention::spawn_sweeper(
            self.registry.clone(),
            retention,
            sweep_interval,
        ))
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with download workers and listens on
    /// the configured bind address (default: 127.0.0.1:3001).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
