//! Shared test helpers for creating MediaDownloader instances in tests.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::engine::{
    DownloadSpec, EngineOutcome, MediaEngine, MediaProbe, ProgressHook, RawFormat,
    TransferProgress,
};
use crate::error::EngineError;
use crate::types::TransferPhase;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// What a [`StubEngine`] download invocation should do
#[derive(Clone)]
pub(crate) enum StubBehavior {
    /// Emit the canned progress updates, write `<template stem>.<ext>` into
    /// the download dir, and report it as the final path
    Succeed {
        /// Extension of the produced file
        ext: &'static str,
        /// Progress payloads fed to the hook, in order
        progress: Vec<TransferProgress>,
        /// Whether to report the final path (false exercises discovery)
        report_path: bool,
    },

    /// Fail the engine call; optionally leave a usable file behind first
    /// (exercises the post-failure discovery path)
    Fail {
        /// Extension of the orphaned file, if any
        leave_file: Option<&'static str>,
    },
}

/// In-memory engine standing in for the yt-dlp subprocess
pub(crate) struct StubEngine {
    probe: MediaProbe,
    behavior: StubBehavior,
    download_calls: AtomicUsize,
    /// Specs of every download invocation, for assertions
    pub(crate) specs: Mutex<Vec<DownloadSpec>>,
}

impl StubEngine {
    pub(crate) fn new(probe: MediaProbe, behavior: StubBehavior) -> Arc<Self> {
        Arc::new(Self {
            probe,
            behavior,
            download_calls: AtomicUsize::new(0),
            specs: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Derive the output path the stub will write, from the spec template
    fn output_path(spec: &DownloadSpec, ext: &str) -> PathBuf {
        let base = spec
            .output_template
            .strip_suffix(".%(ext)s")
            .unwrap_or(&spec.output_template);
        PathBuf::from(format!("{base}.{ext}"))
    }
}

#[async_trait]
impl MediaEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    async fn probe(&self, _url: &str) -> Result<MediaProbe, EngineError> {
        Ok(self.probe.clone())
    }

    async fn download(
        &self,
        spec: &DownloadSpec,
        on_progress: ProgressHook,
    ) -> Result<EngineOutcome, EngineError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.specs.lock().unwrap().push(spec.clone());

        match &self.behavior {
            StubBehavior::Succeed {
                ext,
                progress,
                report_path,
            } => {
                for p in progress {
                    on_progress(p.clone());
                }
                let path = Self::output_path(spec, ext);
                std::fs::write(&path, b"media bytes").map_err(EngineError::Io)?;
                Ok(EngineOutcome {
                    final_path: report_path.then(|| path.clone()),
                })
            }
            StubBehavior::Fail { leave_file } => {
                if let Some(ext) = leave_file {
                    let path = Self::output_path(spec, ext);
                    std::fs::write(&path, b"orphaned output").map_err(EngineError::Io)?;
                }
                Err(EngineError::Failed {
                    status: 1,
                    detail: "stub engine failure".to_string(),
                })
            }
        }
    }
}

/// A probe with one muxed 720p mp4 stream and one m4a audio stream
pub(crate) fn default_probe() -> MediaProbe {
    MediaProbe {
        id: "abc123".into(),
        title: "Test Clip".into(),
        duration: Some(42.0),
        formats: vec![
            RawFormat {
                format_id: Some("22".into()),
                ext: Some("mp4".into()),
                vcodec: Some("avc1.64001F".into()),
                acodec: Some("mp4a.40.2".into()),
                width: Some(1280),
                height: Some(720),
                fps: Some(30.0),
                tbr: Some(1500.0),
            },
            RawFormat {
                format_id: Some("140".into()),
                ext: Some("m4a".into()),
                vcodec: Some("none".into()),
                acodec: Some("mp4a.40.2".into()),
                width: None,
                height: None,
                fps: None,
                tbr: Some(129.5),
            },
        ],
    }
}

/// Canned downloading-then-finished progress sequence
pub(crate) fn default_progress() -> Vec<TransferProgress> {
    vec![
        TransferProgress {
            phase: TransferPhase::Downloading,
            downloaded_bytes: Some(1_000),
            total_bytes: Some(4_000),
            speed: Some(2_048.0),
            eta: Some(2),
        },
        TransferProgress {
            phase: TransferPhase::Downloading,
            downloaded_bytes: Some(4_000),
            total_bytes: Some(4_000),
            speed: Some(2_048.0),
            eta: Some(0),
        },
        TransferProgress {
            phase: TransferPhase::Finished,
            downloaded_bytes: Some(4_000),
            total_bytes: Some(4_000),
            speed: None,
            eta: None,
        },
    ]
}

/// Create a test MediaDownloader with a stub engine and a scratch
/// download directory. Returns the downloader, the engine for assertions,
/// and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    behavior: StubBehavior,
) -> (Arc<MediaDownloader>, Arc<StubEngine>, tempfile::TempDir) {
    create_test_downloader_with_probe(default_probe(), behavior).await
}

/// Like [`create_test_downloader`] but with a caller-supplied probe
pub(crate) async fn create_test_downloader_with_probe(
    probe: MediaProbe,
    behavior: StubBehavior,
) -> (Arc<MediaDownloader>, Arc<StubEngine>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    // Fast polling keeps stream tests snappy
    config.jobs.poll_interval_ms = 10;

    let engine = StubEngine::new(probe, behavior);
    let downloader = MediaDownloader::with_engine(config, engine.clone())
        .await
        .unwrap();

    (Arc::new(downloader), engine, temp_dir)
}

/// Wait until a job reaches a terminal state, with a hard timeout
pub(crate) async fn wait_for_terminal(downloader: &MediaDownloader, id: crate::types::JobId) {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let job = downloader.job(id).expect("job must stay registered");
        if job.is_terminal() {
            return;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "job {id} did not reach a terminal state in time"
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
