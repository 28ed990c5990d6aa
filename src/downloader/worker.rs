//! Download worker: drives one job to completion or failure
//!
//! Each worker owns exactly one job and never touches another. Failures
//! are contained in the job's state; nothing a worker does can crash the
//! registry or affect sibling jobs. There is no automatic retry of the
//! engine call — the only second chance is the one-shot output discovery
//! after an engine error, because some engines leave a usable file behind
//! even when they report a failure upstream (e.g. a non-fatal
//! postprocessor warning).

use crate::config::DownloadConfig;
use crate::engine::{DownloadSpec, MediaEngine, MediaProbe, PostProcessing, ProgressHook};
use crate::naming::{ensure_unique, OutputTemplate};
use crate::types::{JobEvent, JobMetadata, MediaKind};
use std::path::PathBuf;
use std::sync::Arc;

use super::jobs::Job;

/// Generic user-facing failure message; engine detail stays in the log
pub(crate) const FAILURE_MESSAGE: &str = "download failed, start a new job to retry";

/// Run one job to its terminal state
pub(crate) async fn run_job(engine: Arc<dyn MediaEngine>, config: DownloadConfig, job: Arc<Job>) {
    let metadata = job.metadata().clone();

    // Metadata-only probe for the canonical content id and title
    let probe = match engine.probe(&metadata.url).await {
        Ok(probe) => probe,
        Err(e) => {
            tracing::error!(job_id = %job.id(), error = %e, "metadata probe failed");
            job.fail(FAILURE_MESSAGE);
            return;
        }
    };

    let template = resolve_template(&config, &probe, &metadata);
    let spec = build_spec(&config, &metadata, &template);

    // Relay every engine progress callback into the job's queue; the queue
    // is unbounded, so the callback never waits on a consumer.
    let hook: ProgressHook = {
        let job = job.clone();
        Box::new(move |progress| {
            job.push_event(JobEvent::Progress {
                status: progress.phase,
                downloaded_bytes: progress.downloaded_bytes,
                total_bytes: progress.total_bytes,
                percent: compute_percent(progress.downloaded_bytes, progress.total_bytes),
                speed: progress.speed,
                eta: progress.eta,
            });
        })
    };

    match engine.download(&spec, hook).await {
        Ok(outcome) => match resolve_final_path(outcome.final_path, &template) {
            Some(path) => {
                tracing::info!(job_id = %job.id(), path = %path.display(), "job completed");
                job.complete(path);
            }
            None => {
                tracing::error!(
                    job_id = %job.id(),
                    stem = template.stem(),
                    "engine returned but no output file was found"
                );
                job.fail(FAILURE_MESSAGE);
            }
        },
        Err(e) => {
            // The engine may have produced a usable file before failing;
            // one discovery pass decides between success and failure.
            tracing::warn!(
                job_id = %job.id(),
                error = %e,
                "engine failed, searching for a usable output file"
            );
            match template.newest_existing() {
                Some(path) => {
                    tracing::info!(
                        job_id = %job.id(),
                        path = %path.display(),
                        "recovered output file after engine failure"
                    );
                    job.complete(path);
                }
                None => {
                    tracing::error!(job_id = %job.id(), error = %e, "job failed");
                    job.fail(FAILURE_MESSAGE);
                }
            }
        }
    }
}

/// Resolve the collision-free output template for a probed content item
pub(crate) fn resolve_template(
    config: &DownloadConfig,
    probe: &MediaProbe,
    metadata: &JobMetadata,
) -> OutputTemplate {
    let suffix = selection_suffix(metadata.kind, metadata.format_id.as_deref(), probe);
    let template = OutputTemplate::new(
        &config.download_dir,
        &probe.title,
        &probe.id,
        suffix.as_deref(),
    );
    ensure_unique(template)
}

/// Build the engine download spec, applying selector defaults
pub(crate) fn build_spec(
    config: &DownloadConfig,
    metadata: &JobMetadata,
    template: &OutputTemplate,
) -> DownloadSpec {
    let format = metadata.format_id.clone().unwrap_or_else(|| match metadata.kind {
        MediaKind::Video => config.default_video_format.clone(),
        MediaKind::Audio => config.default_audio_format.clone(),
    });

    let post = match metadata.kind {
        MediaKind::Video => PostProcessing::Remux {
            container: config.video_container.clone(),
        },
        MediaKind::Audio => PostProcessing::ExtractAudio {
            codec: config.audio_codec.clone(),
            quality: config.audio_quality.clone(),
        },
    };

    DownloadSpec {
        url: metadata.url.clone(),
        format,
        output_template: template.engine_template(),
        post,
    }
}

/// Descriptive filename suffix for an explicit format selection
///
/// Video selections get `<width>x<height>_<format_id>` when the probed
/// format list knows the dimensions, falling back to the bare format id;
/// audio selections get `audio_<format_id>`. No selector, no suffix.
pub(crate) fn selection_suffix(
    kind: MediaKind,
    format_id: Option<&str>,
    probe: &MediaProbe,
) -> Option<String> {
    let format_id = format_id?;
    match kind {
        MediaKind::Video => {
            let dimensions = probe
                .formats
                .iter()
                .find(|f| f.format_id.as_deref() == Some(format_id))
                .and_then(|f| Some((f.width?, f.height?)));
            match dimensions {
                Some((w, h)) => Some(format!("{w}x{h}_{format_id}")),
                None => Some(format_id.to_string()),
            }
        }
        MediaKind::Audio => Some(format!("audio_{format_id}")),
    }
}

/// Pick the final artifact: the engine's reported path when it exists on
/// disk, otherwise the newest file matching the template
pub(crate) fn resolve_final_path(
    reported: Option<PathBuf>,
    template: &OutputTemplate,
) -> Option<PathBuf> {
    if let Some(path) = reported {
        if path.is_file() {
            return Some(path);
        }
        tracing::warn!(
            path = %path.display(),
            "engine reported a final path that does not exist, falling back to discovery"
        );
    }
    template.newest_existing()
}

/// downloaded/total × 100 clamped to [0, 100]; `None` when total is unknown
pub(crate) fn compute_percent(downloaded: Option<u64>, total: Option<u64>) -> Option<f64> {
    match (downloaded, total) {
        (Some(downloaded), Some(total)) if total > 0 => {
            Some(((downloaded as f64 / total as f64) * 100.0).clamp(0.0, 100.0))
        }
        _ => None,
    }
}
