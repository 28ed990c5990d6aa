//! Asynchronous job handlers: creation, progress streaming, result delivery.

use super::DownloadQuery;
use super::delivery::{CleanupGuard, file_response};
use crate::api::AppState;
use crate::downloader::Job;
use crate::error::Error;
use crate::types::{JobEvent, JobId, JobState, StartJobResponse};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

/// POST /api/download/start - Create a download job
///
/// Allocates the job, spawns its worker, and returns the id immediately;
/// the client subscribes to `/api/progress/{job_id}` for live updates.
#[utoipa::path(
    post,
    path = "/api/download/start",
    tag = "jobs",
    params(
        ("url" = String, Query, description = "Source URL"),
        ("kind" = Option<String>, Query, description = "Media kind: video or audio (default video)"),
        ("format_id" = Option<String>, Query, description = "Engine format selector")
    ),
    responses(
        (status = 200, description = "Job created", body = StartJobResponse),
        (status = 400, description = "Missing URL or malformed kind")
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Json<StartJobResponse>, Error> {
    let metadata = query.into_metadata()?;
    let job_id = state.downloader.start_job(metadata);
    Ok(Json(StartJobResponse { job_id }))
}

/// GET /api/progress/:job_id - Live progress stream (SSE)
///
/// Drains the job's event queue to the client in emission order, with
/// heartbeat frames during long gaps. The stream closes once the job is
/// terminal and the queue is fully drained, so the terminal event is
/// always delivered before the close. A client disconnect ends only the
/// stream — the worker runs on and the job stays queryable.
///
/// Concurrent subscribers to one job compete for events on the single
/// shared queue (known limitation).
#[utoipa::path(
    get,
    path = "/api/progress/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job identifier")
    ),
    responses(
        (status = 200, description = "Server-sent event stream", content_type = "text/event-stream"),
        (status = 404, description = "Unknown job id")
    )
)]
pub async fn stream_progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    let Some(job) = lookup_job(&state, &job_id) else {
        return Error::NotFound(format!("job {job_id}")).into_response();
    };

    let poll = Duration::from_millis(state.config.jobs.poll_interval_ms.max(1));
    let heartbeat = Duration::from_secs(state.config.jobs.heartbeat_secs.max(1));

    Sse::new(job_event_stream(job, poll))
        .keep_alive(KeepAlive::new().interval(heartbeat).text("ping"))
        .into_response()
}

/// GET /api/download/result/:job_id - Fetch the produced file
///
/// Unknown id → 404; failed job → 500; still running → 202 (retryable,
/// lets clients poll right after stream closure without racing the
/// worker's final bookkeeping). A successful fetch schedules download
/// directory cleanup and registry removal once the body is sent.
#[utoipa::path(
    get,
    path = "/api/download/result/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job identifier")
    ),
    responses(
        (status = 200, description = "Result file", content_type = "application/octet-stream"),
        (status = 202, description = "No result yet, retry later"),
        (status = 404, description = "Unknown job id"),
        (status = 500, description = "Job failed")
    )
)]
pub async fn download_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, Error> {
    let job = lookup_job(&state, &job_id)
        .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;
    let id = job.id();

    if job.state() == JobState::Failed {
        return Err(Error::JobFailed { id });
    }

    let path = job.result_path().ok_or(Error::NotReady { id })?;

    let cleanup = CleanupGuard::new(state.downloader.clone(), id);
    file_response(&path, Some(cleanup)).await
}

/// Parse the path parameter and look the job up; a malformed id is just
/// an unknown job
fn lookup_job(state: &AppState, raw: &str) -> Option<Arc<Job>> {
    let id: JobId = raw.parse().ok()?;
    state.downloader.job(id)
}

/// Cooperative poll loop over a job's event queue
///
/// Each step drains the next event without blocking; when the queue is
/// empty and the job is terminal, one final non-blocking drain settles
/// the enqueue-before-flip ordering race before the stream closes.
/// Between polls the loop suspends on a short sleep, never on the queue
/// lock.
fn job_event_stream(
    job: Arc<Job>,
    poll: Duration,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    futures::stream::unfold(job, move |job| async move {
        loop {
            match job.try_next_event() {
                Some(event) => match to_sse(&event) {
                    Some(frame) => return Some((Ok(frame), job)),
                    None => continue,
                },
                None if job.is_terminal() => match job.try_next_event() {
                    Some(event) => match to_sse(&event) {
                        Some(frame) => return Some((Ok(frame), job)),
                        None => continue,
                    },
                    None => return None,
                },
                None => tokio::time::sleep(poll).await,
            }
        }
    })
}

/// Serialize one job event into an SSE frame
fn to_sse(event: &JobEvent) -> Option<SseEvent> {
    match serde_json::to_string(event) {
        Ok(data) => Some(SseEvent::default().event(event.sse_name()).data(data)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize job event, skipping");
            None
        }
    }
}
