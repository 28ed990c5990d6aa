//! File delivery with post-response cleanup.
//!
//! The result file is streamed back with its original filename. When the
//! response body finishes (or the client gives up), the attached guard
//! triggers the shared-directory cleanup and the registry removal — the
//! job is only ever removed after its result was delivered at least once
//! or the caller abandoned the transfer.

use crate::MediaDownloader;
use crate::error::Error;
use crate::types::JobId;
use axum::{
    body::Body,
    http::{HeaderValue, header},
    response::Response,
};
use futures::Stream;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_util::io::ReaderStream;

/// Runs directory cleanup and registry removal when dropped
pub(crate) struct CleanupGuard {
    downloader: Arc<MediaDownloader>,
    job_id: JobId,
    armed: bool,
}

impl CleanupGuard {
    pub(crate) fn new(downloader: Arc<MediaDownloader>, job_id: JobId) -> Self {
        Self {
            downloader,
            job_id,
            armed: true,
        }
    }

    /// Disarm without running cleanup (delivery never started)
    fn defuse(mut self) {
        self.armed = false;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let downloader = self.downloader.clone();
        let job_id = self.job_id;

        // Dropped inside the server runtime; the handle lookup only fails
        // in exotic shutdown paths, where skipping cleanup is harmless.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                downloader.cleanup_download_dir().await;
                downloader.remove_job(job_id);
            });
        }
    }
}

/// Body stream that carries an optional cleanup guard to the end of the
/// response lifetime
struct FileStream<S> {
    inner: S,
    _cleanup: Option<CleanupGuard>,
}

impl<S: Stream + Unpin> Stream for FileStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Stream a file back as `application/octet-stream` with an attachment
/// disposition carrying its bare filename
pub(crate) async fn file_response(
    path: &Path,
    mut cleanup: Option<CleanupGuard>,
) -> Result<Response, Error> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            // Nothing was delivered, so the job record must survive the
            // failed attempt
            if let Some(guard) = cleanup.take() {
                guard.defuse();
            }
            return Err(e.into());
        }
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    let stream = FileStream {
        inner: ReaderStream::new(file),
        _cleanup: cleanup,
    };

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response)
}
