//! Job lifecycle tests against a stub engine.
//!
//! These cover the end-to-end worker behavior the HTTP layer builds on:
//! event ordering, terminal-state resolution, failure recovery through
//! output discovery, and selector defaulting.

use super::test_helpers::{
    create_test_downloader, default_progress, wait_for_terminal, StubBehavior,
};
use crate::types::{JobEvent, JobMetadata, JobState, MediaKind};
use std::collections::HashSet;

fn audio_request() -> JobMetadata {
    JobMetadata {
        url: "https://example.com/watch?v=abc123".into(),
        kind: MediaKind::Audio,
        format_id: None,
    }
}

fn video_request() -> JobMetadata {
    JobMetadata {
        url: "https://example.com/watch?v=abc123".into(),
        kind: MediaKind::Video,
        format_id: None,
    }
}

fn succeed(ext: &'static str) -> StubBehavior {
    StubBehavior::Succeed {
        ext,
        progress: default_progress(),
        report_path: true,
    }
}

/// Drain every queued event for a job
fn drain_events(job: &crate::downloader::Job) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Some(event) = job.try_next_event() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn created_jobs_get_unique_ids_and_are_immediately_visible_running() {
    let (downloader, _engine, _tmp) = create_test_downloader(succeed("mp3")).await;

    // The current-thread test runtime does not run spawned workers until
    // the next await, so the state check right after creation is exact.
    let mut seen = HashSet::new();
    for _ in 0..5 {
        let id = downloader.start_job(audio_request());
        assert!(seen.insert(id), "job ids must never repeat");

        let job = downloader.job(id).expect("job visible right after creation");
        assert_eq!(job.state(), JobState::Running);
    }
    assert_eq!(downloader.job_count(), 5);
}

#[tokio::test]
async fn audio_job_without_selector_defaults_and_completes_with_expected_extension() {
    let (downloader, engine, _tmp) = create_test_downloader(succeed("mp3")).await;

    let id = downloader.start_job(audio_request());
    wait_for_terminal(&downloader, id).await;

    // The defaulted selector reached the engine
    let specs = engine.specs.lock().unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].format, "bestaudio/best");
    drop(specs);

    let job = downloader.job(id).unwrap();
    assert_eq!(job.state(), JobState::Completed);

    let result_path = job.result_path().expect("result path must be recorded");
    assert!(result_path.is_file(), "recorded path must exist on disk");

    // The queue's final event is the terminal Completed with the filename
    let events = drain_events(&job);
    match events.last() {
        Some(JobEvent::Completed { filename }) => {
            assert!(
                filename.ends_with(".mp3"),
                "expected an mp3 filename, got {filename}"
            );
            assert!(filename.starts_with("Test Clip_abc123"));
        }
        other => panic!("final event must be Completed, got {other:?}"),
    }
}

#[tokio::test]
async fn progress_events_arrive_in_order_with_monotonic_clamped_percent() {
    let (downloader, _engine, _tmp) = create_test_downloader(succeed("mp4")).await;

    let id = downloader.start_job(video_request());
    wait_for_terminal(&downloader, id).await;

    let job = downloader.job(id).unwrap();
    let events = drain_events(&job);

    let mut last_downloaded = 0;
    let mut last_percent = 0.0_f64;
    let mut progress_count = 0;
    for event in &events {
        if let JobEvent::Progress {
            downloaded_bytes,
            percent,
            ..
        } = event
        {
            progress_count += 1;
            let downloaded = downloaded_bytes.expect("stub always reports bytes");
            assert!(
                downloaded >= last_downloaded,
                "events must preserve emission order"
            );
            last_downloaded = downloaded;

            let percent = percent.expect("total is known, percent must be computed");
            assert!((0.0..=100.0).contains(&percent));
            assert!(percent >= last_percent, "percent must not decrease");
            last_percent = percent;
        }
    }
    assert_eq!(progress_count, 3, "every engine callback becomes an event");
    assert!(
        matches!(events.last(), Some(JobEvent::Completed { .. })),
        "terminal event must come after all progress events"
    );
}

#[tokio::test]
async fn engine_failure_with_recoverable_file_still_completes() {
    // The engine reports failure after its postprocessing already produced
    // an output file; discovery must turn this into a completion.
    let (downloader, _engine, _tmp) = create_test_downloader(StubBehavior::Fail {
        leave_file: Some("mp4"),
    })
    .await;

    let id = downloader.start_job(video_request());
    wait_for_terminal(&downloader, id).await;

    let job = downloader.job(id).unwrap();
    assert_eq!(job.state(), JobState::Completed, "recovered file means success");
    assert!(job.result_path().is_some());
    assert!(job.error_detail().is_none());

    let events = drain_events(&job);
    assert!(
        matches!(events.last(), Some(JobEvent::Completed { .. })),
        "recovery must emit Completed, not Error"
    );
}

#[tokio::test]
async fn engine_failure_without_file_fails_with_generic_message() {
    let (downloader, _engine, _tmp) =
        create_test_downloader(StubBehavior::Fail { leave_file: None }).await;

    let id = downloader.start_job(video_request());
    wait_for_terminal(&downloader, id).await;

    let job = downloader.job(id).unwrap();
    assert_eq!(job.state(), JobState::Failed);
    assert!(job.result_path().is_none());

    let detail = job.error_detail().expect("failed job records a message");
    assert!(
        !detail.contains("stub engine failure"),
        "internal engine text must never become the user-facing message"
    );

    let events = drain_events(&job);
    match events.last() {
        Some(JobEvent::Error { message }) => {
            assert!(!message.contains("stub engine failure"));
        }
        other => panic!("final event must be Error, got {other:?}"),
    }
}

#[tokio::test]
async fn exactly_one_terminal_event_per_job() {
    for behavior in [succeed("mp3"), StubBehavior::Fail { leave_file: None }] {
        let (downloader, _engine, _tmp) = create_test_downloader(behavior).await;
        let id = downloader.start_job(audio_request());
        wait_for_terminal(&downloader, id).await;

        let job = downloader.job(id).unwrap();
        let terminal = drain_events(&job)
            .iter()
            .filter(|e| e.is_terminal())
            .count();
        assert_eq!(terminal, 1);
    }
}

#[tokio::test]
async fn output_discovery_resolves_path_when_engine_reports_none() {
    let (downloader, _engine, _tmp) = create_test_downloader(StubBehavior::Succeed {
        ext: "mp4",
        progress: vec![],
        report_path: false,
    })
    .await;

    let id = downloader.start_job(video_request());
    wait_for_terminal(&downloader, id).await;

    let job = downloader.job(id).unwrap();
    assert_eq!(job.state(), JobState::Completed);
    let path = job.result_path().expect("discovery must find the file");
    assert!(path.to_string_lossy().ends_with(".mp4"));
}

#[tokio::test]
async fn second_job_for_same_content_gets_a_numbered_filename() {
    let (downloader, _engine, _tmp) = create_test_downloader(succeed("mp3")).await;

    let first = downloader.start_job(audio_request());
    wait_for_terminal(&downloader, first).await;

    let second = downloader.start_job(audio_request());
    wait_for_terminal(&downloader, second).await;

    let first_path = downloader.job(first).unwrap().result_path().unwrap();
    let second_path = downloader.job(second).unwrap().result_path().unwrap();

    assert_ne!(first_path, second_path, "filenames must not collide");
    assert!(
        second_path.to_string_lossy().contains("Test Clip_abc123_2"),
        "second resolution appends _2, got {}",
        second_path.display()
    );
}

#[tokio::test]
async fn worker_failure_is_isolated_from_other_jobs() {
    // A failing job and a succeeding job share the downloader; the failure
    // must not leak into the sibling's state.
    let (failing, _e1, _t1) =
        create_test_downloader(StubBehavior::Fail { leave_file: None }).await;
    let (succeeding, _e2, _t2) = create_test_downloader(succeed("mp3")).await;

    let bad = failing.start_job(audio_request());
    let good = succeeding.start_job(audio_request());

    wait_for_terminal(&failing, bad).await;
    wait_for_terminal(&succeeding, good).await;

    assert_eq!(failing.job(bad).unwrap().state(), JobState::Failed);
    assert_eq!(succeeding.job(good).unwrap().state(), JobState::Completed);
}

#[tokio::test]
async fn video_selector_suffix_lands_in_the_filename() {
    let (downloader, _engine, _tmp) = create_test_downloader(succeed("mp4")).await;

    let id = downloader.start_job(JobMetadata {
        format_id: Some("22".into()),
        ..video_request()
    });
    wait_for_terminal(&downloader, id).await;

    let path = downloader.job(id).unwrap().result_path().unwrap();
    assert!(
        path.to_string_lossy().contains("1280x720_22"),
        "explicit video selection carries a resolution suffix, got {}",
        path.display()
    );
}

#[tokio::test]
async fn download_sync_returns_the_artifact_path() {
    let (downloader, engine, _tmp) = create_test_downloader(succeed("mp3")).await;

    let path = downloader.download_sync(&audio_request()).await.unwrap();
    assert!(path.is_file());
    assert_eq!(engine.download_calls(), 1);
    assert_eq!(
        downloader.job_count(),
        0,
        "the synchronous path never creates a job"
    );
}

#[tokio::test]
async fn download_sync_recovers_an_orphaned_file_after_engine_failure() {
    let (downloader, _engine, _tmp) = create_test_downloader(StubBehavior::Fail {
        leave_file: Some("mp3"),
    })
    .await;

    let path = downloader.download_sync(&audio_request()).await.unwrap();
    assert!(path.is_file());
}

#[tokio::test]
async fn download_sync_surfaces_engine_error_when_nothing_was_produced() {
    let (downloader, _engine, _tmp) =
        create_test_downloader(StubBehavior::Fail { leave_file: None }).await;

    let err = downloader.download_sync(&audio_request()).await.unwrap_err();
    assert!(
        matches!(err, crate::error::Error::Engine(_)),
        "expected an engine error, got {err:?}"
    );
}

#[tokio::test]
async fn cleanup_removes_files_but_not_subdirectories() {
    let (downloader, _engine, _tmp) = create_test_downloader(succeed("mp3")).await;

    let dir = downloader.config().download.download_dir.clone();
    std::fs::write(dir.join("a.mp3"), b"x").unwrap();
    std::fs::write(dir.join("b.mp4"), b"x").unwrap();
    std::fs::create_dir(dir.join("keep")).unwrap();

    downloader.cleanup_download_dir().await;

    assert!(!dir.join("a.mp3").exists());
    assert!(!dir.join("b.mp4").exists());
    assert!(dir.join("keep").is_dir(), "directories are left alone");
}

#[tokio::test]
async fn worker_handle_is_tracked_per_job() {
    let (downloader, _engine, _tmp) = create_test_downloader(succeed("mp3")).await;

    let id = downloader.start_job(audio_request());
    wait_for_terminal(&downloader, id).await;

    let job = downloader.job(id).unwrap();
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while !job.worker_finished() {
        assert!(std::time::Instant::now() < deadline, "worker task must finish");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn remove_job_is_idempotent_and_never_touches_running_state() {
    let (downloader, _engine, _tmp) = create_test_downloader(succeed("mp3")).await;

    let id = downloader.start_job(audio_request());
    wait_for_terminal(&downloader, id).await;

    downloader.remove_job(id);
    assert!(downloader.job(id).is_none());
    // Second removal is a no-op, not a panic
    downloader.remove_job(id);
}
