mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{wait_for_terminal, Harness};
use tokio_test::assert_ok;
use video_localizer::error::SubmitError;
use video_localizer::state::JobStatus;
use video_localizer::voice::Engine;

#[tokio::test]
async fn test_submit_is_immediately_visible() {
    let mut harness = Harness::new("Hello world", "Hola mundo");
    // Hold the job in transcription long enough to observe it
    Arc::get_mut(&mut harness.transcription).unwrap().polls_before_done = 20;
    let service = harness.service();

    let submission = assert_ok!(service.submit(b"FAKEVIDEO", "talk.mp4", "es").await);
    assert_eq!(
        submission.status_url,
        format!("/localize/status/{}", submission.job_id)
    );

    // The spawned run has not been polled yet on this runtime
    let record = service.get_status(&submission.job_id).await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Starting);
    assert!(record.step.is_none());
    assert_eq!(record.target_lang, "es");
    assert!(record.result.is_none());

    let record = wait_for_terminal(&service, &submission.job_id).await;
    assert_eq!(record.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_unknown_job_is_none() {
    let harness = Harness::new("Hello world", "Hola mundo");
    let service = harness.service();

    let record = assert_ok!(service.get_status("does-not-exist").await);
    assert!(record.is_none());
}

#[tokio::test]
async fn test_submitted_job_completes() {
    let harness = Harness::new("Hello world", "Bonjour le monde");
    let service = harness.service();

    let submission = service.submit(b"FAKEVIDEO", "clip.mp4", "fr").await.unwrap();
    let record = wait_for_terminal(&service, &submission.job_id).await;

    assert_eq!(record.status, JobStatus::Completed);
    let result = record.result.unwrap();
    assert_eq!(result.translation, "Bonjour le monde");
    assert!(result
        .video_locator
        .ends_with(&format!("localized/{}_localized.mp4", submission.job_id)));
    assert_eq!(
        harness.speech.last_voice(),
        Some(("Danielle".to_string(), Engine::Generative))
    );
    // The uploaded copy lived in the workspace and is gone with it
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_failed_job_reports_error() {
    let mut harness = Harness::new("Hello world", "unused");
    Arc::get_mut(&mut harness.model).unwrap().translation = Err("quota exceeded".to_string());
    let service = harness.service();

    let submission = service.submit(b"FAKEVIDEO", "clip.mp4", "es").await.unwrap();
    let record = wait_for_terminal(&service, &submission.job_id).await;

    assert_eq!(record.status, JobStatus::Failed);
    assert!(record.error.unwrap().contains("quota exceeded"));
    assert_eq!(harness.muxer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.leftover_workspaces(), 0);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let harness = Harness::new("Hello world", "Hola mundo");
    let service = harness.service();

    let err = service.submit(b"", "clip.mp4", "es").await.unwrap_err();
    assert!(matches!(err, SubmitError::InvalidRequest(_)));

    let err = service.submit(b"FAKEVIDEO", "clip.mp4", "  ").await.unwrap_err();
    assert!(matches!(err, SubmitError::InvalidRequest(_)));

    let err = service.submit(b"FAKEVIDEO", "../", "es").await.unwrap_err();
    assert!(matches!(err, SubmitError::InvalidRequest(_)));

    // Nothing was scheduled
    assert_eq!(service.stats().await.unwrap().total_jobs, 0);
    assert_eq!(harness.transcription.starts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_local_file_is_rejected() {
    let harness = Harness::new("Hello world", "Hola mundo");
    let service = harness.service();

    let err = service
        .localize_file(
            &harness.temp_dir.path().join("missing.mp4"),
            "es",
            None,
            Default::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_concurrent_jobs_all_finish() {
    let harness = Harness::new("Hello world", "Hola mundo");
    let service = harness.service();

    let mut ids = Vec::new();
    for i in 0..4 {
        let submission = service
            .submit(b"FAKEVIDEO", &format!("clip{}.mp4", i), "es")
            .await
            .unwrap();
        ids.push(submission.job_id);
    }

    for id in &ids {
        let record = wait_for_terminal(&service, id).await;
        assert_eq!(record.status, JobStatus::Completed);
    }

    let stats = service.stats().await.unwrap();
    assert_eq!(stats.total_jobs, 4);
    assert_eq!(stats.completed, 4);
    assert_eq!(harness.muxer.calls.load(Ordering::SeqCst), 4);
}
