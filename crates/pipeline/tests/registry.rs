//! Tests for `JobRegistry`.

use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use vizgen_core::error::CoreError;
use vizgen_core::job::JobStatus;
use vizgen_core::types::JobId;
use vizgen_pipeline::registry::JobRegistry;

const STAGES: &[JobStatus] = &[
    JobStatus::GeneratingCode,
    JobStatus::CodeGenerated,
    JobStatus::StartingGeneration,
    JobStatus::Uploading,
];

// ---------------------------------------------------------------------------
// Test: create() inserts a queued record without a URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_inserts_queued_job() {
    let registry = JobRegistry::new();

    let id = registry.create().await;
    let job = registry.get(id).await.expect("job should exist");

    assert_eq!(job.id, id);
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.video_url, None);
    assert_eq!(registry.len().await, 1);
}

// ---------------------------------------------------------------------------
// Test: unknown ids read as not-found, never as a default job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_unknown_id_is_none() {
    let registry = JobRegistry::new();
    registry.create().await;

    assert!(registry.get(JobId::new()).await.is_none());
}

// ---------------------------------------------------------------------------
// Test: updates to unknown ids are a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn updates_to_unknown_id_are_noop() {
    let registry = JobRegistry::new();
    let ghost = JobId::new();

    assert!(registry
        .update_status(ghost, JobStatus::GeneratingCode)
        .await
        .is_ok());
    assert!(registry
        .set_video_url(ghost, "https://cdn.test/x.mp4".into())
        .await
        .is_ok());
    assert!(registry.fail(ghost, "boom".into()).await.is_ok());

    assert!(registry.get(ghost).await.is_none());
    assert!(registry.is_empty().await);
}

// ---------------------------------------------------------------------------
// Test: full success path ends in done with a URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_path_sets_url_with_done() {
    let registry = JobRegistry::new();
    let id = registry.create().await;

    for s in STAGES {
        registry.update_status(id, *s).await.unwrap();
        assert_eq!(registry.get(id).await.unwrap().status, *s);
        assert_eq!(registry.get(id).await.unwrap().video_url, None);
    }
    registry
        .set_video_url(id, "https://cdn.test/v.mp4".into())
        .await
        .unwrap();

    let job = registry.get(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.video_url.as_deref(), Some("https://cdn.test/v.mp4"));
}

// ---------------------------------------------------------------------------
// Test: illegal transitions are rejected and leave the record unchanged
// ---------------------------------------------------------------------------

#[tokio::test]
async fn illegal_transition_is_rejected() {
    let registry = JobRegistry::new();
    let id = registry.create().await;

    assert_matches!(
        registry.update_status(id, JobStatus::Uploading).await,
        Err(CoreError::Conflict(_))
    );
    assert_matches!(
        registry.set_video_url(id, "https://cdn.test/v.mp4".into()).await,
        Err(CoreError::Conflict(_))
    );

    let job = registry.get(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.video_url, None);
}

// ---------------------------------------------------------------------------
// Test: error is terminal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_job_cannot_advance() {
    let registry = JobRegistry::new();
    let id = registry.create().await;
    registry
        .update_status(id, JobStatus::GeneratingCode)
        .await
        .unwrap();
    registry.fail(id, "no code".into()).await.unwrap();

    assert!(registry
        .update_status(id, JobStatus::CodeGenerated)
        .await
        .is_err());

    let job = registry.get(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.video_url, None);
    assert_eq!(job.error.as_deref(), Some("no code"));
}

// ---------------------------------------------------------------------------
// Test: concurrent creation yields distinct ids and no lost updates
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_jobs_keep_their_own_progress() {
    const N: usize = 64;
    let registry = Arc::new(JobRegistry::new());

    let handles: Vec<_> = (0..N)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let id = registry.create().await;
                for s in STAGES {
                    registry.update_status(id, *s).await.unwrap();
                    tokio::task::yield_now().await;
                }
                if i % 2 == 0 {
                    registry
                        .set_video_url(id, format!("https://cdn.test/{id}.mp4"))
                        .await
                        .unwrap();
                } else {
                    registry.fail(id, "upload failed".into()).await.unwrap();
                }
                (i, id)
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let (i, id) = handle.await.unwrap();
        assert!(ids.insert(id), "duplicate id {id}");

        let job = registry.get(id).await.unwrap();
        if i % 2 == 0 {
            assert_eq!(job.status, JobStatus::Done);
            assert_eq!(job.video_url, Some(format!("https://cdn.test/{id}.mp4")));
        } else {
            assert_eq!(job.status, JobStatus::Error);
            assert_eq!(job.video_url, None);
        }
    }

    assert_eq!(ids.len(), N);
    assert_eq!(registry.len().await, N);
}
