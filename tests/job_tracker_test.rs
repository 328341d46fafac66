use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Map;

use prompt_relay::application::ports::JobTracker;
use prompt_relay::application::services::sweep_once;
use prompt_relay::domain::{GenerationOptions, Job, JobId, JobStatus, JobUpdate};
use prompt_relay::infrastructure::persistence::InMemoryJobTracker;

fn job(id: &str) -> Job {
    Job::new(
        JobId::from_string(id),
        "prompt".to_string(),
        "https://example.com/cb".to_string(),
        GenerationOptions::default(),
        Map::new(),
    )
}

#[tokio::test]
async fn given_unknown_id_when_updating_then_no_record_is_created() {
    let tracker = InMemoryJobTracker::default();

    tracker
        .update(&JobId::from_string("ghost"), JobUpdate::status(JobStatus::Processing))
        .await
        .unwrap();

    assert!(tracker.get(&JobId::from_string("ghost")).await.unwrap().is_none());
    assert_eq!(tracker.count().await.unwrap(), 0);
}

#[tokio::test]
async fn given_old_and_recent_jobs_when_sweeping_then_only_old_removed() {
    let tracker: Arc<dyn JobTracker> = Arc::new(InMemoryJobTracker::default());
    let mut stale = job("stale");
    stale.created_at = Utc::now() - Duration::hours(25);
    let mut recent = job("recent");
    recent.created_at = Utc::now() - Duration::hours(1);
    tracker.create(stale).await.unwrap();
    tracker.create(recent).await.unwrap();

    let removed = sweep_once(tracker.as_ref()).await;

    assert_eq!(removed, 1);
    assert!(tracker.get(&JobId::from_string("stale")).await.unwrap().is_none());
    assert!(tracker.get(&JobId::from_string("recent")).await.unwrap().is_some());
}

#[tokio::test]
async fn given_concurrent_readers_when_job_updates_then_reads_see_whole_updates() {
    let tracker = Arc::new(InMemoryJobTracker::default());
    tracker.create(job("shared")).await.unwrap();
    let id = JobId::from_string("shared");

    let writer = {
        let tracker = tracker.clone();
        let id = id.clone();
        tokio::spawn(async move {
            tracker
                .update(&id, JobUpdate::failed("boom"))
                .await
                .unwrap();
        })
    };

    for _ in 0..50 {
        let snapshot = tracker.get(&id).await.unwrap().unwrap();
        if snapshot.status == JobStatus::Failed {
            assert_eq!(snapshot.error_message(), Some("boom"));
        } else {
            assert!(snapshot.result.is_none());
        }
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
}
