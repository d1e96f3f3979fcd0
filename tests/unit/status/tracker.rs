use super::*;
use crate::store::memory::InMemoryStore;

fn job() -> RenderJob {
    RenderJob::for_id(JobId::parse("JOB000000001").unwrap(), "mov")
}

fn tracker() -> (Arc<InMemoryStore>, JobStatusTracker) {
    let store = Arc::new(InMemoryStore::new());
    let tracker = JobStatusTracker::new(store.clone());
    (store, tracker)
}

#[test]
fn for_id_uses_wire_layout() {
    let job = job();
    assert_eq!(job.output_key, "renders/JOB000000001/output.mov");
    assert_eq!(job.success_marker_key, "renders/JOB000000001/_SUCCESS");
    assert_eq!(job.failure_marker_key, "renders/JOB000000001/_FAILED");
    assert!(job.created_at.is_none());
}

#[test]
fn pending_until_a_marker_appears() {
    let (store, tracker) = tracker();
    let job = job();
    assert_eq!(tracker.poll(&job).unwrap(), JobStatus::Pending);

    store.put(&job.output_key, b"video".to_vec());
    assert_eq!(tracker.poll(&job).unwrap(), JobStatus::Pending);

    store.put(&job.success_marker_key, Vec::new());
    assert_eq!(tracker.poll(&job).unwrap(), JobStatus::Succeeded);
}

#[test]
fn failure_marker_means_failed() {
    let (store, tracker) = tracker();
    let job = job();
    store.put(&job.failure_marker_key, b"Traceback ...".to_vec());
    assert_eq!(tracker.poll(&job).unwrap(), JobStatus::Failed);
}

#[test]
fn success_wins_when_both_markers_exist() {
    let (store, tracker) = tracker();
    let job = job();
    store.put(&job.failure_marker_key, Vec::new());
    store.put(&job.success_marker_key, Vec::new());
    for _ in 0..3 {
        assert_eq!(tracker.poll(&job).unwrap(), JobStatus::Succeeded);
    }
}

#[test]
fn every_poll_requeries_the_store() {
    let (store, tracker) = tracker();
    let job = job();
    tracker.poll(&job).unwrap();
    let after_one = store.call_count();
    tracker.poll(&job).unwrap();
    assert_eq!(store.call_count(), after_one * 2);
}

#[test]
fn storage_failure_is_an_error_not_failed() {
    let (store, tracker) = tracker();
    store.set_offline(true);
    let err = tracker.poll(&job()).unwrap_err();
    assert!(matches!(err, RenderError::StorageAccess(_)));
    assert_eq!(err.class(), crate::foundation::error::FailureClass::Unknown);
}

#[test]
fn poll_until_returns_pending_at_deadline() {
    let (store, tracker) = tracker();
    store.set_offline(true);
    let status = tracker
        .poll_until(&job(), Duration::from_millis(5), Duration::from_millis(30))
        .unwrap();
    assert_eq!(status, JobStatus::Pending);
    assert!(store.call_count() >= 2);
}

#[test]
fn poll_until_stops_at_terminal_status() {
    let (store, tracker) = tracker();
    let job = job();
    store.put(&job.failure_marker_key, Vec::new());
    let status = tracker
        .poll_until(&job, Duration::from_secs(60), Duration::from_secs(600))
        .unwrap();
    assert_eq!(status, JobStatus::Failed);
}

#[test]
fn handle_survives_json() {
    let layout = JobLayout::new(&JobId::parse("JOB000000002").unwrap(), "glb", "mp4");
    let job = RenderJob::launched(
        JobId::parse("JOB000000002").unwrap(),
        &layout,
        "gs://b/renders/JOB000000002/output.mp4".into(),
    );
    let json = serde_json::to_string(&job).unwrap();
    assert!(json.contains("\"job_id\":\"JOB000000002\""));
    assert_eq!(RenderJob::from_json_str(&json).unwrap(), job);

    let bare = serde_json::to_value(RenderJob::for_id(JobId::parse("JOB000000002").unwrap(), "mp4"))
        .unwrap();
    assert!(bare.get("created_at").is_none());
}

#[test]
fn malformed_handle_is_invalid_request() {
    let err = RenderJob::from_json_str("{\"job_id\":\"short\"}").unwrap_err();
    assert!(matches!(err, RenderError::InvalidRequest(_)));
}

#[test]
fn poll_until_with_unbounded_timeout_still_returns_terminal_status() {
    let (store, tracker) = tracker();
    let job = job();
    store.put(&job.success_marker_key, Vec::new());
    let status = tracker
        .poll_until(&job, Duration::from_millis(1), Duration::MAX)
        .unwrap();
    assert_eq!(status, JobStatus::Succeeded);
}

#[test]
fn poll_until_with_unbounded_timeout_keeps_polling() {
    let (store, tracker) = tracker();
    let job = job();
    let marker = job.success_marker_key.clone();
    let writer = {
        let store = store.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            store.put(&marker, Vec::new());
        })
    };
    let status = tracker
        .poll_until(&job, Duration::from_millis(5), Duration::from_secs(u64::MAX))
        .unwrap();
    writer.join().unwrap();
    assert_eq!(status, JobStatus::Succeeded);
}
