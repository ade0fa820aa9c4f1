use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outreach_client::{ApiError, JobMonitor, JobSource};
use outreach_core::{JobId, JobStatus, PollConfig, PollPhase, PollTarget, SearchTaskStatus};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;
use tokio::time::sleep;

const INTERVAL: Duration = Duration::from_secs(30);

fn row(id: JobId) -> SearchTaskStatus {
    SearchTaskStatus {
        id,
        status: JobStatus::Running,
        result_count: 0,
        is_completed: false,
        error_message: None,
    }
}

fn rows(ids: &[JobId]) -> Vec<SearchTaskStatus> {
    ids.iter().copied().map(row).collect()
}

fn server_down() -> ApiError {
    ApiError::Server {
        status: 503,
        message: "unavailable".into(),
    }
}

/// Replays scripted outcomes, then repeats the fallback forever.
struct ScriptedSource {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Result<Vec<SearchTaskStatus>, ApiError>>>,
    fallback: Result<Vec<SearchTaskStatus>, ApiError>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedSource {
    fn new(fallback: Result<Vec<SearchTaskStatus>, ApiError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            fallback,
            gate: None,
        }
    }

    fn then(self, outcome: Result<Vec<SearchTaskStatus>, ApiError>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl JobSource<SearchTaskStatus> for ScriptedSource {
    async fn fetch(&self, target: &PollTarget) -> Result<Vec<SearchTaskStatus>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        outcome.map(|rows| rows.into_iter().filter(|row| target.contains(row.id)).collect())
    }
}

fn spawn(source: Arc<ScriptedSource>, target: PollTarget) -> JobMonitor<SearchTaskStatus> {
    JobMonitor::spawn("test", source, PollConfig::with_interval(INTERVAL), target)
}

/// Lets spawned tasks run; virtual time moves only as far as needed.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn tracked_ids(monitor: &JobMonitor<SearchTaskStatus>) -> Vec<JobId> {
    monitor.snapshot().tracked.iter().map(|row| row.id).collect()
}

#[tokio::test(start_paused = true)]
async fn double_start_keeps_a_single_timer() {
    let source = Arc::new(ScriptedSource::new(Ok(rows(&[1]))));
    let monitor = spawn(source.clone(), PollTarget::All);

    monitor.start();
    monitor.start();
    settle().await;
    assert_eq!(source.calls(), 1);

    sleep(INTERVAL * 2).await;
    assert_eq!(source.calls(), 3);
    assert!(monitor.snapshot().is_polling());
}

#[tokio::test(start_paused = true)]
async fn three_failures_exhaust_until_explicit_start() {
    let source = Arc::new(ScriptedSource::new(Err(server_down())));
    let monitor = spawn(source.clone(), PollTarget::All);

    monitor.start();
    sleep(Duration::from_secs(12)).await;
    assert_eq!(source.calls(), 3);
    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.phase, PollPhase::Exhausted);
    assert_eq!(snapshot.retry_count, 3);
    assert!(snapshot.last_error.is_some());

    sleep(INTERVAL * 4).await;
    assert_eq!(source.calls(), 3);

    monitor.start();
    settle().await;
    assert_eq!(source.calls(), 4);
    assert_eq!(monitor.snapshot().phase, PollPhase::Polling);
}

#[tokio::test(start_paused = true)]
async fn each_fetch_replaces_the_tracked_collection() {
    let source = Arc::new(ScriptedSource::new(Ok(rows(&[3]))).then(Ok(rows(&[1, 2]))));
    let monitor = spawn(source.clone(), PollTarget::All);

    monitor.start();
    settle().await;
    assert_eq!(tracked_ids(&monitor), vec![1, 2]);

    sleep(INTERVAL).await;
    assert_eq!(tracked_ids(&monitor), vec![3]);
}

#[tokio::test(start_paused = true)]
async fn success_after_failure_resets_the_retry_counter() {
    let source = Arc::new(
        ScriptedSource::new(Ok(rows(&[9])))
            .then(Err(server_down()))
            .then(Err(server_down())),
    );
    let monitor = spawn(source.clone(), PollTarget::All);

    monitor.start();
    settle().await;
    assert_eq!(monitor.snapshot().retry_count, 1);

    sleep(Duration::from_secs(11)).await;
    let snapshot = monitor.snapshot();
    assert_eq!(source.calls(), 3);
    assert_eq!(snapshot.retry_count, 0);
    assert_eq!(snapshot.phase, PollPhase::Polling);
    assert_eq!(tracked_ids(&monitor), vec![9]);
}

#[tokio::test(start_paused = true)]
async fn late_response_after_stop_is_discarded() {
    let gate = Arc::new(Notify::new());
    let source = Arc::new(ScriptedSource::new(Ok(rows(&[1, 2, 3, 4, 5]))).gated(gate.clone()));
    let monitor = spawn(source.clone(), PollTarget::All);

    monitor.start();
    settle().await;
    assert_eq!(source.calls(), 1);

    monitor.stop();
    settle().await;
    gate.notify_one();
    settle().await;

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.phase, PollPhase::Idle);
    assert!(snapshot.tracked.is_empty());

    sleep(INTERVAL * 2).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn untracked_jobs_leave_the_collection() {
    let source = Arc::new(ScriptedSource::new(Ok(rows(&[1, 2, 3]))));
    let monitor = spawn(source.clone(), PollTarget::ids([1, 2]));

    monitor.start();
    settle().await;
    assert_eq!(tracked_ids(&monitor), vec![1, 2]);

    monitor.untrack([2]);
    settle().await;
    assert_eq!(tracked_ids(&monitor), vec![1]);

    monitor.track([3]);
    sleep(INTERVAL).await;
    assert_eq!(tracked_ids(&monitor), vec![1, 3]);
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_snapshot_changes() {
    let source = Arc::new(ScriptedSource::new(Ok(rows(&[4]))));
    let monitor = spawn(source, PollTarget::All);
    let mut updates = monitor.subscribe();

    monitor.start();
    updates.changed().await.unwrap();
    let mut seen = updates.borrow_and_update().clone();
    while seen.tracked.is_empty() {
        updates.changed().await.unwrap();
        seen = updates.borrow_and_update().clone();
    }
    assert_eq!(seen.tracked, rows(&[4]));
}
