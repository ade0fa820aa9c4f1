//! Async driver for the polling state machine.
//!
//! Each [`JobMonitor`] owns one session. A single task applies messages to the
//! session in order and interprets the resulting effects: fetches and timers
//! run as separate tasks that report back through the same channel, so session
//! state is never touched concurrently.

use std::fmt::Debug;
use std::sync::Arc;

use outreach_core::{
    update, JobId, JobSummary, PollConfig, PollEffect, PollMsg, PollSession, PollSnapshot,
    PollTarget,
};
use outreach_logging::{outreach_debug, outreach_info, outreach_warn};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::ApiError;

/// Fetches the current collection for a session target.
#[async_trait::async_trait]
pub trait JobSource<T>: Send + Sync {
    async fn fetch(&self, target: &PollTarget) -> Result<Vec<T>, ApiError>;
}

/// Handle to a running polling session. Dropping it shuts the session down.
pub struct JobMonitor<T> {
    cmd_tx: mpsc::UnboundedSender<PollMsg<T>>,
    snapshot_rx: watch::Receiver<PollSnapshot<T>>,
    shutdown: CancellationToken,
}

impl<T> JobMonitor<T>
where
    T: JobSummary + Clone + Debug + Send + Sync + 'static,
{
    /// Spawns the session task. Must be called from within a Tokio runtime.
    pub fn spawn(
        name: &'static str,
        source: Arc<dyn JobSource<T>>,
        config: PollConfig,
        target: PollTarget,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let session = PollSession::new(config, target);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.view());
        let shutdown = CancellationToken::new();

        let actor = MonitorActor {
            name,
            source,
            session,
            cmd_tx: cmd_tx.clone(),
            snapshot_tx,
            shutdown: shutdown.clone(),
            timer: None,
        };
        tokio::spawn(actor.run(cmd_rx));

        Self {
            cmd_tx,
            snapshot_rx,
            shutdown,
        }
    }

    pub fn start(&self) {
        let _ = self.cmd_tx.send(PollMsg::Start);
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(PollMsg::Stop);
    }

    pub fn track(&self, ids: impl IntoIterator<Item = JobId>) {
        let _ = self.cmd_tx.send(PollMsg::Track(ids.into_iter().collect()));
    }

    pub fn untrack(&self, ids: impl IntoIterator<Item = JobId>) {
        let _ = self.cmd_tx.send(PollMsg::Untrack(ids.into_iter().collect()));
    }

    pub fn snapshot(&self) -> PollSnapshot<T> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot<T>> {
        self.snapshot_rx.clone()
    }
}

impl<T> Drop for JobMonitor<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct MonitorActor<T> {
    name: &'static str,
    source: Arc<dyn JobSource<T>>,
    session: PollSession<T>,
    cmd_tx: mpsc::UnboundedSender<PollMsg<T>>,
    snapshot_tx: watch::Sender<PollSnapshot<T>>,
    shutdown: CancellationToken,
    /// Cancels the periodic timer and any pending retry of the current start.
    timer: Option<CancellationToken>,
}

impl<T> MonitorActor<T>
where
    T: JobSummary + Clone + Debug + Send + Sync + 'static,
{
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<PollMsg<T>>) {
        loop {
            let msg = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                msg = cmd_rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            self.dispatch(msg);
        }
        self.cancel_timer();
        outreach_debug!("[{}] monitor shut down", self.name);
    }

    fn dispatch(&mut self, msg: PollMsg<T>) {
        let session = std::mem::take(&mut self.session);
        let before = session.phase();
        let (mut session, effects) = update(session, msg);
        if session.phase() != before {
            outreach_info!(
                "[{}] polling {:?} -> {:?} (retries {})",
                self.name,
                before,
                session.phase(),
                session.retry_count()
            );
        }
        if session.consume_dirty() {
            self.snapshot_tx.send_replace(session.view());
        }
        self.session = session;

        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: PollEffect) {
        match effect {
            PollEffect::Fetch { generation, target } => {
                let source = self.source.clone();
                let tx = self.cmd_tx.clone();
                let name = self.name;
                tokio::spawn(async move {
                    let msg = match source.fetch(&target).await {
                        Ok(items) => {
                            outreach_debug!("[{}] fetched {} jobs", name, items.len());
                            PollMsg::FetchSucceeded { generation, items }
                        }
                        Err(err) => {
                            outreach_warn!("[{}] fetch failed: {}", name, err);
                            PollMsg::FetchFailed {
                                generation,
                                reason: err.to_string(),
                            }
                        }
                    };
                    let _ = tx.send(msg);
                });
            }
            PollEffect::ArmTimer {
                generation,
                interval,
            } => {
                self.cancel_timer();
                let token = self.shutdown.child_token();
                self.timer = Some(token.clone());
                let tx = self.cmd_tx.clone();
                tokio::spawn(async move {
                    let mut ticker = interval_at(Instant::now() + interval, interval);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = ticker.tick() => {
                                if tx.send(PollMsg::Tick { generation }).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
            PollEffect::CancelTimer => self.cancel_timer(),
            PollEffect::ScheduleRetry { generation, delay } => {
                let token = match &self.timer {
                    Some(token) => token.clone(),
                    None => self.shutdown.child_token(),
                };
                let tx = self.cmd_tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = sleep(delay) => {
                            let _ = tx.send(PollMsg::RetryDue { generation });
                        }
                    }
                });
            }
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }
}
