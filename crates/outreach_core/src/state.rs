use std::collections::BTreeSet;
use std::time::Duration;

use crate::view_model::PollSnapshot;
use crate::{JobId, JobSummary};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Identifies one `start` of a session; messages from older starts are ignored.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPhase {
    #[default]
    Idle,
    Polling,
    /// Retry ceiling reached; only an explicit start resumes polling.
    Exhausted,
}

/// Which jobs a session asks the backend about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PollTarget {
    #[default]
    All,
    Ids(BTreeSet<JobId>),
}

impl PollTarget {
    pub fn ids(ids: impl IntoIterator<Item = JobId>) -> Self {
        PollTarget::Ids(ids.into_iter().collect())
    }

    pub fn contains(&self, id: JobId) -> bool {
        match self {
            PollTarget::All => true,
            PollTarget::Ids(ids) => ids.contains(&id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl PollConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            retry_delay: Duration::from_secs(5),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// State of one polling session, mutated only through [`crate::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct PollSession<T> {
    config: PollConfig,
    target: PollTarget,
    phase: PollPhase,
    retry_count: u32,
    generation: Generation,
    tracked: Vec<T>,
    last_error: Option<String>,
    dirty: bool,
}

impl<T> Default for PollSession<T> {
    fn default() -> Self {
        Self::new(PollConfig::default(), PollTarget::All)
    }
}

impl<T> PollSession<T> {
    pub fn new(config: PollConfig, target: PollTarget) -> Self {
        Self {
            config,
            target,
            phase: PollPhase::Idle,
            retry_count: 0,
            generation: 0,
            tracked: Vec::new(),
            last_error: None,
            dirty: false,
        }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    pub fn tracked(&self) -> &[T] {
        &self.tracked
    }

    /// Returns whether anything observable changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// True when a message tagged with `generation` belongs to the running session.
    pub(crate) fn accepts(&self, generation: Generation) -> bool {
        self.phase == PollPhase::Polling && self.generation == generation
    }

    pub(crate) fn begin(&mut self) -> Generation {
        self.generation += 1;
        self.phase = PollPhase::Polling;
        self.retry_count = 0;
        self.last_error = None;
        self.dirty = true;
        self.generation
    }

    pub(crate) fn halt(&mut self) {
        self.phase = PollPhase::Idle;
        self.retry_count = 0;
        self.dirty = true;
    }

    /// Records one failed fetch; returns true when the ceiling was reached.
    pub(crate) fn record_failure(&mut self, reason: String) -> bool {
        self.retry_count += 1;
        self.last_error = Some(reason);
        self.dirty = true;
        if self.retry_count >= self.config.max_retries {
            self.phase = PollPhase::Exhausted;
            true
        } else {
            false
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn target_mut(&mut self) -> &mut PollTarget {
        &mut self.target
    }
}

impl<T: JobSummary> PollSession<T> {
    /// Replaces the tracked collection wholesale with a fetched one.
    pub(crate) fn replace_tracked(&mut self, items: Vec<T>) {
        let target = &self.target;
        self.tracked = items
            .into_iter()
            .filter(|item| target.contains(item.job_id()))
            .collect();
        self.retry_count = 0;
        self.last_error = None;
        self.dirty = true;
    }

    pub(crate) fn drop_untracked(&mut self) {
        let target = &self.target;
        let before = self.tracked.len();
        self.tracked.retain(|item| target.contains(item.job_id()));
        if self.tracked.len() != before {
            self.dirty = true;
        }
    }
}

impl<T: Clone> PollSession<T> {
    pub fn view(&self) -> PollSnapshot<T> {
        PollSnapshot {
            phase: self.phase,
            generation: self.generation,
            retry_count: self.retry_count,
            tracked: self.tracked.clone(),
            last_error: self.last_error.clone(),
            dirty: self.dirty,
        }
    }
}
