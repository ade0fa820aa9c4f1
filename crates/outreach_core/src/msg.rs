use crate::{Generation, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum PollMsg<T> {
    /// Caller asked to begin monitoring.
    Start,
    /// Caller asked to stop monitoring.
    Stop,
    /// Periodic timer fired.
    Tick { generation: Generation },
    /// Fixed-delay retry after a failed fetch is due.
    RetryDue { generation: Generation },
    /// A fetch resolved with a fresh collection.
    FetchSucceeded { generation: Generation, items: Vec<T> },
    /// A fetch failed, either in transport or shape validation.
    FetchFailed { generation: Generation, reason: String },
    /// Add job ids to an id-targeted session.
    Track(Vec<JobId>),
    /// Remove job ids; their rows leave the tracked collection.
    Untrack(Vec<JobId>),
}
