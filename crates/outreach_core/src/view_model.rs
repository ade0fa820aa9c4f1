use crate::{Generation, PollPhase};

/// Read-only copy of a session handed to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot<T> {
    pub phase: PollPhase,
    pub generation: Generation,
    pub retry_count: u32,
    pub tracked: Vec<T>,
    pub last_error: Option<String>,
    pub dirty: bool,
}

impl<T> PollSnapshot<T> {
    pub fn is_polling(&self) -> bool {
        self.phase == PollPhase::Polling
    }
}
