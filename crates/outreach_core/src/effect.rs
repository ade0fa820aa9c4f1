use std::time::Duration;

use crate::{Generation, PollTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEffect {
    Fetch {
        generation: Generation,
        target: PollTarget,
    },
    /// Arm the periodic timer. Replaces any timer already armed.
    ArmTimer {
        generation: Generation,
        interval: Duration,
    },
    CancelTimer,
    ScheduleRetry {
        generation: Generation,
        delay: Duration,
    },
}
