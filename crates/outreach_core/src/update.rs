use crate::{JobSummary, PollEffect, PollMsg, PollPhase, PollSession, PollTarget};

/// Pure update function: applies a message to a polling session and returns
/// the effects the driver must carry out.
pub fn update<T: JobSummary>(
    mut session: PollSession<T>,
    msg: PollMsg<T>,
) -> (PollSession<T>, Vec<PollEffect>) {
    let effects = match msg {
        PollMsg::Start => {
            if session.phase() == PollPhase::Polling {
                return (session, Vec::new());
            }
            let generation = session.begin();
            vec![
                PollEffect::Fetch {
                    generation,
                    target: session.target().clone(),
                },
                PollEffect::ArmTimer {
                    generation,
                    interval: session.config().interval,
                },
            ]
        }
        PollMsg::Stop => match session.phase() {
            PollPhase::Idle => Vec::new(),
            PollPhase::Polling => {
                session.halt();
                vec![PollEffect::CancelTimer]
            }
            // Timer is already gone; only the counter needs clearing.
            PollPhase::Exhausted => {
                session.halt();
                Vec::new()
            }
        },
        PollMsg::Tick { generation } | PollMsg::RetryDue { generation } => {
            if session.accepts(generation) {
                vec![PollEffect::Fetch {
                    generation,
                    target: session.target().clone(),
                }]
            } else {
                Vec::new()
            }
        }
        PollMsg::FetchSucceeded { generation, items } => {
            if session.accepts(generation) {
                session.replace_tracked(items);
            }
            Vec::new()
        }
        PollMsg::FetchFailed { generation, reason } => {
            if !session.accepts(generation) {
                return (session, Vec::new());
            }
            if session.record_failure(reason) {
                vec![PollEffect::CancelTimer]
            } else {
                vec![PollEffect::ScheduleRetry {
                    generation,
                    delay: session.config().retry_delay,
                }]
            }
        }
        PollMsg::Track(ids) => {
            if let PollTarget::Ids(tracked) = session.target_mut() {
                tracked.extend(ids);
                session.mark_dirty();
            }
            Vec::new()
        }
        PollMsg::Untrack(ids) => {
            if let PollTarget::Ids(tracked) = session.target_mut() {
                for id in &ids {
                    tracked.remove(id);
                }
                session.mark_dirty();
                session.drop_untracked();
            }
            Vec::new()
        }
    };

    (session, effects)
}
