//! Deadline-ordered timer queue.
//!
//! Timers are single-shot: a timer fires exactly once per arming and
//! never re-arms itself. Periodic behavior is built by the callback
//! explicitly re-arming with a new future deadline. Expiry returns the
//! fired ids so the caller invokes callbacks after the queue borrow is
//! released; firing therefore never blocks on state shared with the task
//! scheduler.

use indexmap::IndexMap;
use millrace_core::{Duration, Timestamp};
use std::collections::BTreeMap;

/// Identifies a timer within one timer queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer_{}", self.0)
    }
}

/// Timer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Registered but not armed
    Unscheduled,
    /// Armed, waiting for its deadline
    Pending {
        /// Absolute fire time
        deadline: Timestamp,
        /// Arming sequence, breaks deadline ties
        seq: u64,
    },
    /// Fired; must be explicitly re-armed
    Fired,
}

/// Timer error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// Arming a timer that is already pending is a local precondition
    /// failure; disarm first
    #[error("{0} is already pending")]
    AlreadyPending(TimerId),

    /// Unknown timer id
    #[error("unknown timer: {0}")]
    Unknown(TimerId),
}

/// Deadline-ordered timer queue keyed by absolute fire time.
///
/// Equal deadlines fire in arming order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: IndexMap<TimerId, TimerState>,
    queue: BTreeMap<(Timestamp, u64), TimerId>,
    next_id: u64,
    next_seq: u64,
}

impl TimerQueue {
    /// Create an empty timer queue
    #[must_use]
    pub fn new() -> Self {
        Self {
            timers: IndexMap::new(),
            queue: BTreeMap::new(),
            next_id: 0,
            next_seq: 0,
        }
    }

    /// Register a new timer, initially unscheduled
    pub fn register(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(id, TimerState::Unscheduled);
        id
    }

    /// Arm a timer at an absolute deadline.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::AlreadyPending`] if the timer is armed and
    /// has not fired, [`TimerError::Unknown`] for an unregistered id.
    pub fn schedule_at(&mut self, id: TimerId, deadline: Timestamp) -> Result<(), TimerError> {
        match self.timers.get_mut(&id) {
            None => Err(TimerError::Unknown(id)),
            Some(TimerState::Pending { .. }) => Err(TimerError::AlreadyPending(id)),
            Some(state) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                *state = TimerState::Pending { deadline, seq };
                self.queue.insert((deadline, seq), id);
                Ok(())
            }
        }
    }

    /// Arm a timer `after` from `now`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TimerQueue::schedule_at`].
    pub fn schedule_after(
        &mut self,
        id: TimerId,
        now: Timestamp,
        after: Duration,
    ) -> Result<(), TimerError> {
        self.schedule_at(id, now.add(after))
    }

    /// Disarm a timer. Idempotent; safe from inside the firing callback;
    /// unknown ids are ignored.
    pub fn unschedule(&mut self, id: TimerId) {
        if let Some(state) = self.timers.get_mut(&id) {
            if let TimerState::Pending { deadline, seq } = *state {
                self.queue.remove(&(deadline, seq));
            }
            *state = TimerState::Unscheduled;
        }
    }

    /// Pop every timer whose deadline has passed, in deadline order with
    /// ties broken by arming order. Each id fires exactly once; the
    /// caller invokes the callbacks.
    pub fn expire(&mut self, now: Timestamp) -> Vec<TimerId> {
        let mut fired = Vec::new();
        while let Some((&(deadline, seq), &id)) = self.queue.iter().next() {
            if deadline > now {
                break;
            }
            self.queue.remove(&(deadline, seq));
            if let Some(state) = self.timers.get_mut(&id) {
                *state = TimerState::Fired;
            }
            fired.push(id);
        }
        fired
    }

    /// Current state of a timer
    #[must_use]
    pub fn state(&self, id: TimerId) -> Option<TimerState> {
        self.timers.get(&id).copied()
    }

    /// Whether a timer is armed
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        matches!(self.timers.get(&id), Some(TimerState::Pending { .. }))
    }

    /// Earliest armed deadline, for idle loops
    #[must_use]
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Number of armed timers
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Number of registered timers
    #[must_use]
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_fire_in_deadline_order() {
        let mut queue = TimerQueue::new();
        let a = queue.register();
        let b = queue.register();
        let c = queue.register();

        queue.schedule_at(c, at(300)).unwrap();
        queue.schedule_at(a, at(100)).unwrap();
        queue.schedule_at(b, at(200)).unwrap();

        assert_eq!(queue.expire(at(250)), vec![a, b]);
        assert_eq!(queue.expire(at(300)), vec![c]);
        assert_eq!(queue.expire(at(400)), Vec::<TimerId>::new());
    }

    #[test]
    fn test_equal_deadlines_fire_in_arming_order() {
        let mut queue = TimerQueue::new();
        let a = queue.register();
        let b = queue.register();
        let c = queue.register();

        // armed b, then c, then a, all for the same instant
        queue.schedule_at(b, at(100)).unwrap();
        queue.schedule_at(c, at(100)).unwrap();
        queue.schedule_at(a, at(100)).unwrap();

        assert_eq!(queue.expire(at(100)), vec![b, c, a]);
    }

    #[test]
    fn test_fired_exactly_once_no_auto_rearm() {
        let mut queue = TimerQueue::new();
        let a = queue.register();
        queue.schedule_at(a, at(100)).unwrap();

        assert_eq!(queue.expire(at(100)), vec![a]);
        assert_eq!(queue.state(a), Some(TimerState::Fired));
        assert_eq!(queue.expire(at(200)), Vec::<TimerId>::new());

        // explicit re-arm works after firing
        queue.schedule_at(a, at(300)).unwrap();
        assert!(queue.is_pending(a));
    }

    #[test]
    fn test_rearm_while_pending_rejected() {
        let mut queue = TimerQueue::new();
        let a = queue.register();
        queue.schedule_at(a, at(100)).unwrap();

        assert_eq!(
            queue.schedule_at(a, at(200)),
            Err(TimerError::AlreadyPending(a))
        );
        // original deadline untouched
        assert_eq!(queue.next_deadline(), Some(at(100)));
    }

    #[test]
    fn test_unschedule_idempotent() {
        let mut queue = TimerQueue::new();
        let a = queue.register();
        queue.schedule_at(a, at(100)).unwrap();

        queue.unschedule(a);
        queue.unschedule(a);
        assert_eq!(queue.state(a), Some(TimerState::Unscheduled));
        assert_eq!(queue.expire(at(500)), Vec::<TimerId>::new());
    }

    #[test]
    fn test_schedule_after() {
        let mut queue = TimerQueue::new();
        let a = queue.register();
        queue
            .schedule_after(a, at(1_000), Duration::from_millis(3_000))
            .unwrap();
        assert_eq!(queue.next_deadline(), Some(at(4_000)));
    }

    #[test]
    fn test_unknown_timer() {
        let mut queue = TimerQueue::new();
        let a = queue.register();
        drop(queue);

        let mut other = TimerQueue::new();
        assert_eq!(other.schedule_at(a, at(1)), Err(TimerError::Unknown(a)));
    }
}
