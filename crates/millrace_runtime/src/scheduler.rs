//! Cooperative task scheduler.
//!
//! A global ordered run list of tasks serviced round-robin, one task at a
//! time, run-to-completion. A popped task is not re-queued automatically:
//! a task that wants to run again re-inserts itself (`fast_reschedule`),
//! and a task with no useful work steps aside so its peers get the slot.

use indexmap::IndexMap;
use std::collections::VecDeque;

/// Identifies a task within one scheduler instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task_{}", self.0)
    }
}

#[derive(Debug)]
struct TaskState {
    enabled: bool,
    queued: bool,
}

/// Round-robin run list over opaque task ids.
///
/// The scheduler decides what runs next; the caller runs it. Disabled
/// tasks keep their bookkeeping so they can be resumed later.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: IndexMap<TaskId, TaskState>,
    run: VecDeque<TaskId>,
    next_id: u64,
}

impl Scheduler {
    /// Create an empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: IndexMap::new(),
            run: VecDeque::new(),
            next_id: 0,
        }
    }

    /// Join the scheduler: insert a new task, initially enabled and
    /// queued for its first run
    pub fn insert(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            TaskState {
                enabled: true,
                queued: true,
            },
        );
        self.run.push_back(id);
        id
    }

    /// Pop the next runnable task off the run list.
    ///
    /// Skips entries that were disabled while queued. The returned task
    /// is no longer queued; it runs to completion and re-inserts itself
    /// if it wants another pass.
    pub fn next(&mut self) -> Option<TaskId> {
        while let Some(id) = self.run.pop_front() {
            if let Some(state) = self.tasks.get_mut(&id) {
                state.queued = false;
                if state.enabled {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Re-queue the currently running task for a near-immediate revisit.
    ///
    /// No-op if the task was disabled meanwhile or is already queued.
    pub fn fast_reschedule(&mut self, id: TaskId) {
        if let Some(state) = self.tasks.get_mut(&id) {
            if state.enabled && !state.queued {
                state.queued = true;
                self.run.push_back(id);
            }
        }
    }

    /// Re-enable and queue a task. Safe on an already-queued task.
    pub fn reschedule(&mut self, id: TaskId) {
        if let Some(state) = self.tasks.get_mut(&id) {
            state.enabled = true;
            if !state.queued {
                state.queued = true;
                self.run.push_back(id);
            }
        }
    }

    /// Disable a task while retaining its bookkeeping.
    ///
    /// Idempotent, and safe to call from inside the very task being
    /// unscheduled; a queued entry is skipped lazily.
    pub fn unschedule(&mut self, id: TaskId) {
        if let Some(state) = self.tasks.get_mut(&id) {
            state.enabled = false;
        }
    }

    /// Whether the task exists and is enabled
    #[must_use]
    pub fn is_enabled(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|s| s.enabled)
    }

    /// Whether the task is currently on the run list
    #[must_use]
    pub fn is_queued(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|s| s.queued)
    }

    /// Number of registered tasks
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of enabled entries waiting on the run list
    #[must_use]
    pub fn pending(&self) -> usize {
        self.run
            .iter()
            .filter(|id| self.is_enabled(**id))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_queues_enabled() {
        let mut sched = Scheduler::new();
        let a = sched.insert();
        assert!(sched.is_enabled(a));
        assert!(sched.is_queued(a));
        assert_eq!(sched.task_count(), 1);
    }

    #[test]
    fn test_round_robin_order() {
        let mut sched = Scheduler::new();
        let a = sched.insert();
        let b = sched.insert();
        let c = sched.insert();

        assert_eq!(sched.next(), Some(a));
        sched.fast_reschedule(a);
        assert_eq!(sched.next(), Some(b));
        sched.fast_reschedule(b);
        assert_eq!(sched.next(), Some(c));
        // c steps aside (no re-insert); a and b keep alternating
        assert_eq!(sched.next(), Some(a));
        assert_eq!(sched.next(), Some(b));
        assert_eq!(sched.next(), None);
    }

    #[test]
    fn test_popped_task_not_requeued_automatically() {
        let mut sched = Scheduler::new();
        let a = sched.insert();
        assert_eq!(sched.next(), Some(a));
        assert!(!sched.is_queued(a));
        assert_eq!(sched.next(), None);
    }

    #[test]
    fn test_unschedule_idempotent_from_inside() {
        let mut sched = Scheduler::new();
        let a = sched.insert();

        // simulate the task disabling itself mid-run
        assert_eq!(sched.next(), Some(a));
        sched.unschedule(a);
        sched.unschedule(a);
        sched.fast_reschedule(a); // must not resurrect a disabled task
        assert_eq!(sched.next(), None);
        assert_eq!(sched.task_count(), 1); // bookkeeping retained

        sched.reschedule(a);
        assert_eq!(sched.next(), Some(a));
    }

    #[test]
    fn test_disable_while_queued_is_skipped() {
        let mut sched = Scheduler::new();
        let a = sched.insert();
        let b = sched.insert();
        sched.unschedule(a);
        assert_eq!(sched.next(), Some(b));
        assert_eq!(sched.next(), None);
    }

    #[test]
    fn test_reschedule_does_not_double_queue() {
        let mut sched = Scheduler::new();
        let a = sched.insert();
        sched.reschedule(a);
        sched.reschedule(a);
        assert_eq!(sched.next(), Some(a));
        assert_eq!(sched.next(), None);
    }

    #[test]
    fn test_pending_counts_enabled_only() {
        let mut sched = Scheduler::new();
        let a = sched.insert();
        let _b = sched.insert();
        sched.unschedule(a);
        assert_eq!(sched.pending(), 1);
    }
}
