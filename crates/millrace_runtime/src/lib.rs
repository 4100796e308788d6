//! MILLRACE runtime: cooperative scheduling, timers, and rate limiting.
//!
//! All three structures are pure decision structures in the same sense as
//! a priority queue: they say *what* should run or fire next, and the
//! graph layer invokes the element code. One scheduler instance together
//! with one timer queue forms one logical thread of control; instances
//! never share state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod rate;
pub mod scheduler;
pub mod timer;

pub use rate::RateLimiter;
pub use scheduler::{Scheduler, TaskId};
pub use timer::{TimerError, TimerId, TimerQueue, TimerState};
