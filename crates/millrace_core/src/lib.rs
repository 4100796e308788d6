//! MILLRACE Core Types
//!
//! This crate contains pure types and logic with no I/O: the shared error
//! type, timestamps and durations, static element capability sets, and the
//! typed configuration arguments elements are configured with.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod capability;
pub mod config;
pub mod error;
pub mod time;

// Re-exports
pub use capability::{Capability, CapabilitySet};
pub use config::{Args, ConfigArg, Errors};
pub use error::{CoreError, CoreResult};
pub use time::{Duration, Timestamp};
