//! Element graphs for MILLRACE.
//!
//! This crate defines the [`Element`] trait, the static port and
//! capability declarations, the push/pull dataflow contract, and the
//! [`Router`]: a validated graph of elements driven by a cooperative
//! scheduler and a deadline-ordered timer queue.
//!
//! Graphs are described either programmatically through
//! [`RouterBuilder`] or as a serde-typed [`RouterPlan`] resolved against
//! a [`Registry`] of element classes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod element;
pub mod plan;
pub mod router;

pub use element::{Element, PortCount, PortSpec, Processing};
pub use plan::{ElementPlan, LinkPlan, Registry, RouterPlan};
pub use router::{BuildError, Context, InitContext, Router, RouterBuilder};
