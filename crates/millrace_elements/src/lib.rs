//! The MILLRACE element library.
//!
//! Sources, queues, rate-limited unqueuers, classifiers, option
//! processors, and sinks, ready to be wired into a
//! [`Router`](millrace_graph::Router). [`default_registry`] exposes
//! every class that can be built from a plan; the handoff pair in
//! [`handoff`] is constructed in matched pairs via [`handoff::channel`]
//! and added to graphs directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod advertise;
pub mod discard;
pub mod filter;
pub mod handoff;
pub mod location;
pub mod options;
pub mod paint;
pub mod queue;
pub mod route;
pub mod source;
pub mod switch;
pub mod unqueue;
pub mod util;

#[cfg(test)]
mod testutil;

pub use advertise::RouteAdvertiser;
pub use discard::Discard;
pub use filter::TimeFilter;
pub use handoff::{HandoffReceiver, HandoffSender};
pub use location::TraceLocation;
pub use options::GatewayOptions;
pub use paint::{CheckPaint, Paint};
pub use queue::Queue;
pub use route::RouteLookup;
pub use source::PatternSource;
pub use switch::StaticSwitch;
pub use unqueue::{RatedUnqueue, RoundRobinUnqueue};

use millrace_graph::Registry;

/// A registry holding every element class in this crate that can be
/// constructed standalone.
///
/// The handoff sender and receiver are absent: they only exist as
/// matched pairs from [`handoff::channel`].
#[must_use]
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register("RouteAdvertiser", || Box::new(RouteAdvertiser::new()));
    registry.register("CheckPaint", || Box::new(CheckPaint::new()));
    registry.register("Discard", || Box::new(Discard::new()));
    registry.register("GatewayOptions", || Box::new(GatewayOptions::new()));
    registry.register("Paint", || Box::new(Paint::new()));
    registry.register("PatternSource", || Box::new(PatternSource::new()));
    registry.register("Queue", || Box::new(Queue::new()));
    registry.register("RatedUnqueue", || Box::new(RatedUnqueue::new()));
    registry.register("RoundRobinUnqueue", || Box::new(RoundRobinUnqueue::new()));
    registry.register("RouteLookup", || Box::new(RouteLookup::new()));
    registry.register("StaticSwitch", || Box::new(StaticSwitch::new()));
    registry.register("TimeFilter", || Box::new(TimeFilter::new()));
    registry.register("TraceLocation", || Box::new(TraceLocation::new()));
    registry
}
