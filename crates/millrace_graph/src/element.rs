//! The element trait and static port declarations.
//!
//! An element is one packet-processing unit with typed ports. Everything
//! the router needs to wire and drive an element is declared statically:
//! port counts and disciplines through [`PortSpec`], participation in
//! scheduling through [`millrace_core::CapabilitySet`]. Resolution happens
//! once at build time, never per call.

use crate::router::{Context, InitContext};
use millrace_core::{Args, CapabilitySet, CoreError, CoreResult, Errors, Timestamp};
use millrace_packet::Packet;
use millrace_runtime::{TaskId, TimerId};

/// Dataflow discipline of one side of an element.
///
/// `Agnostic` ports take whichever discipline their peers impose; the
/// router resolves them to a concrete discipline at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processing {
    /// Caller invokes the element synchronously, ownership transfers in
    Push,
    /// Element is asked for a packet and may answer "none"
    Pull,
    /// Adopts the discipline of whatever it is wired to
    Agnostic,
}

impl std::fmt::Display for Processing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Pull => write!(f, "pull"),
            Self::Agnostic => write!(f, "agnostic"),
        }
    }
}

/// Allowed number of ports on one side of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortCount {
    min: usize,
    max: Option<usize>,
}

impl PortCount {
    /// Exactly `n` ports
    #[must_use]
    pub const fn fixed(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    /// Between `min` and `max` ports inclusive
    #[must_use]
    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// At least `min` ports, no upper bound
    #[must_use]
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    /// Minimum number of ports
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// Whether `n` ports satisfies this declaration
    #[must_use]
    pub const fn allows(&self, n: usize) -> bool {
        n >= self.min
            && match self.max {
                Some(max) => n <= max,
                None => true,
            }
    }
}

/// Static port declaration: counts and disciplines for both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    /// Allowed input port count
    pub inputs: PortCount,
    /// Discipline of all input ports
    pub input_processing: Processing,
    /// Allowed output port count
    pub outputs: PortCount,
    /// Discipline of all output ports
    pub output_processing: Processing,
}

impl PortSpec {
    /// Declare ports on both sides
    #[must_use]
    pub const fn new(
        inputs: PortCount,
        input_processing: Processing,
        outputs: PortCount,
        output_processing: Processing,
    ) -> Self {
        Self {
            inputs,
            input_processing,
            outputs,
            output_processing,
        }
    }

    /// A source: no inputs, `n` outputs
    #[must_use]
    pub const fn source(n: usize, processing: Processing) -> Self {
        Self::new(PortCount::fixed(0), Processing::Agnostic, PortCount::fixed(n), processing)
    }

    /// A sink: `n` inputs, no outputs
    #[must_use]
    pub const fn sink(n: usize, processing: Processing) -> Self {
        Self::new(PortCount::fixed(n), processing, PortCount::fixed(0), Processing::Agnostic)
    }

    /// One input and one output with the same discipline
    #[must_use]
    pub const fn through(processing: Processing) -> Self {
        Self::new(PortCount::fixed(1), processing, PortCount::fixed(1), processing)
    }
}

/// A single packet-processing unit with typed ports.
///
/// The router owns every element, configures it from typed arguments,
/// wires its ports, and drives it through `push`, `pull`, `run_task` and
/// `run_timer`. All invocations on one router instance are strictly
/// sequential and run to completion.
pub trait Element {
    /// Class name, e.g. `"Queue"`
    fn class_name(&self) -> &'static str;

    /// Static port counts and disciplines
    fn ports(&self) -> PortSpec;

    /// Capabilities this element declares; checked against what it
    /// actually registers in [`Element::initialize`]
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
    }

    /// Consume the typed argument list, reporting problems to `errh`.
    ///
    /// The default accepts an empty argument list only.
    fn configure(&mut self, args: &[millrace_core::ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        Args::new(args).finish().map_err(|e| errh.error(e.to_string()))
    }

    /// Register tasks and timers; runs after every element is configured
    fn initialize(&mut self, _ctx: &mut InitContext<'_>) -> CoreResult<()> {
        Ok(())
    }

    /// Receive a packet on input `port`. Ownership transfers here: the
    /// packet must be fully processed, forwarded, or dropped before
    /// returning.
    fn push(&mut self, port: usize, packet: Packet, _ctx: &Context<'_>) {
        tracing::debug!(class = self.class_name(), port, "push into non-push element, dropping");
        drop(packet);
    }

    /// Hand out a packet from output `port`, or `None` if nothing is
    /// currently available. `None` is not an error.
    fn pull(&mut self, _port: usize, _ctx: &Context<'_>) -> Option<Packet> {
        None
    }

    /// Run one scheduled step of work. Returns whether useful work was
    /// done. The task is not requeued automatically; call
    /// [`Context::fast_reschedule`] to keep running.
    fn run_task(&mut self, _task: TaskId, _ctx: &Context<'_>) -> bool {
        false
    }

    /// React to a timer deadline. Timers never auto-rearm; periodic
    /// behavior re-arms explicitly through the context.
    fn run_timer(&mut self, _timer: TimerId, _ctx: &Context<'_>) {}

    /// Read a named introspection handler, if this element defines it
    fn read_handler(&self, _name: &str) -> Option<String> {
        None
    }

    /// Write a named introspection handler
    fn write_handler(&mut self, name: &str, _value: &str, _now: Timestamp) -> CoreResult<()> {
        Err(CoreError::NoSuchHandler(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_count_fixed() {
        let count = PortCount::fixed(2);
        assert_eq!(count.min(), 2);
        assert!(count.allows(2));
        assert!(!count.allows(1));
        assert!(!count.allows(3));
    }

    #[test]
    fn test_port_count_range_and_open() {
        let count = PortCount::range(1, 2);
        assert!(count.allows(1));
        assert!(count.allows(2));
        assert!(!count.allows(3));

        let open = PortCount::at_least(1);
        assert!(!open.allows(0));
        assert!(open.allows(64));
    }

    #[test]
    fn test_port_spec_shorthands() {
        let spec = PortSpec::source(1, Processing::Pull);
        assert_eq!(spec.inputs, PortCount::fixed(0));
        assert_eq!(spec.output_processing, Processing::Pull);

        let spec = PortSpec::through(Processing::Agnostic);
        assert!(spec.inputs.allows(1));
        assert!(spec.outputs.allows(1));
    }
}
