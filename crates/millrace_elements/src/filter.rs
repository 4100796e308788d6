//! Timestamp-window packet filter.

use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreResult, Duration, Errors, Timestamp};
use millrace_graph::{Context, Element, PortCount, PortSpec, Processing};
use millrace_packet::Packet;

/// Passes packets whose receive timestamp lies within a window relative
/// to the first timestamped packet seen.
///
/// Configured with two intervals, start and end offsets from the first
/// packet. Packets outside the window, and packets carrying no timestamp
/// annotation at all, go to output 1 when it exists and are dropped
/// otherwise.
pub struct TimeFilter {
    start_after: Duration,
    end_after: Duration,
    first: Option<Timestamp>,
    drops: u64,
}

impl TimeFilter {
    /// An unconfigured filter; `configure` supplies the window
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_after: Duration::zero(),
            end_after: Duration::zero(),
            first: None,
            drops: 0,
        }
    }

    fn admit(&mut self, packet: &Packet) -> bool {
        let Some(stamp) = packet.annotations().timestamp() else {
            return false;
        };
        let first = *self.first.get_or_insert(stamp);
        let start = first.add(self.start_after);
        let end = first.add(self.end_after);
        stamp >= start && stamp <= end
    }

    fn reject(&mut self, packet: Packet, ctx: &Context<'_>) {
        self.drops += 1;
        ctx.push(1, packet);
    }
}

impl Default for TimeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for TimeFilter {
    fn class_name(&self) -> &'static str {
        "TimeFilter"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new(
            PortCount::fixed(1),
            Processing::Agnostic,
            PortCount::range(1, 2),
            Processing::Agnostic,
        )
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::Push)
            .with(Capability::Pull)
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        self.start_after = args
            .interval("window start")
            .map_err(|e| errh.error(e.to_string()))?;
        self.end_after = args
            .interval("window end")
            .map_err(|e| errh.error(e.to_string()))?;
        if self.end_after < self.start_after {
            return Err(errh.error("window end precedes window start"));
        }
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn push(&mut self, _port: usize, packet: Packet, ctx: &Context<'_>) {
        if self.admit(&packet) {
            ctx.push(0, packet);
        } else {
            self.reject(packet, ctx);
        }
    }

    fn pull(&mut self, _port: usize, ctx: &Context<'_>) -> Option<Packet> {
        let packet = ctx.pull(0)?;
        if self.admit(&packet) {
            Some(packet)
        } else {
            self.reject(packet, ctx);
            None
        }
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "drops" => Some(self.drops.to_string()),
            _ => None,
        }
    }
}
