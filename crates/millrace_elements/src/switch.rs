//! Static output selector.

use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreError, CoreResult, Errors, Timestamp};
use millrace_graph::{Context, Element, PortCount, PortSpec, Processing};
use millrace_packet::Packet;

/// Routes every packet to one statically configured output.
///
/// A negative output index drops everything; an index beyond the wired
/// outputs drops silently. The active output is writable at runtime
/// through the `switch` handler.
pub struct StaticSwitch {
    output: i64,
}

impl StaticSwitch {
    /// A switch initially routing to output 0
    #[must_use]
    pub fn new() -> Self {
        Self { output: 0 }
    }
}

impl Default for StaticSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for StaticSwitch {
    fn class_name(&self) -> &'static str {
        "StaticSwitch"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new(
            PortCount::fixed(1),
            Processing::Push,
            PortCount::at_least(1),
            Processing::Push,
        )
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Push)
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        self.output = args
            .integer("active output")
            .map_err(|e| errh.error(e.to_string()))?;
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn push(&mut self, _port: usize, packet: Packet, ctx: &Context<'_>) {
        if self.output < 0 {
            tracing::debug!("switch inactive, dropping packet");
            return;
        }
        ctx.push(self.output as usize, packet);
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "switch" => Some(self.output.to_string()),
            _ => None,
        }
    }

    fn write_handler(&mut self, name: &str, value: &str, _now: Timestamp) -> CoreResult<()> {
        match name {
            "switch" => {
                self.output = value.trim().parse().map_err(|_| CoreError::Parse {
                    message: "switch must be an integer".to_string(),
                })?;
                Ok(())
            }
            _ => Err(CoreError::NoSuchHandler(name.to_string())),
        }
    }
}
