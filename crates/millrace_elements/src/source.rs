//! Pattern-filled packet source.

use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreResult, Errors};
use millrace_graph::{Context, Element, PortSpec, Processing};
use millrace_packet::{Packet, WritablePacket};

/// Pull source emitting packets of a configured length whose byte at
/// offset `i` is `i & 0xff`, so a downstream checker can verify nothing
/// was reordered or corrupted.
pub struct PatternSource {
    length: usize,
}

impl PatternSource {
    /// An unconfigured source; `configure` supplies the packet length
    #[must_use]
    pub fn new() -> Self {
        Self { length: 1 }
    }
}

impl Default for PatternSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for PatternSource {
    fn class_name(&self) -> &'static str {
        "PatternSource"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::source(1, Processing::Pull)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Pull)
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        let length = args
            .unsigned("packet length")
            .map_err(|e| errh.error(e.to_string()))?;
        if length == 0 {
            return Err(errh.error("packet length must be positive"));
        }
        self.length = length as usize;
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn pull(&mut self, _port: usize, _ctx: &Context<'_>) -> Option<Packet> {
        // allocation failure propagates as "produced nothing"
        let mut packet = match WritablePacket::create(self.length, 0, 0) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::warn!(%err, "pattern packet allocation failed");
                return None;
            }
        };
        for (i, byte) in packet.data_mut().iter_mut().enumerate() {
            *byte = (i & 0xff) as u8;
        }
        Some(packet.into_packet())
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "length" => Some(self.length.to_string()),
            _ => None,
        }
    }
}
