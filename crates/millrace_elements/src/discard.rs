//! Packet sink.

use millrace_core::{Capability, CapabilitySet};
use millrace_graph::{Context, Element, PortSpec, Processing};
use millrace_packet::Packet;

/// Drops every packet pushed into it, counting them.
#[derive(Default)]
pub struct Discard {
    count: u64,
}

impl Discard {
    /// A fresh sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Element for Discard {
    fn class_name(&self) -> &'static str {
        "Discard"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::sink(1, Processing::Push)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Push)
    }

    fn push(&mut self, _port: usize, packet: Packet, _ctx: &Context<'_>) {
        drop(packet);
        self.count += 1;
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "count" => Some(self.count.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{blank_packet, prepared, InjectSource};
    use millrace_core::Timestamp;
    use millrace_graph::RouterBuilder;

    #[test]
    fn test_discard_counts() {
        let pending = prepared(vec![blank_packet(8), blank_packet(8), blank_packet(8)]);
        let router = RouterBuilder::new()
            .add("inject", InjectSource::boxed(pending), vec![])
            .add("sink", Box::new(Discard::new()), vec![])
            .connect("inject", 0, "sink", 0)
            .build(Timestamp::zero())
            .unwrap();
        router.run_task(Timestamp::zero());
        assert_eq!(router.handler_read("sink.count").unwrap(), "3");
    }
}
