//! Push-to-pull packet buffer.

use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreError, CoreResult, Errors, Timestamp};
use millrace_graph::{Context, Element, PortCount, PortSpec, Processing};
use millrace_packet::Packet;
use std::collections::VecDeque;

const DEFAULT_CAPACITY: usize = 1000;

/// FIFO buffer between a push upstream and a pull downstream.
///
/// Queuing is an ordinary element, not part of the dataflow contract:
/// whoever wants store-and-forward behavior wires one of these in.
/// Packets arriving at a full queue are dropped and counted.
pub struct Queue {
    packets: VecDeque<Packet>,
    capacity: usize,
    drops: u64,
}

impl Queue {
    /// An empty queue with the default capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            packets: VecDeque::new(),
            capacity: DEFAULT_CAPACITY,
            drops: 0,
        }
    }

    fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.packets.len() > capacity {
            self.packets.pop_back();
            self.drops += 1;
        }
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Queue {
    fn class_name(&self) -> &'static str {
        "Queue"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new(
            PortCount::fixed(1),
            Processing::Push,
            PortCount::fixed(1),
            Processing::Pull,
        )
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::Push)
            .with(Capability::Pull)
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        let capacity = args
            .optional_unsigned("capacity", DEFAULT_CAPACITY as u64)
            .map_err(|e| errh.error(e.to_string()))?;
        if capacity == 0 {
            return Err(errh.error("capacity must be positive"));
        }
        self.capacity = capacity as usize;
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn push(&mut self, _port: usize, packet: Packet, _ctx: &Context<'_>) {
        if self.packets.len() >= self.capacity {
            self.drops += 1;
            tracing::debug!(drops = self.drops, "queue full, dropping packet");
            return;
        }
        self.packets.push_back(packet);
    }

    fn pull(&mut self, _port: usize, _ctx: &Context<'_>) -> Option<Packet> {
        self.packets.pop_front()
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "length" => Some(self.packets.len().to_string()),
            "capacity" => Some(self.capacity.to_string()),
            "drops" => Some(self.drops.to_string()),
            _ => None,
        }
    }

    fn write_handler(&mut self, name: &str, value: &str, _now: Timestamp) -> CoreResult<()> {
        match name {
            "capacity" => {
                let capacity: usize = value.trim().parse().map_err(|_| CoreError::Parse {
                    message: format!("capacity '{value}': expected positive integer"),
                })?;
                if capacity == 0 {
                    return Err(CoreError::Parse {
                        message: "capacity must be positive".to_string(),
                    });
                }
                self.set_capacity(capacity);
                Ok(())
            }
            _ => Err(CoreError::NoSuchHandler(name.to_string())),
        }
    }
}
