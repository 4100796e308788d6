//! Packet handoff between router instances.
//!
//! A router and everything in it is single-threaded. To move packets
//! between two routers running on different threads, wire a
//! [`HandoffSender`] as a sink in one graph and the matching
//! [`HandoffReceiver`] as a pull source in the other; the pair shares a
//! bounded mutex-guarded deque. Packet buffers are immutable while
//! shared, so crossing threads this way is safe; an element that wants
//! to modify a handed-off packet takes a writable handle on its own
//! side as usual.

use millrace_core::{Capability, CapabilitySet};
use millrace_graph::{Context, Element, PortSpec, Processing};
use millrace_packet::Packet;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

struct Shared {
    packets: Mutex<VecDeque<Packet>>,
    capacity: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VecDeque<Packet>> {
        match self.packets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Create a connected sender/receiver pair with the given capacity.
#[must_use]
pub fn channel(capacity: usize) -> (HandoffSender, HandoffReceiver) {
    let shared = Arc::new(Shared {
        packets: Mutex::new(VecDeque::with_capacity(capacity)),
        capacity,
    });
    (
        HandoffSender {
            shared: Arc::clone(&shared),
            drops: 0,
        },
        HandoffReceiver { shared },
    )
}

/// Push sink feeding the paired [`HandoffReceiver`].
///
/// Packets pushed while the shared deque is full are dropped and
/// counted, like an overflowing queue.
pub struct HandoffSender {
    shared: Arc<Shared>,
    drops: u64,
}

impl Element for HandoffSender {
    fn class_name(&self) -> &'static str {
        "HandoffSender"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::sink(1, Processing::Push)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Push)
    }

    fn push(&mut self, _port: usize, packet: Packet, ctx: &Context<'_>) {
        let mut packets = self.shared.lock();
        if packets.len() >= self.shared.capacity {
            drop(packets);
            self.drops += 1;
            tracing::debug!(element = ctx.element_name(), "handoff full, dropping");
        } else {
            packets.push_back(packet);
        }
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "drops" => Some(self.drops.to_string()),
            _ => None,
        }
    }
}

/// Pull source draining the paired [`HandoffSender`].
pub struct HandoffReceiver {
    shared: Arc<Shared>,
}

impl Element for HandoffReceiver {
    fn class_name(&self) -> &'static str {
        "HandoffReceiver"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::source(1, Processing::Pull)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Pull)
    }

    fn pull(&mut self, _port: usize, _ctx: &Context<'_>) -> Option<Packet> {
        self.shared.lock().pop_front()
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "length" => Some(self.shared.lock().len().to_string()),
            _ => None,
        }
    }
}
