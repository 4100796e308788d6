//! Small elements used only by this crate's tests: injecting prepared
//! packets into a graph and collecting what comes out the other end.

use millrace_core::{Capability, CapabilitySet, CoreResult};
use millrace_graph::{Context, Element, InitContext, PortSpec, Processing};
use millrace_packet::{Packet, WritablePacket};
use millrace_runtime::TaskId;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Shared queue of prepared packets
pub type Prepared = Rc<RefCell<VecDeque<Packet>>>;

/// Shared record of collected packets
pub type Collected = Rc<RefCell<Vec<Packet>>>;

pub fn prepared(packets: Vec<Packet>) -> Prepared {
    Rc::new(RefCell::new(packets.into()))
}

pub fn blank_packet(len: usize) -> Packet {
    WritablePacket::create(len, 0, 0).unwrap().into_packet()
}

/// Scheduled push source emitting every prepared packet in one task run.
pub struct InjectSource {
    pending: Prepared,
}

impl InjectSource {
    pub fn boxed(pending: Prepared) -> Box<Self> {
        Box::new(Self { pending })
    }
}

impl Element for InjectSource {
    fn class_name(&self) -> &'static str {
        "InjectSource"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::source(1, Processing::Push)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::Push)
            .with(Capability::Scheduled)
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> CoreResult<()> {
        ctx.register_task();
        Ok(())
    }

    fn run_task(&mut self, _task: TaskId, ctx: &Context<'_>) -> bool {
        let mut sent = false;
        loop {
            let packet = self.pending.borrow_mut().pop_front();
            match packet {
                Some(packet) => {
                    ctx.push(0, packet);
                    sent = true;
                }
                None => return sent,
            }
        }
    }
}

/// Pull source handing out prepared packets.
pub struct PullFeeder {
    pending: Prepared,
}

impl PullFeeder {
    pub fn boxed(pending: Prepared) -> Box<Self> {
        Box::new(Self { pending })
    }
}

impl Element for PullFeeder {
    fn class_name(&self) -> &'static str {
        "PullFeeder"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::source(1, Processing::Pull)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Pull)
    }

    fn pull(&mut self, _port: usize, _ctx: &Context<'_>) -> Option<Packet> {
        self.pending.borrow_mut().pop_front()
    }
}

/// Push sink recording everything it receives.
pub struct Collect {
    received: Collected,
}

impl Collect {
    pub fn boxed() -> (Box<Self>, Collected) {
        let received: Collected = Rc::new(RefCell::new(Vec::new()));
        (
            Box::new(Self {
                received: Rc::clone(&received),
            }),
            received,
        )
    }
}

impl Element for Collect {
    fn class_name(&self) -> &'static str {
        "Collect"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::sink(1, Processing::Push)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Push)
    }

    fn push(&mut self, _port: usize, packet: Packet, _ctx: &Context<'_>) {
        self.received.borrow_mut().push(packet);
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "count" => Some(self.received.borrow().len().to_string()),
            _ => None,
        }
    }
}

/// Scheduled pull-to-push mover; steps aside when the upstream is empty
/// but stays queued for a later pass.
pub struct Mover;

impl Mover {
    pub fn boxed() -> Box<Self> {
        Box::new(Self)
    }
}

impl Element for Mover {
    fn class_name(&self) -> &'static str {
        "Mover"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new(
            millrace_graph::PortCount::fixed(1),
            Processing::Pull,
            millrace_graph::PortCount::fixed(1),
            Processing::Push,
        )
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::Push)
            .with(Capability::Pull)
            .with(Capability::Scheduled)
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> CoreResult<()> {
        ctx.register_task();
        Ok(())
    }

    fn run_task(&mut self, task: TaskId, ctx: &Context<'_>) -> bool {
        match ctx.pull(0) {
            Some(packet) => {
                ctx.push(0, packet);
                ctx.fast_reschedule(task);
                true
            }
            None => {
                ctx.reschedule(task);
                false
            }
        }
    }
}
