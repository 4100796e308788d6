//! Paint annotation writer and checker.

use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreResult, Errors};
use millrace_graph::{Context, Element, PortCount, PortSpec, Processing};
use millrace_packet::Packet;

/// Sets the paint annotation on every passing packet.
///
/// Agnostic: adopts push or pull from whatever it is wired between.
pub struct Paint {
    color: u8,
}

impl Paint {
    /// An unconfigured painter; `configure` supplies the color
    #[must_use]
    pub fn new() -> Self {
        Self { color: 0 }
    }

    fn act(&self, packet: Packet) -> Packet {
        let mut packet = packet.make_writable();
        packet.annotations_mut().set_paint(self.color);
        packet.into_packet()
    }
}

impl Default for Paint {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for Paint {
    fn class_name(&self) -> &'static str {
        "Paint"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::through(Processing::Agnostic)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::Push)
            .with(Capability::Pull)
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        let color = args.unsigned("color").map_err(|e| errh.error(e.to_string()))?;
        if color > 255 {
            return Err(errh.error("color must fit in a byte"));
        }
        self.color = color as u8;
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn push(&mut self, _port: usize, packet: Packet, ctx: &Context<'_>) {
        ctx.push(0, self.act(packet));
    }

    fn pull(&mut self, _port: usize, ctx: &Context<'_>) -> Option<Packet> {
        ctx.pull(0).map(|packet| self.act(packet))
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "color" => Some(self.color.to_string()),
            _ => None,
        }
    }
}

/// Checks the paint annotation against a configured color.
///
/// Mismatching packets go to output 1 when it exists; with a single
/// output they are dropped. Packets carrying no paint at all mismatch.
pub struct CheckPaint {
    color: u8,
    drops: u64,
}

impl CheckPaint {
    /// An unconfigured checker; `configure` supplies the color
    #[must_use]
    pub fn new() -> Self {
        Self { color: 0, drops: 0 }
    }

    fn matches(&self, packet: &Packet) -> bool {
        packet.annotations().paint() == Some(self.color)
    }

    fn reject(&mut self, packet: Packet, ctx: &Context<'_>) {
        self.drops += 1;
        ctx.push(1, packet);
    }
}

impl Default for CheckPaint {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for CheckPaint {
    fn class_name(&self) -> &'static str {
        "CheckPaint"
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
        let color = args.unsigned("color").map_err(|e| errh.error(e.to_string()))?;
        if color > 255 {
            return Err(errh.error("color must fit in a byte"));
        }
        self.color = color as u8;
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn push(&mut self, _port: usize, packet: Packet, ctx: &Context<'_>) {
        if self.matches(&packet) {
            ctx.push(0, packet);
        } else {
            self.reject(packet, ctx);
        }
    }

    fn pull(&mut self, _port: usize, ctx: &Context<'_>) -> Option<Packet> {
        let packet = ctx.pull(0)?;
        if self.matches(&packet) {
            Some(packet)
        } else {
            self.reject(packet, ctx);
            None
        }
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "color" => Some(self.color.to_string()),
            "drops" => Some(self.drops.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{blank_packet, prepared, Collect, InjectSource};
    use millrace_core::Timestamp;
    use millrace_graph::RouterBuilder;

    fn now() -> Timestamp {
        Timestamp::zero()
    }

    #[test]
    fn test_paint_then_check_passes() {
        let pending = prepared(vec![blank_packet(1), blank_packet(1)]);
        let (good, received_good) = Collect::boxed();
        let (bad, received_bad) = Collect::boxed();
        let router = RouterBuilder::new()
            .add("inject", InjectSource::boxed(pending), vec![])
            .add("paint", Box::new(Paint::new()), vec![ConfigArg::Unsigned(3)])
            .add("check", Box::new(CheckPaint::new()), vec![ConfigArg::Unsigned(3)])
            .add("good", good, vec![])
            .add("bad", bad, vec![])
            .connect("inject", 0, "paint", 0)
            .connect("paint", 0, "check", 0)
            .connect("check", 0, "good", 0)
            .connect("check", 1, "bad", 0)
            .build(now())
            .unwrap();

        router.process(now(), 4);
        assert_eq!(received_good.borrow().len(), 2);
        assert_eq!(received_bad.borrow().len(), 0);
        assert_eq!(received_good.borrow()[0].annotations().paint(), Some(3));
    }

    #[test]
    fn test_mismatch_goes_to_second_output() {
        let pending = prepared(vec![blank_packet(1)]);
        let (good, received_good) = Collect::boxed();
        let (bad, received_bad) = Collect::boxed();
        let router = RouterBuilder::new()
            .add("inject", InjectSource::boxed(pending), vec![])
            .add("paint", Box::new(Paint::new()), vec![ConfigArg::Unsigned(5)])
            .add("check", Box::new(CheckPaint::new()), vec![ConfigArg::Unsigned(3)])
            .add("good", good, vec![])
            .add("bad", bad, vec![])
            .connect("inject", 0, "paint", 0)
            .connect("paint", 0, "check", 0)
            .connect("check", 0, "good", 0)
            .connect("check", 1, "bad", 0)
            .build(now())
            .unwrap();

        router.process(now(), 4);
        assert_eq!(received_good.borrow().len(), 0);
        assert_eq!(received_bad.borrow().len(), 1);
        assert_eq!(router.handler_read("check.drops").unwrap(), "1");
    }

    #[test]
    fn test_mismatch_with_single_output_drops() {
        // no paint annotation at all, and no second output wired
        let pending = prepared(vec![blank_packet(1)]);
        let (good, received_good) = Collect::boxed();
        let router = RouterBuilder::new()
            .add("inject", InjectSource::boxed(pending), vec![])
            .add("check", Box::new(CheckPaint::new()), vec![ConfigArg::Unsigned(3)])
            .add("good", good, vec![])
            .connect("inject", 0, "check", 0)
            .connect("check", 0, "good", 0)
            .build(now())
            .unwrap();

        router.process(now(), 4);
        assert_eq!(received_good.borrow().len(), 0);
        assert_eq!(router.handler_read("check.drops").unwrap(), "1");
    }

    #[test]
    fn test_color_range_checked() {
        let mut paint = Paint::new();
        let mut errh = Errors::new("paint");
        assert!(paint.configure(&[ConfigArg::Unsigned(256)], &mut errh).is_err());
    }
}
