//! Pull-to-push converters: rate-limited and round-robin.

use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreError, CoreResult, Errors, Timestamp};
use millrace_graph::{Context, Element, InitContext, PortCount, PortSpec, Processing};
use millrace_runtime::{RateLimiter, TaskId};

/// Pulls packets from its input and pushes them downstream, at most
/// `rate` packets per second through a leaky-bucket limiter.
///
/// The admission check runs before any pull: when the limiter refuses or
/// the upstream is empty, the task steps aside to the back of the run
/// list instead of spinning, so peers get the slot.
pub struct RatedUnqueue {
    rate: u64,
    limiter: Option<RateLimiter>,
}

impl RatedUnqueue {
    /// An unconfigured converter; `configure` supplies the rate
    #[must_use]
    pub fn new() -> Self {
        Self {
            rate: 1,
            limiter: None,
        }
    }
}

impl Default for RatedUnqueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for RatedUnqueue {
    fn class_name(&self) -> &'static str {
        "RatedUnqueue"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new(
            PortCount::fixed(1),
            Processing::Pull,
            PortCount::fixed(1),
            Processing::Push,
        )
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::Push)
            .with(Capability::Pull)
            .with(Capability::Scheduled)
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        self.rate = args
            .unsigned("unqueueing rate")
            .map_err(|e| errh.error(e.to_string()))?;
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> CoreResult<()> {
        self.limiter = Some(RateLimiter::new(self.rate, ctx.now()));
        ctx.register_task();
        Ok(())
    }

    fn run_task(&mut self, task: TaskId, ctx: &Context<'_>) -> bool {
        let now = ctx.now();
        let permitted = self
            .limiter
            .as_ref()
            .is_some_and(|limiter| limiter.need_update(now));
        if permitted {
            if let Some(packet) = ctx.pull(0) {
                if let Some(limiter) = self.limiter.as_mut() {
                    limiter.update(now);
                }
                ctx.push(0, packet);
                ctx.fast_reschedule(task);
                return true;
            }
        }
        // refused or empty: stay registered, revisit on a later pass
        ctx.reschedule(task);
        false
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "rate" => Some(self.rate.to_string()),
            _ => None,
        }
    }

    fn write_handler(&mut self, name: &str, value: &str, now: Timestamp) -> CoreResult<()> {
        match name {
            "rate" => {
                let rate: u64 = value.trim().parse().map_err(|_| CoreError::Parse {
                    message: "rate must be an integer".to_string(),
                })?;
                self.rate = rate;
                if let Some(limiter) = self.limiter.as_mut() {
                    limiter.set_rate(now, rate);
                }
                Ok(())
            }
            _ => Err(CoreError::NoSuchHandler(name.to_string())),
        }
    }
}

const DEFAULT_BURST: u64 = 1;

/// Pulls from its inputs round-robin and pushes each packet out of the
/// output with the same index. Moves at most BURST packets per
/// scheduling; a burst of 0 means "pull until nothing comes back".
pub struct RoundRobinUnqueue {
    burst: u64,
    packets: u64,
    next: usize,
}

impl RoundRobinUnqueue {
    /// A converter with the default burst of 1
    #[must_use]
    pub fn new() -> Self {
        Self {
            burst: DEFAULT_BURST,
            packets: 0,
            next: 0,
        }
    }
}

impl Default for RoundRobinUnqueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for RoundRobinUnqueue {
    fn class_name(&self) -> &'static str {
        "RoundRobinUnqueue"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::new(
            PortCount::at_least(1),
            Processing::Pull,
            PortCount::at_least(1),
            Processing::Push,
        )
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::Push)
            .with(Capability::Pull)
            .with(Capability::Scheduled)
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        self.burst = args
            .optional_unsigned("burst size", DEFAULT_BURST)
            .map_err(|e| errh.error(e.to_string()))?;
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> CoreResult<()> {
        ctx.register_task();
        Ok(())
    }

    fn run_task(&mut self, task: TaskId, ctx: &Context<'_>) -> bool {
        let inputs = ctx.inputs();
        let limit = if self.burst == 0 { u64::MAX } else { self.burst };
        let mut sent = 0;
        let mut idle = 0;
        while sent < limit && idle < inputs {
            match ctx.pull(self.next) {
                Some(packet) => {
                    ctx.push(self.next, packet);
                    sent += 1;
                    idle = 0;
                }
                None => idle += 1,
            }
            self.next = (self.next + 1) % inputs;
        }
        self.packets += sent;
        if sent > 0 {
            ctx.fast_reschedule(task);
            true
        } else {
            ctx.reschedule(task);
            false
        }
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "packets" => Some(self.packets.to_string()),
            "burst" => Some(self.burst.to_string()),
            _ => None,
        }
    }
}
