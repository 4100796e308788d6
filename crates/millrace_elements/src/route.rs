//! Static next-hop lookup.

use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreResult, Errors};
use millrace_graph::{Context, Element, PortCount, PortSpec, Processing};
use millrace_packet::Packet;
use std::net::Ipv4Addr;

struct Route {
    addr: Ipv4Addr,
    mask: Ipv4Addr,
    gateway: Option<Ipv4Addr>,
    output: usize,
}

impl Route {
    fn matches(&self, dst: Ipv4Addr) -> bool {
        let mask = u32::from(self.mask);
        (u32::from(dst) & mask) == (u32::from(self.addr) & mask)
    }
}

#[derive(Clone, Copy)]
struct CacheEntry {
    addr: Ipv4Addr,
    gateway: Option<Ipv4Addr>,
    output: usize,
}

/// Routes packets by destination annotation against a static prefix
/// table.
///
/// Each configured route is a prefix, an optional gateway address, and
/// an output port number. The most specific matching prefix wins. When
/// the route names a gateway the destination annotation is rewritten to
/// it before the packet leaves. The two most recent lookups are kept in
/// a small cache in front of the table.
///
/// Packets with no destination annotation, or no matching route, are
/// dropped.
pub struct RouteLookup {
    routes: Vec<Route>,
    cache: [Option<CacheEntry>; 2],
}

impl RouteLookup {
    /// An empty table; `configure` supplies the routes
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            cache: [None, None],
        }
    }

    fn cached(&self, dst: Ipv4Addr) -> Option<CacheEntry> {
        self.cache
            .iter()
            .flatten()
            .find(|entry| entry.addr == dst)
            .copied()
    }

    fn lookup(&mut self, dst: Ipv4Addr) -> Option<CacheEntry> {
        if let Some(hit) = self.cached(dst) {
            return Some(hit);
        }
        let best = self
            .routes
            .iter()
            .filter(|route| route.matches(dst))
            .max_by_key(|route| u32::from(route.mask))?;
        let entry = CacheEntry {
            addr: dst,
            gateway: best.gateway,
            output: best.output,
        };
        self.cache[1] = self.cache[0];
        self.cache[0] = Some(entry);
        Some(entry)
    }
}

impl Default for RouteLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for RouteLookup {
    fn class_name(&self) -> &'static str {
        "RouteLookup"
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
        while !args.is_empty() {
            let (addr, mask) = args
                .prefix("route prefix")
                .map_err(|e| errh.error(e.to_string()))?;
            let gateway = match args.peek() {
                Some(ConfigArg::Address(_)) => Some(
                    args.address("gateway")
                        .map_err(|e| errh.error(e.to_string()))?,
                ),
                _ => None,
            };
            let output = args
                .unsigned("output port")
                .map_err(|e| errh.error(e.to_string()))? as usize;
            self.routes.push(Route {
                addr,
                mask,
                gateway,
                output,
            });
        }
        if self.routes.is_empty() {
            errh.warning("no routes");
        }
        Ok(())
    }

    fn push(&mut self, _port: usize, packet: Packet, ctx: &Context<'_>) {
        let dst = match packet.annotations().dest_addr() {
            Some(dst) => dst,
            None => {
                tracing::debug!(
                    element = ctx.element_name(),
                    "no destination annotation, dropping"
                );
                return;
            }
        };
        match self.lookup(dst) {
            Some(entry) => {
                let packet = match entry.gateway {
                    Some(gw) => {
                        let mut packet = packet.make_writable();
                        packet.annotations_mut().set_dest_addr(gw);
                        packet.into_packet()
                    }
                    None => packet,
                };
                ctx.push(entry.output, packet);
            }
            None => {
                tracing::debug!(element = ctx.element_name(), %dst, "no route, dropping");
            }
        }
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "routes" => Some(self.routes.len().to_string()),
            _ => None,
        }
    }
}
