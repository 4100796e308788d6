//! Forwarding-path IP option processing.

use crate::util::{internet_checksum, millis_since_midnight};
use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreResult, Errors};
use millrace_graph::{Context, Element, PortCount, PortSpec, Processing};
use millrace_packet::Packet;
use std::net::Ipv4Addr;

const OPT_END: u8 = 0;
const OPT_NOP: u8 = 1;
const OPT_RECORD_ROUTE: u8 = 7;
const OPT_TIMESTAMP: u8 = 68;

/// Processes the IP options every router on the path must handle,
/// Record Route and Timestamp, and recomputes the header checksum
/// when it modifies the packet.
///
/// The element's address is written into Record Route slots and
/// Timestamp entries, so it belongs on the output path where it knows
/// the outgoing interface. Additional interface addresses may follow
/// the first configuration argument; they satisfy prespecified
/// Timestamp entries.
///
/// Output 1, when wired, receives diagnostics: malformed options are
/// diverted there whole, and a packet whose Record Route area is
/// already full keeps flowing on output 0 while a duplicate goes to
/// output 1. Either way the `param_off` annotation points at the
/// offending byte, header-relative, ready for an ICMP parameter
/// problem.
pub struct GatewayOptions {
    my_addr: Ipv4Addr,
    other_addrs: Vec<Ipv4Addr>,
    drops: u64,
}

impl GatewayOptions {
    /// An unconfigured processor; `configure` supplies the addresses
    #[must_use]
    pub fn new() -> Self {
        Self {
            my_addr: Ipv4Addr::UNSPECIFIED,
            other_addrs: Vec::new(),
            drops: 0,
        }
    }

    fn handle(&mut self, packet: Packet, ctx: &Context<'_>) -> Option<Packet> {
        let off = match packet.annotations().net_header() {
            Some(off) => off,
            None => return Some(packet),
        };
        let hlen = {
            let data = packet.data();
            if off + 20 > data.len() {
                return Some(packet);
            }
            ((data[off] & 0xf) as usize) * 4
        };
        if hlen <= 20 || off + hlen > packet.len() {
            return Some(packet);
        }

        let now_ms = millis_since_midnight(ctx.now());
        let mut packet = packet.make_writable();
        let mut modified = false;
        let mut full_at = None;
        let mut problem = None;

        {
            // offsets below are header-relative, as an ICMP parameter
            // problem pointer wants them
            let ip = &mut packet.data_mut()[off..off + hlen];
            let mut oi = 20;
            while oi < hlen {
                let ty = ip[oi];
                if ty == OPT_END {
                    break;
                }
                if ty == OPT_NOP {
                    oi += 1;
                    continue;
                }
                if oi + 1 >= hlen {
                    problem = Some(oi);
                    break;
                }
                let olen = ip[oi + 1] as usize;
                if olen < 2 || oi + olen > hlen {
                    problem = Some(oi + 1);
                    break;
                }
                match ty {
                    OPT_RECORD_ROUTE => {
                        if olen < 3 {
                            problem = Some(oi + 1);
                            break;
                        }
                        let ptr = ip[oi + 2] as usize;
                        if ptr < 4 {
                            problem = Some(oi + 2);
                            break;
                        }
                        if ptr + 3 <= olen {
                            let at = oi + ptr - 1;
                            ip[at..at + 4].copy_from_slice(&self.my_addr.octets());
                            ip[oi + 2] += 4;
                            modified = true;
                        } else if full_at.is_none() {
                            full_at = Some(oi);
                        }
                    }
                    OPT_TIMESTAMP => {
                        if olen < 4 {
                            problem = Some(oi + 1);
                            break;
                        }
                        let ptr = ip[oi + 2] as usize;
                        let flags = ip[oi + 3] & 0xf;
                        let overflow = ip[oi + 3] >> 4;
                        if ptr < 5 {
                            problem = Some(oi + 2);
                            break;
                        }
                        let entry = match flags {
                            0 => 4,
                            1 => 8,
                            3 => 8,
                            _ => {
                                problem = Some(oi + 3);
                                break;
                            }
                        };
                        if ptr + entry - 1 <= olen {
                            let at = oi + ptr - 1;
                            match flags {
                                0 => {
                                    ip[at..at + 4].copy_from_slice(&now_ms.to_be_bytes());
                                }
                                1 => {
                                    ip[at..at + 4].copy_from_slice(&self.my_addr.octets());
                                    ip[at + 4..at + 8].copy_from_slice(&now_ms.to_be_bytes());
                                }
                                _ => {
                                    // prespecified: stamp only our own entries
                                    let want = Ipv4Addr::new(
                                        ip[at],
                                        ip[at + 1],
                                        ip[at + 2],
                                        ip[at + 3],
                                    );
                                    if want != self.my_addr && !self.other_addrs.contains(&want) {
                                        oi += olen;
                                        continue;
                                    }
                                    ip[at + 4..at + 8].copy_from_slice(&now_ms.to_be_bytes());
                                }
                            }
                            ip[oi + 2] += entry as u8;
                            modified = true;
                        } else if flags != 3 {
                            if overflow == 15 {
                                problem = Some(oi + 3);
                                break;
                            }
                            ip[oi + 3] = ((overflow + 1) << 4) | flags;
                            modified = true;
                        }
                    }
                    _ => {}
                }
                oi += olen;
            }
        }

        if let Some(pointer) = problem {
            self.drops += 1;
            packet.annotations_mut().set_param_off(pointer);
            tracing::debug!(
                element = ctx.element_name(),
                pointer,
                "malformed ip option"
            );
            ctx.push(1, packet.into_packet());
            return None;
        }

        if modified {
            let ip = &mut packet.data_mut()[off..off + hlen];
            ip[10] = 0;
            ip[11] = 0;
            let sum = internet_checksum(ip);
            ip[10..12].copy_from_slice(&sum.to_be_bytes());
        }

        let packet = packet.into_packet();
        if let Some(pointer) = full_at {
            let mut diag = packet.duplicate().make_writable();
            diag.annotations_mut().set_param_off(pointer);
            tracing::debug!(
                element = ctx.element_name(),
                pointer,
                "record route area full"
            );
            ctx.push(1, diag.into_packet());
        }
        Some(packet)
    }
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for GatewayOptions {
    fn class_name(&self) -> &'static str {
        "GatewayOptions"
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
        self.my_addr = args
            .address("router address")
            .map_err(|e| errh.error(e.to_string()))?;
        while !args.is_empty() {
            let addr = args
                .address("other interface address")
                .map_err(|e| errh.error(e.to_string()))?;
            self.other_addrs.push(addr);
        }
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn push(&mut self, _port: usize, packet: Packet, ctx: &Context<'_>) {
        if let Some(packet) = self.handle(packet, ctx) {
            ctx.push(0, packet);
        }
    }

    fn pull(&mut self, _port: usize, ctx: &Context<'_>) -> Option<Packet> {
        let packet = ctx.pull(0)?;
        self.handle(packet, ctx)
    }

    fn read_handler(&self, name: &str) -> Option<String> {
        match name {
            "drops" => Some(self.drops.to_string()),
            _ => None,
        }
    }
}
