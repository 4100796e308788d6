//! Periodic route advertisement sender.

use crate::util::internet_checksum;
use bytes::BufMut;
use millrace_core::{Args, Capability, CapabilitySet, ConfigArg, CoreResult, Duration, Errors};
use millrace_graph::{Context, Element, InitContext, PortSpec, Processing};
use millrace_packet::WritablePacket;
use millrace_runtime::TimerId;
use std::net::Ipv4Addr;

const RIP_PORT: u16 = 520;
const IP_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 24;
const PACKET_LEN: usize = IP_HEADER_LEN + UDP_HEADER_LEN + ENTRY_LEN;

const INITIAL_DELAY: Duration = Duration::from_millis(3_000);
const PERIOD: Duration = Duration::from_millis(30_000);

/// Advertises one route periodically as a RIPv2 response over UDP.
///
/// The timer first fires 3 seconds after the graph starts; each firing
/// builds a fresh advertisement, pushes it out, and explicitly rearms the
/// timer 30 seconds ahead.
pub struct RouteAdvertiser {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    advertised: Ipv4Addr,
    mask: Ipv4Addr,
    metric: u32,
}

impl RouteAdvertiser {
    /// An unconfigured advertiser
    #[must_use]
    pub fn new() -> Self {
        Self {
            src: Ipv4Addr::UNSPECIFIED,
            dst: Ipv4Addr::UNSPECIFIED,
            advertised: Ipv4Addr::UNSPECIFIED,
            mask: Ipv4Addr::UNSPECIFIED,
            metric: 1,
        }
    }

    fn fill(&self, data: &mut [u8]) {
        // pseudo-header fields only, so the UDP checksum over the whole
        // zeroed packet equals the real pseudo-header sum
        data[2..4].copy_from_slice(&((PACKET_LEN - IP_HEADER_LEN) as u16).to_be_bytes());
        data[9] = 17;
        data[12..16].copy_from_slice(&self.src.octets());
        data[16..20].copy_from_slice(&self.dst.octets());

        let mut body = &mut data[IP_HEADER_LEN..];
        body.put_u16(RIP_PORT);
        body.put_u16(RIP_PORT);
        body.put_u16((UDP_HEADER_LEN + ENTRY_LEN) as u16);
        body.put_u16(0);
        // response, version 2, one route entry
        body.put_u32((2 << 24) | (2 << 16));
        body.put_u32(2 << 16);
        body.put_slice(&self.advertised.octets());
        body.put_slice(&self.mask.octets());
        body.put_slice(&self.src.octets());
        body.put_u32(self.metric);

        let udp_sum = internet_checksum(data);
        data[26..28].copy_from_slice(&udp_sum.to_be_bytes());

        // now the remaining IP header fields
        data[0] = 0x45;
        data[2..4].copy_from_slice(&(PACKET_LEN as u16).to_be_bytes());
        data[8] = 200;
        let ip_sum = internet_checksum(&data[..IP_HEADER_LEN]);
        data[10..12].copy_from_slice(&ip_sum.to_be_bytes());
    }
}

impl Default for RouteAdvertiser {
    fn default() -> Self {
        Self::new()
    }
}

impl Element for RouteAdvertiser {
    fn class_name(&self) -> &'static str {
        "RouteAdvertiser"
    }

    fn ports(&self) -> PortSpec {
        PortSpec::source(1, Processing::Push)
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new()
            .with(Capability::Push)
            .with(Capability::Timed)
    }

    fn configure(&mut self, args: &[ConfigArg], errh: &mut Errors) -> CoreResult<()> {
        let mut args = Args::new(args);
        self.src = args
            .address("source addr")
            .map_err(|e| errh.error(e.to_string()))?;
        self.dst = args
            .address("destination addr")
            .map_err(|e| errh.error(e.to_string()))?;
        let (advertised, mask) = args
            .prefix("advertised prefix")
            .map_err(|e| errh.error(e.to_string()))?;
        self.advertised = advertised;
        self.mask = mask;
        self.metric = args
            .unsigned("metric")
            .map_err(|e| errh.error(e.to_string()))? as u32;
        args.finish().map_err(|e| errh.error(e.to_string()))
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> CoreResult<()> {
        let timer = ctx.register_timer();
        ctx.schedule_timer_after(timer, INITIAL_DELAY)
            .map_err(|e| millrace_core::CoreError::Validation {
                field: "advertisement timer".to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn run_timer(&mut self, timer: TimerId, ctx: &Context<'_>) {
        match WritablePacket::create(PACKET_LEN, 0, 0) {
            Ok(mut packet) => {
                self.fill(packet.data_mut());
                let anno = packet.annotations_mut();
                anno.set_net_header(0);
                anno.set_transport_header(IP_HEADER_LEN);
                anno.set_dest_addr(self.dst);
                tracing::debug!(dst = %self.dst, "route advertisement sent");
                ctx.push(0, packet.into_packet());
            }
            Err(err) => {
                tracing::warn!(%err, "advertisement allocation failed, skipping this period");
            }
        }
        if let Err(err) = ctx.schedule_timer_after(timer, PERIOD) {
            tracing::warn!(%err, "advertisement timer rearm failed");
        }
    }
}
