//! Out-of-band packet metadata.
//!
//! Annotations travel with the packet but are not part of its bytes.
//! The slot set is fixed and typed; there is no open-ended key space.

use millrace_core::Timestamp;
use std::net::Ipv4Addr;

/// Number of generic integer annotation slots
pub const USER_SLOTS: usize = 4;

/// How a packet arrived at this host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PacketType {
    /// Addressed to this host
    #[default]
    Host,
    /// Link-level broadcast
    Broadcast,
    /// Link-level multicast
    Multicast,
    /// Addressed to another host (promiscuous capture)
    OtherHost,
    /// Originated here, on its way out
    Outgoing,
    /// Loopback
    Loopback,
}

/// The fixed set of typed annotation slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    device: Option<u32>,
    packet_type: PacketType,
    net_header: Option<usize>,
    transport_header: Option<usize>,
    dest_addr: Option<Ipv4Addr>,
    param_off: Option<usize>,
    paint: Option<u8>,
    timestamp: Option<Timestamp>,
    user: [u64; USER_SLOTS],
}

impl Annotations {
    /// Create a cleared annotation set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Source device, if the packet arrived on one
    #[must_use]
    pub fn device(&self) -> Option<u32> {
        self.device
    }

    /// Set the source device
    pub fn set_device(&mut self, device: u32) {
        self.device = Some(device);
    }

    /// Packet type tag
    #[must_use]
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Set the packet type tag
    pub fn set_packet_type(&mut self, packet_type: PacketType) {
        self.packet_type = packet_type;
    }

    /// Offset of the network header within the packet data
    #[must_use]
    pub fn net_header(&self) -> Option<usize> {
        self.net_header
    }

    /// Mark the network header offset
    pub fn set_net_header(&mut self, offset: usize) {
        self.net_header = Some(offset);
    }

    /// Offset of the transport header within the packet data
    #[must_use]
    pub fn transport_header(&self) -> Option<usize> {
        self.transport_header
    }

    /// Mark the transport header offset
    pub fn set_transport_header(&mut self, offset: usize) {
        self.transport_header = Some(offset);
    }

    /// Destination address annotation (next hop, once routed)
    #[must_use]
    pub fn dest_addr(&self) -> Option<Ipv4Addr> {
        self.dest_addr
    }

    /// Set the destination address annotation
    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.dest_addr = Some(addr);
    }

    /// Parameter offset (points at the byte a diagnostic refers to)
    #[must_use]
    pub fn param_off(&self) -> Option<usize> {
        self.param_off
    }

    /// Set the parameter offset
    pub fn set_param_off(&mut self, offset: usize) {
        self.param_off = Some(offset);
    }

    /// Paint byte
    #[must_use]
    pub fn paint(&self) -> Option<u8> {
        self.paint
    }

    /// Set the paint byte
    pub fn set_paint(&mut self, color: u8) {
        self.paint = Some(color);
    }

    /// Receive timestamp
    #[must_use]
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// Set the receive timestamp
    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = Some(timestamp);
    }

    /// Generic integer slot
    ///
    /// # Panics
    ///
    /// Panics if `slot >= USER_SLOTS`.
    #[must_use]
    pub fn user(&self, slot: usize) -> u64 {
        self.user[slot]
    }

    /// Set a generic integer slot
    ///
    /// # Panics
    ///
    /// Panics if `slot >= USER_SLOTS`.
    pub fn set_user(&mut self, slot: usize, value: u64) {
        self.user[slot] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_default_clear() {
        let anno = Annotations::new();
        assert_eq!(anno.device(), None);
        assert_eq!(anno.packet_type(), PacketType::Host);
        assert_eq!(anno.net_header(), None);
        assert_eq!(anno.paint(), None);
        assert_eq!(anno.user(0), 0);
    }

    #[test]
    fn test_annotations_typed_slots() {
        let mut anno = Annotations::new();
        anno.set_device(2);
        anno.set_packet_type(PacketType::Broadcast);
        anno.set_net_header(14);
        anno.set_transport_header(34);
        anno.set_dest_addr(Ipv4Addr::new(10, 0, 0, 1));
        anno.set_param_off(22);
        anno.set_paint(7);
        anno.set_user(3, 99);

        assert_eq!(anno.device(), Some(2));
        assert_eq!(anno.packet_type(), PacketType::Broadcast);
        assert_eq!(anno.net_header(), Some(14));
        assert_eq!(anno.transport_header(), Some(34));
        assert_eq!(anno.dest_addr(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(anno.param_off(), Some(22));
        assert_eq!(anno.paint(), Some(7));
        assert_eq!(anno.user(3), 99);
    }

    #[test]
    #[should_panic]
    fn test_annotations_user_slot_bounds() {
        let anno = Annotations::new();
        let _ = anno.user(USER_SLOTS);
    }
}
