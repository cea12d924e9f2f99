use std::net::Ipv4Addr;

use crate::packet::PacketView;

/// Canonical, order-independent 5-tuple: `(ip_a, port_a) <= (ip_b, port_b)`
/// lexicographically, so a packet and its reverse-direction reply hash to
/// the same key regardless of which one arrived first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub proto: u8,
    pub ip_a: Ipv4Addr,
    pub port_a: u16,
    pub ip_b: Ipv4Addr,
    pub port_b: u16,
}

impl FlowKey {
    pub fn from_packet(pkt: &PacketView) -> Self {
        let (src, sport) = (pkt.srcip, pkt.srcport);
        let (dst, dport) = (pkt.dstip, pkt.dstport);
        if (src, sport) <= (dst, dport) {
            FlowKey {
                proto: pkt.proto,
                ip_a: src,
                port_a: sport,
                ip_b: dst,
                port_b: dport,
            }
        } else {
            FlowKey {
                proto: pkt.proto,
                ip_a: dst,
                port_a: dport,
                ip_b: src,
                port_b: sport,
            }
        }
    }
}
