use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;
use pnet::packet::Packet;

use crate::packet::{PacketView, IPPROTO_TCP, IPPROTO_UDP};

/// Decode one Ethernet frame captured at `time` seconds into a
/// [`PacketView`], or `None` if it isn't an IPv4/TCP or IPv4/UDP packet this
/// engine understands.
///
/// This is the thin boundary the spec calls out in §6.1: it extracts
/// exactly the fields `PacketView` needs and nothing else. Reassembly,
/// payload inspection and IPv6 are all out of scope and simply fall through
/// to `None`.
pub fn decode_ethernet_frame(time: f64, frame: &[u8]) -> Option<PacketView> {
    let eth = EthernetPacket::new(frame)?;
    if eth.get_ethertype() != EtherTypes::Ipv4 {
        return None;
    }
    decode_ipv4(time, eth.payload())
}

/// Decode a raw IPv4 packet (no link-layer header), as produced by pcap
/// files captured with `DLT_RAW` or after an outer link layer has already
/// been stripped.
pub fn decode_ipv4(time: f64, bytes: &[u8]) -> Option<PacketView> {
    let ipv4 = Ipv4Packet::new(bytes)?;
    let iphlen = (ipv4.get_header_length() as u32) * 4;
    let dscp = ipv4.get_dscp();
    let len = ipv4.get_total_length() as u32;

    match ipv4.get_next_level_protocol() {
        IpNextHeaderProtocols::Tcp => {
            let tcp = TcpPacket::new(ipv4.payload())?;
            Some(PacketView {
                time,
                srcip: ipv4.get_source(),
                dstip: ipv4.get_destination(),
                srcport: tcp.get_source(),
                dstport: tcp.get_destination(),
                proto: IPPROTO_TCP,
                dscp,
                len,
                iphlen,
                prhlen: (tcp.get_data_offset() as u32) * 4,
                flags: tcp.get_flags(),
            })
        }
        IpNextHeaderProtocols::Udp => {
            let udp = UdpPacket::new(ipv4.payload())?;
            Some(PacketView {
                time,
                srcip: ipv4.get_source(),
                dstip: ipv4.get_destination(),
                srcport: udp.get_source(),
                dstport: udp.get_destination(),
                proto: IPPROTO_UDP,
                dscp,
                len,
                iphlen,
                prhlen: 8,
                flags: 0,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::packet::ethernet::{EthernetPacket, MutableEthernetPacket};
    use pnet::packet::ipv4::MutableIpv4Packet;
    use pnet::packet::tcp::MutableTcpPacket;
    use pnet::util::MacAddr;
    use std::net::Ipv4Addr;

    #[test]
    fn decodes_a_tcp_frame() {
        let mut tcp_buf = [0u8; 20];
        let mut tcp = MutableTcpPacket::new(&mut tcp_buf).unwrap();
        tcp.set_source(1234);
        tcp.set_destination(80);
        tcp.set_data_offset(5);
        tcp.set_flags(0x02);

        let mut ip_buf = [0u8; 40];
        let mut ip = MutableIpv4Packet::new(&mut ip_buf).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length(40);
        ip.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
        ip.set_source(Ipv4Addr::new(10, 0, 0, 1));
        ip.set_destination(Ipv4Addr::new(10, 0, 0, 2));
        ip.set_payload(&tcp_buf);

        let mut eth_buf = [0u8; 14 + 40];
        let mut eth = MutableEthernetPacket::new(&mut eth_buf).unwrap();
        eth.set_source(MacAddr::zero());
        eth.set_destination(MacAddr::zero());
        eth.set_ethertype(EtherTypes::Ipv4);
        eth.set_payload(ip.packet());

        let view = decode_ethernet_frame(1.0, EthernetPacket::new(&eth_buf).unwrap().packet())
            .expect("should decode");
        assert_eq!(view.proto, IPPROTO_TCP);
        assert_eq!(view.srcport, 1234);
        assert_eq!(view.dstport, 80);
        assert_eq!(view.len, 40);
    }

    #[test]
    fn ignores_non_ipv4_ethertype() {
        let mut eth_buf = [0u8; 14];
        let mut eth = MutableEthernetPacket::new(&mut eth_buf).unwrap();
        eth.set_ethertype(EtherTypes::Ipv6);
        assert!(decode_ethernet_frame(0.0, eth.packet()).is_none());
    }
}
