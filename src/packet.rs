use std::net::Ipv4Addr;

pub const TCP_FIN: u8 = 0x01;
pub const TCP_SYN: u8 = 0x02;
pub const TCP_RST: u8 = 0x04;
pub const TCP_PSH: u8 = 0x08;
pub const TCP_ACK: u8 = 0x10;
pub const TCP_URG: u8 = 0x20;

pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

/// Decoded fields the flow engine needs from one IPv4 packet.
///
/// Produced by the decoder adapter (see [`crate::decoder`]); the engine never
/// looks past these fields, so reassembly, payload contents and IPv6 never
/// enter the picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketView {
    /// Capture timestamp in seconds, non-decreasing across a single source.
    pub time: f64,
    pub srcip: Ipv4Addr,
    pub dstip: Ipv4Addr,
    pub srcport: u16,
    pub dstport: u16,
    /// IANA protocol number: 6 for TCP, 17 for UDP.
    pub proto: u8,
    /// Six-bit Differentiated Services field from the IP ToS byte.
    pub dscp: u8,
    /// IP total length in bytes.
    pub len: u32,
    /// IPv4 header length in bytes.
    pub iphlen: u32,
    /// Transport header length in bytes (TCP data offset or UDP's fixed 8).
    pub prhlen: u32,
    /// Raw TCP flag byte; zero for non-TCP packets.
    pub flags: u8,
}

impl PacketView {
    /// Combined IP + transport header length.
    pub fn header_len(&self) -> u32 {
        self.iphlen + self.prhlen
    }

    /// True if the packet carries any payload beyond its headers.
    pub fn has_payload(&self) -> bool {
        self.len > self.header_len()
    }

    pub fn flag_set(&self, flag: u8) -> bool {
        self.flags & flag == flag
    }
}
