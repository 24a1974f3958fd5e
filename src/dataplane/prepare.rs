//! Header length computation
//!
//! Walks Ethernet (up to two VLAN tags), IPv4/IPv6 and TCP/UDP headers and
//! records their lengths on the buffer. Nothing is copied or moved.

use crate::port::Mbuf;
use crate::protocol::ethernet::EthernetHeader;
use crate::protocol::ipv4::Ipv4Header;
use crate::protocol::ipv6::{self, Ipv6Header};
use crate::protocol::tcp::TcpHeader;
use crate::protocol::udp::UdpHeader;
use crate::protocol::{EtherType, IpProtocol};
use crate::{Error, Result};
use tracing::trace;

/// Header lengths of one frame, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLengths {
    pub l2: u16,
    pub l3: u16,
    pub l4: u16,
}

/// Compute header lengths for an IP frame carrying TCP or UDP.
pub fn header_lengths(frame: &[u8]) -> Result<HeaderLengths> {
    let eth = EthernetHeader::parse(frame)?;

    let (l3, next_proto, l3_payload) = match EtherType::from_u16(eth.ethertype()) {
        Some(EtherType::Ipv4) => {
            let ip = Ipv4Header::parse(eth.payload())?;
            (ip.header_len(), ip.protocol(), ip.payload())
        }
        Some(EtherType::Ipv6) => {
            let ip = Ipv6Header::parse(eth.payload())?;
            (ipv6::HEADER_SIZE, ip.next_header(), ip.payload())
        }
        _ => return Err(Error::InvalidPacket("not IP")),
    };

    let l4 = match IpProtocol::from_u8(next_proto) {
        Some(IpProtocol::Tcp) => TcpHeader::parse(l3_payload)?.header_len(),
        Some(IpProtocol::Udp) => UdpHeader::parse(l3_payload)?.header_len(),
        _ => return Err(Error::InvalidPacket("not TCP or UDP")),
    };

    Ok(HeaderLengths {
        l2: eth.header_len() as u16,
        l3: l3 as u16,
        l4: l4 as u16,
    })
}

/// Set `l2_len`/`l3_len`/`l4_len` on `m`.
///
/// Returns false for anything that is not TCP or UDP over IP; the lengths
/// are then all zero and the frame should be skipped.
pub fn prepare_packet(m: &mut Mbuf) -> bool {
    match header_lengths(m.data()) {
        Ok(lengths) => {
            m.l2_len = lengths.l2;
            m.mpls_len = 0;
            m.l3_len = lengths.l3;
            m.l4_len = lengths.l4;
            true
        }
        Err(e) => {
            trace!(error = %e, len = m.pkt_len(), "frame not prepared");
            m.reset_header_lengths();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FrameBuilder, VlanTag};

    fn prepared(frame: &[u8]) -> Option<Mbuf> {
        let mut m = Mbuf::from_slice(frame);
        prepare_packet(&mut m).then_some(m)
    }

    #[test]
    fn test_vlan_depths_ipv4_tcp() {
        for n in 0..=2u16 {
            let mut builder = FrameBuilder::new().ipv4().tcp(40000, 80);
            for i in 0..n {
                builder = builder.vlan_tag(VlanTag::new(100 + i));
            }
            let m = prepared(&builder.payload(b"GET / HTTP/1.1\r\n").build()).unwrap();
            assert_eq!(m.l2_len, 12 + 4 * n + 2);
            assert_eq!(m.l3_len, 20);
            assert_eq!(m.l4_len, 20);
            assert_eq!(m.payload(), b"GET / HTTP/1.1\r\n");
        }
    }

    #[test]
    fn test_lengths_follow_header_fields() {
        let frame = FrameBuilder::new()
            .ipv4_options(3)
            .tcp(5060, 5060)
            .tcp_options(2)
            .payload(b"x")
            .build();
        let m = prepared(&frame).unwrap();
        assert_eq!(m.l2_len, 14);
        assert_eq!(m.l3_len, 32);
        assert_eq!(m.l4_len, 28);
        assert_eq!(m.payload(), b"x");
    }

    #[test]
    fn test_ipv6_udp() {
        let frame = FrameBuilder::new()
            .vlan_tag(VlanTag::new(7))
            .ipv6()
            .udp(5004, 5004)
            .payload(&[0x80, 0x00])
            .build();
        let m = prepared(&frame).unwrap();
        assert_eq!(m.l2_len, 18);
        assert_eq!(m.l3_len, 40);
        assert_eq!(m.l4_len, 8);
    }

    #[test]
    fn test_non_ip_zeroes_lengths() {
        let frame = FrameBuilder::new()
            .ethertype(EtherType::Arp as u16)
            .payload(&[0u8; 28])
            .build();
        let mut m = Mbuf::from_slice(&frame);
        m.l2_len = 99;
        m.l3_len = 99;
        m.l4_len = 99;
        assert!(!prepare_packet(&mut m));
        assert_eq!((m.l2_len, m.mpls_len, m.l3_len, m.l4_len), (0, 0, 0, 0));
        assert_eq!(m.data(), &frame[..]);
    }

    #[test]
    fn test_non_tcp_udp_rejected() {
        let frame = FrameBuilder::new()
            .ipv4()
            .ip_protocol(IpProtocol::Icmp)
            .payload(&[8, 0, 0, 0, 0, 1, 0, 1])
            .build();
        assert!(prepared(&frame).is_none());
    }

    #[test]
    fn test_three_vlan_tags_rejected() {
        let frame = FrameBuilder::new()
            .vlan_tag(VlanTag::new(1))
            .vlan_tag(VlanTag::new(2))
            .vlan_tag(VlanTag::new(3))
            .udp(1, 2)
            .build();
        assert!(prepared(&frame).is_none());
    }

    #[test]
    fn test_truncated_headers_rejected() {
        let frame = FrameBuilder::new().tcp(1, 2).build();
        // Cut inside the TCP header
        assert!(prepared(&frame[..14 + 20 + 10]).is_none());
        // Cut inside the IPv4 header
        assert!(prepared(&frame[..14 + 10]).is_none());
        // Cut inside the Ethernet header
        assert!(prepared(&frame[..10]).is_none());
    }

    #[test]
    fn test_header_lengths_value() {
        let frame = FrameBuilder::new().udp(1, 2).payload(b"abc").build();
        assert_eq!(
            header_lengths(&frame).unwrap(),
            HeaderLengths {
                l2: 14,
                l3: 20,
                l4: 8
            }
        );
    }
}
