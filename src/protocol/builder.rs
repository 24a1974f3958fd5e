//! Frame construction
//!
//! Builds Ethernet / VLAN / IP / TCP-UDP frames around an application
//! payload. Only the IPv4 header checksum is filled in; TCP and UDP
//! checksums stay zero since nothing on the forwarding path reads them.

use super::{ipv4, EtherType, IpProtocol, VlanTag};

/// Builder for constructing test and synthetic frames
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    dst_mac: [u8; 6],
    src_mac: [u8; 6],
    vlan_tags: Vec<VlanTag>,
    network: Network,
    ipv4_options: usize,
    tcp_options: usize,
    transport: Option<IpProtocol>,
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Network {
    Ipv4,
    Ipv6,
    Raw(u16),
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            dst_mac: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55],
            src_mac: [0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb],
            vlan_tags: Vec::new(),
            network: Network::Ipv4,
            ipv4_options: 0,
            tcp_options: 0,
            transport: Some(IpProtocol::Udp),
            src_port: 1024,
            dst_port: 1024,
            payload: Vec::new(),
        }
    }

    pub fn dst_mac(mut self, mac: [u8; 6]) -> Self {
        self.dst_mac = mac;
        self
    }

    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.src_mac = mac;
        self
    }

    /// Append a VLAN tag; the first tag added is the outermost.
    pub fn vlan_tag(mut self, tag: VlanTag) -> Self {
        self.vlan_tags.push(tag);
        self
    }

    pub fn ipv4(mut self) -> Self {
        self.network = Network::Ipv4;
        self
    }

    /// IPv4 header carrying `words` 32-bit words of (NOP) options
    pub fn ipv4_options(mut self, words: usize) -> Self {
        self.ipv4_options = words;
        self
    }

    pub fn ipv6(mut self) -> Self {
        self.network = Network::Ipv6;
        self
    }

    /// Arbitrary EtherType; the payload follows the Ethernet header directly.
    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.network = Network::Raw(ethertype);
        self
    }

    pub fn tcp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.transport = Some(IpProtocol::Tcp);
        self.src_port = src_port;
        self.dst_port = dst_port;
        self
    }

    /// TCP header carrying `words` 32-bit words of (NOP) options
    pub fn tcp_options(mut self, words: usize) -> Self {
        self.tcp_options = words;
        self
    }

    pub fn udp(mut self, src_port: u16, dst_port: u16) -> Self {
        self.transport = Some(IpProtocol::Udp);
        self.src_port = src_port;
        self.dst_port = dst_port;
        self
    }

    /// Any other IP protocol; no transport header is written.
    pub fn ip_protocol(mut self, protocol: IpProtocol) -> Self {
        self.transport = Some(protocol);
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(128 + self.payload.len());
        frame.extend_from_slice(&self.dst_mac);
        frame.extend_from_slice(&self.src_mac);
        for tag in &self.vlan_tags {
            frame.extend_from_slice(&tag.to_bytes());
        }

        let transport = self.transport_bytes();
        match self.network {
            Network::Raw(ethertype) => {
                frame.extend_from_slice(&ethertype.to_be_bytes());
                frame.extend_from_slice(&self.payload);
                return frame;
            }
            Network::Ipv4 => {
                frame.extend_from_slice(&(EtherType::Ipv4 as u16).to_be_bytes());
                let header_len = 20 + self.ipv4_options * 4;
                let total_len = header_len + transport.len();
                let mut header = vec![0u8; header_len];
                header[0] = 0x40 | (header_len / 4) as u8;
                header[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
                header[8] = 64;
                header[9] = self.protocol_number();
                header[12..16].copy_from_slice(&[10, 0, 0, 1]);
                header[16..20].copy_from_slice(&[10, 0, 0, 2]);
                for byte in &mut header[20..] {
                    *byte = 0x01;
                }
                let sum = ipv4::checksum(&header);
                header[10..12].copy_from_slice(&sum.to_be_bytes());
                frame.extend_from_slice(&header);
            }
            Network::Ipv6 => {
                frame.extend_from_slice(&(EtherType::Ipv6 as u16).to_be_bytes());
                let mut header = [0u8; 40];
                header[0] = 0x60;
                header[4..6].copy_from_slice(&(transport.len() as u16).to_be_bytes());
                header[6] = self.protocol_number();
                header[7] = 64;
                header[23] = 1;
                header[39] = 2;
                frame.extend_from_slice(&header);
            }
        }

        frame.extend_from_slice(&transport);
        frame
    }

    fn protocol_number(&self) -> u8 {
        self.transport.map(|p| p as u8).unwrap_or(0)
    }

    fn transport_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self.transport {
            Some(IpProtocol::Tcp) => {
                let header_len = 20 + self.tcp_options * 4;
                let mut header = vec![0u8; header_len];
                header[0..2].copy_from_slice(&self.src_port.to_be_bytes());
                header[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
                header[12] = ((header_len / 4) as u8) << 4;
                header[13] = 0x18; // PSH, ACK
                header[14..16].copy_from_slice(&0xffffu16.to_be_bytes());
                for byte in &mut header[20..] {
                    *byte = 0x01;
                }
                out.extend_from_slice(&header);
            }
            Some(IpProtocol::Udp) => {
                let len = (8 + self.payload.len()) as u16;
                out.extend_from_slice(&self.src_port.to_be_bytes());
                out.extend_from_slice(&self.dst_port.to_be_bytes());
                out.extend_from_slice(&len.to_be_bytes());
                out.extend_from_slice(&[0, 0]);
            }
            _ => {}
        }
        out.extend_from_slice(&self.payload);
        out
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ethernet::EthernetHeader;
    use crate::protocol::ipv4::Ipv4Header;
    use crate::protocol::tcp::TcpHeader;

    #[test]
    fn test_build_ipv4_tcp() {
        let frame = FrameBuilder::new()
            .tcp(40000, 80)
            .payload(b"GET / HTTP/1.1\r\n")
            .build();

        let eth = EthernetHeader::parse(&frame).unwrap();
        assert_eq!(eth.ethertype(), EtherType::Ipv4 as u16);
        let ip = Ipv4Header::parse(eth.payload()).unwrap();
        assert_eq!(ip.protocol(), IpProtocol::Tcp as u8);
        assert_eq!(ipv4::checksum(&eth.payload()[..ip.header_len()]), 0);
        let tcp = TcpHeader::parse(ip.payload()).unwrap();
        assert_eq!(tcp.dst_port(), 80);
        assert_eq!(tcp.payload(), b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn test_build_raw_ethertype() {
        let frame = FrameBuilder::new()
            .ethertype(EtherType::Arp as u16)
            .payload(&[1, 2, 3])
            .build();
        assert_eq!(frame.len(), 14 + 3);
        assert_eq!(&frame[12..14], &[0x08, 0x06]);
    }

    #[test]
    fn test_build_vlan_order() {
        let frame = FrameBuilder::new()
            .vlan_tag(VlanTag { tpid: 0x88a8, pcp: 1, cfi: 0, vid: 3 })
            .vlan_tag(VlanTag::new(100))
            .build();
        assert_eq!(&frame[12..16], &[0x88, 0xa8, 0x20, 0x03]);
        assert_eq!(&frame[16..20], &[0x81, 0x00, 0x00, 0x64]);
        assert_eq!(&frame[20..22], &[0x08, 0x00]);
    }
}
