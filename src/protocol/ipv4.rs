//! IPv4 protocol - RFC 791

use crate::{Error, Result};

/// Header size without options
pub const MIN_HEADER_SIZE: usize = 20;

/// IP protocol numbers the pipeline tells apart; everything else is skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IpProtocol {
    Icmp = 1,
    Tcp = 6,
    Udp = 17,
}

impl IpProtocol {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Icmp),
            6 => Some(Self::Tcp),
            17 => Some(Self::Udp),
            _ => None,
        }
    }
}

/// IPv4 header view. The header length comes from IHL, so options are
/// skipped correctly.
#[derive(Debug)]
pub struct Ipv4Header<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> Ipv4Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let Some(&first) = buffer.first() else {
            return Err(Error::InvalidPacket("IPv4 header too short"));
        };
        if first >> 4 != 4 {
            return Err(Error::InvalidPacket("not an IPv4 packet"));
        }

        let header_len = usize::from(first & 0x0f) * 4;
        if header_len < MIN_HEADER_SIZE {
            return Err(Error::InvalidPacket("IPv4 IHL too small"));
        }
        if buffer.len() < header_len {
            return Err(Error::InvalidPacket("IPv4 header truncated"));
        }

        Ok(Self { buffer, header_len })
    }

    pub fn protocol(&self) -> u8 {
        self.buffer[9]
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[8]
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[self.header_len..]
    }
}

/// Internet checksum over `header` (RFC 1071). A header carrying a valid
/// checksum sums to zero.
pub fn checksum(header: &[u8]) -> u16 {
    let mut sum = header
        .chunks(2)
        .map(|pair| match *pair {
            [hi, lo] => u32::from(u16::from_be_bytes([hi, lo])),
            [hi] => u32::from(hi) << 8,
            _ => 0,
        })
        .fold(0u32, u32::wrapping_add);

    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(ihl: u8, protocol: u8) -> Vec<u8> {
        let mut h = vec![0u8; usize::from(ihl) * 4];
        h[0] = 0x40 | ihl;
        h[8] = 64;
        h[9] = protocol;
        h
    }

    #[test]
    fn test_header_len_from_ihl() {
        let plain = header(5, 6);
        let ip = Ipv4Header::parse(&plain).unwrap();
        assert_eq!(ip.header_len(), 20);
        assert_eq!(IpProtocol::from_u8(ip.protocol()), Some(IpProtocol::Tcp));
        assert_eq!(ip.ttl(), 64);

        let mut with_options = header(7, 17);
        with_options.extend_from_slice(b"payload");
        let payload = {
            let ip = Ipv4Header::parse(&with_options).unwrap();
            assert_eq!(ip.header_len(), 28);
            ip.payload()
        };
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_parse_rejects_bad_headers() {
        // IHL below 5
        let mut data = header(5, 6);
        data[0] = 0x43;
        assert!(Ipv4Header::parse(&data).is_err());

        // IHL past the end of the buffer
        data[0] = 0x46;
        assert!(Ipv4Header::parse(&data).is_err());

        // IPv6 version nibble
        data[0] = 0x65;
        assert!(Ipv4Header::parse(&data).is_err());

        assert!(Ipv4Header::parse(&[]).is_err());
    }

    #[test]
    fn test_checksum_verifies() {
        let mut data = header(5, 6);
        data[12..20].copy_from_slice(&[10, 0, 0, 1, 10, 0, 0, 2]);
        let sum = checksum(&data);
        data[10..12].copy_from_slice(&sum.to_be_bytes());
        assert_eq!(checksum(&data), 0);
    }

    #[test]
    fn test_unknown_protocol() {
        assert_eq!(IpProtocol::from_u8(58), None);
    }
}
