//! IPv6 protocol - RFC 8200
//!
//! Extension headers are not walked: the next header must be the transport
//! header itself for the frame to be prepared.

use crate::{Error, Result};

/// Fixed header size
pub const HEADER_SIZE: usize = 40;

#[derive(Debug)]
pub struct Ipv6Header<'a> {
    buffer: &'a [u8],
}

impl<'a> Ipv6Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        match buffer {
            b if b.len() < HEADER_SIZE => Err(Error::InvalidPacket("IPv6 header too short")),
            b if b[0] >> 4 != 6 => Err(Error::InvalidPacket("not an IPv6 packet")),
            b => Ok(Self { buffer: b }),
        }
    }

    pub fn next_header(&self) -> u8 {
        self.buffer[6]
    }

    pub fn hop_limit(&self) -> u8 {
        self.buffer[7]
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[HEADER_SIZE..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_header() {
        let mut data = [0u8; HEADER_SIZE + 4];
        data[0] = 0x60;
        data[6] = 6;
        data[7] = 64;
        data[HEADER_SIZE..].copy_from_slice(b"OPTI");

        let ip = Ipv6Header::parse(&data).unwrap();
        assert_eq!(ip.next_header(), 6);
        assert_eq!(ip.hop_limit(), 64);
        assert_eq!(ip.payload(), b"OPTI");
    }

    #[test]
    fn test_rejects_short_or_wrong_version() {
        let mut data = [0u8; HEADER_SIZE];
        data[0] = 0x60;
        assert!(Ipv6Header::parse(&data[..HEADER_SIZE - 1]).is_err());

        data[0] = 0x45;
        assert!(Ipv6Header::parse(&data).is_err());
    }
}
