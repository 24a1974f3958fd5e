//! TCP protocol - RFC 793
//!
//! Only what is needed to find where the segment payload starts.

use crate::{Error, Result};

/// Header size without options
pub const MIN_HEADER_SIZE: usize = 20;

#[derive(Debug)]
pub struct TcpHeader<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> TcpHeader<'a> {
    /// The header length is taken from the data offset field, not assumed.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < MIN_HEADER_SIZE {
            return Err(Error::InvalidPacket("TCP header too short"));
        }

        let header_len = usize::from(buffer[12] >> 4) * 4;
        match header_len {
            n if n < MIN_HEADER_SIZE => Err(Error::InvalidPacket("TCP data offset too small")),
            n if n > buffer.len() => Err(Error::InvalidPacket("TCP header truncated")),
            _ => Ok(Self { buffer, header_len }),
        }
    }

    pub fn src_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[0], self.buffer[1]])
    }

    pub fn dst_port(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    /// Header length in bytes, options included
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[self.header_len..]
    }
}
