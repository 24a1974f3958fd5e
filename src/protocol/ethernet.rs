//! Ethernet header walking (802.1Q / 802.1ad aware)

use super::{EtherType, VlanTag};
use crate::{Error, Result};

/// Length of one MAC address
pub const ETHER_ADDR_LEN: usize = 6;
/// Destination + source MAC addresses
pub const MAC_HEADER_LEN: usize = 2 * ETHER_ADDR_LEN;
/// Minimum Ethernet header size (no VLAN tags)
pub const MIN_HEADER_SIZE: usize = MAC_HEADER_LEN + 2;
/// Stacked VLAN tags accepted before the header is considered malformed
pub const MAX_VLAN_TAGS: usize = 2;

/// Parsed Ethernet header (zero-copy reference)
#[derive(Debug)]
pub struct EthernetHeader<'a> {
    buffer: &'a [u8],
    vlan_count: usize,
}

impl<'a> EthernetHeader<'a> {
    /// Walk the MAC addresses and any VLAN tags up to the real EtherType.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < MIN_HEADER_SIZE {
            return Err(Error::InvalidPacket("frame too short"));
        }

        let mut offset = MAC_HEADER_LEN;
        let mut vlan_count = 0;
        while EtherType::is_vlan_tpid(read_u16(buffer, offset)) {
            vlan_count += 1;
            if vlan_count > MAX_VLAN_TAGS {
                return Err(Error::InvalidPacket("too many VLAN tags"));
            }
            offset += VlanTag::LEN;
            if buffer.len() < offset + 2 {
                return Err(Error::InvalidPacket("VLAN frame too short"));
            }
        }

        Ok(Self { buffer, vlan_count })
    }

    pub fn dst_mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[0..ETHER_ADDR_LEN]);
        mac
    }

    pub fn src_mac(&self) -> [u8; 6] {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.buffer[ETHER_ADDR_LEN..MAC_HEADER_LEN]);
        mac
    }

    /// EtherType following all VLAN tags
    pub fn ethertype(&self) -> u16 {
        read_u16(self.buffer, self.header_len() - 2)
    }

    pub fn vlan_count(&self) -> usize {
        self.vlan_count
    }

    /// VLAN tags, outermost first
    pub fn vlan_tags(&self) -> impl Iterator<Item = VlanTag> + '_ {
        (0..self.vlan_count).map(move |i| {
            let off = MAC_HEADER_LEN + i * VlanTag::LEN;
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&self.buffer[off..off + VlanTag::LEN]);
            VlanTag::from_bytes(bytes)
        })
    }

    /// MAC addresses, VLAN tags and EtherType
    pub fn header_len(&self) -> usize {
        MIN_HEADER_SIZE + self.vlan_count * VlanTag::LEN
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[self.header_len()..]
    }
}

fn read_u16(buffer: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buffer[offset], buffer[offset + 1]])
}
