//! Common protocol types

/// EtherType values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
    Vlan = 0x8100,
    Ipv6 = 0x86DD,
    MplsUnicast = 0x8847,
    MplsMulticast = 0x8848,
    QinQ = 0x88A8,
}

impl EtherType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0800 => Some(EtherType::Ipv4),
            0x0806 => Some(EtherType::Arp),
            0x8100 => Some(EtherType::Vlan),
            0x86DD => Some(EtherType::Ipv6),
            0x8847 => Some(EtherType::MplsUnicast),
            0x8848 => Some(EtherType::MplsMulticast),
            0x88A8 => Some(EtherType::QinQ),
            _ => None,
        }
    }

    /// 802.1Q or 802.1ad tag protocol identifier
    pub fn is_vlan_tpid(value: u16) -> bool {
        value == EtherType::Vlan as u16 || value == EtherType::QinQ as u16
    }

    pub fn is_mpls(value: u16) -> bool {
        value == EtherType::MplsUnicast as u16 || value == EtherType::MplsMulticast as u16
    }
}

/// VLAN tag as it appears on the wire: TPID followed by TCI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VlanTag {
    /// Tag protocol identifier (0x8100 or 0x88a8)
    pub tpid: u16,
    /// Priority Code Point (3 bits)
    pub pcp: u8,
    /// Canonical Format Indicator / Drop Eligible Indicator (1 bit)
    pub cfi: u8,
    /// VLAN ID (12 bits)
    pub vid: u16,
}

impl VlanTag {
    pub const LEN: usize = 4;

    /// Highest usable VLAN ID; 4095 is reserved.
    pub const MAX_VID: u16 = 4094;

    pub fn new(vid: u16) -> Self {
        Self {
            tpid: EtherType::Vlan as u16,
            pcp: 0,
            cfi: 0,
            vid: vid & 0x0FFF,
        }
    }

    /// Tag control information (PCP, CFI, VID)
    pub fn tci(&self) -> u16 {
        ((self.pcp as u16 & 0x07) << 13) | ((self.cfi as u16 & 0x01) << 12) | (self.vid & 0x0FFF)
    }

    /// Packed 32-bit value: TPID in the upper half, TCI in the lower half
    pub fn to_u32(&self) -> u32 {
        ((self.tpid as u32) << 16) | self.tci() as u32
    }

    pub fn from_u32(value: u32) -> Self {
        Self {
            tpid: (value >> 16) as u16,
            pcp: ((value >> 13) & 0x07) as u8,
            cfi: ((value >> 12) & 0x01) as u8,
            vid: (value & 0x0FFF) as u16,
        }
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.to_u32().to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::from_u32(u32::from_be_bytes(bytes))
    }
}

/// MPLS label stack entry - RFC 3032
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MplsLabel {
    /// Label value (20 bits)
    pub label: u32,
    /// Experimental / traffic class bits (3 bits)
    pub exp: u8,
    /// Bottom of stack
    pub bos: bool,
    pub ttl: u8,
}

impl MplsLabel {
    pub const LEN: usize = 4;

    pub const MAX_LABEL: u32 = 0x000F_FFFF;

    pub fn to_u32(&self) -> u32 {
        ((self.label & Self::MAX_LABEL) << 12)
            | ((self.exp as u32 & 0x07) << 9)
            | ((self.bos as u32) << 8)
            | self.ttl as u32
    }

    pub fn from_u32(value: u32) -> Self {
        Self {
            label: value >> 12,
            exp: ((value >> 9) & 0x07) as u8,
            bos: (value >> 8) & 0x01 != 0,
            ttl: (value & 0xFF) as u8,
        }
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.to_u32().to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::from_u32(u32::from_be_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethertype_from_u16() {
        assert_eq!(EtherType::from_u16(0x0800), Some(EtherType::Ipv4));
        assert_eq!(EtherType::from_u16(0x8100), Some(EtherType::Vlan));
        assert_eq!(EtherType::from_u16(0x88a8), Some(EtherType::QinQ));
        assert_eq!(EtherType::from_u16(0x8847), Some(EtherType::MplsUnicast));
        assert_eq!(EtherType::from_u16(0x86DD), Some(EtherType::Ipv6));
        assert_eq!(EtherType::from_u16(0x1234), None);
    }

    #[test]
    fn test_vlan_tpid_detection() {
        assert!(EtherType::is_vlan_tpid(0x8100));
        assert!(EtherType::is_vlan_tpid(0x88a8));
        assert!(!EtherType::is_vlan_tpid(0x0800));
    }

    #[test]
    fn test_vlan_tag_to_bytes() {
        let tag = VlanTag {
            tpid: 0x8100,
            pcp: 5,
            cfi: 1,
            vid: 100,
        };
        // PCP=5 (101), CFI=1, VID=100 (0x64) -> TCI 0xB064
        assert_eq!(tag.to_bytes(), [0x81, 0x00, 0xB0, 0x64]);
    }

    #[test]
    fn test_vlan_tag_from_bytes() {
        let tag = VlanTag::from_bytes([0x88, 0xa8, 0x20, 0x03]);
        assert_eq!(tag.tpid, 0x88a8);
        assert_eq!(tag.pcp, 1);
        assert_eq!(tag.cfi, 0);
        assert_eq!(tag.vid, 3);
    }

    #[test]
    fn test_vlan_tag_new_truncates_vid() {
        let tag = VlanTag::new(0xFFFF);
        assert_eq!(tag.vid, 0x0FFF);
        assert_eq!(tag.tpid, 0x8100);
    }

    #[test]
    fn test_mpls_label_layout() {
        let label = MplsLabel {
            label: 65793,
            exp: 3,
            bos: true,
            ttl: 64,
        };
        let value = label.to_u32();
        assert_eq!(value >> 12, 65793);
        assert_eq!((value >> 9) & 0x7, 3);
        assert_eq!((value >> 8) & 0x1, 1);
        assert_eq!(value & 0xff, 64);
        assert_eq!(MplsLabel::from_bytes(label.to_bytes()), label);
    }
}
