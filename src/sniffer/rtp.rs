//! RTP recognition (RFC 3550 fixed header, RFC 3551 payload types)

use super::{Matcher, Protocol};

/// Fixed header size
pub const MIN_LEN: usize = 12;

const VERSION: u8 = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct RtpMatcher;

impl RtpMatcher {
    /// Static (0..=34) and dynamic (96..=127) payload types
    fn valid_payload_type(pt: u8) -> bool {
        pt <= 34 || (96..=127).contains(&pt)
    }

    /// Header length including CSRC list and extension, if it fits in
    /// `payload`.
    fn header_len(payload: &[u8]) -> Option<usize> {
        let csrc_count = (payload[0] & 0x0F) as usize;
        let mut len = MIN_LEN + csrc_count * 4;
        if payload.len() < len {
            return None;
        }

        if payload[0] & 0x10 != 0 {
            // profile id (16 bits) then extension length in 32-bit words
            let ext = payload.get(len + 2..len + 4)?;
            let words = u16::from_be_bytes([ext[0], ext[1]]) as usize;
            len += 4 + words * 4;
            if payload.len() < len {
                return None;
            }
        }
        Some(len)
    }
}

impl Matcher for RtpMatcher {
    fn classify(&self, payload: &[u8]) -> Protocol {
        if payload.len() < MIN_LEN {
            return Protocol::Unknown;
        }
        if payload[0] >> 6 != VERSION {
            return Protocol::Unknown;
        }
        if !Self::valid_payload_type(payload[1] & 0x7F) {
            return Protocol::Unknown;
        }
        let ssrc = u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]);
        if ssrc == 0 {
            return Protocol::Unknown;
        }
        match Self::header_len(payload) {
            Some(_) => Protocol::Rtp,
            None => Protocol::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(b0: u8, pt: u8, ssrc: u32) -> Vec<u8> {
        let mut h = vec![b0, pt, 0x12, 0x34, 0, 0, 0x03, 0xe8];
        h.extend_from_slice(&ssrc.to_be_bytes());
        h
    }

    #[test]
    fn test_minimal_header() {
        let pkt = header(0x80, 0, 0x1234_5678);
        assert_eq!(RtpMatcher.classify(&pkt), Protocol::Rtp);
    }

    #[test]
    fn test_marker_bit_and_dynamic_type() {
        let mut pkt = header(0x80, 0x80 | 111, 1);
        pkt.extend_from_slice(&[0u8; 20]);
        assert_eq!(RtpMatcher.classify(&pkt), Protocol::Rtp);
    }

    #[test]
    fn test_rejects_bad_fields() {
        // Version 1
        assert_eq!(RtpMatcher.classify(&header(0x40, 0, 1)), Protocol::Unknown);
        // Version 3
        assert_eq!(RtpMatcher.classify(&header(0xC0, 0, 1)), Protocol::Unknown);
        // Unassigned payload type
        assert_eq!(RtpMatcher.classify(&header(0x80, 35, 1)), Protocol::Unknown);
        assert_eq!(RtpMatcher.classify(&header(0x80, 95, 1)), Protocol::Unknown);
        // Zero SSRC
        assert_eq!(RtpMatcher.classify(&header(0x80, 8, 0)), Protocol::Unknown);
    }

    #[test]
    fn test_csrc_list_must_fit() {
        // Two CSRCs declared, one present
        let mut pkt = header(0x82, 0, 1);
        pkt.extend_from_slice(&[0, 0, 0, 1]);
        assert_eq!(RtpMatcher.classify(&pkt), Protocol::Unknown);

        pkt.extend_from_slice(&[0, 0, 0, 2]);
        assert_eq!(RtpMatcher.classify(&pkt), Protocol::Rtp);
    }

    #[test]
    fn test_extension_length_in_words() {
        // Extension with 2 words of data
        let mut pkt = header(0x90, 0, 1);
        pkt.extend_from_slice(&[0xBE, 0xDE, 0x00, 0x02]);
        pkt.extend_from_slice(&[0u8; 4]);
        assert_eq!(RtpMatcher.classify(&pkt), Protocol::Unknown);

        pkt.extend_from_slice(&[0u8; 4]);
        assert_eq!(RtpMatcher.classify(&pkt), Protocol::Rtp);
    }

    #[test]
    fn test_extension_header_truncated() {
        let mut pkt = header(0x90, 0, 1);
        pkt.extend_from_slice(&[0xBE, 0xDE]);
        assert_eq!(RtpMatcher.classify(&pkt), Protocol::Unknown);
    }

    #[test]
    fn test_minimum_length() {
        let pkt = header(0x80, 0, 1);
        assert_eq!(RtpMatcher.classify(&pkt[..11]), Protocol::Unknown);
    }
}
