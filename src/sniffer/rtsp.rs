//! RTSP/1.0 recognition (RFC 2326)

use super::text::{starts_with_keyword, strip_method};
use super::{Matcher, Protocol};

/// Shortest payload that can hold a request line
pub const MIN_LEN: usize = 15;

const VERSION: &[u8] = b"RTSP/1.0";

const METHODS: [&[u8]; 11] = [
    b"DESCRIBE",
    b"OPTIONS",
    b"PLAY",
    b"PAUSE",
    b"RECORD",
    b"REDIRECT",
    b"SETUP",
    b"ANNOUNCE",
    b"GET_PARAMETER",
    b"SET_PARAMETER",
    b"TEARDOWN",
];

const SCHEME: &[u8] = b"RTSP://";

#[derive(Debug, Clone, Copy, Default)]
pub struct RtspMatcher;

impl Matcher for RtspMatcher {
    fn classify(&self, payload: &[u8]) -> Protocol {
        if payload.len() < MIN_LEN {
            return Protocol::Unknown;
        }
        if starts_with_keyword(payload, VERSION) {
            return Protocol::Rtsp;
        }

        match strip_method(payload, &METHODS) {
            Some(uri) if starts_with_keyword(uri, SCHEME) => Protocol::Rtsp,
            _ => Protocol::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(payload: &[u8]) -> Protocol {
        RtspMatcher.classify(payload)
    }

    #[test]
    fn test_requests() {
        assert_eq!(
            classify(b"DESCRIBE rtsp://example.com/media.mp4 RTSP/1.0\r\n"),
            Protocol::Rtsp
        );
        assert_eq!(
            classify(b"get_parameter rtsp://example.com/media.mp4 RTSP/1.0\r\n"),
            Protocol::Rtsp
        );
        assert_eq!(classify(b"TEARDOWN RTSP://10.0.0.1/live RTSP/1.0"), Protocol::Rtsp);
    }

    #[test]
    fn test_response_line() {
        assert_eq!(classify(b"RTSP/1.0 200 OK\r\nCSeq: 1\r\n"), Protocol::Rtsp);
        assert_eq!(classify(b"rtsp/1.0 454 Session Not Found"), Protocol::Rtsp);
    }

    #[test]
    fn test_rejects() {
        assert_eq!(classify(b"PLAY http://example.com/a RTSP/1.0"), Protocol::Unknown);
        assert_eq!(classify(b"PLAY rtsp:/example.com/a RTSP/1.0"), Protocol::Unknown);
        assert_eq!(classify(b"Play rtsp://example.com/a RTSP/1.0"), Protocol::Unknown);
        assert_eq!(classify(b"RTSP/2.0 200 OK\r\n\r\n"), Protocol::Unknown);
    }

    #[test]
    fn test_minimum_length() {
        // 14 bytes
        assert_eq!(classify(b"PLAY rtsp://ab"), Protocol::Unknown);
        assert_eq!(classify(b"PLAY rtsp://abc"), Protocol::Rtsp);
    }
}
