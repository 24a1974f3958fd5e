//! HTTP/1.x recognition
//!
//! Status line: `HTTP/1.1 ...` (or 1.0). Request line:
//! `METHOD SP request-target SP HTTP/1.1`.

use super::text::{starts_with_keyword, strip_method};
use super::{Matcher, Protocol};

/// Shortest payload that can hold a request line
pub const MIN_LEN: usize = 15;

const VERSIONS: [&[u8]; 2] = [b"HTTP/1.1", b"HTTP/1.0"];

const METHODS: [&[u8]; 8] = [
    b"OPTIONS", b"GET", b"HEAD", b"POST", b"PUT", b"DELETE", b"TRACE", b"CONNECT",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpMatcher;

impl HttpMatcher {
    fn is_version(input: &[u8]) -> bool {
        VERSIONS.iter().any(|v| starts_with_keyword(input, v))
    }
}

impl Matcher for HttpMatcher {
    fn classify(&self, payload: &[u8]) -> Protocol {
        if payload.len() < MIN_LEN {
            return Protocol::Unknown;
        }
        if Self::is_version(payload) {
            return Protocol::Http;
        }

        let Some(target) = strip_method(payload, &METHODS) else {
            return Protocol::Unknown;
        };
        // The request target runs to the next space
        let Some(space) = target.iter().position(|b| *b == b' ') else {
            return Protocol::Unknown;
        };
        if Self::is_version(&target[space + 1..]) {
            Protocol::Http
        } else {
            Protocol::Unknown
        }
    }
}
