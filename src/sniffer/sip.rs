//! SIP recognition (RFC 3261, plus the method extensions in common use)

use super::text::{starts_with_keyword, strip_method};
use super::{Matcher, Protocol};

/// Shortest payload that can hold a request line
pub const MIN_LEN: usize = 14;

const VERSION: &[u8] = b"SIP/2.0";

const METHODS: [&[u8]; 14] = [
    b"INVITE",
    b"ACK",
    b"BYE",
    b"CANCEL",
    b"OPTIONS",
    b"REGISTER",
    b"PRACK",
    b"SUBSCRIBE",
    b"NOTIFY",
    b"PUBLISH",
    b"INFO",
    b"REFER",
    b"MESSAGE",
    b"UPDATE",
];

const SCHEMES: [&[u8]; 2] = [b"SIP:", b"SIPS:"];

#[derive(Debug, Clone, Copy, Default)]
pub struct SipMatcher;

impl Matcher for SipMatcher {
    fn classify(&self, payload: &[u8]) -> Protocol {
        if payload.len() < MIN_LEN {
            return Protocol::Unknown;
        }
        if starts_with_keyword(payload, VERSION) {
            return Protocol::Sip;
        }

        match strip_method(payload, &METHODS) {
            Some(uri) if SCHEMES.iter().any(|s| starts_with_keyword(uri, s)) => Protocol::Sip,
            _ => Protocol::Unknown,
        }
    }
}
