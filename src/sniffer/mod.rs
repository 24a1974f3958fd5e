//! Content-based protocol identification
//!
//! Each [`Matcher`] inspects the application payload of one frame (the bytes
//! after `l2_len + mpls_len + l3_len + l4_len`) and either names its protocol
//! or answers [`Protocol::Unknown`]. The [`Analyzer`] asks its matchers in a
//! fixed order and stops at the first hit: SIP, RTP, RTSP, HTTP. SIP and RTSP
//! share the `OPTIONS` method and only differ in the URI scheme, and no text
//! line can pass the RTP version check, so this order never lets one
//! protocol shadow another.

mod http;
mod rtp;
mod rtsp;
mod sip;
mod text;

pub use http::HttpMatcher;
pub use rtp::RtpMatcher;
pub use rtsp::RtspMatcher;
pub use sip::SipMatcher;

use crate::port::Mbuf;
use std::fmt;

/// Sniffed application protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Protocol {
    Http = 0,
    Sip = 1,
    Rtp = 2,
    Rtsp = 3,
    /// No matcher recognised the payload
    Unknown = 0xFF,
}

impl Protocol {
    /// Number of identifiable protocols
    pub const COUNT: usize = 4;

    /// Every identifiable protocol, in counter order
    pub const KNOWN: [Protocol; Protocol::COUNT] =
        [Protocol::Http, Protocol::Sip, Protocol::Rtp, Protocol::Rtsp];

    /// Keyword used in rule files and statistics
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Http => "HTTP",
            Protocol::Sip => "SIP",
            Protocol::Rtp => "RTP",
            Protocol::Rtsp => "RTSP",
            Protocol::Unknown => "UNKNOWN",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|p| p.name() == name)
    }

    /// Counter slot; `None` for Unknown
    pub fn index(&self) -> Option<usize> {
        match self {
            Protocol::Unknown => None,
            known => Some(*known as usize),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Heuristic recogniser for one protocol
pub trait Matcher: Send + Sync {
    /// Classify an application payload. Must not read past its end.
    fn classify(&self, payload: &[u8]) -> Protocol;
}

/// Ordered list of matchers, built once and shared read-only by all workers
pub struct Analyzer {
    matchers: Vec<Box<dyn Matcher>>,
}

impl Analyzer {
    /// Analyzer with the standard matcher order
    pub fn new() -> Self {
        Self::with_matchers(vec![
            Box::new(SipMatcher),
            Box::new(RtpMatcher),
            Box::new(RtspMatcher),
            Box::new(HttpMatcher),
        ])
    }

    pub fn with_matchers(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// Classify a frame whose header lengths are already set.
    pub fn analyze(&self, m: &Mbuf) -> Protocol {
        self.classify(m.payload())
    }

    pub fn classify(&self, payload: &[u8]) -> Protocol {
        self.matchers
            .iter()
            .map(|matcher| matcher.classify(payload))
            .find(|protocol| *protocol != Protocol::Unknown)
            .unwrap_or(Protocol::Unknown)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("matchers", &self.matchers.len())
            .finish()
    }
}
