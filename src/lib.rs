//! Protoplane - content-sniffing packet pipeline
//!
//! Frames are received in bursts per port, their header lengths computed in
//! place, their application protocol sniffed from payload bytes, and the
//! action list configured for (ingress port, protocol) applied before the
//! frame is transmitted or freed.

pub mod config;
pub mod dataplane;
pub mod error;
pub mod port;
pub mod protocol;
pub mod sniffer;
pub mod telemetry;

pub use error::{Error, Result};
