//! Ports and frame buffers
//!
//! A [`Port`] moves frames between the pipeline and the wire in bursts.
//! Backends:
//! - AF_PACKET: Linux raw socket, no special setup required
//! - Memory: in-process queues, for tests and simulation

mod af_packet;
mod mbuf;
mod memory;

pub use af_packet::AfPacketPort;
pub use mbuf::{Mbuf, MbufPool, DEFAULT_DATAROOM, DEFAULT_HEADROOM, DEFAULT_POOL_SIZE};
pub use memory::MemoryPort;

use crate::telemetry::PortStats;

/// Port identifier as it appears in rule keys and OUTPUT actions
pub type PortId = u8;

/// Burst I/O backend trait
///
/// Every call returns immediately; no method may block the polling core.
/// Implementations count their own rx/tx packets and bytes in [`Port::stats`].
pub trait Port: Send + Sync {
    fn id(&self) -> PortId;

    /// Human readable name (interface name for kernel-backed ports)
    fn name(&self) -> &str;

    /// Receive up to `max` frames into buffers taken from `pool`, appending
    /// them to `out`. Returns the number of frames received.
    fn recv_burst(&self, pool: &MbufPool, out: &mut Vec<Mbuf>, max: usize) -> usize;

    /// Transmit frames from the front of `frames`. The accepted prefix is
    /// removed (and freed); the rest stay in `frames`. Returns the number
    /// accepted.
    fn send_burst(&self, frames: &mut Vec<Mbuf>) -> usize;

    /// Current link state
    fn link_up(&self) -> bool;

    fn stats(&self) -> &PortStats;
}
