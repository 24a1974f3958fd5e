//! In-process port backed by queues

use super::{Mbuf, MbufPool, Port, PortId};
use crate::telemetry::PortStats;
use crate::Error;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Port whose wire is a pair of queues.
///
/// Frames injected with [`MemoryPort::inject`] are handed out by
/// `recv_burst`; transmitted frames are copied out of their buffers (which
/// are then freed, as a NIC would after transmission) and kept until
/// [`MemoryPort::take_transmitted`] is called. The transmit queue holds at
/// most `tx_capacity` frames; a full queue accepts nothing.
#[derive(Debug)]
pub struct MemoryPort {
    id: PortId,
    name: String,
    rx: Mutex<VecDeque<Vec<u8>>>,
    tx: Mutex<Vec<Vec<u8>>>,
    tx_capacity: AtomicUsize,
    link: AtomicBool,
    stats: PortStats,
}

impl MemoryPort {
    pub fn new(id: PortId) -> Self {
        Self {
            id,
            name: format!("mem{}", id),
            rx: Mutex::new(VecDeque::new()),
            tx: Mutex::new(Vec::new()),
            tx_capacity: AtomicUsize::new(usize::MAX),
            link: AtomicBool::new(true),
            stats: PortStats::new(),
        }
    }

    /// Queue a frame for reception
    pub fn inject(&self, frame: &[u8]) {
        if let Ok(mut rx) = self.rx.lock() {
            rx.push_back(frame.to_vec());
        }
    }

    /// Frames still waiting to be received
    pub fn pending_rx(&self) -> usize {
        self.rx.lock().map(|rx| rx.len()).unwrap_or(0)
    }

    /// Remove and return everything transmitted so far
    pub fn take_transmitted(&self) -> Vec<Vec<u8>> {
        self.tx
            .lock()
            .map(|mut tx| std::mem::take(&mut *tx))
            .unwrap_or_default()
    }

    pub fn set_link(&self, up: bool) {
        self.link.store(up, Ordering::Relaxed);
    }

    /// Limit the transmit queue; `None` removes the limit.
    pub fn set_tx_capacity(&self, capacity: Option<usize>) {
        self.tx_capacity
            .store(capacity.unwrap_or(usize::MAX), Ordering::Relaxed);
    }
}

impl Port for MemoryPort {
    fn id(&self) -> PortId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn recv_burst(&self, pool: &MbufPool, out: &mut Vec<Mbuf>, max: usize) -> usize {
        if !self.link_up() {
            return 0;
        }
        let Ok(mut rx) = self.rx.lock() else {
            return 0;
        };

        let mut received = 0;
        while received < max {
            let Some(frame) = rx.pop_front() else { break };
            match pool.alloc_from(&frame) {
                Ok(m) => {
                    self.stats.record_rx(m.pkt_len());
                    out.push(m);
                    received += 1;
                }
                Err(Error::PoolExhausted) => {
                    // Out of buffers; leave the frame on the wire for later
                    self.stats.record_rx_error();
                    rx.push_front(frame);
                    break;
                }
                Err(e) => {
                    debug!(port = self.id, error = %e, len = frame.len(), "frame discarded");
                    self.stats.record_rx_error();
                }
            }
        }
        received
    }

    fn send_burst(&self, frames: &mut Vec<Mbuf>) -> usize {
        if !self.link_up() {
            return 0;
        }
        let Ok(mut tx) = self.tx.lock() else {
            return 0;
        };

        let room = self
            .tx_capacity
            .load(Ordering::Relaxed)
            .saturating_sub(tx.len());
        let accepted = frames.len().min(room);
        for m in frames.drain(..accepted) {
            self.stats.record_tx(m.pkt_len());
            tx.push(m.data().to_vec());
        }
        accepted
    }

    fn link_up(&self) -> bool {
        self.link.load(Ordering::Relaxed)
    }

    fn stats(&self) -> &PortStats {
        &self.stats
    }
}
