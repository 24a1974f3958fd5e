//! Per-worker transmit batching
//!
//! Frames produced by OUTPUT actions are collected per destination port and
//! sent as one burst when the batch is full or when the worker's drain
//! timer fires. A burst the port accepts nothing of ends the attempt: the
//! unsent frames are freed and counted as `tx_dropped`.

use super::executor::OutputSink;
use crate::port::{Mbuf, Port, PortId};
use std::sync::Arc;
use tracing::{debug, trace};

struct TxQueue {
    port: Arc<dyn Port>,
    frames: Vec<Mbuf>,
}

impl TxQueue {
    fn flush(&mut self) -> usize {
        let mut sent = 0;
        while !self.frames.is_empty() {
            let accepted = self.port.send_burst(&mut self.frames);
            if accepted == 0 {
                let unsent = self.frames.len();
                self.port.stats().record_tx_drop(unsent);
                self.frames.clear();
                trace!(port = self.port.id(), unsent, "transmit queue full, frames freed");
                break;
            }
            sent += accepted;
        }
        sent
    }
}

/// Pending output batches of one worker, one per known port
pub struct TxBuffer {
    queues: Vec<TxQueue>,
    by_port: [Option<usize>; 256],
    burst_size: usize,
}

impl TxBuffer {
    pub fn new(ports: &[Arc<dyn Port>], burst_size: usize) -> Self {
        let mut by_port = [None; 256];
        let mut queues = Vec::with_capacity(ports.len());
        for port in ports {
            by_port[port.id() as usize] = Some(queues.len());
            queues.push(TxQueue {
                port: port.clone(),
                frames: Vec::with_capacity(burst_size),
            });
        }
        Self {
            queues,
            by_port,
            burst_size: burst_size.max(1),
        }
    }

    /// Frames waiting in all batches
    pub fn pending(&self) -> usize {
        self.queues.iter().map(|q| q.frames.len()).sum()
    }

    /// Send every non-empty batch. Returns the number of frames sent.
    pub fn flush_all(&mut self) -> usize {
        self.queues.iter_mut().map(TxQueue::flush).sum()
    }
}

impl OutputSink for TxBuffer {
    fn enqueue(&mut self, port: PortId, m: Mbuf) {
        let Some(idx) = self.by_port[port as usize] else {
            debug!(port, "output to unknown port, frame freed");
            return;
        };
        let queue = &mut self.queues[idx];
        queue.frames.push(m);
        if queue.frames.len() >= self.burst_size {
            queue.flush();
        }
    }
}
