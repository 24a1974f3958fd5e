//! Packet statistics.
//!
//! Counters are plain relaxed atomics: any core may increment them and the
//! stats-printing core reads them without locking. Per-protocol counters are
//! kept per core and only summed when a report is rendered.

use crate::port::Port;
use crate::sniffer::Protocol;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Highest number of worker cores tracked separately by per-core counters.
pub const MAX_CORES: usize = 64;

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter by 1.
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds a value to the counter.
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Gets the current value of the counter.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Sniffed-protocol counters, one row per core.
#[derive(Debug)]
pub struct ProtocolStats {
    per_core: Box<[[Counter; Protocol::COUNT]; MAX_CORES]>,
}

impl ProtocolStats {
    pub fn new() -> Self {
        Self {
            per_core: Box::new(std::array::from_fn(|_| std::array::from_fn(|_| Counter::new()))),
        }
    }

    /// Count one frame of `protocol` seen on `core`. Unknown is not counted.
    pub fn inc(&self, protocol: Protocol, core: usize) {
        if let Some(idx) = protocol.index() {
            self.per_core[core % MAX_CORES][idx].inc();
        }
    }

    /// Count for a single core
    pub fn get(&self, protocol: Protocol, core: usize) -> u64 {
        protocol
            .index()
            .map(|idx| self.per_core[core % MAX_CORES][idx].get())
            .unwrap_or(0)
    }

    /// Sum over all cores.
    pub fn total(&self, protocol: Protocol) -> u64 {
        match protocol.index() {
            Some(idx) => self.per_core.iter().map(|row| row[idx].get()).sum(),
            None => 0,
        }
    }
}

impl Default for ProtocolStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-port statistics.
#[derive(Debug, Default)]
pub struct PortStats {
    /// Number of packets received.
    pub rx_packets: Counter,
    /// Number of bytes received.
    pub rx_bytes: Counter,
    /// Number of packets transmitted.
    pub tx_packets: Counter,
    /// Number of bytes transmitted.
    pub tx_bytes: Counter,
    /// Received frames freed without being forwarded.
    pub dropped: Counter,
    /// Frames queued for transmit that the port never accepted.
    pub tx_dropped: Counter,
    /// Number of receive errors.
    pub rx_errors: Counter,
    /// Sniffed protocol counts for frames received on this port.
    pub protocols: ProtocolStats,
}

impl PortStats {
    /// Creates new port statistics initialized to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received packet.
    pub fn record_rx(&self, bytes: usize) {
        self.rx_packets.inc();
        self.rx_bytes.add(bytes as u64);
    }

    /// Records a transmitted packet.
    pub fn record_tx(&self, bytes: usize) {
        self.tx_packets.inc();
        self.tx_bytes.add(bytes as u64);
    }

    pub fn record_drop(&self) {
        self.dropped.inc();
    }

    pub fn record_tx_drop(&self, count: usize) {
        self.tx_dropped.add(count as u64);
    }

    /// Records a receive error.
    pub fn record_rx_error(&self) {
        self.rx_errors.inc();
    }
}

/// Ports whose statistics are reported together
#[derive(Clone, Default)]
pub struct StatsRegistry {
    ports: Vec<Arc<dyn Port>>,
}

impl StatsRegistry {
    pub fn new(ports: Vec<Arc<dyn Port>>) -> Self {
        Self { ports }
    }

    /// Render the statistics block: one section per port.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "==================== port statistics ====================");
        for port in &self.ports {
            let stats = port.stats();
            let _ = writeln!(out, "port {} ({})", port.id(), port.name());
            let _ = writeln!(
                out,
                "  rx: {} packets, {} bytes, {} errors",
                stats.rx_packets.get(),
                stats.rx_bytes.get(),
                stats.rx_errors.get()
            );
            let _ = writeln!(
                out,
                "  tx: {} packets, {} bytes, {} dropped",
                stats.tx_packets.get(),
                stats.tx_bytes.get(),
                stats.tx_dropped.get()
            );
            let _ = writeln!(out, "  dropped: {}", stats.dropped.get());
            for protocol in Protocol::KNOWN {
                let _ = writeln!(
                    out,
                    "  {:<6} {}",
                    protocol.name(),
                    stats.protocols.total(protocol)
                );
            }
        }
        let _ = write!(out, "==========================================================");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MemoryPort;

    #[test]
    fn test_counter_basic() {
        let counter = Counter::new();
        assert_eq!(counter.get(), 0);

        counter.inc();
        assert_eq!(counter.get(), 1);

        counter.add(10);
        assert_eq!(counter.get(), 11);
    }

    #[test]
    fn test_port_stats() {
        let stats = PortStats::new();

        stats.record_rx(100);
        stats.record_rx(200);
        stats.record_tx(150);
        stats.record_tx_drop(3);

        assert_eq!(stats.rx_packets.get(), 2);
        assert_eq!(stats.rx_bytes.get(), 300);
        assert_eq!(stats.tx_packets.get(), 1);
        assert_eq!(stats.tx_bytes.get(), 150);
        assert_eq!(stats.tx_dropped.get(), 3);
    }

    #[test]
    fn test_protocol_stats_aggregate_across_cores() {
        let stats = ProtocolStats::new();
        stats.inc(Protocol::Sip, 1);
        stats.inc(Protocol::Sip, 2);
        stats.inc(Protocol::Sip, 2);
        stats.inc(Protocol::Rtp, 3);
        stats.inc(Protocol::Unknown, 1);

        assert_eq!(stats.get(Protocol::Sip, 2), 2);
        assert_eq!(stats.total(Protocol::Sip), 3);
        assert_eq!(stats.total(Protocol::Rtp), 1);
        assert_eq!(stats.total(Protocol::Http), 0);
        assert_eq!(stats.total(Protocol::Unknown), 0);
    }

    #[test]
    fn test_protocol_stats_concurrent_increments() {
        let stats = Arc::new(ProtocolStats::new());
        let handles: Vec<_> = (0..4)
            .map(|core| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.inc(Protocol::Http, core);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.total(Protocol::Http), 4000);
    }

    #[test]
    fn test_render_stats() {
        let port = Arc::new(MemoryPort::new(3));
        port.stats().record_rx(64);
        port.stats().protocols.inc(Protocol::Rtsp, 1);
        let registry = StatsRegistry::new(vec![port as Arc<dyn Port>]);

        let text = registry.render();
        assert!(text.contains("port 3"));
        assert!(text.contains("rx: 1 packets, 64 bytes"));
        assert!(text.contains("RTSP   1"));
        assert!(text.contains("SIP    0"));
    }
}
