//! Per-core polling loop
//!
//! A worker owns a set of receive ports and runs to completion on every
//! burst: prepare, sniff, look up, execute, free. It never blocks. Three
//! timers run off the same loop: the transmit drain, the link poll, and (on
//! the designated worker only) the statistics printout.

use super::executor::{execute, Verdict};
use super::prepare::prepare_packet;
use super::txbuf::TxBuffer;
use crate::config::RuleTable;
use crate::port::{Mbuf, MbufPool, Port};
use crate::sniffer::{Analyzer, Protocol};
use crate::telemetry::StatsRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Timing and sizing of one worker loop
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub core: usize,
    pub burst_size: usize,
    pub drain_interval: Duration,
    pub link_poll_interval: Duration,
    /// Set on the one worker that prints statistics
    pub stats_interval: Option<Duration>,
}

/// State shared read-only by every worker
#[derive(Clone)]
pub struct SharedState {
    pub rules: Arc<RuleTable>,
    pub analyzer: Arc<Analyzer>,
    pub pool: MbufPool,
}

pub struct Worker {
    config: WorkerConfig,
    shared: SharedState,
    rx_ports: Vec<Arc<dyn Port>>,
    link_up: Vec<bool>,
    tx: TxBuffer,
    stats: Option<StatsRegistry>,
    burst: Vec<Mbuf>,
}

impl Worker {
    /// `rx_ports` are polled by this worker; `all_ports` are the possible
    /// OUTPUT destinations.
    pub fn new(
        config: WorkerConfig,
        shared: SharedState,
        rx_ports: Vec<Arc<dyn Port>>,
        all_ports: &[Arc<dyn Port>],
        stats: Option<StatsRegistry>,
    ) -> Self {
        let link_up = rx_ports.iter().map(|p| p.link_up()).collect();
        let tx = TxBuffer::new(all_ports, config.burst_size);
        let burst = Vec::with_capacity(config.burst_size);
        Self {
            config,
            shared,
            rx_ports,
            link_up,
            tx,
            stats,
            burst,
        }
    }

    pub fn core(&self) -> usize {
        self.config.core
    }

    /// Poll until `cancel` fires, then flush and return.
    ///
    /// The token is checked once per iteration, so a burst in progress is
    /// always finished first.
    pub fn run(mut self, cancel: CancellationToken) {
        info!(
            core = self.config.core,
            ports = ?self.rx_ports.iter().map(|p| p.id()).collect::<Vec<_>>(),
            "worker started"
        );

        let start = Instant::now();
        let mut last_drain = start;
        let mut last_link_poll = start;
        let mut last_stats = start;

        while !cancel.is_cancelled() {
            let processed = self.poll_once();

            let now = Instant::now();
            if now.duration_since(last_drain) >= self.config.drain_interval {
                self.tx.flush_all();
                last_drain = now;
            }
            if now.duration_since(last_link_poll) >= self.config.link_poll_interval {
                self.poll_links();
                last_link_poll = now;
            }
            if let (Some(interval), Some(stats)) = (self.config.stats_interval, &self.stats) {
                if now.duration_since(last_stats) >= interval {
                    println!("{}", stats.render());
                    last_stats = now;
                }
            }

            if processed == 0 {
                std::hint::spin_loop();
            }
        }

        let flushed = self.tx.flush_all();
        info!(core = self.config.core, flushed, "worker stopped");
    }

    /// Receive and process one burst from each port. Returns the number of
    /// frames received.
    pub fn poll_once(&mut self) -> usize {
        let mut burst = std::mem::take(&mut self.burst);
        let mut received = 0;

        for port in &self.rx_ports {
            let n = port.recv_burst(&self.shared.pool, &mut burst, self.config.burst_size);
            received += n;
            for m in burst.drain(..) {
                process_frame(
                    m,
                    port.as_ref(),
                    self.config.core,
                    &self.shared,
                    &mut self.tx,
                );
            }
        }

        self.burst = burst;
        received
    }

    /// Send whatever is waiting in the transmit batches.
    pub fn flush(&mut self) -> usize {
        self.tx.flush_all()
    }

    fn poll_links(&mut self) {
        for (port, was_up) in self.rx_ports.iter().zip(self.link_up.iter_mut()) {
            let up = port.link_up();
            if up != *was_up {
                info!(
                    port = port.id(),
                    name = port.name(),
                    link = if up { "up" } else { "down" },
                    "link state changed"
                );
                *was_up = up;
            }
        }
    }
}

/// One frame through the pipeline. The frame is freed when this returns.
fn process_frame(
    mut m: Mbuf,
    port: &dyn Port,
    core: usize,
    shared: &SharedState,
    tx: &mut TxBuffer,
) {
    let stats = port.stats();

    if !prepare_packet(&mut m) {
        stats.record_drop();
        return;
    }

    let protocol = shared.analyzer.analyze(&m);
    if protocol == Protocol::Unknown {
        trace!(port = port.id(), len = m.pkt_len(), "protocol not identified");
        stats.record_drop();
        return;
    }
    stats.protocols.inc(protocol, core);

    let Some(actions) = shared.rules.lookup(port.id(), protocol) else {
        trace!(port = port.id(), %protocol, "no rule");
        stats.record_drop();
        return;
    };

    match execute(&mut m, actions, &shared.pool, tx) {
        Verdict::Dropped | Verdict::Completed { outputs: 0 } => stats.record_drop(),
        Verdict::Completed { outputs } => {
            debug!(port = port.id(), %protocol, outputs, "frame forwarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameBuilder;
    use crate::port::MemoryPort;

    const INVITE: &[u8] = b"INVITE sip:bob@biloxi.example.com SIP/2.0\r\nVia: x\r\n\r\n";

    fn worker_with(rules: &str, burst_size: usize) -> (Worker, Arc<MemoryPort>, Arc<MemoryPort>, MbufPool) {
        let p0 = Arc::new(MemoryPort::new(0));
        let p1 = Arc::new(MemoryPort::new(1));
        let ports: Vec<Arc<dyn Port>> = vec![p0.clone(), p1.clone()];
        let pool = MbufPool::new(64, 128, 2048);
        let shared = SharedState {
            rules: Arc::new(RuleTable::parse(rules).unwrap()),
            analyzer: Arc::new(Analyzer::new()),
            pool: pool.clone(),
        };
        let config = WorkerConfig {
            core: 1,
            burst_size,
            drain_interval: Duration::from_micros(100),
            link_poll_interval: Duration::from_millis(100),
            stats_interval: None,
        };
        let worker = Worker::new(config, shared, vec![ports[0].clone()], &ports, None);
        (worker, p0, p1, pool)
    }

    #[test]
    fn test_sip_invite_tagged_and_forwarded() {
        let (mut worker, p0, p1, pool) =
            worker_with("0,SIP:PUSH_VLAN(0x8100,2,0,100);OUTPUT(1)", 32);
        let frame = FrameBuilder::new().udp(5060, 5060).payload(INVITE).build();
        p0.inject(&frame);

        assert_eq!(worker.poll_once(), 1);
        worker.flush();

        let sent = p1.take_transmitted();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0][12..16], &[0x81, 0x00, 0x40, 0x64]);
        assert_eq!(&sent[0][16..], &frame[12..]);
        assert!(p0.take_transmitted().is_empty());
        assert_eq!(pool.in_use(), 0);
        assert_eq!(p0.stats().protocols.get(Protocol::Sip, 1), 1);
        assert_eq!(p0.stats().dropped.get(), 0);
    }

    #[test]
    fn test_unmatched_traffic_is_dropped() {
        let (mut worker, p0, p1, pool) = worker_with("0,SIP:OUTPUT(1)", 32);
        // No rule for HTTP
        p0.inject(&FrameBuilder::new().tcp(40000, 80).payload(b"GET / HTTP/1.1\r\n\r\n").build());
        // Not sniffable
        p0.inject(&FrameBuilder::new().udp(53, 53).payload(&[0u8; 32]).build());
        // Not IP
        p0.inject(&FrameBuilder::new().ethertype(0x0806).payload(&[0u8; 28]).build());

        assert_eq!(worker.poll_once(), 3);
        worker.flush();

        assert!(p1.take_transmitted().is_empty());
        assert_eq!(p0.stats().dropped.get(), 3);
        assert_eq!(p0.stats().protocols.total(Protocol::Http), 1);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_drop_rule() {
        let (mut worker, p0, p1, _pool) = worker_with("0,SIP:DROP", 32);
        p0.inject(&FrameBuilder::new().udp(5060, 5060).payload(INVITE).build());
        worker.poll_once();
        worker.flush();
        assert!(p1.take_transmitted().is_empty());
        assert_eq!(p0.stats().dropped.get(), 1);
    }

    #[test]
    fn test_burst_size_limits_one_poll() {
        let (mut worker, p0, p1, _pool) = worker_with("0,SIP:OUTPUT(1)", 2);
        let frame = FrameBuilder::new().udp(5060, 5060).payload(INVITE).build();
        for _ in 0..5 {
            p0.inject(&frame);
        }

        assert_eq!(worker.poll_once(), 2);
        assert_eq!(p0.pending_rx(), 3);
        // A full batch goes out without waiting for the drain timer
        assert_eq!(p1.take_transmitted().len(), 2);
    }

    #[test]
    fn test_run_stops_on_cancel_and_flushes() {
        let (worker, p0, p1, pool) = worker_with("0,SIP:OUTPUT(1)", 32);
        let frame = FrameBuilder::new().udp(5060, 5060).payload(INVITE).build();
        p0.inject(&frame);

        let cancel = CancellationToken::new();
        let handle = {
            let cancel = cancel.clone();
            std::thread::spawn(move || worker.run(cancel))
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while p1.stats().tx_packets.get() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        cancel.cancel();
        handle.join().unwrap();

        assert_eq!(p1.take_transmitted(), vec![frame]);
        assert_eq!(pool.in_use(), 0);
    }
}
