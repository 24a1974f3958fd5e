//! Worker lifecycle
//!
//! Ports are spread over cores, one worker thread is started per core in
//! use, and the threads are joined again once the cancellation token fires.
//! Core 0 is left to the supervising thread.

use super::worker::{SharedState, Worker, WorkerConfig};
use crate::config::{PipelineSettings, RuleTable, CPU_SET_SIZE};
use crate::port::{MbufPool, Port, PortId, DEFAULT_DATAROOM};
use crate::sniffer::Analyzer;
use crate::telemetry::StatsRegistry;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pick a core for every port.
///
/// Each entry is a port and its explicit core, if any; explicit cores are
/// kept as long as they exist.
/// The others get the lowest unused cores from 1 upwards, one port each.
pub fn assign_cores(
    ports: &[(PortId, Option<usize>)],
    core_count: usize,
) -> Result<Vec<usize>> {
    let mut used: HashSet<usize> = ports.iter().filter_map(|(_, core)| *core).collect();
    let mut next = 1;

    ports
        .iter()
        .map(|&(port, requested)| {
            if let Some(core) = requested {
                return if core < core_count {
                    Ok(core)
                } else {
                    Err(Error::NoCoreForPort { port })
                };
            }
            while used.contains(&next) {
                next += 1;
            }
            if next >= core_count {
                return Err(Error::NoCoreForPort { port });
            }
            used.insert(next);
            Ok(next)
        })
        .collect()
}

/// Ports, their cores and the shared state, ready to be started
pub struct Pipeline {
    ports: Vec<(Arc<dyn Port>, usize)>,
    shared: SharedState,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Check that every OUTPUT target exists and build the shared state.
    pub fn new(
        rules: RuleTable,
        ports: Vec<(Arc<dyn Port>, usize)>,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let known: HashSet<PortId> = ports.iter().map(|(p, _)| p.id()).collect();
        if let Some(port) = rules.output_ports().find(|p| !known.contains(p)) {
            return Err(Error::PortNotFound { port });
        }

        let pool = MbufPool::new(settings.pool_size, settings.headroom, DEFAULT_DATAROOM);
        Ok(Self {
            ports,
            shared: SharedState {
                rules: Arc::new(rules),
                analyzer: Arc::new(Analyzer::new()),
                pool,
            },
            settings,
        })
    }

    pub fn pool(&self) -> &MbufPool {
        &self.shared.pool
    }

    fn all_ports(&self) -> Vec<Arc<dyn Port>> {
        self.ports.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Start one worker thread per core.
    pub fn spawn(self, cancel: CancellationToken) -> Result<PipelineHandle> {
        let all_ports = self.all_ports();
        let registry = StatsRegistry::new(all_ports.clone());

        let mut by_core: BTreeMap<usize, Vec<Arc<dyn Port>>> = BTreeMap::new();
        for (port, core) in &self.ports {
            by_core.entry(*core).or_default().push(port.clone());
        }

        let stats_interval = match self.settings.stats_interval {
            0 => None,
            secs => Some(Duration::from_secs(secs as u64)),
        };

        let mut workers = Vec::with_capacity(by_core.len());
        for (idx, (core, rx_ports)) in by_core.into_iter().enumerate() {
            let config = WorkerConfig {
                core,
                burst_size: self.settings.burst_size,
                drain_interval: Duration::from_micros(self.settings.drain_interval_us),
                link_poll_interval: Duration::from_millis(self.settings.link_poll_ms),
                // The lowest core prints
                stats_interval: if idx == 0 { stats_interval } else { None },
            };
            let stats = (idx == 0).then(|| registry.clone());
            let worker = Worker::new(config, self.shared.clone(), rx_ports, &all_ports, stats);

            let worker_cancel = cancel.clone();
            let handle = std::thread::Builder::new()
                .name(format!("worker-{}", core))
                .spawn(move || {
                    pin_to_core(core);
                    worker.run(worker_cancel);
                });

            match handle {
                Ok(handle) => workers.push((core, handle)),
                Err(e) => {
                    // Stop whatever already started before reporting
                    cancel.cancel();
                    for (_, handle) in workers {
                        let _ = handle.join();
                    }
                    return Err(Error::Io(e));
                }
            }
        }

        info!(workers = workers.len(), ports = all_ports.len(), "pipeline started");
        Ok(PipelineHandle { workers, registry })
    }
}

/// Running workers
pub struct PipelineHandle {
    workers: Vec<(usize, JoinHandle<()>)>,
    registry: StatsRegistry,
}

impl PipelineHandle {
    pub fn stats(&self) -> &StatsRegistry {
        &self.registry
    }

    /// Wait for every worker to exit.
    pub fn join(self) {
        for (core, handle) in self.workers {
            if handle.join().is_err() {
                error!(core, "worker panicked");
            }
        }
        info!("pipeline stopped");
    }
}

/// Best-effort CPU affinity for the calling thread
fn pin_to_core(core: usize) {
    if core >= CPU_SET_SIZE {
        warn!(core, "core outside the affinity mask, worker not pinned");
        return;
    }
    let mut set: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe { libc::CPU_SET(core, &mut set) };
    let ret = unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) };
    if ret == 0 {
        debug!(core, "worker pinned");
    } else {
        warn!(core, error = %std::io::Error::last_os_error(), "could not pin worker");
    }
}
