//! Telemetry: logging setup and packet statistics.

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{Counter, PortStats, ProtocolStats, StatsRegistry, MAX_CORES};
