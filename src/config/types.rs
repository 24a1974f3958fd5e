//! Runtime settings types (settings.toml)

use crate::Error;
use serde::Deserialize;

/// Runtime settings. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub ports: Vec<PortSettings>,
}

impl Settings {
    /// Add a port per interface name, numbered after the existing ports.
    /// Names that are already configured are skipped. Fails once the ids
    /// run past 255.
    pub fn add_interfaces(&mut self, names: &[String]) -> crate::Result<()> {
        let mut next_id = self.ports.iter().map(|p| p.id as usize + 1).max().unwrap_or(0);
        for name in names {
            if self.ports.iter().any(|p| &p.interface == name) {
                continue;
            }
            let id = u8::try_from(next_id).map_err(|_| {
                Error::Settings(format!("interface {}: no port id left after 255", name))
            })?;
            self.ports.push(PortSettings {
                id,
                interface: name.clone(),
                core: None,
            });
            next_id += 1;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSettings {
    /// Frames requested from a port per receive call
    #[serde(default = "default_burst_size")]
    pub burst_size: usize,
    /// Longest time a partial transmit batch may wait
    #[serde(default = "default_drain_interval_us")]
    pub drain_interval_us: u64,
    #[serde(default = "default_link_poll_ms")]
    pub link_poll_ms: u64,
    /// Seconds between statistics blocks; 0 disables them
    #[serde(default)]
    pub stats_interval: u16,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Bytes reserved in front of every received frame for header pushes
    #[serde(default = "default_headroom")]
    pub headroom: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            burst_size: default_burst_size(),
            drain_interval_us: default_drain_interval_us(),
            link_poll_ms: default_link_poll_ms(),
            stats_interval: 0,
            pool_size: default_pool_size(),
            headroom: default_headroom(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortSettings {
    pub id: u8,
    pub interface: String,
    /// Worker core; assigned automatically when absent
    #[serde(default)]
    pub core: Option<usize>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_burst_size() -> usize {
    32
}

fn default_drain_interval_us() -> u64 {
    100
}

fn default_link_poll_ms() -> u64 {
    100
}

fn default_pool_size() -> usize {
    crate::port::DEFAULT_POOL_SIZE
}

fn default_headroom() -> usize {
    crate::port::DEFAULT_HEADROOM
}
