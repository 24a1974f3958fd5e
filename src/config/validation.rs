//! Settings validation

use super::Settings;
use std::collections::HashSet;

/// Largest receive burst a worker will request
pub const MAX_BURST_SIZE: usize = 512;

/// Cores at or above this cannot be expressed in a CPU affinity mask
pub const CPU_SET_SIZE: usize = libc::CPU_SETSIZE as usize;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate settings and return warnings/errors
pub fn validate(settings: &Settings) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_pipeline(settings, &mut result);
    validate_ports(settings, &mut result);

    result
}

fn validate_pipeline(settings: &Settings, result: &mut ValidationResult) {
    let pipeline = &settings.pipeline;

    if pipeline.burst_size == 0 || pipeline.burst_size > MAX_BURST_SIZE {
        result.error(format!(
            "pipeline.burst_size: {} is outside 1..={}",
            pipeline.burst_size, MAX_BURST_SIZE
        ));
    }

    // A VLAN or MPLS push needs 4 bytes in front of the frame
    if pipeline.headroom < 4 {
        result.error(format!(
            "pipeline.headroom: {} leaves no room for a header push",
            pipeline.headroom
        ));
    }

    if pipeline.pool_size < pipeline.burst_size {
        result.warn(format!(
            "pipeline.pool_size: {} buffers cannot hold one burst of {}",
            pipeline.pool_size, pipeline.burst_size
        ));
    }

    if pipeline.drain_interval_us == 0 {
        result.warn("pipeline.drain_interval_us: 0 flushes transmit batches on every poll");
    }
}

fn validate_ports(settings: &Settings, result: &mut ValidationResult) {
    if settings.ports.is_empty() {
        result.error("ports: no ports defined");
        return;
    }

    let mut ids = HashSet::new();
    let mut interfaces = HashSet::new();
    let mut cores = HashSet::new();

    for port in &settings.ports {
        if !ids.insert(port.id) {
            result.error(format!("ports: duplicate port id {}", port.id));
        }
        if !interfaces.insert(port.interface.as_str()) {
            result.error(format!(
                "ports.{}: interface {} is already used",
                port.id, port.interface
            ));
        }
        if let Some(core) = port.core {
            if core >= CPU_SET_SIZE {
                result.error(format!(
                    "ports.{}: core {} is beyond the affinity mask ({} cores)",
                    port.id, core, CPU_SET_SIZE
                ));
            }
            if core == 0 {
                result.warn(format!(
                    "ports.{}: core 0 is shared with the supervisor thread",
                    port.id
                ));
            }
            if !cores.insert(core) {
                result.error(format!("ports.{}: core {} is already used", port.id, core));
            }
        }
    }
}
