//! Configuration management
//!
//! Two inputs: the rule file (line grammar, see [`rules`]) mapping
//! (port, protocol) to action lists, and the optional settings.toml with
//! logging, pipeline and port settings.

pub mod rules;
mod types;
mod validation;

pub use rules::{RuleError, RuleKey, RuleTable};
pub use types::*;
pub use validation::{validate, ValidationResult, CPU_SET_SIZE, MAX_BURST_SIZE};

use crate::{Error, Result};
use std::path::Path;
use tracing::info;

/// Load and parse a rule file
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<RuleTable> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("cannot read rule file {}: {}", path.display(), e))
    })?;
    let table = RuleTable::parse(&content)?;
    info!(path = %path.display(), rules = table.len(), "rule file loaded");
    Ok(table)
}

/// Load settings from a TOML file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    let settings: Settings =
        toml::from_str(&content).map_err(|e| Error::Settings(e.to_string()))?;
    Ok(settings)
}
