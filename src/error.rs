use crate::config::RuleError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("rule file line {line}: {source}")]
    Rule {
        line: usize,
        #[source]
        source: RuleError,
    },

    #[error("settings error: {0}")]
    Settings(String),

    #[error("not enough headroom: needed {needed} bytes, {available} available")]
    NoHeadroom { needed: usize, available: usize },

    #[error("buffer pool exhausted")]
    PoolExhausted,

    #[error("interface not found: {name}")]
    InterfaceNotFound { name: String },

    #[error("port {port} not found")]
    PortNotFound { port: u8 },

    #[error("no spare core for port {port}")]
    NoCoreForPort { port: u8 },

    #[error("invalid packet: {0}")]
    InvalidPacket(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
