//! Data plane components
//!
//! Per-frame processing (header lengths, actions, execution) and the
//! per-core workers that drive it.

mod action;
mod executor;
mod pipeline;
mod prepare;
mod txbuf;
mod worker;

pub use action::Action;
pub use executor::{execute, push_mpls, push_vlan, OutputSink, Verdict};
pub use pipeline::{assign_cores, Pipeline, PipelineHandle};
pub use prepare::{header_lengths, prepare_packet, HeaderLengths};
pub use txbuf::TxBuffer;
pub use worker::{SharedState, Worker, WorkerConfig};
