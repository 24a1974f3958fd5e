//! Network protocol headers
//!
//! Just enough of each layer to walk from the Ethernet header to the
//! application payload without copying.

pub mod builder;
pub mod ethernet;
pub mod ipv4;
pub mod ipv6;
pub mod tcp;
pub mod types;
pub mod udp;

pub use builder::FrameBuilder;
pub use ipv4::IpProtocol;
pub use types::*;
