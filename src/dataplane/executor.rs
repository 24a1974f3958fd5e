//! Action execution
//!
//! Applies a validated action list to one prepared frame. Header pushes
//! mutate the frame in place, growing it into its headroom; OUTPUT hands a
//! copy of the frame, as it is at that point, to an [`OutputSink`]. The
//! frame itself always stays with the caller, which frees it afterwards.

use super::Action;
use crate::port::{Mbuf, MbufPool, PortId};
use crate::protocol::ethernet::{MAC_HEADER_LEN, MIN_HEADER_SIZE};
use crate::protocol::{EtherType, MplsLabel, VlanTag};
use crate::{Error, Result};
use tracing::{debug, warn};

/// Destination for frames produced by OUTPUT actions
pub trait OutputSink {
    fn enqueue(&mut self, port: PortId, m: Mbuf);
}

impl OutputSink for Vec<(PortId, Mbuf)> {
    fn enqueue(&mut self, port: PortId, m: Mbuf) {
        self.push((port, m));
    }
}

/// What became of a frame's action list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A DROP action ended the list
    Dropped,
    /// Every action ran; `outputs` copies were handed to the sink
    Completed { outputs: usize },
}

/// Run `actions` in order against `m`.
///
/// A push that cannot be applied is logged and skipped; the remaining
/// actions still run on the unmodified frame.
pub fn execute<S: OutputSink>(
    m: &mut Mbuf,
    actions: &[Action],
    pool: &MbufPool,
    sink: &mut S,
) -> Verdict {
    let mut outputs = 0;
    for action in actions {
        match *action {
            Action::Drop => return Verdict::Dropped,
            Action::PushVlan(tag) => {
                if let Err(e) = push_vlan(m, tag) {
                    warn!(error = %e, vid = tag.vid, "VLAN push skipped");
                }
            }
            Action::PushMpls { label, exp, ttl } => {
                if let Err(e) = push_mpls(m, label, exp, ttl) {
                    warn!(error = %e, label, "MPLS push skipped");
                }
            }
            Action::Output { port } => match pool.alloc_copy(m) {
                Ok(copy) => {
                    sink.enqueue(port, copy);
                    outputs += 1;
                }
                Err(e) => debug!(error = %e, port, "output copy failed"),
            },
        }
    }
    Verdict::Completed { outputs }
}

/// Insert `tag` right after the MAC addresses, making it the outermost tag.
///
/// Needs 4 bytes of headroom. On success `l2_len` grows by 4.
pub fn push_vlan(m: &mut Mbuf, tag: VlanTag) -> Result<()> {
    if m.pkt_len() < MAC_HEADER_LEN {
        return Err(Error::InvalidPacket("frame shorter than MAC header"));
    }

    m.prepend(VlanTag::LEN)?;
    let data = m.data_mut();
    data.copy_within(VlanTag::LEN..VlanTag::LEN + MAC_HEADER_LEN, 0);
    data[MAC_HEADER_LEN..MAC_HEADER_LEN + VlanTag::LEN].copy_from_slice(&tag.to_bytes());

    m.l2_len += VlanTag::LEN as u16;
    Ok(())
}

/// Insert a label stack entry between the Ethernet header (VLAN tags
/// included) and the network header, and set the EtherType to MPLS unicast.
///
/// The entry is marked bottom of stack unless the frame already carries
/// MPLS. Needs 4 bytes of headroom and a prepared `l2_len`. On success
/// `mpls_len` grows by 4; `l2_len` is unchanged.
pub fn push_mpls(m: &mut Mbuf, label: u32, exp: u8, ttl: u8) -> Result<()> {
    let l2_len = m.l2_len as usize;
    if l2_len < MIN_HEADER_SIZE || l2_len > m.pkt_len() {
        return Err(Error::InvalidPacket("Ethernet header length not set"));
    }

    let ethertype = u16::from_be_bytes([m.data()[l2_len - 2], m.data()[l2_len - 1]]);
    let entry = MplsLabel {
        label,
        exp,
        bos: !EtherType::is_mpls(ethertype),
        ttl,
    };

    m.prepend(MplsLabel::LEN)?;
    let data = m.data_mut();
    data.copy_within(MplsLabel::LEN..MplsLabel::LEN + l2_len, 0);
    data[l2_len..l2_len + MplsLabel::LEN].copy_from_slice(&entry.to_bytes());
    data[l2_len - 2..l2_len].copy_from_slice(&(EtherType::MplsUnicast as u16).to_be_bytes());

    m.mpls_len += MplsLabel::LEN as u16;
    Ok(())
}
