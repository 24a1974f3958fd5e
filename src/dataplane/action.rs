//! Rule actions
//!
//! Every action belongs to a priority class. Within one action list the
//! classes must not decrease: drop first, then header pushes, then outputs.
//! VLAN and MPLS pushes share a class, so they may appear in either order.

use crate::port::PortId;
use crate::protocol::VlanTag;
use std::fmt;

/// One step of a rule's action list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Dispose of the frame; nothing after it runs
    Drop,
    /// Insert a tag right after the MAC addresses, as the outermost tag
    PushVlan(VlanTag),
    /// Insert a label stack entry after the Ethernet header. The bottom of
    /// stack bit is derived from the frame at push time.
    PushMpls { label: u32, exp: u8, ttl: u8 },
    /// Transmit a copy of the frame as it is at this point
    Output { port: PortId },
}

impl Action {
    /// Ordering class; lists must be non-decreasing in it
    pub fn priority(&self) -> u8 {
        match self {
            Action::Drop => 0,
            Action::PushVlan(_) | Action::PushMpls { .. } => 1,
            Action::Output { .. } => 2,
        }
    }

    /// Rule-file keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            Action::Drop => "DROP",
            Action::PushVlan(_) => "PUSH_VLAN",
            Action::PushMpls { .. } => "PUSH_MPLS",
            Action::Output { .. } => "OUTPUT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Drop => write!(f, "DROP"),
            Action::PushVlan(tag) => write!(
                f,
                "PUSH_VLAN({:#06x},{},{},{})",
                tag.tpid, tag.pcp, tag.cfi, tag.vid
            ),
            Action::PushMpls { label, exp, ttl } => {
                write!(f, "PUSH_MPLS({},{},{})", label, exp, ttl)
            }
            Action::Output { port } => write!(f, "OUTPUT({})", port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities() {
        let vlan = Action::PushVlan(VlanTag::new(10));
        let mpls = Action::PushMpls {
            label: 16,
            exp: 0,
            ttl: 64,
        };
        assert!(Action::Drop.priority() < vlan.priority());
        assert_eq!(vlan.priority(), mpls.priority());
        assert!(mpls.priority() < Action::Output { port: 1 }.priority());
    }

    #[test]
    fn test_display_uses_rule_syntax() {
        let tag = VlanTag {
            tpid: 0x8100,
            pcp: 2,
            cfi: 0,
            vid: 100,
        };
        assert_eq!(Action::PushVlan(tag).to_string(), "PUSH_VLAN(0x8100,2,0,100)");
        assert_eq!(
            Action::PushMpls {
                label: 65793,
                exp: 3,
                ttl: 64
            }
            .to_string(),
            "PUSH_MPLS(65793,3,64)"
        );
        assert_eq!(Action::Output { port: 7 }.to_string(), "OUTPUT(7)");
        assert_eq!(Action::Drop.to_string(), "DROP");
    }
}
