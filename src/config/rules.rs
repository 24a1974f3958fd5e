//! Rule file parsing
//!
//! One rule per line:
//!
//! ```text
//! <port>,<PROTOCOL> : <action>[;<action>]*
//! ```
//!
//! Whitespace anywhere in a line is ignored. Blank lines and lines starting
//! with `#` are skipped but still counted for error reporting. Integers are
//! decimal or `0x` hex. Action keywords may be written with `_` or `-`
//! (`PUSH_VLAN` / `PUSH-VLAN`). A trailing `;` after the last action is
//! allowed.
//!
//! Any error aborts the whole load; a partially loaded table is never
//! returned.

use crate::dataplane::Action;
use crate::port::PortId;
use crate::protocol::{EtherType, MplsLabel, VlanTag};
use crate::sniffer::Protocol;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Reason a rule line was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("missing ':' between rule key and actions")]
    MissingColon,

    #[error("missing ',' between port and protocol")]
    MissingComma,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unknown protocol '{0}'")]
    UnknownProtocol(String),

    #[error("{field} {value} out of range")]
    OutOfRange { field: &'static str, value: u64 },

    #[error("rule for port {port} {protocol} already defined on line {first_line}")]
    DuplicateKey {
        port: PortId,
        protocol: Protocol,
        first_line: usize,
    },

    #[error("action list is empty")]
    EmptyActions,

    #[error("empty action between ';'")]
    EmptyAction,

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("malformed {keyword} action '{text}'")]
    Malformed { keyword: &'static str, text: String },

    #[error("{keyword} takes {expected} arguments, got {got}")]
    ArgumentCount {
        keyword: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{next} may not follow {prev}")]
    Order {
        prev: &'static str,
        next: &'static str,
    },
}

type RuleResult<T> = std::result::Result<T, RuleError>;

/// Lookup key: ingress port in the low byte, protocol in the high byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleKey(u16);

impl RuleKey {
    pub fn new(port: PortId, protocol: Protocol) -> Self {
        Self(port as u16 | (protocol as u16) << 8)
    }

    pub fn port(&self) -> PortId {
        (self.0 & 0xFF) as PortId
    }

    pub fn raw(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Immutable mapping from (port, protocol) to an ordered action list
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<RuleKey, Vec<Action>>,
}

impl RuleTable {
    /// Parse a whole rule file.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rules = HashMap::new();
        let mut defined_on: HashMap<RuleKey, usize> = HashMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            if compact.is_empty() || compact.starts_with('#') {
                continue;
            }

            let wrap = |source| Error::Rule { line, source };
            let (port, protocol, actions) = parse_line(&compact).map_err(wrap)?;

            let key = RuleKey::new(port, protocol);
            if let Some(&first_line) = defined_on.get(&key) {
                return Err(wrap(RuleError::DuplicateKey {
                    port,
                    protocol,
                    first_line,
                }));
            }

            debug!(line, port, %protocol, actions = ?actions, "rule parsed");
            defined_on.insert(key, line);
            rules.insert(key, actions);
        }

        Ok(Self { rules })
    }

    pub fn get(&self, key: RuleKey) -> Option<&[Action]> {
        self.rules.get(&key).map(Vec::as_slice)
    }

    pub fn lookup(&self, port: PortId, protocol: Protocol) -> Option<&[Action]> {
        self.get(RuleKey::new(port, protocol))
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Ports named by OUTPUT actions
    pub fn output_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        self.rules.values().flatten().filter_map(|action| match action {
            Action::Output { port } => Some(*port),
            _ => None,
        })
    }
}

fn parse_line(line: &str) -> RuleResult<(PortId, Protocol, Vec<Action>)> {
    let (key, actions) = line.split_once(':').ok_or(RuleError::MissingColon)?;
    let (port, protocol) = key.split_once(',').ok_or(RuleError::MissingComma)?;

    let port = parse_bounded(port, "port", u8::MAX as u64)? as PortId;
    let protocol = Protocol::from_name(protocol)
        .ok_or_else(|| RuleError::UnknownProtocol(protocol.to_string()))?;

    Ok((port, protocol, parse_actions(actions)?))
}

fn parse_actions(text: &str) -> RuleResult<Vec<Action>> {
    let text = text.strip_suffix(';').unwrap_or(text);
    if text.is_empty() {
        return Err(RuleError::EmptyActions);
    }

    let actions = text
        .split(';')
        .map(parse_action)
        .collect::<RuleResult<Vec<_>>>()?;

    for pair in actions.windows(2) {
        if pair[1].priority() < pair[0].priority() {
            return Err(RuleError::Order {
                prev: pair[0].keyword(),
                next: pair[1].keyword(),
            });
        }
    }

    Ok(actions)
}

fn parse_action(text: &str) -> RuleResult<Action> {
    if text.is_empty() {
        return Err(RuleError::EmptyAction);
    }

    let (name, args) = match text.split_once('(') {
        Some((name, rest)) => (name, Some(rest)),
        None => (text, None),
    };
    let name = name.replace('-', "_");

    match (name.as_str(), args) {
        ("DROP", None) => Ok(Action::Drop),
        ("PUSH_VLAN", Some(args)) => {
            let args = arguments(args, "PUSH_VLAN", text)?;
            parse_vlan(&args).map(Action::PushVlan)
        }
        ("PUSH_MPLS", Some(args)) => {
            let args = arguments(args, "PUSH_MPLS", text)?;
            parse_mpls(&args)
        }
        ("OUTPUT", Some(args)) => {
            let args = arguments(args, "OUTPUT", text)?;
            match args.as_slice() {
                [port] => Ok(Action::Output {
                    port: parse_bounded(port, "output port", u8::MAX as u64)? as PortId,
                }),
                _ => Err(RuleError::ArgumentCount {
                    keyword: "OUTPUT",
                    expected: "1",
                    got: args.len(),
                }),
            }
        }
        ("DROP", Some(_)) => Err(RuleError::Malformed {
            keyword: "DROP",
            text: text.to_string(),
        }),
        _ => Err(RuleError::UnknownAction(text.to_string())),
    }
}

/// Split `a,b,c)` into its arguments; the closing parenthesis must end the
/// action.
fn arguments<'a>(rest: &'a str, keyword: &'static str, text: &str) -> RuleResult<Vec<&'a str>> {
    let inner = rest
        .strip_suffix(')')
        .filter(|inner| !inner.contains(['(', ')']))
        .ok_or_else(|| RuleError::Malformed {
            keyword,
            text: text.to_string(),
        })?;
    Ok(inner.split(',').collect())
}

fn parse_vlan(args: &[&str]) -> RuleResult<VlanTag> {
    let tag = match args {
        [tpid, pcp, cfi, vid] => VlanTag {
            tpid: parse_bounded(tpid, "vlan tpid", u16::MAX as u64)? as u16,
            pcp: parse_bounded(pcp, "vlan pcp", 7)? as u8,
            cfi: parse_bounded(cfi, "vlan cfi", 1)? as u8,
            vid: parse_bounded(vid, "vlan vid", VlanTag::MAX_VID as u64)? as u16,
        },
        [raw] => VlanTag::from_u32(parse_bounded(raw, "vlan tag", u32::MAX as u64)? as u32),
        _ => {
            return Err(RuleError::ArgumentCount {
                keyword: "PUSH_VLAN",
                expected: "1 or 4",
                got: args.len(),
            })
        }
    };

    if !EtherType::is_vlan_tpid(tag.tpid) {
        return Err(RuleError::OutOfRange {
            field: "vlan tpid",
            value: tag.tpid as u64,
        });
    }
    if tag.vid > VlanTag::MAX_VID {
        return Err(RuleError::OutOfRange {
            field: "vlan vid",
            value: tag.vid as u64,
        });
    }
    Ok(tag)
}

fn parse_mpls(args: &[&str]) -> RuleResult<Action> {
    match args {
        [label, exp, ttl] => Ok(Action::PushMpls {
            label: parse_bounded(label, "mpls label", MplsLabel::MAX_LABEL as u64)? as u32,
            exp: parse_bounded(exp, "mpls exp", 7)? as u8,
            ttl: parse_bounded(ttl, "mpls ttl", u8::MAX as u64)? as u8,
        }),
        [raw] => {
            let entry =
                MplsLabel::from_u32(parse_bounded(raw, "mpls label", u32::MAX as u64)? as u32);
            Ok(Action::PushMpls {
                label: entry.label,
                exp: entry.exp,
                ttl: entry.ttl,
            })
        }
        _ => Err(RuleError::ArgumentCount {
            keyword: "PUSH_MPLS",
            expected: "1 or 3",
            got: args.len(),
        }),
    }
}

fn parse_int(text: &str) -> RuleResult<u64> {
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse::<u64>(),
    };
    parsed.map_err(|_| RuleError::InvalidNumber(text.to_string()))
}

fn parse_bounded(text: &str, field: &'static str, max: u64) -> RuleResult<u64> {
    let value = parse_int(text)?;
    if value > max {
        return Err(RuleError::OutOfRange { field, value });
    }
    Ok(value)
}
