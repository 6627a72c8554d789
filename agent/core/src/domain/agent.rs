// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Identity
//!
//! Value objects naming an agent and its discrete clock.
//!
//! - [`AgentId`]: integer identifier assigned by the transport (or by
//!   configuration), immutable for the process lifetime.
//! - [`Tick`]: the agent's internal second counter, used as the belief
//!   timestamp on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Unique integer identifier of an agent within the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Derive a 16-bit identifier from a network address.
    ///
    /// IPv4 uses the two low octets, IPv6 the two low bytes. This mirrors the
    /// short hardware address a radio module would expose.
    pub fn from_ip(ip: IpAddr) -> Self {
        let low = match ip {
            IpAddr::V4(v4) => {
                let o = v4.octets();
                u16::from_be_bytes([o[2], o[3]])
            }
            IpAddr::V6(v6) => {
                let o = v6.octets();
                u16::from_be_bytes([o[14], o[15]])
            }
        };
        Self(u32::from(low))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

/// Discrete time step of an agent. Advances once per elapsed second.
pub type Tick = u64;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_id_from_ipv4_uses_low_octets() {
        let id = AgentId::from_ip(IpAddr::V4(Ipv4Addr::new(10, 3, 1, 2)));
        assert_eq!(id, AgentId(0x0102));
    }

    #[test]
    fn test_id_from_ipv6_uses_low_bytes() {
        let id = AgentId::from_ip(IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0x00ff)));
        assert_eq!(id, AgentId(0xff));
    }

    #[test]
    fn test_parse_and_display() {
        let id: AgentId = "513".parse().unwrap();
        assert_eq!(id.to_string(), "513");
        assert!("abc".parse::<AgentId>().is_err());
    }
}
