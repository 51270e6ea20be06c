//! Origin access filter.
//!
//! Coarse, non-cryptographic authorization: a datagram is admitted if its
//! source address is loopback or falls inside one of the allowed prefixes.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Failure parsing a CIDR prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid network prefix {input:?}: {reason}")]
pub struct PrefixParseError {
    pub input: String,
    pub reason: &'static str,
}

/// An IP network in CIDR form, e.g. `192.168.8.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkPrefix {
    network: IpAddr,
    prefix_len: u8,
}

impl NetworkPrefix {
    /// Create a prefix, rejecting lengths longer than the address family allows.
    pub fn new(network: IpAddr, prefix_len: u8) -> Result<Self, PrefixParseError> {
        if prefix_len > max_prefix_len(&network) {
            return Err(PrefixParseError {
                input: format!("{network}/{prefix_len}"),
                reason: "prefix length exceeds address width",
            });
        }
        Ok(Self {
            network,
            prefix_len,
        })
    }

    /// IPv4 prefix; lengths above 32 are clamped.
    #[must_use]
    pub fn from_octets_v4(octets: [u8; 4], prefix_len: u8) -> Self {
        Self {
            network: IpAddr::from(octets),
            prefix_len: prefix_len.min(32),
        }
    }

    #[must_use]
    pub fn network(&self) -> IpAddr {
        self.network
    }

    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Whether `addr` lies inside this network.
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        match (self.network, addr.to_canonical()) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                prefix_matches(&net.octets(), &ip.octets(), self.prefix_len)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                prefix_matches(&net.octets(), &ip.octets(), self.prefix_len)
            }
            // IPv4 and IPv6 addresses are in disjoint address spaces
            _ => false,
        }
    }
}

impl FromStr for NetworkPrefix {
    type Err = PrefixParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| PrefixParseError {
            input: s.to_string(),
            reason,
        };

        let (addr, len) = match s.trim().split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s.trim(), None),
        };

        let network: IpAddr = addr.parse().map_err(|_| err("bad address"))?;
        let prefix_len = match len {
            Some(len) => len.parse::<u8>().map_err(|_| err("bad prefix length"))?,
            // A bare address admits exactly that host.
            None => max_prefix_len(&network),
        };

        Self::new(network, prefix_len).map_err(|e| err(e.reason))
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl<'de> Deserialize<'de> for NetworkPrefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Decides whether a sender may talk to this service at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessFilter {
    allowed: Vec<NetworkPrefix>,
}

impl AccessFilter {
    #[must_use]
    pub fn new(allowed: Vec<NetworkPrefix>) -> Self {
        Self { allowed }
    }

    /// Loopback only.
    #[must_use]
    pub fn loopback_only() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn allowed(&self) -> &[NetworkPrefix] {
        &self.allowed
    }

    /// Loopback is always admitted; anything else must match a prefix.
    #[must_use]
    pub fn permits(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        addr.is_loopback() || self.allowed.iter().any(|prefix| prefix.contains(addr))
    }
}

fn max_prefix_len(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Returns true if the first `prefix_bits` bits of both slices are equal.
fn prefix_matches(a: &[u8], b: &[u8], prefix_bits: u8) -> bool {
    let full_bytes = usize::from(prefix_bits / 8);
    let remaining_bits = prefix_bits % 8;

    if a[..full_bytes] != b[..full_bytes] {
        return false;
    }

    if remaining_bits > 0 {
        let mask = 0xFFu8 << (8 - remaining_bits);
        return (a[full_bytes] & mask) == (b[full_bytes] & mask);
    }

    true
}
