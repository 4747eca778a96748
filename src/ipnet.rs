// file: src/ipnet.rs
// version: 1.0.0
// guid: 8b1d4e6a-2c3f-4a97-b5e0-9d7c1f2a6e58

//! CIDR network type used by every network field of the install-config.
//!
//! `IpNet` serializes to and from its CIDR string form (`10.0.0.0/16`,
//! `fd00::/48`). Parsing through [`IpNet::parse_cidr`] yields the network
//! address, while deserialization keeps the address exactly as written so
//! that a document survives a load/save cycle unchanged.

use crate::error::{InstallError, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IP network: an address plus a prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNet {
    addr: IpAddr,
    prefix_len: u8,
}

impl IpNet {
    /// Create a network from an address and prefix length
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self> {
        let max = max_prefix(&addr);
        if prefix_len > max {
            return Err(InstallError::config(format!(
                "invalid prefix length {} for {} (maximum {})",
                prefix_len, addr, max
            )));
        }
        Ok(Self { addr, prefix_len })
    }

    /// IPv4 network literal for defaults known at compile time
    pub const fn v4(a: u8, b: u8, c: u8, d: u8, prefix_len: u8) -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::new(a, b, c, d)),
            prefix_len,
        }
    }

    /// Parse a CIDR string and return the network it denotes (host bits cleared)
    pub fn parse_cidr(s: &str) -> Result<Self> {
        let (addr, prefix_len) = parse_parts(s)?;
        Ok(Self { addr, prefix_len }.network())
    }

    /// The address as written
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of leading one bits in the mask and the total bits of the address
    pub fn mask_size(&self) -> (u8, u8) {
        (self.prefix_len, max_prefix(&self.addr))
    }

    /// Total bits of the address family (32 or 128)
    pub fn bits(&self) -> u8 {
        max_prefix(&self.addr)
    }

    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.addr.is_ipv6()
    }

    /// The same network with host bits cleared
    pub fn network(&self) -> Self {
        Self {
            addr: mask_addr(self.addr, self.prefix_len),
            prefix_len: self.prefix_len,
        }
    }

    /// Whether `ip` falls inside this network
    pub fn contains(&self, ip: &IpAddr) -> bool {
        if ip.is_ipv4() != self.addr.is_ipv4() {
            return false;
        }
        mask_addr(*ip, self.prefix_len) == mask_addr(self.addr, self.prefix_len)
    }

    /// Whether the two networks share at least one address
    pub fn overlaps(&self, other: &IpNet) -> bool {
        if self.is_ipv4() != other.is_ipv4() {
            return false;
        }
        self.contains(&other.network().addr) || other.contains(&self.network().addr)
    }

    /// The `n`-th address counting from the network address, if it is inside the network
    pub fn nth_host(&self, n: u128) -> Option<IpAddr> {
        let host_bits = u32::from(self.bits() - self.prefix_len);
        if host_bits < 128 && n >= (1u128 << host_bits) {
            return None;
        }
        match self.network().addr {
            IpAddr::V4(v4) => {
                let base = u128::from(u32::from(v4));
                u32::try_from(base + n)
                    .ok()
                    .map(|v| IpAddr::V4(Ipv4Addr::from(v)))
            }
            IpAddr::V6(v6) => u128::from(v6)
                .checked_add(n)
                .map(|v| IpAddr::V6(Ipv6Addr::from(v))),
        }
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask_addr(addr: IpAddr, prefix_len: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let mask = if prefix_len == 0 {
                0
            } else {
                u32::MAX << (32 - u32::from(prefix_len))
            };
            IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
        }
        IpAddr::V6(v6) => {
            let mask = if prefix_len == 0 {
                0
            } else {
                u128::MAX << (128 - u32::from(prefix_len))
            };
            IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
        }
    }
}

fn parse_parts(s: &str) -> Result<(IpAddr, u8)> {
    let invalid = || InstallError::config(format!("invalid CIDR address: {}", s));

    let (addr, prefix) = s.split_once('/').ok_or_else(invalid)?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let prefix_len: u8 = prefix.parse().map_err(|_| invalid())?;
    if prefix_len > max_prefix(&addr) {
        return Err(invalid());
    }
    Ok((addr, prefix_len))
}

impl fmt::Display for IpNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl FromStr for IpNet {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_cidr(s)
    }
}

impl Serialize for IpNet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct IpNetVisitor;

impl<'de> Visitor<'de> for IpNetVisitor {
    type Value = IpNet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a CIDR string such as 10.0.0.0/16")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<IpNet, E> {
        let (addr, prefix_len) = parse_parts(v)
            .map_err(|e| E::custom(format!("failed to parse cidr string: {}", e)))?;
        Ok(IpNet { addr, prefix_len })
    }
}

impl<'de> Deserialize<'de> for IpNet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_str(IpNetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cidr_clears_host_bits() {
        let net = IpNet::parse_cidr("10.0.1.5/16").unwrap();
        assert_eq!(net.to_string(), "10.0.0.0/16");
        assert_eq!(net.mask_size(), (16, 32));
    }

    #[test]
    fn test_parse_cidr_ipv6() {
        let net: IpNet = "fd01::1/48".parse().unwrap();
        assert_eq!(net.to_string(), "fd01::/48");
        assert!(net.is_ipv6());
        assert_eq!(net.bits(), 128);
    }

    #[test]
    fn test_parse_cidr_rejects_garbage() {
        for bad in ["", "10.0.0.0", "10.0.0.0/", "10.0.0.0/33", "10.0.0.0/+1", "nope/8", "fd00::/129"] {
            assert!(IpNet::parse_cidr(bad).is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_json_round_trip_keeps_address() {
        let net: IpNet = serde_json::from_str("\"192.168.1.7/24\"").unwrap();
        assert_eq!(net.addr().to_string(), "192.168.1.7");

        let encoded = serde_json::to_string(&net).unwrap();
        assert_eq!(encoded, "\"192.168.1.7/24\"");
        let decoded: IpNet = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, net);
    }

    #[test]
    fn test_json_null_is_none() {
        let net: Option<IpNet> = serde_json::from_str("null").unwrap();
        assert!(net.is_none());
        assert_eq!(serde_json::to_string(&net).unwrap(), "null");
    }

    #[test]
    fn test_json_invalid_cidr() {
        let result: std::result::Result<IpNet, _> = serde_json::from_str("\"10.0.0.0/40\"");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("failed to parse cidr string"));
    }

    #[test]
    fn test_contains_and_overlaps() {
        let a = IpNet::parse_cidr("10.128.0.0/14").unwrap();
        let b = IpNet::parse_cidr("10.130.0.0/16").unwrap();
        let c = IpNet::parse_cidr("172.30.0.0/16").unwrap();
        let v6 = IpNet::parse_cidr("fd00::/48").unwrap();

        assert!(a.contains(&"10.131.255.1".parse().unwrap()));
        assert!(!a.contains(&"10.132.0.1".parse().unwrap()));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&v6));
    }

    #[test]
    fn test_nth_host() {
        let net = IpNet::v4(172, 22, 0, 0, 24);
        assert_eq!(net.nth_host(3).unwrap().to_string(), "172.22.0.3");
        assert_eq!(net.nth_host(255).unwrap().to_string(), "172.22.0.255");
        assert!(net.nth_host(256).is_none());

        let v6 = IpNet::parse_cidr("fd2e:6f44:5dd8:b856::/64").unwrap();
        assert_eq!(v6.nth_host(2).unwrap().to_string(), "fd2e:6f44:5dd8:b856::2");
    }

    #[test]
    fn test_new_rejects_long_prefix() {
        assert!(IpNet::new("10.0.0.0".parse().unwrap(), 33).is_err());
        assert!(IpNet::new("10.0.0.0".parse().unwrap(), 8).is_ok());
    }
}
