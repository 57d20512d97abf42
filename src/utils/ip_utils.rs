//! IPv4 helpers for interface addresses and subnets.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Prefix length given to an address written without one (class A, `10.0.0.0/8`)
pub const DEFAULT_PREFIX_LEN: u8 = 8;

/// Parse an interface address such as `10.0.0.1/24` or `10.0.0.1`.
///
/// A bare address gets [`DEFAULT_PREFIX_LEN`]. The host bits are preserved,
/// so the result identifies both the interface address and its subnet.
pub fn parse_cidr(value: &str) -> Result<Ipv4Net, String> {
    let value = value.trim();
    match value.split_once('/') {
        Some((addr, len)) => {
            let addr: Ipv4Addr = addr
                .parse()
                .map_err(|_| format!("Invalid IPv4 address '{}'", addr))?;
            let len: u8 = len
                .parse()
                .map_err(|_| format!("Invalid prefix length '{}' in '{}'", len, value))?;
            Ipv4Net::new(addr, len).map_err(|e| format!("Invalid prefix in '{}': {}", value, e))
        }
        None => {
            let addr: Ipv4Addr = value
                .parse()
                .map_err(|_| format!("Invalid IPv4 address '{}'", value))?;
            Ipv4Net::new(addr, DEFAULT_PREFIX_LEN).map_err(|e| e.to_string())
        }
    }
}

/// Subnet an interface address belongs to, e.g. `10.0.0.1/24` -> `10.0.0.0/24`
pub fn subnet_of(addr: &Ipv4Net) -> Ipv4Net {
    addr.trunc()
}

/// Serde adapter for optional interface addresses that accepts bare addresses.
pub mod cidr_opt {
    use super::parse_cidr;
    use ipnet::Ipv4Net;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Ipv4Net>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(net) => serializer.serialize_str(&net.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Ipv4Net>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse_cidr(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
