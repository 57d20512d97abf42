//! Network topology module.
//!
//! This module contains the topology descriptor types and the builders for
//! the two built-in scenarios: a single-switch LAN and a four-router
//! internetwork.

pub mod types;
pub mod lan;
pub mod routers;

// Re-export key types and functions for easier access
pub use types::{Controller, Interface, Link, Node, NodeRole, Topology, TopologyError};
pub use lan::build_lan_topology;
pub use routers::build_router_topology;

use crate::utils::ip_utils::parse_cidr;
use ipnet::Ipv4Net;

/// Parse a literal address for a builder, mapping failures to [`TopologyError`]
pub(crate) fn cidr(value: &str) -> Result<Ipv4Net, TopologyError> {
    parse_cidr(value).map_err(|reason| TopologyError::InvalidAddress {
        value: value.to_string(),
        reason,
    })
}
