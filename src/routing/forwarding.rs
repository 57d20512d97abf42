//! Static forwarding analysis.
//!
//! Mirrors what the kernel does with the installed table: longest prefix
//! first, then lowest metric, ignoring routes whose egress link or next hop
//! is cut off. Lets path and failover properties be checked without
//! bringing up a single namespace.

use super::table::{RouteError, RouteTable};
use crate::topology::{Interface, NodeRole, Topology};
use crate::utils::ip_utils::subnet_of;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Hop limit for [`trace`]
pub const MAX_HOPS: usize = 16;

/// Set of failed links, identified by the nodes they join
#[derive(Debug, Clone, Default)]
pub struct LinkFailures {
    down: BTreeSet<(String, String)>,
}

impl LinkFailures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the link between `a` and `b` as down
    pub fn fail(&mut self, a: &str, b: &str) -> &mut Self {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        self.down.insert(key);
        self
    }

    /// Returns true if link `index` of `topology` is down
    pub fn is_down(&self, topology: &Topology, index: usize) -> bool {
        topology
            .links
            .get(index)
            .map(|l| self.down.iter().any(|(a, b)| l.connects(a, b)))
            .unwrap_or(true)
    }
}

/// Forwarding decision for one destination on one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextHop {
    /// Destination sits on a directly attached subnet
    Direct { dev: String },
    /// Hand the packet to a gateway
    Gateway { via: Ipv4Addr, dev: String, metric: u32 },
}

impl NextHop {
    pub fn dev(&self) -> &str {
        match self {
            Self::Direct { dev } | Self::Gateway { dev, .. } => dev,
        }
    }
}

/// Choose the route `node` uses towards `destination`.
///
/// Candidates are the node's connected subnets (metric 0), its default
/// route (prefix length 0) and its static table entries.
pub fn lookup(
    topology: &Topology,
    table: &RouteTable,
    node: &str,
    destination: Ipv4Addr,
    failures: &LinkFailures,
) -> Option<NextHop> {
    let link_up = |index: usize| !failures.is_down(topology, index);
    let reachable = |iface: &Interface, via: Ipv4Addr| {
        topology
            .segment(iface, link_up)
            .iter()
            .any(|peer| peer.address.map(|a| a.addr()) == Some(via))
    };

    let mut candidates: Vec<(u8, u32, NextHop)> = Vec::new();

    for (subnet, iface) in topology.connected_subnets(node) {
        if subnet.contains(&destination) && link_up(iface.link) {
            candidates.push((subnet.prefix_len(), 0, NextHop::Direct { dev: iface.name }));
        }
    }

    if let Some(gateway) = topology.node(node).and_then(|n| n.default_route) {
        let egress = topology
            .interfaces_of(node)
            .into_iter()
            .find(|i| i.address.map(|a| subnet_of(&a).contains(&gateway)).unwrap_or(false));
        if let Some(iface) = egress {
            if reachable(&iface, gateway) {
                candidates.push((
                    0,
                    0,
                    NextHop::Gateway {
                        via: gateway,
                        dev: iface.name,
                        metric: 0,
                    },
                ));
            }
        }
    }

    for entry in table.for_router(node) {
        if !entry.destination.contains(&destination) {
            continue;
        }
        let Some(iface) = topology.interface(node, &entry.dev) else {
            continue;
        };
        if reachable(&iface, entry.via) {
            candidates.push((
                entry.destination.prefix_len(),
                entry.effective_metric(),
                NextHop::Gateway {
                    via: entry.via,
                    dev: entry.dev.clone(),
                    metric: entry.effective_metric(),
                },
            ));
        }
    }

    candidates
        .into_iter()
        .min_by_key(|(prefix_len, metric, _)| (std::cmp::Reverse(*prefix_len), *metric))
        .map(|(_, _, hop)| hop)
}

/// Follow forwarding decisions from `source` until `destination` is reached.
///
/// Returns the nodes visited, switches excluded, starting with `source`.
/// Only the source and routers forward; a packet handed to any other node
/// that does not own the destination is dropped.
pub fn trace(
    topology: &Topology,
    table: &RouteTable,
    source: &str,
    destination: Ipv4Addr,
    failures: &LinkFailures,
) -> Result<Vec<String>, RouteError> {
    let link_up = |index: usize| !failures.is_down(topology, index);
    let no_route = |node: &str| RouteError::NoRoute {
        node: node.to_string(),
        destination,
    };

    let mut path = vec![source.to_string()];
    let mut current = source.to_string();

    for _ in 0..MAX_HOPS {
        let owns = topology
            .interfaces_of(&current)
            .iter()
            .any(|i| i.address.map(|a| a.addr()) == Some(destination));
        if owns {
            return Ok(path);
        }
        if current != source && topology.role_of(&current) != Some(NodeRole::Router) {
            return Err(no_route(&current));
        }

        let hop = lookup(topology, table, &current, destination, failures).ok_or_else(|| no_route(&current))?;
        let target = match &hop {
            NextHop::Direct { .. } => destination,
            NextHop::Gateway { via, .. } => *via,
        };
        let iface = topology
            .interface(&current, hop.dev())
            .ok_or_else(|| no_route(&current))?;
        let next = topology
            .segment(&iface, link_up)
            .into_iter()
            .find(|peer| peer.address.map(|a| a.addr()) == Some(target))
            .ok_or_else(|| no_route(&current))?;

        log::trace!("{} -> {} via {}", current, next.node, hop.dev());
        path.push(next.node.clone());
        current = next.node;
    }

    Err(RouteError::ForwardingLoop {
        origin: source.to_string(),
        destination,
    })
}
