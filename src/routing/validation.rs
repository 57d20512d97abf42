//! Static checks of a route table against its topology.
//!
//! Everything here runs before any command reaches a router, so a broken
//! table is rejected instead of leaving a router silently without a route.

use super::table::{RouteEntry, RouteError, RouteTable};
use crate::topology::{NodeRole, Topology};
use ipnet::Ipv4Net;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Validate a route table against a topology.
///
/// Checks, in order: every entry individually ([`validate_entry`]), no
/// duplicate (router, destination, metric) triples, metric ordering
/// ([`check_metric_order`]) and completeness ([`missing_routes`]).
pub fn validate_route_table(topology: &Topology, table: &RouteTable) -> Result<(), RouteError> {
    for entry in table {
        validate_entry(topology, entry)?;
    }

    let mut seen = HashSet::new();
    for entry in table {
        if !seen.insert((entry.router.as_str(), entry.destination, entry.effective_metric())) {
            return Err(RouteError::DuplicateRoute {
                router: entry.router.clone(),
                destination: entry.destination,
                metric: entry.effective_metric(),
            });
        }
    }

    check_metric_order(topology, table)?;

    if let Some((router, destination)) = missing_routes(topology, table).into_iter().next() {
        return Err(RouteError::MissingRoute { router, destination });
    }

    let routers = topology.routers().count();
    log::debug!(
        "Route table valid: {} entries across {} routers",
        table.len(),
        routers
    );
    Ok(())
}

/// Check one entry: router role, own egress interface, adjacent next hop.
pub fn validate_entry(topology: &Topology, entry: &RouteEntry) -> Result<(), RouteError> {
    match topology.role_of(&entry.router) {
        None => return Err(RouteError::UnknownRouter(entry.router.clone())),
        Some(NodeRole::Router) => {}
        Some(_) => return Err(RouteError::NotARouter(entry.router.clone())),
    }

    if !entry.has_network_destination() {
        return Err(RouteError::HostBitsSet {
            router: entry.router.clone(),
            destination: entry.destination,
        });
    }

    let iface = topology
        .interface(&entry.router, &entry.dev)
        .ok_or_else(|| RouteError::ForeignInterface {
            router: entry.router.clone(),
            dev: entry.dev.clone(),
        })?;

    if topology
        .connected_subnets(&entry.router)
        .iter()
        .any(|(subnet, _)| *subnet == entry.destination)
    {
        return Err(RouteError::DirectlyConnected {
            router: entry.router.clone(),
            destination: entry.destination,
        });
    }

    let adjacent = topology
        .segment(&iface, |_| true)
        .iter()
        .any(|peer| peer.address.map(|a| a.addr()) == Some(entry.via));
    if !adjacent {
        return Err(RouteError::NextHopNotAdjacent {
            router: entry.router.clone(),
            via: entry.via,
            dev: entry.dev.clone(),
        });
    }

    Ok(())
}

/// Subnets each router can reach neither directly nor through the table.
///
/// Covers every access and transit subnet of the topology. Returns
/// `(router, subnet)` pairs in router then subnet order.
pub fn missing_routes(topology: &Topology, table: &RouteTable) -> Vec<(String, Ipv4Net)> {
    let subnets: BTreeSet<Ipv4Net> = topology
        .access_subnets()
        .into_keys()
        .chain(topology.transit_subnets().into_keys())
        .collect();

    let mut missing = Vec::new();
    for router in topology.routers() {
        let connected: BTreeSet<Ipv4Net> = topology
            .connected_subnets(&router.name)
            .into_iter()
            .map(|(subnet, _)| subnet)
            .collect();

        for subnet in &subnets {
            if connected.contains(subnet) {
                continue;
            }
            let covered = table.for_router(&router.name).any(|e| covers(&e.destination, subnet));
            if !covered {
                missing.push((router.name.clone(), *subnet));
            }
        }
    }
    missing
}

/// Returns true if `route` matches every address of `subnet`
fn covers(route: &Ipv4Net, subnet: &Ipv4Net) -> bool {
    route.prefix_len() <= subnet.prefix_len() && route.contains(&subnet.network())
}

/// Router hops from an entry's next hop to the nearest router on its destination.
///
/// `None` when no router on the destination is reachable from the next hop.
pub fn next_hop_distance(topology: &Topology, entry: &RouteEntry) -> Option<usize> {
    let next = topology.owner_of(entry.via)?;
    let hops = topology.router_hops(&next.node);
    topology
        .routers_on(&entry.destination)
        .iter()
        .filter_map(|r| hops.get(r).copied())
        .min()
}

/// Where two entries share (router, destination), the entry whose next hop is
/// strictly closer to the destination must carry the strictly lower metric.
pub fn check_metric_order(topology: &Topology, table: &RouteTable) -> Result<(), RouteError> {
    let mut groups: BTreeMap<(&str, Ipv4Net), Vec<&RouteEntry>> = BTreeMap::new();
    for entry in table {
        groups
            .entry((entry.router.as_str(), entry.destination))
            .or_default()
            .push(entry);
    }

    for ((router, destination), entries) in groups {
        if entries.len() < 2 {
            continue;
        }
        let ranked: Vec<(usize, &RouteEntry)> = entries
            .iter()
            .map(|e| (next_hop_distance(topology, e).unwrap_or(usize::MAX), *e))
            .collect();

        for (d_a, a) in &ranked {
            for (d_b, b) in &ranked {
                if d_a < d_b && a.effective_metric() >= b.effective_metric() {
                    return Err(RouteError::MetricOrder {
                        router: router.to_string(),
                        destination,
                        shorter: a.via,
                        longer: b.via,
                    });
                }
            }
        }
    }

    Ok(())
}
