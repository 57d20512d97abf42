//! Four-router internetwork.
//!
//! Each router `rN` anchors access subnet `10.(N-1).0.0/24` through switch
//! `sN` and host `hN`. Routers are joined by four /24 transit links:
//!
//! ```text
//!   h1 - s1 - r1 ---- 10.100 ---- r2 - s2 - h2
//!              |                   |
//!            10.101              10.103
//!              |                   |
//!   h3 - s3 - r3 ---- 10.102 ---- r4 - s4 - h4
//! ```
//!
//! r1 and r4 have no direct link, neither do r2 and r3.

use super::{cidr, Link, Node, Topology, TopologyError};
use std::net::Ipv4Addr;

/// Number of routers (and access subnets)
pub const ROUTER_COUNT: usize = 4;

/// Router-to-router links: (a, a interface, a address, b, b interface, b address)
const TRANSIT_LINKS: [(&str, &str, &str, &str, &str, &str); 4] = [
    ("r1", "r1-eth2", "10.100.0.1/24", "r2", "r2-eth2", "10.100.0.2/24"),
    ("r1", "r1-eth3", "10.101.0.1/24", "r3", "r3-eth2", "10.101.0.2/24"),
    ("r3", "r3-eth3", "10.102.0.1/24", "r4", "r4-eth2", "10.102.0.2/24"),
    ("r2", "r2-eth3", "10.103.0.1/24", "r4", "r4-eth3", "10.103.0.2/24"),
];

/// Build the router topology.
pub fn build_router_topology() -> Result<Topology, TopologyError> {
    let mut topo = Topology::new("routers");

    // Routers own the .1 of their access subnet
    for n in 1..=ROUTER_COUNT {
        let router = format!("r{}", n);
        topo.add_node(Node::router(&router, cidr(&gateway_cidr(n))?))?;
    }

    for n in 1..=ROUTER_COUNT {
        topo.add_node(Node::switch(&format!("s{}", n)))?;
    }

    // Switch-router links in the access subnets
    for n in 1..=ROUTER_COUNT {
        let router = format!("r{}", n);
        topo.add_link(
            Link::new(&format!("s{}", n), &router)
                .interface_b(&format!("{}-eth1", router), Some(cidr(&gateway_cidr(n))?)),
        )?;
    }

    // Router-router links in the transit subnets
    for (a, a_if, a_addr, b, b_if, b_addr) in TRANSIT_LINKS {
        topo.add_link(
            Link::new(a, b)
                .interface_a(a_if, Some(cidr(a_addr)?))
                .interface_b(b_if, Some(cidr(b_addr)?)),
        )?;
    }

    // One host per access subnet, routed through its router
    for n in 1..=ROUTER_COUNT {
        let octet = (n - 1) as u8;
        let host = Node::host(&format!("h{}", n), cidr(&format!("10.{}.0.10/24", octet))?)
            .with_default_route(Ipv4Addr::new(10, octet, 0, 1));
        topo.add_node(host)?;
    }

    for n in 1..=ROUTER_COUNT {
        topo.add_link(Link::new(&format!("h{}", n), &format!("s{}", n)))?;
    }

    Ok(topo)
}

fn gateway_cidr(n: usize) -> String {
    format!("10.{}.0.1/24", n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::NodeRole;

    #[test]
    fn test_router_topology_counts() {
        let topo = build_router_topology().unwrap();
        assert_eq!(topo.routers().count(), 4);
        assert_eq!(topo.switches().count(), 4);
        assert_eq!(topo.hosts().count(), 4);
        assert_eq!(topo.access_subnets().len(), 4);
        assert_eq!(topo.transit_subnets().len(), 4);
        topo.validate().unwrap();
    }

    #[test]
    fn test_router_interfaces_match_declaration() {
        let topo = build_router_topology().unwrap();
        let names: Vec<String> = topo.interfaces_of("r4").into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["r4-eth1", "r4-eth2", "r4-eth3"]);

        let h1 = topo.interfaces_of("h1");
        assert_eq!(h1.len(), 1);
        assert_eq!(h1[0].name, "h1-eth0");
        assert_eq!(h1[0].address.unwrap().to_string(), "10.0.0.10/24");
    }

    #[test]
    fn test_hosts_route_through_their_router() {
        let topo = build_router_topology().unwrap();
        for host in topo.hosts() {
            let gateway = host.default_route.unwrap();
            let owner = topo.owner_of(gateway).unwrap();
            assert_eq!(topo.role_of(&owner.node), Some(NodeRole::Router));
            assert_eq!(owner.node, host.name.replace('h', "r"));
        }
    }
}
