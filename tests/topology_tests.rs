#[cfg(test)]
mod topology_tests {
    use ipnet::Ipv4Net;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    use netlab::topology::{build_lan_topology, build_router_topology, NodeRole};

    /// The LAN is a star of six hosts around one switch
    #[test]
    fn test_lan_shape() {
        let topo = build_lan_topology().unwrap();
        topo.validate().unwrap();

        assert_eq!(topo.hosts().count(), 6);
        assert_eq!(topo.switches().count(), 1);
        assert_eq!(topo.routers().count(), 0);
        assert_eq!(topo.links.len(), 6);

        for link in &topo.links {
            assert!(link.endpoint_b == "s1" || link.endpoint_a == "s1", "{:?} bypasses s1", link);
        }

        let controller = topo.controller.as_ref().unwrap();
        assert_eq!(controller.name, "c0");
        assert_eq!(controller.port, 6633);
    }

    /// LAN hosts have distinct addresses inside 10.0.0.0/24
    #[test]
    fn test_lan_addresses() {
        let topo = build_lan_topology().unwrap();
        let lan: Ipv4Net = "10.0.0.0/24".parse().unwrap();

        let mut seen = HashSet::new();
        for host in topo.hosts() {
            let address = host.address.unwrap();
            assert!(lan.contains(&address.addr()), "{} outside {}", address, lan);
            assert_eq!(address.prefix_len(), 8);
            assert!(seen.insert(address.addr()));
        }
        assert_eq!(seen.len(), 6);
    }

    /// Four routers, four access subnets, four transit links, four hosts
    #[test]
    fn test_router_shape() {
        let topo = build_router_topology().unwrap();
        topo.validate().unwrap();

        assert_eq!(topo.routers().count(), 4);
        assert_eq!(topo.hosts().count(), 4);
        assert_eq!(topo.switches().count(), 4);
        assert_eq!(topo.access_subnets().len(), 4);
        assert_eq!(topo.transit_subnets().len(), 4);

        let router_links = topo
            .links
            .iter()
            .filter(|l| {
                topo.role_of(&l.endpoint_a) == Some(NodeRole::Router)
                    && topo.role_of(&l.endpoint_b) == Some(NodeRole::Router)
            })
            .count();
        assert_eq!(router_links, 4);
    }

    /// Diagonals of the ring are absent
    #[test]
    fn test_router_ring_has_no_diagonals() {
        let topo = build_router_topology().unwrap();
        assert!(!topo.links.iter().any(|l| l.connects("r1", "r4")));
        assert!(!topo.links.iter().any(|l| l.connects("r2", "r3")));

        assert_eq!(topo.router_hops("r1")["r4"], 2);
        assert_eq!(topo.router_hops("r2")["r3"], 2);
    }

    /// Every host routes through the router of its access subnet
    #[test]
    fn test_host_default_routes() {
        let topo = build_router_topology().unwrap();
        for n in 1..=4u8 {
            let host = topo.node(&format!("h{}", n)).unwrap();
            assert_eq!(host.default_route, Some(Ipv4Addr::new(10, n - 1, 0, 1)));
            assert_eq!(host.address.unwrap().addr(), Ipv4Addr::new(10, n - 1, 0, 10));

            let gateway = topo.owner_of(Ipv4Addr::new(10, n - 1, 0, 1)).unwrap();
            assert_eq!(gateway.node, format!("r{}", n));
            assert_eq!(gateway.name, format!("r{}-eth1", n));
        }
    }

    /// Interface names follow the <node>-eth<port> scheme and fit the kernel limit
    #[test]
    fn test_interface_names() {
        let topo = build_router_topology().unwrap();
        let names: Vec<String> = topo.interfaces_of("r1").into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["r1-eth1", "r1-eth2", "r1-eth3"]);

        for iface in topo.interfaces() {
            assert!(iface.name.len() <= 15);
            assert!(iface.name.starts_with(&format!("{}-eth", iface.node)));
        }
    }
}
