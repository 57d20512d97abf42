#[cfg(test)]
mod routing_tests {
    use std::net::Ipv4Addr;

    use netlab::routing::forwarding::{lookup, trace, LinkFailures, NextHop};
    use netlab::routing::validation::next_hop_distance;
    use netlab::routing::{
        check_metric_order, missing_routes, router_route_table, validate_route_table, RouteTable,
    };
    use netlab::topology::{build_lan_topology, build_router_topology};

    fn host_address(n: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, n - 1, 0, 10)
    }

    /// Every router reaches every subnet, directly or through the table
    #[test]
    fn test_table_is_complete() {
        let topo = build_router_topology().unwrap();
        let table = router_route_table().unwrap();
        assert!(missing_routes(&topo, &table).is_empty());
        validate_route_table(&topo, &table).unwrap();
    }

    /// All 12 ordered pairs of access subnets are reachable host to host
    #[test]
    fn test_all_host_pairs_reachable() {
        let topo = build_router_topology().unwrap();
        let table = router_route_table().unwrap();
        let none = LinkFailures::new();

        let mut pairs = 0;
        for src in 1..=4u8 {
            for dst in 1..=4u8 {
                if src == dst {
                    continue;
                }
                let source = format!("h{}", src);
                let path = trace(&topo, &table, &source, host_address(dst), &none)
                    .unwrap_or_else(|e| panic!("h{} -> h{}: {}", src, dst, e));
                assert_eq!(path.first(), Some(&source));
                assert_eq!(path.last(), Some(&format!("h{}", dst)));
                pairs += 1;
            }
        }
        assert_eq!(pairs, 12);
    }

    /// Where a destination has two routes, the closer next hop has the lower metric
    #[test]
    fn test_metric_ordering() {
        let topo = build_router_topology().unwrap();
        let table = router_route_table().unwrap();
        check_metric_order(&topo, &table).unwrap();

        for entry in &table {
            let routes = table.to_destination(&entry.router, &entry.destination);
            if routes.len() != 2 {
                continue;
            }
            assert!(routes[0].effective_metric() < routes[1].effective_metric());
            let primary = next_hop_distance(&topo, routes[0]).unwrap();
            let backup = next_hop_distance(&topo, routes[1]).unwrap();
            assert!(primary <= backup, "{} is farther than {}", routes[0], routes[1]);
        }
    }

    /// r1 prefers r2 for 10.1.0.0/24 and falls back to r3
    #[test]
    fn test_r1_primary_and_backup() {
        let topo = build_router_topology().unwrap();
        let table = router_route_table().unwrap();

        let hop = lookup(&topo, &table, "r1", host_address(2), &LinkFailures::new()).unwrap();
        assert_eq!(
            hop,
            NextHop::Gateway {
                via: Ipv4Addr::new(10, 100, 0, 2),
                dev: "r1-eth2".to_string(),
                metric: 100,
            }
        );

        let mut failures = LinkFailures::new();
        failures.fail("r2", "r1");
        let hop = lookup(&topo, &table, "r1", host_address(2), &failures).unwrap();
        assert_eq!(
            hop,
            NextHop::Gateway {
                via: Ipv4Addr::new(10, 101, 0, 2),
                dev: "r1-eth3".to_string(),
                metric: 200,
            }
        );
    }

    /// With r1-r2 down, h1 still reaches h2 the long way round
    #[test]
    fn test_backup_path_end_to_end() {
        let topo = build_router_topology().unwrap();
        let table = router_route_table().unwrap();

        let direct = trace(&topo, &table, "h1", host_address(2), &LinkFailures::new()).unwrap();
        assert_eq!(direct, vec!["h1", "r1", "r2", "h2"]);

        let mut failures = LinkFailures::new();
        failures.fail("r1", "r2");
        let around = trace(&topo, &table, "h1", host_address(2), &failures).unwrap();
        assert_eq!(around, vec!["h1", "r1", "r3", "r4", "r2", "h2"]);
    }

    /// LAN hosts reach each other directly without any routes
    #[test]
    fn test_lan_is_flat() {
        let topo = build_lan_topology().unwrap();
        let path = trace(
            &topo,
            &RouteTable::new(),
            "h1",
            Ipv4Addr::new(10, 0, 0, 6),
            &LinkFailures::new(),
        )
        .unwrap();
        assert_eq!(path, vec!["h1", "h6"]);
    }
}
