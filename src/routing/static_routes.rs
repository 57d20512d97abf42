//! Static routes for the four-router internetwork.
//!
//! Metric 100 marks the primary path and 200 the backup wherever a router
//! has two ways to reach a subnet; single-path destinations carry no metric.

use super::table::{RouteEntry, RouteError, RouteTable};

/// Metric of the preferred route when a destination has two paths
pub const PRIMARY_METRIC: u32 = 100;

/// Metric of the fallback route when a destination has two paths
pub const BACKUP_METRIC: u32 = 200;

type Row = (&'static str, &'static str, &'static str, &'static str, Option<u32>);

const P: Option<u32> = Some(PRIMARY_METRIC);
const B: Option<u32> = Some(BACKUP_METRIC);

const ROUTER_ROUTES: [Row; 35] = [
    // r1: neighbours r2 (eth2) and r3 (eth3)
    ("r1", "10.1.0.0/24", "10.100.0.2", "r1-eth2", P),
    ("r1", "10.1.0.0/24", "10.101.0.2", "r1-eth3", B),
    ("r1", "10.2.0.0/24", "10.101.0.2", "r1-eth3", None),
    ("r1", "10.3.0.0/24", "10.101.0.2", "r1-eth3", P),
    ("r1", "10.3.0.0/24", "10.100.0.2", "r1-eth2", B),
    ("r1", "10.102.0.0/24", "10.101.0.2", "r1-eth3", None),
    ("r1", "10.103.0.0/24", "10.100.0.2", "r1-eth2", P),
    ("r1", "10.103.0.0/24", "10.101.0.2", "r1-eth3", B),
    // r2: neighbours r1 (eth2) and r4 (eth3)
    ("r2", "10.0.0.0/24", "10.100.0.1", "r2-eth2", P),
    ("r2", "10.0.0.0/24", "10.103.0.2", "r2-eth3", B),
    ("r2", "10.3.0.0/24", "10.103.0.2", "r2-eth3", None),
    ("r2", "10.2.0.0/24", "10.103.0.2", "r2-eth3", P),
    ("r2", "10.2.0.0/24", "10.100.0.1", "r2-eth2", B),
    ("r2", "10.102.0.0/24", "10.103.0.2", "r2-eth3", None),
    ("r2", "10.101.0.0/24", "10.100.0.1", "r2-eth2", P),
    ("r2", "10.101.0.0/24", "10.103.0.2", "r2-eth3", B),
    // r3: neighbours r1 (eth2) and r4 (eth3)
    ("r3", "10.0.0.0/24", "10.101.0.1", "r3-eth2", None),
    ("r3", "10.3.0.0/24", "10.102.0.2", "r3-eth3", P),
    ("r3", "10.3.0.0/24", "10.101.0.1", "r3-eth2", B),
    ("r3", "10.1.0.0/24", "10.102.0.2", "r3-eth3", P),
    ("r3", "10.1.0.0/24", "10.101.0.1", "r3-eth2", B),
    ("r3", "10.103.0.0/24", "10.102.0.2", "r3-eth3", P),
    ("r3", "10.103.0.0/24", "10.101.0.1", "r3-eth2", B),
    ("r3", "10.100.0.0/24", "10.101.0.1", "r3-eth2", P),
    ("r3", "10.100.0.0/24", "10.102.0.2", "r3-eth3", B),
    // r4: neighbours r3 (eth2) and r2 (eth3)
    ("r4", "10.1.0.0/24", "10.103.0.1", "r4-eth3", P),
    ("r4", "10.1.0.0/24", "10.102.0.1", "r4-eth2", B),
    ("r4", "10.2.0.0/24", "10.102.0.1", "r4-eth2", P),
    ("r4", "10.2.0.0/24", "10.103.0.1", "r4-eth3", B),
    ("r4", "10.0.0.0/24", "10.102.0.1", "r4-eth2", P),
    ("r4", "10.0.0.0/24", "10.103.0.1", "r4-eth3", B),
    ("r4", "10.101.0.0/24", "10.102.0.1", "r4-eth2", P),
    ("r4", "10.101.0.0/24", "10.103.0.1", "r4-eth3", B),
    // r2 sits on 10.100.0.0/24, so the r2 path is the primary
    ("r4", "10.100.0.0/24", "10.103.0.1", "r4-eth3", P),
    ("r4", "10.100.0.0/24", "10.102.0.1", "r4-eth2", B),
];

/// Build the static route table for the router topology.
pub fn router_route_table() -> Result<RouteTable, RouteError> {
    let mut table = RouteTable::new();
    for (router, destination, via, dev, metric) in ROUTER_ROUTES {
        table.push(RouteEntry::parse(router, destination, via, dev, metric)?);
    }
    Ok(table)
}
