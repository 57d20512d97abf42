//! Load-balancer test LAN.
//!
//! One switch, six hosts in a star, and an external controller that is
//! expected to balance traffic between the file servers on h1 and h2.

use super::{cidr, Controller, Link, Node, Topology, TopologyError};
use std::net::Ipv4Addr;

/// Number of hosts attached to the LAN switch
pub const LAN_HOST_COUNT: usize = 6;

/// Port the external controller listens on
pub const CONTROLLER_PORT: u16 = 6633;

/// Hosts running a file server
pub const FILE_SERVER_HOSTS: [&str; 2] = ["h1", "h2"];

/// Port the file servers listen on
pub const FILE_SERVER_PORT: u16 = 80;

/// Build the LAN topology: `s1` with `h1..h6` at `10.0.0.1..6` (class A mask).
pub fn build_lan_topology() -> Result<Topology, TopologyError> {
    let mut topo = Topology::new("lan");

    log::info!("*** Adding controller");
    topo.set_controller(Controller {
        name: "c0".to_string(),
        ip: Ipv4Addr::LOCALHOST,
        port: CONTROLLER_PORT,
    });

    log::info!("*** Adding hosts");
    for i in 1..=LAN_HOST_COUNT {
        let name = format!("h{}", i);
        topo.add_node(Node::host(&name, cidr(&format!("10.0.0.{}", i))?))?;
    }

    log::info!("*** Adding switches");
    topo.add_node(Node::switch("s1"))?;

    log::info!("*** Creating links");
    for i in 1..=LAN_HOST_COUNT {
        topo.add_link(Link::new(&format!("h{}", i), "s1"))?;
    }

    Ok(topo)
}
