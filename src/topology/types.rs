//! Topology type definitions.
//!
//! A topology is a small undirected graph of hosts, routers and switches.
//! Links are stored as declared; [`Topology::interfaces`] resolves them into
//! named, addressed interfaces the same way the emulator realizes them.

use crate::utils::ip_utils::{cidr_opt, subnet_of};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Longest interface name the kernel accepts (`IFNAMSIZ` minus the NUL)
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// Errors raised while building or validating a topology
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Link from {0} to itself")]
    SelfLink(String),

    #[error("Invalid address '{value}': {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("Interface name {0} is used more than once")]
    DuplicateInterface(String),

    #[error("Interface name {0} is longer than 15 characters")]
    InterfaceNameTooLong(String),

    #[error("Address {address} is assigned to both {first} and {second}")]
    DuplicateAddress {
        address: Ipv4Addr,
        first: String,
        second: String,
    },

    #[error("Switch {0} cannot carry an IP address or default route")]
    AddressOnSwitch(String),

    #[error("Default gateway {gateway} of {node} is not on any directly attached link")]
    UnreachableGateway { node: String, gateway: Ipv4Addr },

    #[error("Default gateway {gateway} of {node} matches more than one attached link")]
    AmbiguousGateway { node: String, gateway: Ipv4Addr },

    #[error("Default gateway {gateway} of {node} belongs to {owner}, which is not a router")]
    GatewayNotRouter {
        node: String,
        gateway: Ipv4Addr,
        owner: String,
    },
}

/// Role of a node in the emulated network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Plain end host in its own namespace
    Host,
    /// Layer-2 switch in the root namespace
    Switch,
    /// Host with IP forwarding enabled for its lifetime
    Router,
}

impl NodeRole {
    /// Returns true if the node gets its own network namespace
    pub fn has_namespace(&self) -> bool {
        !matches!(self, Self::Switch)
    }

    /// First port number used for automatically named interfaces
    fn port_base(&self) -> usize {
        match self {
            Self::Switch => 1,
            Self::Host | Self::Router => 0,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Switch => write!(f, "switch"),
            Self::Router => write!(f, "router"),
        }
    }
}

/// A node declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub role: NodeRole,
    /// Address of the node's first interface
    #[serde(default, with = "cidr_opt", skip_serializing_if = "Option::is_none")]
    pub address: Option<Ipv4Net>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_route: Option<Ipv4Addr>,
}

impl Node {
    pub fn host(name: &str, address: Ipv4Net) -> Self {
        Self {
            name: name.to_string(),
            role: NodeRole::Host,
            address: Some(address),
            default_route: None,
        }
    }

    pub fn router(name: &str, address: Ipv4Net) -> Self {
        Self {
            name: name.to_string(),
            role: NodeRole::Router,
            address: Some(address),
            default_route: None,
        }
    }

    pub fn switch(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: NodeRole::Switch,
            address: None,
            default_route: None,
        }
    }

    pub fn with_default_route(mut self, gateway: Ipv4Addr) -> Self {
        self.default_route = Some(gateway);
        self
    }
}

/// An undirected link between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub endpoint_a: String,
    pub endpoint_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_b: Option<String>,
    #[serde(default, with = "cidr_opt", skip_serializing_if = "Option::is_none")]
    pub address_a: Option<Ipv4Net>,
    #[serde(default, with = "cidr_opt", skip_serializing_if = "Option::is_none")]
    pub address_b: Option<Ipv4Net>,
}

impl Link {
    pub fn new(endpoint_a: &str, endpoint_b: &str) -> Self {
        Self {
            endpoint_a: endpoint_a.to_string(),
            endpoint_b: endpoint_b.to_string(),
            interface_a: None,
            interface_b: None,
            address_a: None,
            address_b: None,
        }
    }

    pub fn interface_a(mut self, name: &str, address: Option<Ipv4Net>) -> Self {
        self.interface_a = Some(name.to_string());
        self.address_a = address;
        self
    }

    pub fn interface_b(mut self, name: &str, address: Option<Ipv4Net>) -> Self {
        self.interface_b = Some(name.to_string());
        self.address_b = address;
        self
    }

    /// Returns true if this link joins `x` and `y` in either direction
    pub fn connects(&self, x: &str, y: &str) -> bool {
        (self.endpoint_a == x && self.endpoint_b == y) || (self.endpoint_a == y && self.endpoint_b == x)
    }
}

/// External OpenFlow controller the switches connect to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    pub name: String,
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl Controller {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }

    /// Controller target string understood by `ovs-vsctl set-controller`
    pub fn target(&self) -> String {
        format!("tcp:{}:{}", self.ip, self.port)
    }
}

/// A link endpoint resolved to a concrete interface
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub node: String,
    pub name: String,
    pub address: Option<Ipv4Net>,
    pub peer_node: String,
    pub peer_name: String,
    /// Index of the link in [`Topology::links`]
    pub link: usize,
}

/// Topology descriptor for one scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub name: String,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Controller>,
}

impl Topology {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a node, rejecting duplicate names
    pub fn add_node(&mut self, node: Node) -> Result<(), TopologyError> {
        if self.node(&node.name).is_some() {
            return Err(TopologyError::DuplicateNode(node.name));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Add a link between two existing nodes
    pub fn add_link(&mut self, link: Link) -> Result<(), TopologyError> {
        for endpoint in [&link.endpoint_a, &link.endpoint_b] {
            if self.node(endpoint).is_none() {
                return Err(TopologyError::UnknownNode(endpoint.clone()));
            }
        }
        if link.endpoint_a == link.endpoint_b {
            return Err(TopologyError::SelfLink(link.endpoint_a));
        }
        self.links.push(link);
        Ok(())
    }

    pub fn set_controller(&mut self, controller: Controller) {
        self.controller = Some(controller);
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn role_of(&self, name: &str) -> Option<NodeRole> {
        self.node(name).map(|n| n.role)
    }

    pub fn nodes_with_role(&self, role: NodeRole) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.role == role)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Node> {
        self.nodes_with_role(NodeRole::Host)
    }

    pub fn switches(&self) -> impl Iterator<Item = &Node> {
        self.nodes_with_role(NodeRole::Switch)
    }

    pub fn routers(&self) -> impl Iterator<Item = &Node> {
        self.nodes_with_role(NodeRole::Router)
    }

    /// Resolve every link endpoint into a named interface.
    ///
    /// Endpoints without an explicit name become `<node>-eth<port>`. Ports
    /// start at 0 on hosts and routers and at 1 on switches; every endpoint
    /// consumes a port whether or not it is named explicitly. An endpoint
    /// without an explicit address inherits the node address if it sits on
    /// the node's first port.
    pub fn interfaces(&self) -> Vec<Interface> {
        let mut next_port: HashMap<&str, usize> = HashMap::new();
        let mut result = Vec::with_capacity(self.links.len() * 2);

        for (index, link) in self.links.iter().enumerate() {
            let a = self.resolve_endpoint(&mut next_port, &link.endpoint_a, &link.interface_a, link.address_a);
            let b = self.resolve_endpoint(&mut next_port, &link.endpoint_b, &link.interface_b, link.address_b);

            result.push(Interface {
                node: link.endpoint_a.clone(),
                name: a.0.clone(),
                address: a.1,
                peer_node: link.endpoint_b.clone(),
                peer_name: b.0.clone(),
                link: index,
            });
            result.push(Interface {
                node: link.endpoint_b.clone(),
                name: b.0,
                address: b.1,
                peer_node: link.endpoint_a.clone(),
                peer_name: a.0,
                link: index,
            });
        }

        result
    }

    fn resolve_endpoint<'a>(
        &'a self,
        next_port: &mut HashMap<&'a str, usize>,
        node_name: &'a str,
        explicit_name: &Option<String>,
        explicit_address: Option<Ipv4Net>,
    ) -> (String, Option<Ipv4Net>) {
        let node = self.node(node_name);
        let base = node.map(|n| n.role.port_base()).unwrap_or(0);
        let port = next_port.entry(node_name).or_insert(base);
        let this_port = *port;
        *port += 1;

        let name = explicit_name
            .clone()
            .unwrap_or_else(|| format!("{}-eth{}", node_name, this_port));
        let address = explicit_address.or_else(|| {
            if this_port == base {
                node.and_then(|n| n.address)
            } else {
                None
            }
        });
        (name, address)
    }

    /// Interfaces belonging to one node, in port order
    pub fn interfaces_of(&self, node: &str) -> Vec<Interface> {
        self.interfaces().into_iter().filter(|i| i.node == node).collect()
    }

    /// Look up a node's interface by name
    pub fn interface(&self, node: &str, name: &str) -> Option<Interface> {
        self.interfaces()
            .into_iter()
            .find(|i| i.node == node && i.name == name)
    }

    /// Interface carrying exactly this host address
    pub fn owner_of(&self, addr: Ipv4Addr) -> Option<Interface> {
        self.interfaces()
            .into_iter()
            .find(|i| i.address.map(|a| a.addr()) == Some(addr))
    }

    /// Interfaces reachable at layer 2 from `iface`, crossing switches.
    ///
    /// `link_up` decides whether a link (by index) carries traffic. The
    /// starting interface itself is never part of the result.
    pub fn segment<F>(&self, iface: &Interface, link_up: F) -> Vec<Interface>
    where
        F: Fn(usize) -> bool,
    {
        let all = self.interfaces();
        let mut found = Vec::new();
        if !link_up(iface.link) {
            return found;
        }

        let mut visited_switches = HashSet::new();
        let mut queue = VecDeque::new();
        let peer = all
            .iter()
            .find(|i| i.link == iface.link && i.node == iface.peer_node && i.name == iface.peer_name);

        match peer {
            Some(p) if self.role_of(&p.node) == Some(NodeRole::Switch) => {
                visited_switches.insert(p.node.clone());
                queue.push_back(p.node.clone());
            }
            Some(p) => found.push(p.clone()),
            None => {}
        }

        while let Some(switch) = queue.pop_front() {
            for port in all.iter().filter(|i| i.node == switch && link_up(i.link)) {
                let Some(far) = all
                    .iter()
                    .find(|i| i.link == port.link && i.node == port.peer_node && i.name == port.peer_name)
                else {
                    continue;
                };
                if far.node == iface.node && far.name == iface.name {
                    continue;
                }
                if self.role_of(&far.node) == Some(NodeRole::Switch) {
                    if visited_switches.insert(far.node.clone()) {
                        queue.push_back(far.node.clone());
                    }
                } else {
                    found.push(far.clone());
                }
            }
        }

        found
    }

    /// Routers joined to `router` by a direct router-to-router link
    pub fn router_neighbors(&self, router: &str) -> BTreeSet<String> {
        self.links
            .iter()
            .filter_map(|l| {
                if l.endpoint_a == router {
                    Some(l.endpoint_b.clone())
                } else if l.endpoint_b == router {
                    Some(l.endpoint_a.clone())
                } else {
                    None
                }
            })
            .filter(|peer| self.role_of(peer) == Some(NodeRole::Router))
            .collect()
    }

    /// Hop count from `router` to every router reachable over router links
    pub fn router_hops(&self, router: &str) -> HashMap<String, usize> {
        let mut hops = HashMap::new();
        let mut queue = VecDeque::new();
        hops.insert(router.to_string(), 0);
        queue.push_back(router.to_string());

        while let Some(current) = queue.pop_front() {
            let distance = hops[&current];
            for neighbor in self.router_neighbors(&current) {
                if !hops.contains_key(&neighbor) {
                    hops.insert(neighbor.clone(), distance + 1);
                    queue.push_back(neighbor);
                }
            }
        }

        hops
    }

    /// Subnets directly attached to a node, with the interface carrying them
    pub fn connected_subnets(&self, node: &str) -> Vec<(Ipv4Net, Interface)> {
        self.interfaces_of(node)
            .into_iter()
            .filter_map(|i| i.address.map(|a| (subnet_of(&a), i)))
            .collect()
    }

    /// Subnets on router interfaces facing a host or switch, keyed to their router
    pub fn access_subnets(&self) -> BTreeMap<Ipv4Net, String> {
        self.router_subnets(false)
    }

    /// Subnets on router-to-router links, keyed to the lower-named endpoint
    pub fn transit_subnets(&self) -> BTreeMap<Ipv4Net, String> {
        self.router_subnets(true)
    }

    fn router_subnets(&self, transit: bool) -> BTreeMap<Ipv4Net, String> {
        let mut subnets = BTreeMap::new();
        for iface in self.interfaces() {
            if self.role_of(&iface.node) != Some(NodeRole::Router) {
                continue;
            }
            let peer_is_router = self.role_of(&iface.peer_node) == Some(NodeRole::Router);
            if peer_is_router != transit {
                continue;
            }
            if let Some(addr) = iface.address {
                subnets.entry(subnet_of(&addr)).or_insert(iface.node.clone());
            }
        }
        subnets
    }

    /// Routers with an interface inside `subnet`
    pub fn routers_on(&self, subnet: &Ipv4Net) -> BTreeSet<String> {
        self.interfaces()
            .into_iter()
            .filter(|i| self.role_of(&i.node) == Some(NodeRole::Router))
            .filter(|i| i.address.map(|a| subnet.contains(&a.addr())).unwrap_or(false))
            .map(|i| i.node)
            .collect()
    }

    /// Check names, interfaces, addresses and default gateways
    pub fn validate(&self) -> Result<(), TopologyError> {
        let mut names = HashSet::new();
        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                return Err(TopologyError::DuplicateNode(node.name.clone()));
            }
            if node.role == NodeRole::Switch && (node.address.is_some() || node.default_route.is_some()) {
                return Err(TopologyError::AddressOnSwitch(node.name.clone()));
            }
        }

        for link in &self.links {
            for endpoint in [&link.endpoint_a, &link.endpoint_b] {
                if !names.contains(endpoint.as_str()) {
                    return Err(TopologyError::UnknownNode(endpoint.clone()));
                }
            }
            if link.endpoint_a == link.endpoint_b {
                return Err(TopologyError::SelfLink(link.endpoint_a.clone()));
            }
        }

        let interfaces = self.interfaces();
        let mut interface_names = HashSet::new();
        let mut addresses: HashMap<Ipv4Addr, String> = HashMap::new();
        for iface in &interfaces {
            if iface.name.len() > MAX_INTERFACE_NAME_LEN {
                return Err(TopologyError::InterfaceNameTooLong(iface.name.clone()));
            }
            if !interface_names.insert(iface.name.as_str()) {
                return Err(TopologyError::DuplicateInterface(iface.name.clone()));
            }
            let Some(address) = iface.address else {
                continue;
            };
            if self.role_of(&iface.node) == Some(NodeRole::Switch) {
                return Err(TopologyError::AddressOnSwitch(iface.node.clone()));
            }
            if let Some(first) = addresses.insert(address.addr(), iface.name.clone()) {
                return Err(TopologyError::DuplicateAddress {
                    address: address.addr(),
                    first,
                    second: iface.name.clone(),
                });
            }
        }

        for node in &self.nodes {
            if let Some(gateway) = node.default_route {
                self.validate_gateway(&node.name, gateway)?;
            }
        }

        Ok(())
    }

    /// The gateway must sit on exactly one attached subnet and be owned by a
    /// router on the same layer-2 segment.
    fn validate_gateway(&self, node: &str, gateway: Ipv4Addr) -> Result<(), TopologyError> {
        let attached: Vec<Interface> = self
            .interfaces_of(node)
            .into_iter()
            .filter(|i| i.address.map(|a| subnet_of(&a).contains(&gateway)).unwrap_or(false))
            .collect();

        let iface = match attached.as_slice() {
            [] => {
                return Err(TopologyError::UnreachableGateway {
                    node: node.to_string(),
                    gateway,
                })
            }
            [only] => only,
            _ => {
                return Err(TopologyError::AmbiguousGateway {
                    node: node.to_string(),
                    gateway,
                })
            }
        };

        let owner = self
            .segment(iface, |_| true)
            .into_iter()
            .find(|i| i.address.map(|a| a.addr()) == Some(gateway))
            .ok_or_else(|| TopologyError::UnreachableGateway {
                node: node.to_string(),
                gateway,
            })?;

        if self.role_of(&owner.node) != Some(NodeRole::Router) {
            return Err(TopologyError::GatewayNotRouter {
                node: node.to_string(),
                gateway,
                owner: owner.node,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ip_utils::parse_cidr;

    fn net(s: &str) -> Ipv4Net {
        parse_cidr(s).unwrap()
    }

    fn two_hosts_one_switch() -> Topology {
        let mut topo = Topology::new("pair");
        topo.add_node(Node::host("h1", net("10.0.0.1/24"))).unwrap();
        topo.add_node(Node::host("h2", net("10.0.0.2/24"))).unwrap();
        topo.add_node(Node::switch("s1")).unwrap();
        topo.add_link(Link::new("h1", "s1")).unwrap();
        topo.add_link(Link::new("h2", "s1")).unwrap();
        topo
    }

    #[test]
    fn test_auto_interface_names() {
        let topo = two_hosts_one_switch();
        let names: Vec<String> = topo.interfaces().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["h1-eth0", "s1-eth1", "h2-eth0", "s1-eth2"]);
    }

    #[test]
    fn test_first_interface_inherits_node_address() {
        let topo = two_hosts_one_switch();
        let h1 = topo.interface("h1", "h1-eth0").unwrap();
        assert_eq!(h1.address, Some(net("10.0.0.1/24")));
        let s1 = topo.interface("s1", "s1-eth1").unwrap();
        assert_eq!(s1.address, None);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut topo = two_hosts_one_switch();
        let err = topo.add_node(Node::switch("h1")).unwrap_err();
        assert_eq!(err, TopologyError::DuplicateNode("h1".to_string()));
    }

    #[test]
    fn test_unknown_endpoint_and_self_link_rejected() {
        let mut topo = two_hosts_one_switch();
        assert_eq!(
            topo.add_link(Link::new("h1", "s9")).unwrap_err(),
            TopologyError::UnknownNode("s9".to_string())
        );
        assert_eq!(
            topo.add_link(Link::new("s1", "s1")).unwrap_err(),
            TopologyError::SelfLink("s1".to_string())
        );
    }

    #[test]
    fn test_segment_crosses_switch() {
        let topo = two_hosts_one_switch();
        let h1 = topo.interface("h1", "h1-eth0").unwrap();
        let seg = topo.segment(&h1, |_| true);
        assert_eq!(seg.len(), 1);
        assert_eq!(seg[0].node, "h2");
        assert!(topo.segment(&h1, |link| link != 1).is_empty());
    }

    #[test]
    fn test_duplicate_address_detected() {
        let mut topo = two_hosts_one_switch();
        topo.nodes[1].address = Some(net("10.0.0.1/24"));
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::DuplicateAddress { .. })
        ));
    }

    #[test]
    fn test_interface_name_collision_and_length() {
        let mut topo = two_hosts_one_switch();
        topo.add_node(Node::host("h3", net("10.0.0.3/24"))).unwrap();
        topo.add_link(Link::new("h3", "s1").interface_a("h1-eth0", None))
            .unwrap();
        assert_eq!(
            topo.validate(),
            Err(TopologyError::DuplicateInterface("h1-eth0".to_string()))
        );

        topo.links[2].interface_a = Some("h3-a-very-long-name".to_string());
        assert_eq!(
            topo.validate(),
            Err(TopologyError::InterfaceNameTooLong("h3-a-very-long-name".to_string()))
        );
    }

    #[test]
    fn test_gateway_must_be_router() {
        let mut topo = two_hosts_one_switch();
        topo.nodes[0].default_route = Some(Ipv4Addr::new(10, 0, 0, 2));
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::GatewayNotRouter { .. })
        ));

        topo.nodes[0].default_route = Some(Ipv4Addr::new(10, 9, 0, 1));
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::UnreachableGateway { .. })
        ));
    }

    #[test]
    fn test_address_on_switch_rejected() {
        let mut topo = two_hosts_one_switch();
        topo.links[0].address_b = Some(net("10.0.0.9/24"));
        assert_eq!(
            topo.validate(),
            Err(TopologyError::AddressOnSwitch("s1".to_string()))
        );
    }
}
