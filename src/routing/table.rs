//! Static route table types.
//!
//! A [`RouteEntry`] is one `ip route add` invocation on one router. The
//! rendered command is the exact text handed to the router's shell.

use crate::utils::ip_utils::subnet_of;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

/// Metric the kernel assigns when `ip route add` is given none
pub const KERNEL_DEFAULT_METRIC: u32 = 0;

/// Errors raised while building, validating or walking a route table
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("Invalid route field '{value}': {reason}")]
    InvalidField { value: String, reason: String },

    #[error("Route on unknown node {0}")]
    UnknownRouter(String),

    #[error("Route on {0}, which is not a router")]
    NotARouter(String),

    #[error("Destination {destination} on {router} has host bits set")]
    HostBitsSet { router: String, destination: Ipv4Net },

    #[error("Interface {dev} does not belong to {router}")]
    ForeignInterface { router: String, dev: String },

    #[error("Next hop {via} is not directly reachable from {router} through {dev}")]
    NextHopNotAdjacent {
        router: String,
        via: Ipv4Addr,
        dev: String,
    },

    #[error("Destination {destination} is directly connected to {router}")]
    DirectlyConnected { router: String, destination: Ipv4Net },

    #[error("Duplicate route to {destination} on {router} with metric {metric}")]
    DuplicateRoute {
        router: String,
        destination: Ipv4Net,
        metric: u32,
    },

    #[error("{router} has no route to {destination}")]
    MissingRoute { router: String, destination: Ipv4Net },

    #[error("Route to {destination} on {router} via {shorter} is the shorter path but does not have the lower metric than via {longer}")]
    MetricOrder {
        router: String,
        destination: Ipv4Net,
        shorter: Ipv4Addr,
        longer: Ipv4Addr,
    },

    #[error("No route from {node} to {destination}")]
    NoRoute { node: String, destination: Ipv4Addr },

    #[error("Forwarding loop from {origin} to {destination}")]
    ForwardingLoop { origin: String, destination: Ipv4Addr },
}

/// One static route on one router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub router: String,
    pub destination: Ipv4Net,
    pub via: Ipv4Addr,
    pub dev: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
}

impl RouteEntry {
    /// Build an entry from its textual fields
    pub fn parse(
        router: &str,
        destination: &str,
        via: &str,
        dev: &str,
        metric: Option<u32>,
    ) -> Result<Self, RouteError> {
        let destination: Ipv4Net = destination.parse().map_err(|e: ipnet::AddrParseError| {
            RouteError::InvalidField {
                value: destination.to_string(),
                reason: e.to_string(),
            }
        })?;
        let via: Ipv4Addr = via.parse().map_err(|e: std::net::AddrParseError| {
            RouteError::InvalidField {
                value: via.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            router: router.to_string(),
            destination,
            via,
            dev: dev.to_string(),
            metric,
        })
    }

    /// Metric the kernel ranks this route with
    pub fn effective_metric(&self) -> u32 {
        self.metric.unwrap_or(KERNEL_DEFAULT_METRIC)
    }

    /// Returns true if the destination is a proper network address
    pub fn has_network_destination(&self) -> bool {
        subnet_of(&self.destination) == self.destination
    }

    /// The `ip route add` command line installing this entry
    pub fn command(&self) -> String {
        self.argv().join(" ")
    }

    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![
            "ip".to_string(),
            "route".to_string(),
            "add".to_string(),
            self.destination.to_string(),
            "via".to_string(),
            self.via.to_string(),
            "dev".to_string(),
            self.dev.clone(),
        ];
        if let Some(metric) = self.metric {
            argv.push("metric".to_string());
            argv.push(metric.to_string());
        }
        argv
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.router, self.command())
    }
}

/// Ordered list of static routes across all routers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries installed on one router, in table order
    pub fn for_router<'a>(&'a self, router: &'a str) -> impl Iterator<Item = &'a RouteEntry> + 'a {
        self.entries.iter().filter(move |e| e.router == router)
    }

    /// Entries on `router` for exactly `destination`, primary first
    pub fn to_destination(&self, router: &str, destination: &Ipv4Net) -> Vec<&RouteEntry> {
        let mut routes: Vec<&RouteEntry> = self
            .entries
            .iter()
            .filter(|e| e.router == router && &e.destination == destination)
            .collect();
        routes.sort_by_key(|e| e.effective_metric());
        routes
    }

    /// Routers that carry at least one entry
    pub fn routers(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.router.as_str()).collect()
    }
}

impl From<Vec<RouteEntry>> for RouteTable {
    fn from(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a RouteEntry;
    type IntoIter = std::slice::Iter<'a, RouteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
