use crate::routing::{router_route_table, validate_route_table, RouteError, RouteTable};
use crate::topology::lan::{FILE_SERVER_HOSTS, FILE_SERVER_PORT};
use crate::topology::{build_lan_topology, build_router_topology, Topology, TopologyError};
use serde::{Deserialize, Serialize};

/// A complete scenario: topology, static routes and services.
///
/// This is the unit that scenario files describe and that the runner brings
/// up, so custom networks can be run without code changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub topology: Topology,
    /// Static routes installed after the network is built
    #[serde(default, skip_serializing_if = "RouteTable::is_empty")]
    pub routes: RouteTable,
    /// Long-running processes started once the network is up
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

/// A background process on one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub host: String,
    /// Shell command line, run through `sh -c`
    pub command: String,
}

impl Service {
    /// Minimal HTTP file server serving the working directory
    pub fn file_server(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            command: format!("python3 -m http.server {}", port),
        }
    }
}

impl Scenario {
    /// Single-switch LAN with file servers on h1 and h2
    pub fn lan() -> Result<Self, ValidationError> {
        Ok(Self {
            name: "lan".to_string(),
            topology: build_lan_topology()?,
            routes: RouteTable::new(),
            services: FILE_SERVER_HOSTS
                .iter()
                .map(|host| Service::file_server(host, FILE_SERVER_PORT))
                .collect(),
        })
    }

    /// Four-router internetwork with its static route table
    pub fn routers() -> Result<Self, ValidationError> {
        Ok(Self {
            name: "routers".to_string(),
            topology: build_router_topology()?,
            routes: router_route_table()?,
            services: Vec::new(),
        })
    }

    /// Validate the topology, the route table against it, and the services
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::InvalidScenario(
                "name cannot be empty".to_string(),
            ));
        }

        self.topology.validate()?;
        validate_route_table(&self.topology, &self.routes)?;

        for service in &self.services {
            if service.command.trim().is_empty() {
                return Err(ValidationError::InvalidService(format!(
                    "empty command for host {}",
                    service.host
                )));
            }
            match self.topology.role_of(&service.host) {
                Some(role) if role.has_namespace() => {}
                Some(role) => {
                    return Err(ValidationError::InvalidService(format!(
                        "{} is a {} and cannot run services",
                        service.host, role
                    )))
                }
                None => {
                    return Err(ValidationError::InvalidService(format!(
                        "unknown host {}",
                        service.host
                    )))
                }
            }
        }

        Ok(())
    }
}

/// Scenario validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("Invalid route table: {0}")]
    Routes(#[from] RouteError),
    #[error("Invalid service: {0}")]
    InvalidService(String),
}
