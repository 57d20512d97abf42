//! Emulation backend.
//!
//! This module realizes a topology on Linux network namespaces through a
//! pluggable [`Shell`], installs static routes, runs node lifecycle hooks and
//! offers an interactive console over the running network.

pub mod console;
pub mod lifecycle;
pub mod network;
pub mod shell;

// Re-export key types and functions for easier access
pub use console::{Console, Flow, PROMPT};
pub use lifecycle::{hooks_for, IpForwarding, NodeHooks, IP_FORWARD_OFF, IP_FORWARD_ON};
pub use network::{InstallReport, Network, NetworkState};
pub use shell::{CommandOutput, NetnsShell, RecordedCommand, RecordingShell, Shell, ShellError, Target};

use crate::topology::{Controller, TopologyError};
use std::net::TcpStream;
use std::time::Duration;

/// How long to wait for the controller to accept a connection
pub const CONTROLLER_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors raised while realizing or driving a network
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error("Unknown node or node without a namespace: {0}")]
    UnknownNode(String),
}

/// Returns true if something accepts TCP connections at the controller address
pub fn controller_reachable(controller: &Controller, timeout: Duration) -> bool {
    match TcpStream::connect_timeout(&controller.socket_addr(), timeout) {
        Ok(_) => true,
        Err(e) => {
            log::debug!("Connection to {} failed: {}", controller.socket_addr(), e);
            false
        }
    }
}
