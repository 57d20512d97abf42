//! Per-node start and stop hooks.
//!
//! A router is an ordinary namespace plus [`IpForwarding`]: forwarding is
//! switched on when the node is configured and off as the node's last
//! command at teardown.

use super::shell::{Shell, ShellError, Target};
use crate::topology::NodeRole;

/// Command enabling IPv4 forwarding inside a namespace
pub const IP_FORWARD_ON: [&str; 2] = ["sysctl", "net.ipv4.ip_forward=1"];

/// Command disabling IPv4 forwarding inside a namespace
pub const IP_FORWARD_OFF: [&str; 2] = ["sysctl", "net.ipv4.ip_forward=0"];

/// Commands run on a node at configuration and teardown time
pub trait NodeHooks {
    fn on_start(&self, node: &str, shell: &mut dyn Shell) -> Result<(), ShellError>;

    fn on_stop(&self, node: &str, shell: &mut dyn Shell) -> Result<(), ShellError>;
}

/// Enables IPv4 forwarding for the node's lifetime
#[derive(Debug, Clone, Copy, Default)]
pub struct IpForwarding;

impl NodeHooks for IpForwarding {
    fn on_start(&self, node: &str, shell: &mut dyn Shell) -> Result<(), ShellError> {
        shell.run_checked(Target::Node(node), &IP_FORWARD_ON)?;
        Ok(())
    }

    fn on_stop(&self, node: &str, shell: &mut dyn Shell) -> Result<(), ShellError> {
        shell.run_checked(Target::Node(node), &IP_FORWARD_OFF)?;
        Ok(())
    }
}

/// Hooks attached to a node of the given role
pub fn hooks_for(role: NodeRole) -> Option<Box<dyn NodeHooks>> {
    match role {
        NodeRole::Router => Some(Box::new(IpForwarding)),
        NodeRole::Host | NodeRole::Switch => None,
    }
}
