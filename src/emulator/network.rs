//! Realization of a [`Topology`] on network namespaces.
//!
//! Hosts and routers become namespaces, switches become bridges in the root
//! namespace and every link becomes a veth pair. All commands go through a
//! [`Shell`], so the same code drives the kernel or a recording.

use super::lifecycle::{hooks_for, NodeHooks};
use super::shell::{describe, CommandOutput, Shell, ShellError, Target};
use super::EmulatorError;
use crate::routing::{RouteEntry, RouteTable};
use crate::topology::{Interface, NodeRole, Topology};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Lifecycle state of a [`Network`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// Nothing has been created yet
    Declared,
    /// Namespaces, links and addresses exist
    Built,
    /// Switches are up and services may run
    Started,
    /// Torn down
    Stopped,
}

/// Outcome of [`Network::install_routes`]
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub installed: Vec<RouteEntry>,
    /// Entries the router rejected, with the command output
    pub failed: Vec<(RouteEntry, String)>,
    /// Entries for routers whose routes were already installed
    pub skipped: Vec<RouteEntry>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// An emulated network driven through a [`Shell`]
pub struct Network<S: Shell> {
    topology: Topology,
    shell: S,
    hooks: Vec<(String, Box<dyn NodeHooks>)>,
    state: NetworkState,
    routed: BTreeSet<String>,
}

impl<S: Shell> Network<S> {
    pub fn new(topology: Topology, shell: S) -> Self {
        let hooks = topology
            .nodes
            .iter()
            .filter_map(|n| hooks_for(n.role).map(|h| (n.name.clone(), h)))
            .collect();
        Self {
            topology,
            shell,
            hooks,
            state: NetworkState::Declared,
            routed: BTreeSet::new(),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn into_shell(self) -> S {
        self.shell
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    /// Returns true once at least one static route was installed on `router`
    pub fn has_routes(&self, router: &str) -> bool {
        self.routed.contains(router)
    }

    /// Names of nodes that live in their own namespace, in declaration order
    pub fn namespaces(&self) -> Vec<String> {
        self.topology
            .nodes
            .iter()
            .filter(|n| n.role.has_namespace())
            .map(|n| n.name.clone())
            .collect()
    }

    fn switch_names(&self) -> Vec<String> {
        self.topology.switches().map(|n| n.name.clone()).collect()
    }

    fn uses_ovs(&self) -> bool {
        self.topology.controller.is_some()
    }

    /// Create namespaces, switches, links, addresses and default routes,
    /// then run every node's start hook.
    pub fn build(&mut self) -> Result<(), EmulatorError> {
        self.topology.validate()?;

        let namespaces = self.namespaces();
        log::info!("*** Adding hosts:");
        log::info!("{}", namespaces.join(" "));
        for name in &namespaces {
            self.shell.run_checked(Target::Root, &["ip", "netns", "add", name])?;
            self.shell
                .run_checked(Target::Node(name), &["ip", "link", "set", "lo", "up"])?;
        }

        let switches = self.switch_names();
        log::info!("*** Adding switches:");
        log::info!("{}", switches.join(" "));
        for name in &switches {
            self.add_switch(name)?;
        }

        log::info!("*** Adding links:");
        let interfaces = self.topology.interfaces();
        for pair in interfaces.chunks(2) {
            let [a, b] = pair else {
                continue;
            };
            self.shell.run_checked(
                Target::Root,
                &["ip", "link", "add", &a.name, "type", "veth", "peer", "name", &b.name],
            )?;
            self.attach(a)?;
            self.attach(b)?;
            log::info!("({}, {})", a.node, b.node);
        }

        log::info!("*** Configuring hosts");
        let gateways: Vec<(String, Ipv4Addr)> = self
            .topology
            .nodes
            .iter()
            .filter_map(|n| n.default_route.map(|gw| (n.name.clone(), gw)))
            .collect();
        for (name, gateway) in &gateways {
            let gateway = gateway.to_string();
            self.shell.run_checked(
                Target::Node(name),
                &["ip", "route", "add", "default", "via", &gateway],
            )?;
        }

        for (name, hooks) in &self.hooks {
            hooks.on_start(name, &mut self.shell)?;
        }

        self.state = NetworkState::Built;
        Ok(())
    }

    fn add_switch(&mut self, name: &str) -> Result<(), ShellError> {
        if self.uses_ovs() {
            self.shell
                .run_checked(Target::Root, &["ovs-vsctl", "--may-exist", "add-br", name])?;
            self.shell
                .run_checked(Target::Root, &["ovs-vsctl", "set-fail-mode", name, "secure"])?;
        } else {
            self.shell
                .run_checked(Target::Root, &["ip", "link", "add", "name", name, "type", "bridge"])?;
        }
        Ok(())
    }

    fn attach(&mut self, iface: &Interface) -> Result<(), ShellError> {
        let name = iface.name.as_str();
        if self.topology.role_of(&iface.node) == Some(NodeRole::Switch) {
            if self.uses_ovs() {
                self.shell.run_checked(
                    Target::Root,
                    &["ovs-vsctl", "--may-exist", "add-port", &iface.node, name],
                )?;
            } else {
                self.shell
                    .run_checked(Target::Root, &["ip", "link", "set", name, "master", &iface.node])?;
            }
            self.shell
                .run_checked(Target::Root, &["ip", "link", "set", name, "up"])?;
            return Ok(());
        }

        self.shell
            .run_checked(Target::Root, &["ip", "link", "set", name, "netns", &iface.node])?;
        let target = Target::Node(&iface.node);
        if let Some(address) = iface.address {
            let address = address.to_string();
            self.shell
                .run_checked(target, &["ip", "addr", "add", &address, "dev", name])?;
        }
        self.shell.run_checked(target, &["ip", "link", "set", name, "up"])?;
        Ok(())
    }

    /// Issue one `ip route add` per entry on its router.
    ///
    /// Failures are logged and reported, never fatal. Routers that already
    /// received their routes are skipped.
    pub fn install_routes(&mut self, table: &RouteTable) -> InstallReport {
        let mut report = InstallReport::default();
        let done = self.routed.clone();

        for entry in table {
            if done.contains(&entry.router) {
                log::debug!("Routes already installed on {}, skipping {}", entry.router, entry);
                report.skipped.push(entry.clone());
                continue;
            }
            let argv = entry.argv();
            let args: Vec<&str> = argv.iter().map(String::as_str).collect();
            match self.shell.run(Target::Node(&entry.router), &args) {
                Ok(output) if output.success => {
                    let text = output.text();
                    if !text.is_empty() {
                        log::info!("{}", text);
                    }
                    self.routed.insert(entry.router.clone());
                    report.installed.push(entry.clone());
                }
                Ok(output) => {
                    let text = output.text();
                    log::warn!("Failed to add route {}: {}", entry, text);
                    report.failed.push((entry.clone(), text));
                }
                Err(e) => {
                    log::warn!("Failed to add route {}: {}", entry, e);
                    report.failed.push((entry.clone(), e.to_string()));
                }
            }
        }

        log::info!(
            "Installed {} of {} static routes",
            report.installed.len(),
            table.len()
        );
        report
    }

    /// Bring switches up and connect them to the controller, if any
    pub fn start(&mut self) -> Result<(), ShellError> {
        let switches = self.switch_names();
        let controller = self.topology.controller.as_ref().map(|c| (c.name.clone(), c.target()));

        if let Some((name, target)) = &controller {
            log::info!("*** Starting controller");
            log::info!("{} ({})", name, target);
        }
        log::info!("*** Starting {} switches", switches.len());
        for name in &switches {
            if let Some((_, target)) = &controller {
                self.shell
                    .run_checked(Target::Root, &["ovs-vsctl", "set-controller", name, target])?;
            }
            self.shell
                .run_checked(Target::Root, &["ip", "link", "set", name, "up"])?;
        }

        self.state = NetworkState::Started;
        Ok(())
    }

    /// Run `command` through `sh -c` in the background on `host`
    pub fn start_service(&mut self, host: &str, command: &str) -> Result<(), EmulatorError> {
        match self.topology.role_of(host) {
            Some(role) if role.has_namespace() => {}
            _ => return Err(EmulatorError::UnknownNode(host.to_string())),
        }
        self.shell.spawn(Target::Node(host), &["sh", "-c", command])?;
        Ok(())
    }

    /// Run a shell command line on a node. Switches run in the root namespace.
    pub fn cmd(&mut self, node: &str, line: &str) -> Result<CommandOutput, EmulatorError> {
        let role = self
            .topology
            .role_of(node)
            .ok_or_else(|| EmulatorError::UnknownNode(node.to_string()))?;
        let target = if role.has_namespace() {
            Target::Node(node)
        } else {
            Target::Root
        };
        Ok(self.shell.run(target, &["sh", "-c", line])?)
    }

    /// Address other nodes use to reach `node`
    pub fn address_of(&self, node: &str) -> Option<Ipv4Addr> {
        self.topology
            .node(node)
            .and_then(|n| n.address)
            .or_else(|| {
                self.topology
                    .interfaces_of(node)
                    .into_iter()
                    .find_map(|i| i.address)
            })
            .map(|a| a.addr())
    }

    /// Tear everything down. Best effort: failures are logged, never returned.
    ///
    /// Stop hooks run after every other command issued inside a namespace,
    /// so disabling forwarding is each router's last command.
    pub fn stop(&mut self) {
        if self.state == NetworkState::Stopped {
            return;
        }

        log::info!("*** Stopping network");
        self.shell.reap();

        let namespaces = self.namespaces();
        for name in &namespaces {
            self.kill_namespace_processes(name);
        }

        for (name, hooks) in &self.hooks {
            if let Err(e) = hooks.on_stop(name, &mut self.shell) {
                log::warn!("Stop hook for {} failed: {}", name, e);
            }
        }

        for name in &self.switch_names() {
            if self.uses_ovs() {
                self.best_effort(Target::Root, &["ovs-vsctl", "--if-exists", "del-br", name]);
            } else {
                self.best_effort(Target::Root, &["ip", "link", "del", name]);
            }
        }

        for name in &namespaces {
            self.best_effort(Target::Root, &["ip", "netns", "del", name]);
        }

        self.state = NetworkState::Stopped;
        log::info!("*** Done");
    }

    fn kill_namespace_processes(&mut self, namespace: &str) {
        let output = match self.shell.run(Target::Root, &["ip", "netns", "pids", namespace]) {
            Ok(output) if output.success => output,
            Ok(_) | Err(_) => return,
        };
        for pid in output.stdout.split_whitespace() {
            self.best_effort(Target::Root, &["kill", pid]);
        }
    }

    fn best_effort(&mut self, target: Target<'_>, argv: &[&str]) {
        match self.shell.run(target, argv) {
            Ok(output) if output.success => {}
            Ok(output) => log::warn!("{} failed: {}", describe(target, argv), output.text()),
            Err(e) => log::warn!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::shell::RecordingShell;
    use crate::routing::router_route_table;
    use crate::topology::{build_lan_topology, build_router_topology};

    #[test]
    fn test_lan_uses_ovs_with_controller() {
        let mut net = Network::new(build_lan_topology().unwrap(), RecordingShell::new());
        net.build().unwrap();
        net.start().unwrap();

        let root = net.shell().root_lines();
        assert!(root.contains(&"ovs-vsctl --may-exist add-br s1"));
        assert!(root.contains(&"ovs-vsctl set-fail-mode s1 secure"));
        assert!(root.contains(&"ovs-vsctl set-controller s1 tcp:127.0.0.1:6633"));
        assert!(root.contains(&"ip link add h1-eth0 type veth peer name s1-eth1"));
        assert!(root.contains(&"ovs-vsctl --may-exist add-port s1 s1-eth1"));
        assert_eq!(
            net.shell().lines_for("h3"),
            vec![
                "ip link set lo up",
                "ip addr add 10.0.0.3/8 dev h3-eth0",
                "ip link set h3-eth0 up"
            ]
        );
        assert_eq!(net.state(), NetworkState::Started);
    }

    #[test]
    fn test_router_topology_uses_linux_bridges() {
        let mut net = Network::new(build_router_topology().unwrap(), RecordingShell::new());
        net.build().unwrap();

        let root = net.shell().root_lines();
        assert!(root.contains(&"ip link add name s1 type bridge"));
        assert!(root.contains(&"ip link set s1-eth1 master s1"));
        assert!(!root.iter().any(|l| l.starts_with("ovs-vsctl")));

        let h2 = net.shell().lines_for("h2");
        assert!(h2.contains(&"ip route add default via 10.1.0.1"));
        let r1 = net.shell().lines_for("r1");
        assert!(r1.contains(&"ip addr add 10.100.0.1/24 dev r1-eth2"));
        assert_eq!(r1.last(), Some(&"sysctl net.ipv4.ip_forward=1"));
    }

    #[test]
    fn test_route_failures_are_reported_not_fatal() {
        let shell = RecordingShell::new().fail_on(Some("r2"), "10.3.0.0/24");
        let mut net = Network::new(build_router_topology().unwrap(), shell);
        net.build().unwrap();
        let table = router_route_table().unwrap();
        let report = net.install_routes(&table);

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.router, "r2");
        assert_eq!(report.installed.len(), table.len() - 1);
        assert!(net.has_routes("r2"));
        assert!(!report.is_complete());
    }

    #[test]
    fn test_routes_installed_once_per_router() {
        let mut net = Network::new(build_router_topology().unwrap(), RecordingShell::new());
        net.build().unwrap();
        let table = router_route_table().unwrap();
        let first = net.install_routes(&table);
        let issued = net.shell().commands().len();

        let second = net.install_routes(&table);
        assert_eq!(first.installed.len(), table.len());
        assert!(second.installed.is_empty());
        assert_eq!(second.skipped.len(), table.len());
        assert_eq!(net.shell().commands().len(), issued);
        let r1_routes = net
            .shell()
            .lines_for("r1")
            .into_iter()
            .filter(|l| l.starts_with("ip route add"))
            .count();
        assert_eq!(r1_routes, table.for_router("r1").count());
    }

    #[test]
    fn test_build_error_propagates() {
        let shell = RecordingShell::new().fail_on(None, "ip netns add h2");
        let mut net = Network::new(build_lan_topology().unwrap(), shell);
        let err = net.build().unwrap_err();
        assert!(matches!(err, EmulatorError::Shell(ShellError::Failed { .. })));
        assert_eq!(net.state(), NetworkState::Declared);
    }

    #[test]
    fn test_stop_is_idempotent_and_forwarding_off_last() {
        let mut net = Network::new(build_router_topology().unwrap(), RecordingShell::new());
        net.build().unwrap();
        net.install_routes(&router_route_table().unwrap());
        net.start().unwrap();
        net.stop();
        let issued = net.shell().commands().len();
        net.stop();
        assert_eq!(net.shell().commands().len(), issued);

        for router in ["r1", "r2", "r3", "r4"] {
            let lines = net.shell().lines_for(router);
            assert_eq!(lines.last(), Some(&"sysctl net.ipv4.ip_forward=0"));
        }
        let root = net.shell().root_lines();
        assert!(root.contains(&"ip netns del h4"));
        assert!(root.contains(&"ip link del s4"));
    }

    #[test]
    fn test_cmd_targets() {
        let mut net = Network::new(build_lan_topology().unwrap(), RecordingShell::new());
        net.cmd("h1", "ip addr").unwrap();
        net.cmd("s1", "ovs-ofctl dump-flows s1").unwrap();
        assert!(matches!(net.cmd("h9", "true"), Err(EmulatorError::UnknownNode(_))));
        assert_eq!(net.shell().lines_for("h1"), vec!["sh -c ip addr"]);
        assert_eq!(net.shell().root_lines(), vec!["sh -c ovs-ofctl dump-flows s1"]);
        assert_eq!(net.address_of("h6"), Some(Ipv4Addr::new(10, 0, 0, 6)));
    }
}
