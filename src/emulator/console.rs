//! Line-oriented console over a running [`Network`].

use super::network::Network;
use super::shell::Shell;
use std::io::{self, BufRead, Write};

/// Prompt printed before every command
pub const PROMPT: &str = "netlab> ";

const HELP: &str = "\
Documented commands:
  help               show this text
  nodes              list nodes
  net                list links per node
  links              list links
  routes <node>      show the kernel routing table of a host or router
  pingall            ping between every pair of hosts and routers
  <node> <cmd>       run a shell command on a node
  exit | quit        leave the console";

/// Whether the console keeps reading after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Interactive console bound to a network
pub struct Console<'a, S: Shell> {
    net: &'a mut Network<S>,
}

impl<'a, S: Shell> Console<'a, S> {
    pub fn new(net: &'a mut Network<S>) -> Self {
        Self { net }
    }

    /// Read commands until `exit`, `quit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        let mut line = String::new();
        loop {
            write!(output, "{}", PROMPT)?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(());
            }
            if self.execute(line.trim(), &mut output)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Execute one command line
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(Flow::Continue);
        };

        match first {
            "exit" | "quit" => return Ok(Flow::Exit),
            "help" | "?" => writeln!(out, "{}", HELP)?,
            "nodes" => self.nodes(out)?,
            "net" => self.net_listing(out)?,
            "links" => self.links(out)?,
            "pingall" => self.pingall(out)?,
            "routes" => match words.next() {
                Some(node) => self.routes(node, out)?,
                None => writeln!(out, "*** usage: routes <node>")?,
            },
            node if self.net.topology().node(node).is_some() => {
                let command = line
                    .split_once(char::is_whitespace)
                    .map(|(_, rest)| rest.trim())
                    .unwrap_or("");
                if command.is_empty() {
                    writeln!(out, "*** Enter a command for node: {} <cmd>", node)?;
                } else {
                    self.run_on(node, command, out)?;
                }
            }
            _ => writeln!(out, "*** Unknown command: {}", line)?,
        }

        Ok(Flow::Continue)
    }

    fn routes<W: Write>(&mut self, node: &str, out: &mut W) -> io::Result<()> {
        match self.net.topology().role_of(node) {
            Some(role) if role.has_namespace() => self.run_on(node, "ip route show", out),
            Some(role) => writeln!(out, "*** {} is a {} and has no routing table", node, role),
            None => writeln!(out, "*** Unknown node: {}", node),
        }
    }

    fn run_on<W: Write>(&mut self, node: &str, command: &str, out: &mut W) -> io::Result<()> {
        match self.net.cmd(node, command) {
            Ok(output) => {
                let text = output.text();
                if !text.is_empty() {
                    writeln!(out, "{}", text)?;
                }
            }
            Err(e) => writeln!(out, "*** Error: {}", e)?,
        }
        Ok(())
    }

    fn nodes<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let topology = self.net.topology();
        let mut names: Vec<&str> = topology.controller.iter().map(|c| c.name.as_str()).collect();
        names.extend(topology.nodes.iter().map(|n| n.name.as_str()));
        writeln!(out, "available nodes are: ")?;
        writeln!(out, "{}", names.join(" "))
    }

    fn net_listing<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let topology = self.net.topology();
        for node in &topology.nodes {
            let ports: Vec<String> = topology
                .interfaces_of(&node.name)
                .into_iter()
                .map(|i| format!("{}:{}", i.name, i.peer_name))
                .collect();
            writeln!(out, "{} {}", node.name, ports.join(" "))?;
        }
        if let Some(controller) = &topology.controller {
            writeln!(out, "{}", controller.name)?;
        }
        Ok(())
    }

    fn links<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let interfaces = self.net.topology().interfaces();
        for pair in interfaces.chunks(2) {
            if let [a, b] = pair {
                writeln!(out, "{}<->{}", a.name, b.name)?;
            }
        }
        Ok(())
    }

    fn pingall<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let targets: Vec<(String, String)> = self
            .net
            .namespaces()
            .into_iter()
            .filter_map(|n| self.net.address_of(&n).map(|a| (n, a.to_string())))
            .collect();

        writeln!(out, "*** Ping: testing ping reachability")?;
        let mut sent = 0usize;
        let mut received = 0usize;
        for (source, _) in &targets {
            let mut results = Vec::new();
            for (dest, address) in &targets {
                if dest == source {
                    continue;
                }
                sent += 1;
                let reached = self
                    .net
                    .cmd(source, &format!("ping -c1 -W1 {}", address))
                    .map(|o| o.success)
                    .unwrap_or(false);
                if reached {
                    received += 1;
                    results.push(dest.as_str());
                } else {
                    results.push("X");
                }
            }
            writeln!(out, "{} -> {}", source, results.join(" "))?;
        }

        let dropped = if sent == 0 { 0 } else { 100 * (sent - received) / sent };
        writeln!(
            out,
            "*** Results: {}% dropped ({}/{} received)",
            dropped, received, sent
        )
    }
}
