//! Command execution against the root namespace and node namespaces.
//!
//! [`NetnsShell`] runs commands for real through `ip netns exec`;
//! [`RecordingShell`] only records them, which is what `--dry-run` and the
//! tests use.

use std::process::{Child, Command, Output, Stdio};

/// Where a command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// The root namespace (switches, veth creation, namespace management)
    Root,
    /// Inside the namespace of the named node
    Node(&'a str),
}

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(stderr: &str) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Combined stdout and stderr, as an operator would see it
    pub fn text(&self) -> String {
        let mut text = self.stdout.trim_end().to_string();
        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Errors from running commands
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Render a command the way it appears in logs
pub fn describe(target: Target<'_>, argv: &[&str]) -> String {
    match target {
        Target::Root => argv.join(" "),
        Target::Node(node) => format!("{}: {}", node, argv.join(" ")),
    }
}

/// Executes commands for the emulated network
pub trait Shell {
    /// Run a command to completion. A non-zero exit is not an error here.
    fn run(&mut self, target: Target<'_>, argv: &[&str]) -> Result<CommandOutput, ShellError>;

    /// Start a long-running command in the background
    fn spawn(&mut self, target: Target<'_>, argv: &[&str]) -> Result<(), ShellError>;

    /// Stop every background command started with [`Shell::spawn`]
    fn reap(&mut self);

    /// Returns true if commands reach a real kernel
    fn is_live(&self) -> bool {
        false
    }

    /// Run a command, turning a non-zero exit into [`ShellError::Failed`]
    fn run_checked(&mut self, target: Target<'_>, argv: &[&str]) -> Result<CommandOutput, ShellError> {
        let output = self.run(target, argv)?;
        if !output.success {
            return Err(ShellError::Failed {
                command: describe(target, argv),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// Runs commands on the local machine, entering node namespaces with
/// `ip netns exec`.
pub struct NetnsShell {
    sudo: bool,
    children: Vec<(String, Child)>,
}

impl NetnsShell {
    /// Create a shell; with `sudo` every command is prefixed by `sudo`
    pub fn new(sudo: bool) -> Self {
        Self {
            sudo,
            children: Vec::new(),
        }
    }

    fn command(&self, target: Target<'_>, argv: &[&str]) -> Command {
        let mut full: Vec<&str> = Vec::with_capacity(argv.len() + 5);
        if self.sudo {
            full.push("sudo");
        }
        if let Target::Node(node) = target {
            full.extend_from_slice(&["ip", "netns", "exec", node]);
        }
        full.extend_from_slice(argv);

        let mut cmd = Command::new(full[0]);
        cmd.args(&full[1..]);
        cmd
    }
}

impl Shell for NetnsShell {
    fn run(&mut self, target: Target<'_>, argv: &[&str]) -> Result<CommandOutput, ShellError> {
        log::debug!("exec {}", describe(target, argv));
        self.command(target, argv)
            .output()
            .map(CommandOutput::from)
            .map_err(|source| ShellError::Spawn {
                command: describe(target, argv),
                source,
            })
    }

    fn spawn(&mut self, target: Target<'_>, argv: &[&str]) -> Result<(), ShellError> {
        let label = describe(target, argv);
        let child = self
            .command(target, argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ShellError::Spawn {
                command: label.clone(),
                source,
            })?;
        log::debug!("spawned pid {} for {}", child.id(), label);
        self.children.push((label, child));
        Ok(())
    }

    fn reap(&mut self) {
        for (label, mut child) in self.children.drain(..) {
            let _ = child.kill();
            let _ = child.wait();
            log::debug!("stopped {}", label);
        }
    }

    fn is_live(&self) -> bool {
        true
    }
}

impl Drop for NetnsShell {
    fn drop(&mut self) {
        self.reap();
    }
}

/// A command seen by [`RecordingShell`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommand {
    /// Node namespace, `None` for the root namespace
    pub node: Option<String>,
    pub line: String,
    pub background: bool,
}

/// Records commands instead of running them.
///
/// Every command succeeds unless it matches a pattern registered with
/// [`RecordingShell::fail_on`].
#[derive(Debug, Default)]
pub struct RecordingShell {
    log: Vec<RecordedCommand>,
    failures: Vec<(Option<String>, String)>,
    running: usize,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make commands on `node` (or anywhere, for `None`) containing `pattern` fail
    pub fn fail_on(mut self, node: Option<&str>, pattern: &str) -> Self {
        self.failures.push((node.map(str::to_string), pattern.to_string()));
        self
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.log
    }

    /// Command lines issued inside one node, in order
    pub fn lines_for(&self, node: &str) -> Vec<&str> {
        self.log
            .iter()
            .filter(|c| c.node.as_deref() == Some(node))
            .map(|c| c.line.as_str())
            .collect()
    }

    /// Command lines issued in the root namespace, in order
    pub fn root_lines(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter(|c| c.node.is_none())
            .map(|c| c.line.as_str())
            .collect()
    }

    /// Background commands still considered running
    pub fn running(&self) -> usize {
        self.running
    }

    fn record(&mut self, target: Target<'_>, argv: &[&str], background: bool) -> bool {
        let node = match target {
            Target::Root => None,
            Target::Node(n) => Some(n.to_string()),
        };
        let line = argv.join(" ");
        let fails = self.failures.iter().any(|(fail_node, pattern)| {
            (fail_node.is_none() || fail_node == &node) && line.contains(pattern.as_str())
        });
        log::debug!("[dry-run] {}", describe(target, argv));
        self.log.push(RecordedCommand {
            node,
            line,
            background,
        });
        !fails
    }
}

impl Shell for RecordingShell {
    fn run(&mut self, target: Target<'_>, argv: &[&str]) -> Result<CommandOutput, ShellError> {
        if self.record(target, argv, false) {
            Ok(CommandOutput::ok())
        } else {
            Ok(CommandOutput::failed("simulated failure"))
        }
    }

    fn spawn(&mut self, target: Target<'_>, argv: &[&str]) -> Result<(), ShellError> {
        if self.record(target, argv, true) {
            self.running += 1;
            Ok(())
        } else {
            Err(ShellError::Failed {
                command: describe(target, argv),
                stderr: "simulated failure".to_string(),
            })
        }
    }

    fn reap(&mut self) {
        self.running = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_shell_records_targets() {
        let mut shell = RecordingShell::new();
        shell.run(Target::Root, &["ip", "netns", "add", "h1"]).unwrap();
        shell.run(Target::Node("h1"), &["ip", "link", "set", "lo", "up"]).unwrap();

        assert_eq!(shell.root_lines(), vec!["ip netns add h1"]);
        assert_eq!(shell.lines_for("h1"), vec!["ip link set lo up"]);
    }

    #[test]
    fn test_recording_shell_failure_patterns() {
        let mut shell = RecordingShell::new().fail_on(Some("r3"), "dev r4-eth2");
        let out = shell
            .run(Target::Node("r3"), &["ip", "route", "add", "10.100.0.0/24", "via", "10.102.0.1", "dev", "r4-eth2"])
            .unwrap();
        assert!(!out.success);

        let out = shell
            .run(Target::Node("r4"), &["ip", "route", "add", "10.100.0.0/24", "via", "10.102.0.1", "dev", "r4-eth2"])
            .unwrap();
        assert!(out.success);

        assert!(shell
            .run_checked(Target::Node("r3"), &["ip", "link", "show", "dev", "r4-eth2"])
            .is_err());
    }

    #[test]
    fn test_spawn_and_reap() {
        let mut shell = RecordingShell::new();
        shell.spawn(Target::Node("h1"), &["sh", "-c", "sleep 10"]).unwrap();
        assert_eq!(shell.running(), 1);
        shell.reap();
        assert_eq!(shell.running(), 0);
        assert!(shell.commands()[0].background);
    }

    #[test]
    fn test_output_text_joins_streams() {
        let out = CommandOutput {
            success: false,
            stdout: "line\n".to_string(),
            stderr: "RTNETLINK answers: File exists\n".to_string(),
        };
        assert_eq!(out.text(), "line\nRTNETLINK answers: File exists");
    }
}
