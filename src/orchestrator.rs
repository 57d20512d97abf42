//! Scenario runner.
//!
//! This module drives one scenario through its whole life: validation,
//! network construction, static route installation, switch and service
//! start-up, the interactive console and teardown. Teardown runs whether or
//! not the steps before it succeeded.

use crate::config::Scenario;
use crate::emulator::{
    controller_reachable, Console, InstallReport, Network, RecordedCommand, RecordingShell, Shell,
    CONTROLLER_CONNECT_TIMEOUT,
};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{info, warn};
use std::io::{BufRead, Write};

/// Streams the console reads from and writes to
pub struct ConsoleIo<'a> {
    pub input: &'a mut dyn BufRead,
    pub output: &'a mut dyn Write,
}

/// Result of a completed scenario run
pub struct ScenarioRun<S> {
    /// The shell, handed back after teardown
    pub shell: S,
    pub routes: InstallReport,
}

/// Run a scenario end to end.
///
/// Without `console` the network is torn down as soon as it is up.
pub fn run_scenario<S: Shell>(
    scenario: &Scenario,
    shell: S,
    console: Option<ConsoleIo<'_>>,
) -> Result<ScenarioRun<S>> {
    scenario
        .validate()
        .wrap_err_with(|| format!("Scenario '{}' is invalid", scenario.name))?;

    if let Some(controller) = &scenario.topology.controller {
        if shell.is_live() && !controller_reachable(controller, CONTROLLER_CONNECT_TIMEOUT) {
            warn!(
                "Unable to contact the remote controller at {}",
                controller.socket_addr()
            );
        }
    }

    let mut net = Network::new(scenario.topology.clone(), shell);
    let outcome = bring_up(&mut net, scenario, console);
    net.stop();

    let routes = outcome?;
    Ok(ScenarioRun {
        shell: net.into_shell(),
        routes,
    })
}

fn bring_up<S: Shell>(
    net: &mut Network<S>,
    scenario: &Scenario,
    console: Option<ConsoleIo<'_>>,
) -> Result<InstallReport> {
    info!("*** Creating network");
    net.build().wrap_err("Failed to build the network")?;

    let report = if scenario.routes.is_empty() {
        InstallReport::default()
    } else {
        info!("*** Installing static routes");
        net.install_routes(&scenario.routes)
    };
    if !report.is_complete() {
        warn!("{} static routes could not be installed", report.failed.len());
    }

    info!("*** Starting network");
    net.start().wrap_err("Failed to start switches")?;

    for service in &scenario.services {
        info!("*** Starting '{}' on {}", service.command, service.host);
        net.start_service(&service.host, &service.command)
            .wrap_err_with(|| format!("Failed to start service on {}", service.host))?;
    }

    if let Some(io) = console {
        info!("*** Starting CLI:");
        if let Err(e) = Console::new(net).run(io.input, io.output) {
            warn!("Console terminated: {}", e);
        }
    }

    Ok(report)
}

/// Every command a scenario would issue, from build to teardown, without
/// touching the system
pub fn plan_scenario(scenario: &Scenario) -> Result<Vec<RecordedCommand>> {
    let run = run_scenario(scenario, RecordingShell::new(), None)?;
    Ok(run.shell.commands().to_vec())
}

/// Render a command plan one line per command
pub fn format_plan(plan: &[RecordedCommand]) -> String {
    plan.iter()
        .map(|c| {
            let prefix = if c.background { "&" } else { "" };
            match &c.node {
                Some(node) => format!("{}{}: {}", prefix, node, c.line),
                None => format!("{}{}", prefix, c.line),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
