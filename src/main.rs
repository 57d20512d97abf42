use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use netlab::config::Scenario;
use netlab::config_loader::{self, Format};
use netlab::emulator::{NetnsShell, RecordingShell, Shell};
use netlab::orchestrator::{self, ConsoleIo, ScenarioRun};
use std::io;
use std::path::PathBuf;

/// Emulate small networks on Linux network namespaces
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the single-switch LAN wired to an external controller
    Lan(RunArgs),

    /// Run the four-router internetwork with its static routes
    Routers(RunArgs),

    /// Run a scenario from a YAML or JSON file
    Run {
        /// Path to the scenario file
        #[arg(short, long)]
        config: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Write a built-in scenario as YAML or JSON
    Export {
        scenario: BuiltIn,

        /// Output file; the extension picks the format. Prints to stdout if absent
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print JSON instead of YAML when writing to stdout
        #[arg(long, conflicts_with = "output")]
        json: bool,
    },

    /// Validate a scenario and print every command it would issue
    Check {
        #[arg(required_unless_present = "config")]
        scenario: Option<BuiltIn>,

        /// Path to a scenario file
        #[arg(short, long, conflicts_with = "scenario")]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct RunArgs {
    /// Record commands instead of executing them, then print them
    #[arg(long)]
    dry_run: bool,

    /// Tear the network down once it is up instead of opening the console
    #[arg(long)]
    no_cli: bool,

    /// Do not prefix commands with sudo
    #[arg(long)]
    no_sudo: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum BuiltIn {
    Lan,
    Routers,
}

impl BuiltIn {
    fn scenario(self) -> Result<Scenario> {
        let scenario = match self {
            Self::Lan => Scenario::lan()?,
            Self::Routers => Scenario::routers()?,
        };
        Ok(scenario)
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match args.command {
        Command::Lan(run) => execute(&BuiltIn::Lan.scenario()?, run),
        Command::Routers(run) => execute(&BuiltIn::Routers.scenario()?, run),
        Command::Run { config, run } => {
            let scenario = config_loader::load_scenario(&config)?;
            execute(&scenario, run)
        }
        Command::Export {
            scenario,
            output,
            json,
        } => export(&scenario.scenario()?, output, json),
        Command::Check { scenario, config } => check(scenario, config),
    }
}

fn execute(scenario: &Scenario, run: RunArgs) -> Result<()> {
    info!("Running scenario '{}'", scenario.name);

    if run.dry_run {
        let outcome = launch(scenario, RecordingShell::new(), run.no_cli)?;
        println!("{}", orchestrator::format_plan(outcome.shell.commands()));
    } else {
        launch(scenario, NetnsShell::new(!run.no_sudo), run.no_cli)?;
    }

    info!("Scenario '{}' finished", scenario.name);
    Ok(())
}

fn launch<S: Shell>(scenario: &Scenario, shell: S, no_cli: bool) -> Result<ScenarioRun<S>> {
    if no_cli {
        return orchestrator::run_scenario(scenario, shell, None);
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    orchestrator::run_scenario(
        scenario,
        shell,
        Some(ConsoleIo {
            input: &mut input,
            output: &mut output,
        }),
    )
}

fn export(scenario: &Scenario, output: Option<PathBuf>, json: bool) -> Result<()> {
    match output {
        Some(path) => config_loader::write_scenario(scenario, &path),
        None => {
            let format = if json { Format::Json } else { Format::Yaml };
            print!("{}", config_loader::render_scenario(scenario, format)?);
            Ok(())
        }
    }
}

fn check(builtin: Option<BuiltIn>, config: Option<PathBuf>) -> Result<()> {
    let scenario = match (builtin, config) {
        (_, Some(path)) => config_loader::load_scenario(&path)?,
        (Some(builtin), None) => builtin.scenario()?,
        (None, None) => return Err(eyre!("Either a built-in scenario or --config is required")),
    };

    let plan = orchestrator::plan_scenario(&scenario)
        .wrap_err_with(|| format!("Failed to plan scenario '{}'", scenario.name))?;
    println!("{}", orchestrator::format_plan(&plan));

    info!(
        "Scenario '{}' is valid: {} routes, {} commands",
        scenario.name,
        scenario.routes.len(),
        plan.len()
    );
    Ok(())
}
