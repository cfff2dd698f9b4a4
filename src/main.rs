//! Binary entry point for the mooring CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use mooring::{
    ConfigError, EventBus, Fixture, FixtureError, Intent, IntentOutcome, MemoryGateway,
    MooringConfig, Orchestrator, RenderSurface,
};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("fixture error: {0}")]
    Fixture(#[from] FixtureError),
    #[error("failed to write output: {0}")]
    Output(String),
}

/// One replayed intent and what came of it.
#[derive(Debug, Serialize)]
struct Step {
    intent: Intent,
    #[serde(flatten)]
    result: StepResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum StepResult {
    Ok(IntentOutcome),
    Error(String),
}

#[derive(Debug, Serialize)]
struct ApplyReport {
    steps: Vec<Step>,
    refreshes_from_events: usize,
    surface: RenderSurface,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.args().log_level);
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .is_err()
    {
        debug!("tracing subscriber already installed");
    }
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = MooringConfig::load_without_cli_args()?;
    config.validate()?;
    match cli {
        Cli::Render(args) => {
            let fixture = Fixture::load(&args.fixture)?;
            let orchestrator = mount(&fixture, &config).await;
            let surface = orchestrator.surface();
            orchestrator.unmount().await;
            write_json(&surface)
        }
        Cli::Apply(args) => {
            let report = apply(&args.fixture, &config).await?;
            write_json(&report)
        }
    }
}

async fn mount(fixture: &Fixture, config: &MooringConfig) -> Orchestrator<MemoryGateway, EventBus> {
    let bus = EventBus::new(config.event_buffer);
    let gateway = fixture.gateway(bus.clone());
    let orchestrator = Orchestrator::mount(fixture.parent.clone(), gateway, bus, config.settings());
    if let Err(err) = orchestrator.load().await {
        warn!(error = %err, "initial load failed");
    }
    orchestrator
}

async fn apply(path: &Utf8Path, config: &MooringConfig) -> Result<ApplyReport, CliError> {
    let fixture = Fixture::load(path)?;
    let orchestrator = mount(&fixture, config).await;

    let mut steps = Vec::with_capacity(fixture.intents.len());
    let mut refreshes_from_events = 0;
    for intent in fixture.intents.iter().cloned() {
        let result = match orchestrator.dispatch(intent.clone()).await {
            Ok(outcome) => StepResult::Ok(outcome),
            Err(err) => StepResult::Error(err.to_string()),
        };
        refreshes_from_events += orchestrator.process_pending_events().await;
        steps.push(Step { intent, result });
    }

    for event in &fixture.events {
        orchestrator.events().publish(event.clone());
    }
    refreshes_from_events += orchestrator.process_pending_events().await;
    debug!(steps = steps.len(), refreshes_from_events, "fixture replayed");

    let surface = orchestrator.surface();
    orchestrator.unmount().await;
    Ok(ApplyReport {
        steps,
        refreshes_from_events,
        surface,
    })
}

fn write_json(value: &impl Serialize) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(io::stdout(), "{json}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_writes_cli_error() {
        let mut buffer = Vec::new();
        write_error(
            &mut buffer,
            &CliError::Output(String::from("broken pipe")),
        );
        assert_eq!(
            String::from_utf8(buffer).expect("utf8"),
            "failed to write output: broken pipe\n"
        );
    }

    #[test]
    fn step_results_serialise_flat() {
        let step = Step {
            intent: Intent::CloseDrawer,
            result: StepResult::Error(String::from("no drawer is open")),
        };
        let json = serde_json::to_value(&step).expect("serialise");
        assert_eq!(json["intent"]["intent"], "close_drawer");
        assert_eq!(json["error"], "no drawer is open");
    }
}
