// vigil-cli/src/main.rs
// ============================================================================
// Module: Vigil CLI
// Description: Command-line entry point driving the canned demo scenarios.
// Purpose: Give an operator a way to exercise the full triage-through-
//          verification pipeline against deterministic fixture data without
//          standing up a real document-store backend or the integration
//          adapters' live credentials.
// ============================================================================

//! ## Overview
//! Three subcommands cover the CLI surface: `run-scenario <id>` drives one
//! named scenario end to end and reports its outcome, `demo:all` does the
//! same for every registered scenario in order, and `cleanup` removes the
//! run-report artifacts those commands leave behind under `.vigil/runs/`.
//! Every other document-store-backed concern (the live alert watcher, the
//! approval gate's human-facing poll loop, the integration adapters) runs
//! synchronously, so this binary needs no async runtime at all.

use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use vigil_cli::scenarios;
use vigil_cli::scenarios::ScenarioRun;
use vigil_cli::scenarios::SCENARIOS;

/// Directory the CLI writes per-run report artifacts under.
const RUN_REPORT_DIR: &str = ".vigil/runs";

/// Top-level CLI arguments.
#[derive(Debug, Parser)]
#[command(name = "vigil", disable_help_subcommand = true, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands this binary supports.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Drives one named scenario through the full pipeline and reports its
    /// outcome.
    #[command(name = "run-scenario")]
    RunScenario {
        /// Scenario id, e.g. `geo-anomaly-tier1`. See `demo:all` for the
        /// full list.
        id: String,
    },
    /// Drives every registered scenario through the full pipeline, in
    /// order, and reports each outcome.
    #[command(name = "demo:all")]
    DemoAll,
    /// Removes run-report artifacts written by previous `run-scenario` or
    /// `demo:all` invocations.
    Cleanup,
}

/// A CLI-level failure, reported to the operator and converted to a
/// non-zero exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    message: String,
}

impl CliError {
    const fn new(message: String) -> Self {
        Self { message }
    }
}

/// Result type every command handler returns.
type CliResult<T> = Result<T, CliError>;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario { id } => command_run_scenario(&id),
        Commands::DemoAll => command_demo_all(),
        Commands::Cleanup => command_cleanup(),
    }
}

// ============================================================================
// SECTION: run-scenario / demo:all
// ============================================================================

/// Executes the `run-scenario` command.
fn command_run_scenario(id: &str) -> CliResult<ExitCode> {
    let scenario = scenarios::find(id).ok_or_else(|| {
        CliError::new(format!(
            "unknown scenario `{id}`; run `vigil demo:all` to see every registered scenario"
        ))
    })?;

    let scenario_run = scenarios::run(scenario)
        .map_err(|err| CliError::new(format!("scenario `{id}` failed to run: {err}")))?;

    report_run(&scenario_run)?;
    write_run_report(&scenario_run)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `demo:all` command.
fn command_demo_all() -> CliResult<ExitCode> {
    let mut any_failed = false;
    for scenario in SCENARIOS {
        match scenarios::run(scenario) {
            Ok(scenario_run) => {
                report_run(&scenario_run)?;
                write_run_report(&scenario_run)?;
            }
            Err(err) => {
                any_failed = true;
                write_stderr_line(&format!("scenario `{}` failed to run: {err}", scenario.id))
                    .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            }
        }
    }
    Ok(if any_failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Prints a scenario's expectation alongside its actual outcome.
fn report_run(scenario_run: &ScenarioRun) -> CliResult<()> {
    let scenario = scenario_run.scenario;
    write_stdout_line(&format!("== {} ==", scenario.id))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&format!("  summary:     {}", scenario.summary))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&format!("  expectation: {}", scenario.expectation))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&format!("  outcome:     {}", describe_outcome(&scenario_run.outcome)))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

/// Renders a [`scenarios::DriveOutcome`] without relying on its `Debug`
/// implementation.
fn describe_outcome(outcome: &vigil_coordinator::DriveOutcome) -> String {
    match outcome {
        vigil_coordinator::DriveOutcome::Resolved(incident_id) => {
            format!("resolved (incident {})", incident_id.as_str())
        }
        vigil_coordinator::DriveOutcome::Escalated(incident_id) => {
            format!("escalated (incident {})", incident_id.as_str())
        }
        vigil_coordinator::DriveOutcome::Suppressed(incident_id) => {
            format!("suppressed (incident {})", incident_id.as_str())
        }
        vigil_coordinator::DriveOutcome::Queued(alert_id) => {
            format!("queued (alert {})", alert_id.as_str())
        }
    }
}

/// Writes a JSON report for one scenario run under [`RUN_REPORT_DIR`].
fn write_run_report(scenario_run: &ScenarioRun) -> CliResult<()> {
    let dir = Path::new(RUN_REPORT_DIR);
    fs::create_dir_all(dir)
        .map_err(|err| CliError::new(format!("failed to create `{RUN_REPORT_DIR}`: {err}")))?;

    let scenario = scenario_run.scenario;
    let report = serde_json::json!({
        "scenario_id": scenario.id,
        "expectation": scenario.expectation,
        "outcome": describe_outcome(&scenario_run.outcome),
    });
    let body = serde_json::to_string_pretty(&report)
        .map_err(|err| CliError::new(format!("failed to render report for `{}`: {err}", scenario.id)))?;

    let path = report_path(dir, scenario.id);
    let mut file = fs::File::create(&path)
        .map_err(|err| CliError::new(format!("failed to create `{}`: {err}", path.display())))?;
    file.write_all(body.as_bytes())
        .map_err(|err| CliError::new(format!("failed to write `{}`: {err}", path.display())))?;
    Ok(())
}

/// Builds the report path for a given scenario id.
fn report_path(dir: &Path, scenario_id: &str) -> PathBuf {
    dir.join(format!("{scenario_id}.json"))
}

// ============================================================================
// SECTION: cleanup
// ============================================================================

/// Executes the `cleanup` command: removes every run-report artifact this
/// CLI has written under [`RUN_REPORT_DIR`]. The document store itself is
/// in-memory and leaves nothing on disk, so report files are the only
/// state a run leaves behind.
fn command_cleanup() -> CliResult<ExitCode> {
    let dir = Path::new(RUN_REPORT_DIR);
    if dir.exists() {
        fs::remove_dir_all(dir)
            .map_err(|err| CliError::new(format!("failed to remove `{RUN_REPORT_DIR}`: {err}")))?;
    }
    write_stdout_line(&format!("removed `{RUN_REPORT_DIR}`"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output-stream-write failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Prints a terminal error message and returns the CLI's failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test fixtures use explicit asserts and unwraps for clarity.")]

    use super::*;

    #[test]
    fn report_path_uses_the_scenario_id_as_the_file_stem() {
        let dir = Path::new(RUN_REPORT_DIR);
        let path = report_path(dir, "geo-anomaly-tier1");
        assert_eq!(path, dir.join("geo-anomaly-tier1.json"));
    }

    #[test]
    fn cli_parses_run_scenario_with_an_id() {
        let cli = Cli::try_parse_from(["vigil", "run-scenario", "geo-anomaly-tier1"]).expect("parses");
        match cli.command {
            Commands::RunScenario { id } => assert_eq!(id, "geo-anomaly-tier1"),
            Commands::DemoAll | Commands::Cleanup => panic!("wrong subcommand parsed"),
        }
    }

    #[test]
    fn cli_parses_demo_all() {
        let cli = Cli::try_parse_from(["vigil", "demo:all"]).expect("parses");
        assert!(matches!(cli.command, Commands::DemoAll));
    }

    #[test]
    fn cli_parses_cleanup() {
        let cli = Cli::try_parse_from(["vigil", "cleanup"]).expect("parses");
        assert!(matches!(cli.command, Commands::Cleanup));
    }

    #[test]
    fn cli_rejects_unknown_subcommands() {
        assert!(Cli::try_parse_from(["vigil", "not-a-command"]).is_err());
    }
}
