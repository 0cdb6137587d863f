//! `policy-prep`: runs one policy preparation flow from the command line.
//!
//! Exit codes: 0 when the flow completes, 1 when a step fails, 2 when the
//! requested flow does not exist.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use policyflow::context::{Notification, NotificationLevel, RunObserver, RunSnapshot};
use policyflow::logger::{init_tracing_with, RunLogger};
use policyflow::prelude::*;
use policyflow::runtime::GenovaClient;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "policy-prep", version, about = "Run a policy preparation flow")]
struct Cli {
    /// Flow to run, e.g. motor-policy-creation
    #[arg(short, long)]
    flow: Option<String>,

    /// Load flow definitions from a YAML or JSON file instead of the built-in motor flows
    #[arg(long)]
    flows: Option<PathBuf>,

    /// Use simulated operations instead of calling Genova
    #[arg(long)]
    simulate: bool,

    /// Fixed delay of each simulated call; random 2-4 s when omitted
    #[arg(long, requires = "simulate")]
    delay_ms: Option<u64>,

    /// Run parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// List the available flows and exit
    #[arg(long)]
    list: bool,

    /// Print every snapshot as a JSON line instead of progress text
    #[arg(long)]
    json: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

/// Prints progress lines as steps change state
struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_snapshot(&self, snapshot: &RunSnapshot) {
        if let Some(step) = snapshot.in_progress() {
            println!("[{:>4}] {step}...", snapshot.progress.to_string());
        }
    }

    fn on_notification(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Success => println!("[100%] {}", notification.message),
            NotificationLevel::Error => eprintln!(
                "error: {} ({})",
                notification.message,
                notification.step_id.as_deref().unwrap_or("-")
            ),
        }
    }
}

/// Emits snapshots as JSON lines on stdout
struct JsonLinesObserver;

impl RunObserver for JsonLinesObserver {
    fn on_snapshot(&self, snapshot: &RunSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize snapshot"),
        }
    }
}

fn catalog(cli: &Cli, config: &AppConfig) -> Result<OperationCatalog> {
    if cli.simulate {
        let delay = match cli.delay_ms {
            Some(ms) => Delay::Fixed(Duration::from_millis(ms)),
            None => Delay::placeholder(),
        };
        return Ok(motor::simulated_catalog(delay));
    }

    let client =
        GenovaClient::new(&config.genova_config()).context("Failed to create Genova client")?;
    Ok(motor::genova_catalog(
        Arc::new(client),
        &config.genova.document_base,
    ))
}

fn registry(cli: &Cli, catalog: &OperationCatalog) -> Result<FlowRegistry> {
    match &cli.flows {
        Some(path) => {
            let flows = FlowLoader::from_file(path)?;
            FlowLoader::build_registry(&flows, catalog)
                .with_context(|| format!("Invalid flow definitions in {}", path.display()))
        }
        None => motor::registry(catalog).context("Failed to build motor flows"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    if let Err(e) = init_tracing_with(&config.logging.level, config.logging.format) {
        eprintln!("tracing already initialised: {e}");
    }

    run(&cli, &config).await
}

async fn run(cli: &Cli, config: &AppConfig) -> Result<ExitCode> {
    let catalog = catalog(cli, config)?;
    run_with(cli, config, &catalog).await
}

async fn run_with(cli: &Cli, config: &AppConfig, catalog: &OperationCatalog) -> Result<ExitCode> {
    let registry = registry(cli, catalog)?;

    if cli.list {
        for flow in registry.flows() {
            println!("{:<24} {} ({} steps)", flow.id, flow.title, flow.len());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let requested = cli
        .flow
        .as_deref()
        .ok_or_else(|| anyhow!("--flow is required unless --list is given"))?;
    let flow = match registry.select(requested) {
        FlowSelection::Ready(flow) => flow,
        FlowSelection::Invalid { requested } => {
            eprintln!("Invalid Flow: '{requested}'");
            eprintln!("available flows: {}", registry.flow_ids().join(", "));
            return Ok(ExitCode::from(2));
        }
    };

    let params: HashMap<String, Value> = cli
        .params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    let logger = RunLogger::new();
    let display: Arc<dyn RunObserver> = if cli.json {
        Arc::new(JsonLinesObserver)
    } else {
        println!("{}: {}", flow.title, flow.description);
        Arc::new(ConsoleObserver)
    };
    let runner = StepRunner::with_config(config.runner_config())
        .observe(Arc::new(logger.clone()))
        .observe(display);

    let report = runner.run(&flow, params).await?;
    logger.log_summary(&report);
    logger.log_step_details(&report);

    if report.is_success() {
        if let (Some(artifact), false) = (&report.result_artifact, cli.json) {
            println!("Documents: {artifact}");
        }
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("policy_no=LIC/HQ/MOT/MC/24/476").unwrap(),
            ("policy_no".to_string(), "LIC/HQ/MOT/MC/24/476".to_string())
        );
        assert_eq!(parse_param("note=a=b").unwrap().1, "a=b");
        assert!(parse_param("=x").is_err());
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            "policy-prep",
            "--flow",
            "motor-policy-renewal",
            "--simulate",
            "--delay-ms",
            "0",
            "-p",
            "policy_no=P-1",
            "--param",
            "effective_date=2026-10-17",
        ])
        .unwrap();
        assert_eq!(cli.flow.as_deref(), Some("motor-policy-renewal"));
        assert_eq!(cli.delay_ms, Some(0));
        assert_eq!(cli.params.len(), 2);

        assert!(Cli::try_parse_from(["policy-prep", "--delay-ms", "5"]).is_err());
    }

    fn simulated(args: &[&str]) -> Cli {
        let base = ["policy-prep", "--simulate", "--delay-ms", "0"];
        Cli::try_parse_from(base.iter().chain(args)).unwrap()
    }

    #[tokio::test]
    async fn test_exit_code_for_unknown_flow() {
        let cli = simulated(&["--flow", "unknown-flow"]);
        let code = run(&cli, &AppConfig::default()).await.unwrap();
        assert_eq!(code, ExitCode::from(2));
    }

    #[tokio::test]
    async fn test_exit_code_for_completed_flow() {
        let cli = simulated(&["--flow", motor::POLICY_RENEWAL, "-p", "policy_no=P-1"]);
        let code = run(&cli, &AppConfig::default()).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let listing = simulated(&["--list"]);
        let code = run(&listing, &AppConfig::default()).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_exit_code_for_failed_step() {
        let mut catalog = motor::simulated_catalog(Delay::None);
        catalog.insert(
            motor::RENEW_POLICY,
            Arc::new(SimulatedOperation::failing("Policy not due for renewal")),
        );
        let cli = simulated(&["--flow", motor::POLICY_RENEWAL, "--json"]);
        let code = run_with(&cli, &AppConfig::default(), &catalog).await.unwrap();
        assert_eq!(code, ExitCode::from(1));
    }

    #[tokio::test]
    async fn test_flow_is_required_without_list() {
        let err = run(&simulated(&[]), &AppConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("--flow is required"));
    }
}
