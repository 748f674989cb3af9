// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NumberGoUp Node
//!
//! Entry point for the `ngu-node` binary. Parses CLI arguments, initializes
//! logging and metrics, deploys the token, and serves the HTTP/WS API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — deploy and serve the API plus `/metrics`
//! - `init`    — write a devnet deployment config
//! - `replay`  — deploy, apply a script of operations, print a report
//! - `version` — print build version information

mod api;
mod cli;
mod config;
mod logging;
mod metrics;
mod ops;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;

use ngu_ledger::{audit, Shared};

use cli::{Commands, NguNodeCli};
use config::DeploymentConfig;
use logging::LogFormat;
use metrics::LedgerMetrics;
use ops::{Operation, OperationOutcome};

/// Broadcast channel capacity for live event streaming. A single transfer
/// can emit one event per whole unit moved, so this is sized for bursts.
const EVENT_CHANNEL_CAPACITY: usize = 4096;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = NguNodeCli::parse();
    let format = LogFormat::from_str_lossy(&cli.log_format);

    match cli.command {
        Commands::Run(args) => {
            logging::init_logging("ngu_node=info,ngu_ledger=info,ngu_contracts=info,tower_http=debug", format)?;
            run_node(args).await
        }
        Commands::Init(args) => {
            logging::init_logging("ngu_node=info", format)?;
            init_config(args)
        }
        Commands::Replay(args) => {
            logging::init_logging("ngu_node=warn", format)?;
            replay(args)
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Deploys the token and serves the API and metrics endpoints until a
/// shutdown signal arrives.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    let config = DeploymentConfig::load_or_default(args.config.as_deref())?;
    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        network = %config.network,
        ledger = %config.ledger_address,
        "starting ngu-node"
    );

    // --- Deployment ---
    let mut ngu = config.deploy()?;
    // Construction events predate every subscriber.
    ngu.take_events();

    // --- Metrics ---
    let ledger_metrics = Arc::new(LedgerMetrics::new().context("failed to register metrics")?);
    ledger_metrics.observe(ngu.ledger());

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        network: config.network.clone(),
        ngu: Shared::new(ngu),
        event_tx,
        metrics: Arc::clone(&ledger_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&ledger_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("ngu-node stopped");
    Ok(())
}

/// Writes the devnet deployment config.
fn init_config(args: cli::InitArgs) -> Result<()> {
    let path = &args.output;
    if path.exists() && !args.force {
        bail!("{} already exists (pass --force to overwrite)", path.display());
    }

    let config = DeploymentConfig::default();
    config.save(path)?;
    tracing::info!(path = %path.display(), "deployment config written");

    println!("Config written successfully.");
    println!("  Path           : {}", path.display());
    println!("  Network        : {}", config.network);
    println!("  Token address  : {}", config.ledger_address);
    println!("  Owner          : {}", config.deployment.initial_owner);

    Ok(())
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Final state printed by `ngu-node replay`.
#[derive(Debug, Serialize)]
struct ReplayReport {
    erc20_total_supply: u128,
    erc721_total_supply: u128,
    erc721_queue_length: usize,
    minted: u128,
    applied: usize,
    rejected: usize,
    /// Whether the invariant audit passed on the final state.
    audit_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    audit_violation: Option<String>,
    operations: Vec<OperationOutcome>,
}

fn replay(args: cli::ReplayArgs) -> Result<()> {
    let config = DeploymentConfig::load_or_default(args.config.as_deref())?;
    let script = load_script(&args.script)?;
    let report = run_script(&config, &script, args.fail_fast)?;

    let body = serde_json::to_string_pretty(&report).context("failed to encode replay report")?;
    println!("{}", body);

    if args.fail_fast && report.rejected > 0 {
        bail!("replay stopped at the first rejected operation");
    }
    Ok(())
}

fn load_script(path: &Path) -> Result<Vec<Operation>> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse script {}", path.display()))
}

/// Deploys from `config` and applies `script` in order.
fn run_script(config: &DeploymentConfig, script: &[Operation], fail_fast: bool) -> Result<ReplayReport> {
    let mut ngu = config.deploy()?;
    let mut outcomes = Vec::with_capacity(script.len());

    for (index, op) in script.iter().enumerate() {
        let result = ops::apply(&mut ngu, op);
        ngu.take_events();
        let outcome = OperationOutcome::new(index, op, &result);
        if let Some(error) = &outcome.error {
            tracing::warn!(index, kind = op.kind(), %error, "operation rejected");
        }
        let stop = fail_fast && !outcome.ok;
        outcomes.push(outcome);
        if stop {
            break;
        }
    }

    let ledger = ngu.ledger();
    let audit_result = audit(ledger);
    let rejected = outcomes.iter().filter(|o| !o.ok).count();
    Ok(ReplayReport {
        erc20_total_supply: ledger.erc20_total_supply(),
        erc721_total_supply: ledger.erc721_total_supply(),
        erc721_queue_length: ledger.erc721_queue_length(),
        minted: ledger.minted(),
        applied: outcomes.len() - rejected,
        rejected,
        audit_ok: audit_result.is_ok(),
        audit_violation: audit_result.err().map(|v| v.to_string()),
        operations: outcomes,
    })
}

/// Prints version information to stdout.
fn print_version() {
    println!("ngu-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc    {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed the corresponding branch never completes.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngu_ledger::Address;

    const UNITS: u128 = 1_000_000_000_000_000_000;

    fn script() -> Vec<Operation> {
        let config = DeploymentConfig::default();
        let owner = config.deployment.initial_owner;
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        vec![
            Operation::Transfer {
                from: owner,
                to: alice,
                amount: 5 * UNITS,
            },
            // Rejected: bob holds nothing.
            Operation::Transfer {
                from: bob,
                to: alice,
                amount: UNITS,
            },
            Operation::Transfer {
                from: alice,
                to: bob,
                amount: 2 * UNITS,
            },
        ]
    }

    #[test]
    fn replay_applies_everything_without_fail_fast() {
        let report = run_script(&DeploymentConfig::default(), &script(), false).unwrap();
        assert_eq!(report.operations.len(), 3);
        assert_eq!(report.applied, 2);
        assert_eq!(report.rejected, 1);
        assert!(!report.operations[1].ok);
        assert_eq!(report.operations[2].reassigned, 2);
        assert_eq!(report.erc721_total_supply, 5);
        assert_eq!(report.erc20_total_supply, 100 * UNITS);
        assert!(report.audit_ok);
    }

    #[test]
    fn replay_stops_at_first_rejection_with_fail_fast() {
        let report = run_script(&DeploymentConfig::default(), &script(), true).unwrap();
        assert_eq!(report.operations.len(), 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.erc721_total_supply, 5);
    }

    #[test]
    fn script_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.json");
        std::fs::write(&path, serde_json::to_vec(&script()).unwrap()).unwrap();
        assert_eq!(load_script(&path).unwrap(), script());
    }
}
