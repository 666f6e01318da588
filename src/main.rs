//! Polymarket Paper-Trading Bot CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paper_trader::services::{PollingScheduler, ResolutionSettler, StopLossEvaluator};
use paper_trader::api::{create_app, AppState};
use paper_trader::{allocator, Config, CsvSink, HttpGateway, Ledger, ScannerOutput};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "paper-trader")]
#[command(about = "Paper-trading bot for Polymarket prediction markets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate the budget over scanner output and poll to completion
    Run {
        /// Scanner output JSON file (overrides SCANNER_INPUT)
        #[arg(short, long)]
        input: Option<String>,

        /// Total budget in USDC (overrides TOTAL_BUDGET)
        #[arg(short, long)]
        budget: Option<String>,

        /// Stop-loss probability drop (overrides STOP_PROB_DROP)
        #[arg(short, long)]
        stop_drop: Option<f64>,

        /// Poll interval in seconds (overrides POLL_INTERVAL_SECONDS)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Run {
            input,
            budget,
            stop_drop,
            interval,
        } => {
            if let Some(input) = input {
                config.scanner_input = input;
            }
            if let Some(budget) = budget {
                config.total_budget = Decimal::from_str(&budget)
                    .context("Invalid --budget value")?;
            }
            if let Some(stop_drop) = stop_drop {
                config.stop_prob_drop = stop_drop;
            }
            if let Some(interval) = interval {
                config.poll_interval_seconds = interval;
            }

            run_trader(config).await?;
        }
    }

    Ok(())
}

async fn run_trader(config: Config) -> Result<()> {
    let opportunities = ScannerOutput::load(&config.scanner_input)?;

    if opportunities.is_empty() {
        info!("No eligible markets from scanner. Exiting.");
        return Ok(());
    }

    let mut ledger = Ledger::new(config.total_budget);
    let opened = allocator::seed_positions(&mut ledger, &opportunities);
    info!("Opened {} of {} opportunities", opened, opportunities.len());

    let ledger = Arc::new(RwLock::new(ledger));
    let sink = Arc::new(CsvSink::new(&config.csv_file, &config.snapshot_file));
    let gateway = Arc::new(HttpGateway::new());

    // Control server runs alongside the scheduler; it only reads
    let state = AppState {
        ledger: ledger.clone(),
        sink: sink.clone(),
    };
    let port = config.port;
    tokio::spawn(async move {
        let app = create_app(state);
        let addr = format!("0.0.0.0:{}", port);
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("Control server running on port {}", port);
                if let Err(e) = axum::serve(listener, app).await {
                    error!("Control server failed: {}", e);
                }
            }
            Err(e) => error!("Failed to bind control server on {}: {}", addr, e),
        }
    });

    let scheduler = PollingScheduler::new(
        gateway,
        sink,
        ledger,
        StopLossEvaluator::new(config.stop_prob_drop, config.fee_rate),
        ResolutionSettler::new(config.fee_rate),
        Duration::from_secs(config.poll_interval_seconds),
    );

    scheduler.run().await
}
