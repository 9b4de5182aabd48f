//! Batch token payments from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Pay everyone in a recipients file (atomic when the aggregator exists)
//! batchpay --config batchpay.toml send --recipients payroll.toml
//!
//! # Ad-hoc recipients
//! batchpay send --to 0xabc...=1.5 --to 0xdef...=2
//!
//! # One payment, simulated before it is sent
//! batchpay pay --to 0xabc... --amount 10
//!
//! # Validate addresses without touching the network
//! batchpay check 0xabc... 0xdef...
//! ```
//!
//! Add `--dry-run` to `send` or `pay` to run against an in-memory chain.

mod config;
mod recipients;
mod report;

use alloy_primitives::{address, Address, U256};
use anyhow::{bail, Result};
use batchpay_chain::ChainClient;
use batchpay_chain_memory::MemoryChain;
use batchpay_chain_rpc::RpcChain;
use batchpay_engine::BatchEngine;
use batchpay_types::{is_valid_address, BatchStatus, RecipientSession};
use clap::{Parser, Subcommand};
use config::CliConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Account funding `--dry-run` payments.
const DRY_RUN_SENDER: Address = address!("0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e");

/// Decimals of the token simulated by `--dry-run`.
const DRY_RUN_DECIMALS: u8 = 6;

/// Batch token payments.
#[derive(Parser, Debug)]
#[command(name = "batchpay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint (overrides config)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a batch of payments
    Send {
        /// Recipients file (TOML, `[[recipients]]` tables)
        #[arg(long)]
        recipients: Option<PathBuf>,

        /// Extra recipient as ADDRESS=AMOUNT (repeatable)
        #[arg(long = "to")]
        to: Vec<String>,

        /// Run against an in-memory chain instead of the RPC endpoint
        #[arg(long)]
        dry_run: bool,
    },

    /// Send a single payment
    Pay {
        #[arg(long)]
        to: String,

        /// Human decimal amount, e.g. 12.5
        #[arg(long)]
        amount: String,

        /// Run against an in-memory chain instead of the RPC endpoint
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate addresses offline
    Check {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    config.apply_overrides(cli.rpc_url.as_deref());

    match cli.command {
        Command::Check { addresses } => Ok(check(&addresses)),
        Command::Send {
            recipients,
            to,
            dry_run,
        } => {
            let mut session = RecipientSession::new();
            if let Some(path) = &recipients {
                recipients::load_file(&mut session, path)?;
            }
            for pair in &to {
                let (address, amount) = recipients::parse_pair(pair)?;
                session.push(address, amount);
            }
            if session.summary().filled_rows == 0 {
                bail!("No recipients given; use --recipients or --to");
            }
            report::print_summary(&session.summary());

            if dry_run {
                send(dry_run_engine(&config), &session).await
            } else {
                send(rpc_engine(&config)?, &session).await
            }
        }
        Command::Pay {
            to,
            amount,
            dry_run,
        } => {
            if dry_run {
                pay(dry_run_engine(&config), &to, &amount).await
            } else {
                pay(rpc_engine(&config)?, &to, &amount).await
            }
        }
    }
}

fn check(addresses: &[String]) -> ExitCode {
    let mut all_valid = true;
    for address in addresses {
        let valid = is_valid_address(address);
        all_valid &= valid;
        println!("{} {}", if valid { "valid  " } else { "INVALID" }, address);
    }
    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn rpc_engine(config: &CliConfig) -> Result<BatchEngine<RpcChain>> {
    let rpc = config.rpc_config();
    info!(url = %rpc.url, "Using JSON-RPC endpoint");
    let client = RpcChain::new(&rpc)?;
    Ok(BatchEngine::new(Arc::new(client), config.engine_config()))
}

fn dry_run_engine(config: &CliConfig) -> BatchEngine<MemoryChain> {
    let engine_config = config.engine_config();
    let chain = MemoryChain::new(DRY_RUN_SENDER, engine_config.chain.token, DRY_RUN_DECIMALS);
    chain.set_balance(DRY_RUN_SENDER, U256::from(u128::MAX));
    chain.deploy_aggregator(engine_config.chain.aggregator);
    info!(sender = %DRY_RUN_SENDER, "Dry run against an in-memory chain");
    BatchEngine::new(Arc::new(chain), engine_config)
}

async fn send<C: ChainClient + 'static>(engine: BatchEngine<C>, session: &RecipientSession) -> Result<ExitCode> {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = engine.with_events(tx);
    let follower = tokio::spawn(report::follow(rx));

    let result = engine.submit_batch(session.rows()).await;
    let chain = engine.config().chain.clone();
    drop(engine);
    let _ = follower.await;

    let attempt = result?;
    report::print_attempt(&attempt, session, &chain);

    Ok(if attempt.status == BatchStatus::Confirmed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn pay<C: ChainClient + 'static>(engine: BatchEngine<C>, to: &str, amount: &str) -> Result<ExitCode> {
    let receipt = engine.pay(to, amount).await?;
    report::print_payment(&receipt);
    Ok(ExitCode::SUCCESS)
}
