//! fabgate CLI — replay chaincode events and prepare off-line signed requests.
//!
//! Usage:
//! ```bash
//! # Replay events of chaincode "basic" from a newline-delimited JSON ledger
//! fabgate replay --ledger blocks.jsonl --chaincode basic --start-block 100
//!
//! # Resume after a processed transaction, stop after 10 events
//! fabgate replay --ledger blocks.jsonl --chaincode basic \
//!     --start-block 120 --after-tx 5f3a... --limit 10
//!
//! # Print request bytes and digest for off-line signing
//! fabgate request --channel mychannel --chaincode basic --start-block 100
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::Deserialize;

use fabgate_core::{
    BlockEventBatch, CloseableStream, InMemoryCheckpointer, MemoryGateway, Network,
    NetworkConfig, SignedChaincodeEventsRequest,
};
use fabgate_observability::{init_tracing, LogConfig};

/// Contents of the optional `--config` JSON file.
#[derive(Debug, Default, Deserialize)]
struct CliConfig {
    #[serde(default)]
    network: NetworkConfig,
    #[serde(default)]
    log: LogConfig,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let config = match load_config(&args[2..]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };
    init_tracing(&config.log);

    let result = match args[1].as_str() {
        "replay" => cmd_replay(&args[2..], &config).await,
        "request" => cmd_request(&args[2..], &config),
        "version" | "--version" | "-V" => {
            println!("fabgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("fabgate {}", env!("CARGO_PKG_VERSION"));
    println!("Replay chaincode events and prepare off-line signed requests\n");
    println!("USAGE:");
    println!("    fabgate <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    replay     Stream chaincode events from a JSON-lines ledger file");
    println!("    request    Print request bytes and digest for off-line signing");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("COMMON FLAGS:");
    println!("    --config <FILE>        JSON config with \"network\" and \"log\" sections");
    println!("    --json-logs            Emit logs as JSON lines\n");
    println!("REPLAY FLAGS:");
    println!("    --ledger <FILE>        One block event batch per line  [required]");
    println!("    --chaincode <NAME>     Chaincode name                  [required]");
    println!("    --start-block <N>      First block to read (default 0)");
    println!("    --after-tx <TX_ID>     Skip start-block events up to this transaction");
    println!("    --limit <N>            Close the stream after N events\n");
    println!("REQUEST FLAGS:");
    println!("    --channel <NAME>       Channel name (default from config)");
    println!("    --chaincode <NAME>     Chaincode name                  [required]");
    println!("    --start-block <N>      Replay from this block (default: next commit)");
}

fn load_config(args: &[String]) -> anyhow::Result<CliConfig> {
    let mut config = match parse_flag(args, "--config") {
        Some(path) => {
            let raw = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_slice(&raw).with_context(|| format!("parsing {path}"))?
        }
        None => CliConfig::default(),
    };
    if has_flag(args, "--json-logs") {
        config.log.json = true;
    }
    Ok(config)
}

async fn cmd_replay(args: &[String], config: &CliConfig) -> anyhow::Result<()> {
    let ledger = parse_flag(args, "--ledger").context("--ledger is required")?;
    let chaincode = parse_flag(args, "--chaincode").context("--chaincode is required")?;
    let start_block = parse_number(args, "--start-block")?;
    let after_tx = parse_flag(args, "--after-tx");
    let limit = parse_number(args, "--limit")?;

    let gateway = Arc::new(MemoryGateway::with_config(&config.network));
    let text = std::fs::read_to_string(&ledger).with_context(|| format!("reading {ledger}"))?;
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let batch = BlockEventBatch::from_json(line.as_bytes())
            .with_context(|| format!("{ledger}:{}", i + 1))?;
        gateway
            .push(batch)
            .with_context(|| format!("{ledger}:{}", i + 1))?;
    }
    gateway.finish();
    tracing::info!(ledger = %ledger, blocks = gateway.len(), "ledger loaded");

    let network = Network::from_config(&config.network, gateway);
    let mut builder = network
        .new_chaincode_events_request(&chaincode)?
        .start_block(start_block.unwrap_or(0));
    if let Some(tx_id) = after_tx {
        let Some(block) = start_block else {
            bail!("--after-tx requires --start-block");
        };
        let checkpoint = InMemoryCheckpointer::new();
        checkpoint.checkpoint_transaction(block, tx_id);
        builder = builder.checkpoint(&checkpoint);
    }

    // The in-process gateway does not verify signatures.
    let request = SignedChaincodeEventsRequest::new(builder.build(), Vec::new());
    let events = network.get_signed_events(request).await?;

    let mut count = 0u64;
    while let Some(event) = events.next().await {
        let event = event?;
        println!("{}", serde_json::to_string(&event)?);
        count += 1;
        if limit.is_some_and(|limit| count >= limit) {
            events.close();
        }
    }

    let metrics = events.metrics();
    tracing::info!(
        events = metrics.events_emitted,
        batches = metrics.batches_received,
        "replay finished"
    );
    Ok(())
}

fn cmd_request(args: &[String], config: &CliConfig) -> anyhow::Result<()> {
    let channel = parse_flag(args, "--channel").unwrap_or_else(|| config.network.channel.clone());
    let chaincode = parse_flag(args, "--chaincode").context("--chaincode is required")?;
    if chaincode.is_empty() {
        bail!("--chaincode must not be empty");
    }

    let mut builder = fabgate_core::ChaincodeEventsRequestBuilder::new(channel, chaincode);
    if let Some(block) = parse_number(args, "--start-block")? {
        builder = builder.start_block(block);
    }
    let request = builder.build();

    let out = serde_json::json!({
        "request": hex::encode(request.bytes()?),
        "digest": hex::encode(request.digest()?),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_number(args: &[String], flag: &str) -> anyhow::Result<Option<u64>> {
    parse_flag(args, flag)
        .map(|v| v.parse::<u64>().with_context(|| format!("{flag} expects a number, got '{v}'")))
        .transpose()
}
