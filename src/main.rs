//! Settlement Consumer
//!
//! Replays JSON-lines chain events through the settlement dispatcher
//! against an in-memory ledger.
//!
//! Run modes:
//!   settlement-consumer replay <file|-> [--wallet <addr>=<wallet>] [--fund <wallet>=<sats>]
//!                              [--journal <id>=<wallet>:<sats>]
//!   settlement-consumer config
//!   settlement-consumer help

use onchain_settlement::common::{self, AppError, SettlementConfig};
use onchain_settlement::consumer::{feed_json_lines, DeadLetter, EventConsumer};
use onchain_settlement::ledger::MemoryLedger;
use onchain_settlement::settlement::SettlementDispatcher;
use onchain_settlement::types::{JournalId, WalletId};
use std::env;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let result = match args[1].as_str() {
        "replay" => run_replay(&args[2..]).await,
        "config" => show_config(),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("On-chain Settlement Consumer");
    println!();
    println!("Usage:");
    println!("  settlement-consumer replay <file|-> [options]   Replay JSON-lines events");
    println!("  settlement-consumer config                      Show configuration");
    println!();
    println!("Replay options:");
    println!("  --wallet <address>=<wallet_id>                  Track an address");
    println!("  --fund <wallet_id>=<sats>                       Seed an opening balance");
    println!("  --journal <journal_id>=<wallet_id>:<sats>       Open a payout journal");
    println!();
    println!("Environment Variables:");
    println!("  SETTLEMENT_NETWORK              mainnet | testnet | regtest");
    println!("  SETTLEMENT_DUST_THRESHOLD_SATS  Dust threshold (default: 5000)");
    println!("  SETTLEMENT_DEPOSIT_FEE_SATS     Deposit fee (default: 0)");
    println!("  SETTLEMENT_LOG_LEVEL            trace | debug | info | warn | error");
    println!("  SETTLEMENT_LOG_JSON             1 for JSON logs");
}

fn show_config() -> common::Result<()> {
    SettlementConfig::from_env()?.print_summary();
    Ok(())
}

async fn run_replay(args: &[String]) -> common::Result<()> {
    let config = SettlementConfig::from_env()?;
    common::init_from_config(&config)?;

    let source = args
        .first()
        .ok_or_else(|| AppError::InvalidArgument("replay needs a file path or '-'".to_string()))?
        .clone();

    let ledger = MemoryLedger::from_config(&config);

    apply_replay_options(&ledger, &args[1..]).await?;

    let dispatcher = SettlementDispatcher::new(Arc::new(ledger.clone()));
    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (dead_tx, mut dead_rx) = mpsc::channel::<DeadLetter>(CHANNEL_CAPACITY);

    let consumer = EventConsumer::new(dispatcher).with_dead_letters(dead_tx);
    println!("Replay run: {}", consumer.correlation_id());
    let consumer_task = tokio::spawn(consumer.run(event_rx));

    let dead_task = tokio::spawn(async move {
        let mut letters = Vec::new();
        while let Some(letter) = dead_rx.recv().await {
            letters.push(letter);
        }
        letters
    });

    let feed = if source == "-" {
        feed_json_lines(BufReader::new(tokio::io::stdin()), event_tx).await?
    } else {
        let file = tokio::fs::File::open(&source).await?;
        feed_json_lines(BufReader::new(file), event_tx).await?
    };

    let stats = consumer_task
        .await
        .map_err(|e| AppError::Internal(format!("consumer task failed: {}", e)))?;
    let dead_letters = dead_task
        .await
        .map_err(|e| AppError::Internal(format!("dead-letter task failed: {}", e)))?;

    println!();
    println!("Read {} events ({} malformed lines skipped)", feed.sent, feed.skipped);
    println!("{}", stats);
    for letter in &dead_letters {
        println!(
            "  dead letter: sequence {} [{}] {}",
            letter.event.sequence,
            letter.error.error_code(),
            letter.error
        );
    }

    let ledger_stats = ledger.stats().await;
    println!(
        "Ledger: {} settled incoming | {} pending | {} open payouts | {} settled payouts | {} cold transfers ({} sats)",
        ledger_stats.settled_incoming,
        ledger_stats.pending_incoming,
        ledger_stats.open_payouts,
        ledger_stats.settled_payouts,
        ledger_stats.cold_transfers,
        ledger_stats.cold_transfer_sats
    );

    Ok(())
}

/// Apply `--wallet`, `--fund` and `--journal` options to the ledger
async fn apply_replay_options(ledger: &MemoryLedger, args: &[String]) -> common::Result<()> {
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .map(String::as_str)
                .ok_or_else(|| AppError::InvalidArgument(format!("missing value for {}", flag)))
        };

        match flag {
            "--wallet" => {
                let value = value()?;
                let (address, wallet) = value.split_once('=').ok_or_else(|| {
                    AppError::InvalidArgument(format!("bad --wallet value: {}", value))
                })?;
                ledger.register_address(address, WalletId::new(wallet)).await;
            }
            "--fund" => {
                let value = value()?;
                let (wallet, sats) = value.split_once('=').ok_or_else(|| {
                    AppError::InvalidArgument(format!("bad --fund value: {}", value))
                })?;
                let sats: u64 = sats.parse().map_err(|_| {
                    AppError::InvalidArgument(format!("bad --fund amount: {}", sats))
                })?;
                ledger
                    .fund_wallet(WalletId::new(wallet), sats)
                    .await
                    .map_err(|e| AppError::InvalidArgument(e.to_string()))?;
            }
            "--journal" => open_journal(ledger, value()?).await?,
            _ => {
                return Err(AppError::InvalidArgument(format!("unknown option: {}", flag)));
            }
        }
        i += 2;
    }

    Ok(())
}

/// `--journal <journal_id>=<wallet_id>:<sats>`
async fn open_journal(ledger: &MemoryLedger, value: &str) -> common::Result<()> {
    let bad = || AppError::InvalidArgument(format!("bad --journal value: {}", value));

    let (journal, rest) = value.split_once('=').ok_or_else(bad)?;
    let (wallet, sats) = rest.split_once(':').ok_or_else(bad)?;
    let sats: u64 = sats.parse().map_err(|_| bad())?;

    ledger
        .open_payout_journal(JournalId::new(journal), WalletId::new(wallet), sats)
        .await
        .map_err(|e| AppError::InvalidArgument(e.to_string()))
}
