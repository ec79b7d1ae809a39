//! Headless Trace Replay
//!
//! Runs the keepers over a recorded trace on a simulated clock and prints a
//! JSON summary of the actions they requested. Nothing is sent to a game.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use keeperbot::core::config::BotConfig;
use keeperbot::core::types::ManualClock;
use keeperbot::runtime::{build_char_keeper, run_bot_tick, TickOutcome};
use keeperbot::status::TraceStatusReader;
use keeperbot::test_support::RecordingClient;

/// Headless Trace Replay - what would the bot have done?
#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a status trace against a configuration and summarize the requested actions")]
struct Args {
    /// Bot configuration (TOML)
    #[arg(long)]
    config: PathBuf,

    /// Status snapshots as JSON lines
    #[arg(long)]
    trace: PathBuf,

    /// Simulated time between snapshots in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// Print every tick's actions to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct ReplaySummary {
    ticks: u64,
    read_failures: u64,
    emergency_ticks: u64,
    simulated_ms: u64,
    actions: BTreeMap<String, u64>,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "keeperbot=debug"
    } else {
        "keeperbot=warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(e) = replay(&args) {
        eprintln!("replay failed: {}", e);
        std::process::exit(1);
    }
}

fn replay(args: &Args) -> keeperbot::core::error::Result<()> {
    let config = BotConfig::load(&args.config)?;
    let clock = Arc::new(ManualClock::new());
    let client = Arc::new(RecordingClient::new());
    let mut keeper = build_char_keeper(&config, client.clone(), clock.clone())?;
    let mut reader = TraceStatusReader::new(BufReader::new(File::open(&args.trace)?));

    let mut summary = ReplaySummary {
        ticks: 0,
        read_failures: 0,
        emergency_ticks: 0,
        simulated_ms: 0,
        actions: BTreeMap::new(),
    };

    loop {
        match run_bot_tick(&mut keeper, &mut reader)? {
            TickOutcome::Exhausted => break,
            TickOutcome::ReadFailed => summary.read_failures += 1,
            TickOutcome::Handled => {}
        }
        summary.ticks += 1;
        if keeper.modes().emergency.is_mode_on() {
            summary.emergency_ticks += 1;
        }

        let actions = client.take_actions();
        if args.verbose && !actions.is_empty() {
            eprintln!("tick {:>5}: {:?}", summary.ticks, actions);
        }
        for action in actions {
            *summary.actions.entry(format!("{:?}", action)).or_insert(0) += 1;
        }

        clock.advance_ms(args.tick_ms);
        summary.simulated_ms += args.tick_ms;
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
