//! Keeperbot - Entry Point
//!
//! Loads the configuration, starts one sender thread per command channel and
//! runs the keeper loop over status snapshots read as JSON lines, either from
//! a trace file or from stdin (fed by an external poller).

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use keeperbot::command::{ActionDriver, ClientInterface, CommandProcessor, DryRunDriver, XdotoolDriver};
use keeperbot::core::config::BotConfig;
use keeperbot::core::error::{BotError, Result};
use keeperbot::core::types::SystemClock;
use keeperbot::keeper::CharKeeper;
use keeperbot::runtime::{build_char_keeper, BotRunner};
use keeperbot::status::{StatusReader, TraceStatusReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    /// Log keystrokes only
    DryRun,
    /// Send keystrokes to a window with xdotool
    Xdotool,
}

/// Keeps a character healed, hasted, shielded and equipped
#[derive(Parser, Debug)]
#[command(name = "keeperbot")]
#[command(about = "Keeps a character healed, hasted, shielded and equipped")]
struct Args {
    /// Bot configuration (TOML)
    #[arg(long)]
    config: PathBuf,

    /// Status snapshots as JSON lines; read from stdin when absent
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Tick interval in milliseconds
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// How keystrokes are delivered
    #[arg(long, value_enum, default_value_t = DriverKind::DryRun)]
    driver: DriverKind,

    /// Target window id for the xdotool driver
    #[arg(long)]
    window: Option<String>,

    /// Log every decision
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "keeperbot=debug"
    } else {
        "keeperbot=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("Keeperbot starting...");
    let config = BotConfig::load(&args.config)?;

    let driver: Arc<dyn ActionDriver> = match args.driver {
        DriverKind::DryRun => Arc::new(DryRunDriver),
        DriverKind::Xdotool => {
            let window = args.window.clone().ok_or_else(|| {
                BotError::Config("--window is required with the xdotool driver".into())
            })?;
            Arc::new(XdotoolDriver::new(window))
        }
    };

    let clock = Arc::new(SystemClock);
    let processor = Arc::new(CommandProcessor::start(driver, clock.clone())?);
    let client = Arc::new(ClientInterface::new(
        config.hotkeys.clone(),
        Arc::clone(&processor),
    ));
    let keeper = build_char_keeper(&config, client, clock)?;

    let tick = Duration::from_millis(args.tick_ms);
    let ticks = match &args.trace {
        Some(path) => run(TraceStatusReader::new(BufReader::new(File::open(path)?)), keeper, tick)?,
        None => run(TraceStatusReader::new(io::stdin().lock()), keeper, tick)?,
    };

    processor.stop();
    tracing::info!(ticks, "Keeperbot finished");
    Ok(())
}

fn run<R: StatusReader>(reader: R, keeper: CharKeeper, tick: Duration) -> Result<u64> {
    let mut runner = BotRunner::new(reader, keeper, tick);
    let stop = runner.stop_handle();

    // Only used to await Ctrl-C; the tick loop stays on this thread
    let rt = Runtime::new()?;
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping");
            stop.store(true, Ordering::Release);
        }
    });

    runner.run()
}
