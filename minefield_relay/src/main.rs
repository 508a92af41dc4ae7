// CLI entry point for the Minefield state relay.
//
// Starts a standalone relay that game peers connect to. Settings come from
// `RelayConfig::default()`, optionally overlaid by a JSON config file, then by
// command-line flags. The relay runs until the process is killed.
//
// Usage:
//   relay [OPTIONS]
//     -c, --config <FILE>          JSON config file
//     -b, --bind <ADDR>            Listen interface (default: 0.0.0.0)
//     -p, --port <PORT>            Listen port (default: 12345)
//     --max-clients <N>            Max peers (default: 100)
//     --monitor-interval-ms <MS>   Seed monitor wake interval (default: 50)
//     --reseed-on-join             New board seed whenever a peer joins
//     --debug                      Debug-level logging

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use minefield_relay::{RelayConfig, RelayError, start_relay};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "relay", about = "Minefield multiplayer state relay")]
struct Args {
    /// JSON config file; flags below override its values.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen interface.
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum simultaneous peers.
    #[arg(long, value_name = "N")]
    max_clients: Option<usize>,

    /// Upper bound on the seed monitor's sleep between checks.
    #[arg(long, value_name = "MS")]
    monitor_interval_ms: Option<u64>,

    /// Request a new board seed whenever a peer joins.
    #[arg(long)]
    reseed_on_join: bool,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let (handle, _addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            error!("failed to start relay: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Acceptor and monitor run until the process is killed.
    handle.wait();
    ExitCode::SUCCESS
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn build_config(args: &Args) -> Result<RelayConfig, RelayError> {
    let mut config = match &args.config {
        Some(path) => RelayConfig::from_json_file(path)?,
        None => RelayConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.bind_address = bind.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max_clients) = args.max_clients {
        config.max_clients = max_clients;
    }
    if let Some(interval) = args.monitor_interval_ms {
        config.monitor_interval_ms = interval;
    }
    if args.reseed_on_join {
        config.reseed_on_join = true;
    }
    Ok(config)
}
