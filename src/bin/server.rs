//! SkipKV Server Binary
//!
//! Reads commands from stdin, one per line, and prints each reply.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use skipkv::{Config, Engine, Router, SnapshotFormat};
use tracing_subscriber::{fmt, EnvFilter};

/// SkipKV Server
#[derive(Parser, Debug)]
#[command(name = "skipkv-server")]
#[command(about = "In-memory key-value store with sorted sets and expiry")]
#[command(version)]
struct Args {
    /// Data directory (snapshot location)
    #[arg(short, long, default_value = "./backup")]
    data_dir: String,

    /// Seconds between periodic snapshots (0 disables them)
    #[arg(short, long, default_value = "20")]
    snapshot_interval_secs: u64,

    /// Number of reader worker threads
    #[arg(short, long, default_value = "3")]
    read_workers: usize,

    /// Use the checksummed binary snapshot format
    #[arg(short, long)]
    binary: bool,

    /// Start empty instead of restoring the snapshot
    #[arg(long)]
    no_restore: bool,
}

const MENU: &str = "\
Commands:
  SET key value [EX seconds | PX milliseconds]
  GET key
  DEL key [key ...]
  TTL key
  EXPIRE key seconds
  ZADD key score member [score member ...]
  ZRANGE key start stop [WITHSCORES]
  ZRANK key member
  quit";

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,skipkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("SkipKV Server v{}", skipkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let format = if args.binary {
        SnapshotFormat::Binary
    } else {
        SnapshotFormat::Text
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .snapshot_format(format)
        .snapshot_interval(Duration::from_secs(args.snapshot_interval_secs))
        .read_workers(args.read_workers)
        .restore_on_open(!args.no_restore)
        .build();

    // Open engine (restores the snapshot)
    let engine = match Engine::open(config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let router = match Router::new(Arc::clone(&engine)) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to start router: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    if let Err(e) = repl(&router) {
        tracing::error!("Input error: {}", e);
    }

    router.shutdown();
    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        std::process::exit(1);
    }
    println!("bye");
}

/// Read-eval-print loop until `quit` or end of input
fn repl(router: &Router) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("{}", MENU);
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.eq_ignore_ascii_case("quit") {
            break;
        }
        match router.execute(trimmed) {
            Ok(reply) => println!("{}", reply),
            Err(e) => {
                tracing::error!("Command failed: {}", e);
                break;
            }
        }

        print!("> ");
        stdout.flush()?;
    }
    Ok(())
}
