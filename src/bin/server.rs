//! sparseblk Server Binary
//!
//! Creates one device and serves it over TCP.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use sparseblk::network::Server;
use sparseblk::{Config, Device, GrowthPolicy, SeekMode};
use tracing_subscriber::{fmt, EnvFilter};

/// sparseblk Server
#[derive(Parser, Debug)]
#[command(name = "sparseblk-server")]
#[command(about = "Sparse in-memory block device served over TCP")]
#[command(version)]
struct Args {
    /// Device name
    #[arg(short, long, default_value = "scull")]
    name: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Initial directory capacity in blocks
    #[arg(long, default_value = "4096")]
    initial_capacity: usize,

    /// Maximum directory capacity in blocks
    #[arg(long, default_value = "16777216")]
    max_capacity: usize,

    /// Maximum number of materialized blocks (unbounded if omitted)
    #[arg(long)]
    max_blocks: Option<usize>,

    /// Directory growth policy
    #[arg(short, long, value_enum, default_value = "doubling")]
    growth: Growth,

    /// Clamp negative seek results to 0
    #[arg(long)]
    clamp_seek: bool,

    /// Worker threads
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Maximum concurrent connections (also capped by --workers)
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// Close sessions idle for this long (milliseconds, 0 = never)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,

    /// Give up on a reply after this long (milliseconds, 0 = never)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Growth {
    Doubling,
    ExactFit,
}

impl From<Growth> for GrowthPolicy {
    fn from(growth: Growth) -> Self {
        match growth {
            Growth::Doubling => GrowthPolicy::Doubling,
            Growth::ExactFit => GrowthPolicy::ExactFit,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sparseblk=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("sparseblk server v{}", sparseblk::VERSION);

    let seek_mode = if args.clamp_seek {
        SeekMode::ClampToZero
    } else {
        SeekMode::Unclamped
    };

    let config = Config::builder()
        .device_name(&args.name)
        .listen_addr(&args.listen)
        .initial_capacity(args.initial_capacity)
        .max_capacity(args.max_capacity)
        .max_blocks(args.max_blocks)
        .growth_policy(args.growth.into())
        .seek_mode(seek_mode)
        .worker_threads(args.workers)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .build();

    let device = match Device::new(&config) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            tracing::error!("Failed to create device: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, device) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
