//! asidebench - load harness for the cache-aside layer
//!
//! Runs sequential write, sequential read and random read phases against
//! Redis + MongoDB (or the in-process backends) and prints hit/miss
//! statistics and cache residency after each phase.

mod workload;

use std::path::PathBuf;

use anyhow::Result;
use asidecache::Config;
use clap::Parser;
use tracing::info;

use crate::workload::{PhaseReport, Workload};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "ASIDE_CONFIG")]
    config: Option<PathBuf>,

    /// Memory budget of the key-value tier in bytes
    #[arg(long, env = "ASIDE_CACHE_CAPACITY_BYTES")]
    cache_capacity_bytes: Option<u64>,

    /// Key-value server host
    #[arg(long, env = "ASIDE_CACHE_HOST")]
    cache_host: Option<String>,

    /// Key-value server port
    #[arg(long, env = "ASIDE_CACHE_PORT")]
    cache_port: Option<u16>,

    /// Key-value logical database index
    #[arg(long, env = "ASIDE_CACHE_DB_INDEX")]
    cache_db_index: Option<u32>,

    /// Document server host
    #[arg(long, env = "ASIDE_STORE_HOST")]
    store_host: Option<String>,

    /// Document server port
    #[arg(long, env = "ASIDE_STORE_PORT")]
    store_port: Option<u16>,

    /// Document database name
    #[arg(long, env = "ASIDE_STORE_DB_NAME")]
    store_db_name: Option<String>,

    /// Use in-process backends instead of Redis and MongoDB
    #[arg(long)]
    memory: bool,

    /// Number of keys written and read
    #[arg(short, long, default_value_t = 22500)]
    messages: u64,

    /// Value size in bytes
    #[arg(short = 's', long, default_value_t = 5120)]
    message_size: usize,

    /// Worker threads per phase
    #[arg(short, long, default_value_t = 1)]
    workers: usize,

    /// Seed for the random-read phase
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        if let Some(bytes) = self.cache_capacity_bytes {
            config.cache_capacity_bytes = bytes;
        }
        if let Some(host) = &self.cache_host {
            config.cache_host = host.clone();
        }
        if let Some(port) = self.cache_port {
            config.cache_port = port;
        }
        if let Some(db) = self.cache_db_index {
            config.cache_db_index = db;
        }
        if let Some(host) = &self.store_host {
            config.store_host = host.clone();
        }
        if let Some(port) = self.store_port {
            config.store_port = port;
        }
        if let Some(name) = &self.store_db_name {
            config.store_db_name = name.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn workload(&self) -> Workload {
        Workload {
            messages: self.messages,
            message_size: self.message_size,
            workers: self.workers.max(1),
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = args.config()?;
    let workload = args.workload();

    info!("Starting asidebench v{}", env!("CARGO_PKG_VERSION"));
    info!(
        messages = workload.messages,
        message_size = workload.message_size,
        workers = workload.workers,
        "workload"
    );

    let reports = if args.memory {
        info!(capacity_bytes = config.cache_capacity_bytes, "using in-process backends");
        let cache = asidecache::embedded(&config)?;
        workload.run(&cache)?
    } else {
        info!(
            cache = %format!("{}:{}/{}", config.cache_host, config.cache_port, config.cache_db_index),
            store = %format!("{}:{}/{}", config.store_host, config.store_port, config.store_db_name),
            "connecting to backends"
        );
        let cache = asidecache::connect(&config)?;
        workload.run(&cache)?
    };

    println!("\n📊 CONFIGURATION:");
    println!("   Cache capacity:  {} bytes", config.cache_capacity_bytes);
    println!("   Messages:        {} x {} bytes", workload.messages, workload.message_size);
    println!("   Workers:         {}", workload.workers);
    reports.iter().for_each(PhaseReport::print);

    Ok(())
}
