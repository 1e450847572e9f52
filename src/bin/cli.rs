//! LogKV CLI
//!
//! Command-line interface operating directly on a data directory.

use clap::{Parser, Subcommand};
use logkv::{Config, Engine, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// LogKV CLI
#[derive(Parser, Debug)]
#[command(name = "logkv-cli")]
#[command(about = "CLI for the LogKV key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./logkv_data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Compact the log, keeping only live entries
    Merge,

    /// Print live key count and log size
    Stats,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,logkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // One-shot process: every write is synced before exit
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&engine, args.command) {
        tracing::error!("Command failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        std::process::exit(1);
    }
}

fn run(engine: &Engine, command: Commands) -> logkv::Result<()> {
    match command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Merge => {
            let before = engine.log_size()?;
            engine.merge()?;
            println!("OK ({} -> {} bytes)", before, engine.log_size()?);
        }
        Commands::Stats => {
            let stats = engine.stats()?;
            println!("live_keys: {}", stats.live_keys);
            println!("log_size:  {}", stats.log_size);
        }
    }
    Ok(())
}
