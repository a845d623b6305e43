//! bolty CLI
//!
//! Command-line interface for a local bolty database file.

use std::path::PathBuf;
use std::process;

use bolty::{Codec, Command, CommitDurability, Config, Output, Store};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// bolty CLI
#[derive(Parser, Debug)]
#[command(name = "bolty-cli")]
#[command(about = "CLI for the bolty bucketed key-value store")]
#[command(version)]
struct Args {
    /// Database file
    #[arg(short, long, default_value = "./bolty.db")]
    db: PathBuf,

    /// Permission bits (octal) used when the file is created
    #[arg(short, long, default_value = "600", value_parser = parse_mode)]
    mode: u32,

    /// Value codec: json or bincode
    #[arg(short, long, default_value = "json", value_parser = parse_codec)]
    codec: Codec,

    /// Batch commits instead of syncing each one
    #[arg(long)]
    batched: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a bucket
    CreateBucket {
        /// Bucket name
        bucket: String,
    },

    /// Delete a bucket and everything in it
    DropBucket {
        /// Bucket name
        bucket: String,
    },

    /// List buckets
    Buckets,

    /// Set a key-value pair
    Set {
        /// Bucket name
        bucket: String,

        /// The key to set
        key: String,

        /// The value (parsed as JSON, otherwise stored as a string)
        value: String,
    },

    /// Get a value by key
    Get {
        /// Bucket name
        bucket: String,

        /// The key to get
        key: String,
    },

    /// Delete a key
    Del {
        /// Bucket name
        bucket: String,

        /// The key to delete
        key: String,
    },

    /// List records whose key starts with a prefix
    Seek {
        /// Bucket name
        bucket: String,

        /// Key prefix
        prefix: String,
    },
}

fn main() {
    // Initialize tracing/logging (stderr, stdout carries results)
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,bolty=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> bolty::Result<()> {
    let durability = if args.batched {
        CommitDurability::Batched
    } else {
        CommitDurability::SyncPerCommit
    };

    let config = Config::builder()
        .path(&args.db)
        .file_mode(args.mode)
        .codec(args.codec)
        .durability(durability)
        .build();

    let command = build_command(args.command, args.codec)?;

    let store = Store::open_with(config)?;
    let output = store.execute(command);
    let closed = store.close();

    print_output(output?);
    closed
}

fn build_command(command: Commands, codec: Codec) -> bolty::Result<Command> {
    let command = match command {
        Commands::CreateBucket { bucket } => Command::CreateBucket { bucket },
        Commands::DropBucket { bucket } => Command::DeleteBucket { bucket },
        Commands::Buckets => Command::Buckets,
        Commands::Set { bucket, key, value } => {
            let parsed = serde_json::from_str::<serde_json::Value>(&value)
                .unwrap_or(serde_json::Value::String(value));
            Command::Set {
                bucket,
                key: key.into_bytes(),
                value: codec.encode(&parsed)?,
            }
        }
        Commands::Get { bucket, key } => Command::Get {
            bucket,
            key: key.into_bytes(),
        },
        Commands::Del { bucket, key } => Command::Delete {
            bucket,
            key: key.into_bytes(),
        },
        Commands::Seek { bucket, prefix } => Command::Seek {
            bucket,
            prefix: prefix.into_bytes(),
        },
    };
    Ok(command)
}

fn print_output(output: Output) {
    match output {
        Output::Done => {}
        Output::Value(value) => println!("{}", String::from_utf8_lossy(&value)),
        Output::Records(records) => {
            for record in records {
                println!(
                    "key={}, value={}",
                    record.key_lossy(),
                    String::from_utf8_lossy(&record.value)
                );
            }
        }
        Output::Buckets(names) => {
            for name in names {
                println!("{}", name);
            }
        }
    }
}

fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0o");
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode '{}': {}", s, e))
}

fn parse_codec(s: &str) -> Result<Codec, String> {
    s.parse::<Codec>().map_err(|e| e.to_string())
}
