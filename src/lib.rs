//! # bolty
//!
//! A small facade over an embedded transactional key-value store with:
//! - Named buckets (flat key/value namespaces), created explicitly
//! - Get / Set / Delete, each in its own atomic transaction
//! - Lazy prefix scans over a consistent read snapshot
//! - Typed values through a store-wide codec (JSON or bincode)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Caller / bolty-cli                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Command / direct calls
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                 │
//! │      (Unopened → Open → Closed, single writer lock)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   WriteTxn  │          │   ReadTxn   │
//!   │ (serialized)│          │ (snapshot)  │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │ PrefixScan
//!          ▼                        ▼
//!   ┌─────────────────────────────────────┐
//!   │        redb (one table/bucket)      │
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bolty::Store;
//!
//! # fn main() -> bolty::Result<()> {
//! let store = Store::open_path("users.db")?;
//! store.create_bucket("users")?;
//! store.set("users", "alice", &42u32)?;
//!
//! let age: u32 = store.get_as("users", "alice")?;
//! assert_eq!(age, 42);
//!
//! for record in store.seek_prefix("users", "al")? {
//!     let record = record?;
//!     println!("{}", record.key_lossy());
//! }
//!
//! store.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod command;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use codec::Codec;
pub use command::{Command, CommandType, Output};
pub use config::{CommitDurability, Config};
pub use error::{BoltyError, ErrorKind, Result};
pub use store::{PrefixScan, ReadTxn, Record, Store, WriteTxn};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bolty
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
