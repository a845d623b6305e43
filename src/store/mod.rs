//! Store Module
//!
//! The key-value facade: lifecycle, single-shot operations and closures
//! over read/write transactions.
//!
//! ## Responsibilities
//! - Open the database file (permissions, exclusive lock) and close it
//! - Serialize writers, optionally with an acquisition timeout
//! - Run each operation in its own transaction (commit or abort as a unit)
//! - Hand out snapshot-consistent prefix scans

mod scan;
mod txn;

pub use scan::{PrefixScan, Record};
pub use txn::{ReadTxn, WriteTxn};

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard, RwLock};
use redb::Database;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::command::{Command, Output};
use crate::config::{CommitDurability, Config};
use crate::error::{BoltyError, Result};

use scan::{close_slot, ScanSlot};

/// Lifecycle state of a [`Store`]
enum State {
    Unopened,
    Open(Arc<Database>),
    Closed,
}

/// A bucketed key-value store backed by one database file
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (create/delete bucket, set, delete, `update`): serialized by
///   `write_lock`, taken before the backend write transaction starts. With
///   `Config::write_timeout` set, waiting longer fails with `Timeout`.
///
/// - **Reads** (get, seek, `view`): each runs on its own MVCC snapshot and
///   never waits on writers or other readers.
///
/// The database handle lives in an `Arc`; operations clone it and release
/// the state lock before doing any work. `close()` also takes the snapshot
/// away from every live [`PrefixScan`], so once no `view`/`update` closure
/// is still running on another thread the backend file lock is free and the
/// store can be opened again.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Unopened / Open / Closed
    state: RwLock<State>,

    /// Serializes write transactions
    write_lock: Mutex<()>,

    /// Snapshots of the scans handed out since the last open
    scans: Mutex<Vec<Weak<Mutex<ScanSlot>>>>,
}

impl Store {
    /// Create a store in the Unopened state
    ///
    /// Every operation fails with `Closed` until [`Store::open`] succeeds.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: RwLock::new(State::Unopened),
            write_lock: Mutex::new(()),
            scans: Mutex::new(Vec::new()),
        }
    }

    /// Create and open a store with the given config
    pub fn open_with(config: Config) -> Result<Self> {
        let store = Self::new(config);
        store.open()?;
        Ok(store)
    }

    /// Open a store at `path` (convenience method)
    ///
    /// Uses default config with the specified file path
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().path(path.as_ref()).build();
        Self::open_with(config)
    }

    /// Open (or reopen after `close`) the backing file
    ///
    /// Creates the file with `Config::file_mode` if it does not exist and
    /// takes the backend's exclusive lock. A no-op when already open.
    pub fn open(&self) -> Result<()> {
        let mut state = self.state.write();
        if let State::Open(_) = *state {
            return Ok(());
        }

        let db = open_database(&self.config)?;
        *state = State::Open(Arc::new(db));

        tracing::info!(
            path = %self.config.path.display(),
            durability = ?self.config.durability,
            codec = self.config.codec.name(),
            "store opened"
        );
        Ok(())
    }

    /// Close the store
    ///
    /// With batched commits, first forces a durable commit so everything
    /// committed so far reaches disk. Live scans lose their snapshot and
    /// yield `Closed`. Afterwards every operation fails with `Closed` until
    /// the store is reopened.
    pub fn close(&self) -> Result<()> {
        let (db, scans) = {
            let mut state = self.state.write();
            match std::mem::replace(&mut *state, State::Closed) {
                State::Open(db) => (db, std::mem::take(&mut *self.scans.lock())),
                previous => {
                    *state = previous;
                    return Err(BoltyError::Closed);
                }
            }
        };

        let released = scans
            .iter()
            .filter_map(Weak::upgrade)
            .inspect(|slot| close_slot(slot))
            .count();
        if released > 0 {
            tracing::debug!(scans = released, "released live prefix scans");
        }

        if self.config.durability == CommitDurability::Batched {
            let _write_guard = self.write_lock.lock();
            let mut tx = db.begin_write()?;
            tx.set_durability(redb::Durability::Immediate);
            tx.commit()?;
        }

        drop(db);
        tracing::info!(path = %self.config.path.display(), "store closed");
        Ok(())
    }

    /// Whether the store is currently open
    pub fn is_open(&self) -> bool {
        matches!(*self.state.read(), State::Open(_))
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Run `f` against one read snapshot
    pub fn view<R>(&self, f: impl FnOnce(&ReadTxn) -> Result<R>) -> Result<R> {
        let txn = self.begin_read()?;
        f(&txn)
    }

    /// Run `f` inside one write transaction
    ///
    /// `Ok` commits everything `f` wrote; `Err` aborts and the store is left
    /// exactly as it was.
    ///
    /// The writer lock is not reentrant. Write through `tx` inside `f`:
    /// calling `set`, `delete`, `create_bucket`, `delete_bucket`, `update`,
    /// or (with batched commits) `close` on the same store from `f` blocks
    /// forever, or fails with `Timeout` when `Config::write_timeout` is set.
    pub fn update<R>(&self, f: impl FnOnce(&mut WriteTxn) -> Result<R>) -> Result<R> {
        let db = self.handle()?;
        let _write_guard = self.lock_writer()?;

        let mut txn = WriteTxn::new(
            db.begin_write()?,
            Arc::clone(&db),
            self.config.codec,
            self.config.durability,
        );

        match f(&mut txn) {
            Ok(result) => {
                txn.commit()?;
                Ok(result)
            }
            Err(e) => {
                txn.abort();
                tracing::debug!(error = %e, "write transaction aborted");
                Err(e)
            }
        }
    }

    // =========================================================================
    // Single-shot Operations
    // =========================================================================

    /// Create a bucket
    pub fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.update(|tx| tx.create_bucket(bucket))?;
        tracing::debug!(bucket, "bucket created");
        Ok(())
    }

    /// Delete a bucket and all of its records
    pub fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.update(|tx| tx.delete_bucket(bucket))?;
        tracing::debug!(bucket, "bucket deleted");
        Ok(())
    }

    /// Bucket names in ascending order
    pub fn buckets(&self) -> Result<Vec<String>> {
        self.view(|tx| tx.buckets())
    }

    /// Encode `value` with the store codec and write it under `key`
    ///
    /// The value is encoded before the write lock is taken, so an
    /// unencodable value fails with `Serialization` without touching the
    /// store. A store that is not open fails with `Closed` first.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        bucket: &str,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<()> {
        self.handle()?;
        let bytes = self.config.codec.encode(value)?;
        self.set_raw(bucket, key, &bytes)
    }

    /// Write raw bytes under `key`
    pub fn set_raw(&self, bucket: &str, key: impl AsRef<[u8]>, value: &[u8]) -> Result<()> {
        let key = key.as_ref();
        self.update(|tx| tx.set_raw(bucket, key, value))?;
        tracing::debug!(bucket, key_len = key.len(), value_len = value.len(), "set");
        Ok(())
    }

    /// Raw bytes stored under `key`
    pub fn get(&self, bucket: &str, key: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        self.view(|tx| tx.get(bucket, key))
    }

    /// Value stored under `key`, decoded with the store codec
    pub fn get_as<T: DeserializeOwned>(&self, bucket: &str, key: impl AsRef<[u8]>) -> Result<T> {
        self.view(|tx| tx.get_as(bucket, key))
    }

    /// Delete `key`; deleting an absent key is a no-op
    pub fn delete(&self, bucket: &str, key: impl AsRef<[u8]>) -> Result<()> {
        let key = key.as_ref();
        let removed = self.update(|tx| tx.delete(bucket, key))?;
        tracing::debug!(bucket, key_len = key.len(), removed, "delete");
        Ok(())
    }

    /// Lazy, ascending scan of the records whose key starts with `prefix`
    ///
    /// The scan reads from one snapshot taken now and is cut off by
    /// [`Store::close`].
    pub fn seek_prefix(&self, bucket: &str, prefix: impl AsRef<[u8]>) -> Result<PrefixScan> {
        // Registered under the state lock so `close` cannot miss it
        let state = self.state.read();
        let db = match &*state {
            State::Open(db) => Arc::clone(db),
            State::Unopened | State::Closed => return Err(BoltyError::Closed),
        };

        let txn = ReadTxn::new(db.begin_read()?, db, self.config.codec);
        let scan = txn.into_prefix_scan(bucket, prefix.as_ref(), self.config.scan_batch_size)?;

        let mut scans = self.scans.lock();
        scans.retain(|slot| slot.strong_count() > 0);
        scans.push(scan.slot());
        Ok(scan)
    }

    /// Execute a command
    ///
    /// Routes commands to the matching operation. `Seek` collects the scan.
    pub fn execute(&self, command: Command) -> Result<Output> {
        tracing::trace!(command = ?command.command_type(), "execute");

        match command {
            Command::CreateBucket { bucket } => {
                self.create_bucket(&bucket)?;
                Ok(Output::Done)
            }
            Command::DeleteBucket { bucket } => {
                self.delete_bucket(&bucket)?;
                Ok(Output::Done)
            }
            Command::Buckets => Ok(Output::Buckets(self.buckets()?)),
            Command::Set { bucket, key, value } => {
                self.set_raw(&bucket, &key, &value)?;
                Ok(Output::Done)
            }
            Command::Get { bucket, key } => Ok(Output::Value(self.get(&bucket, &key)?)),
            Command::Delete { bucket, key } => {
                self.delete(&bucket, &key)?;
                Ok(Output::Done)
            }
            Command::Seek { bucket, prefix } => {
                let records = self
                    .seek_prefix(&bucket, &prefix)?
                    .collect::<Result<Vec<_>>>()?;
                Ok(Output::Records(records))
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn handle(&self) -> Result<Arc<Database>> {
        match &*self.state.read() {
            State::Open(db) => Ok(Arc::clone(db)),
            State::Unopened | State::Closed => Err(BoltyError::Closed),
        }
    }

    fn begin_read(&self) -> Result<ReadTxn> {
        let db = self.handle()?;
        let tx = db.begin_read()?;
        Ok(ReadTxn::new(tx, db, self.config.codec))
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        match self.config.write_timeout {
            Some(timeout) => self
                .write_lock
                .try_lock_for(timeout)
                .ok_or(BoltyError::Timeout(timeout)),
            None => Ok(self.write_lock.lock()),
        }
    }
}

/// Open or create the database file and hand it to redb
fn open_database(config: &Config) -> Result<Database> {
    let file = open_file(&config.path, config.file_mode)?;

    let mut builder = Database::builder();
    if let Some(cache_size) = config.cache_size {
        builder.set_cache_size(cache_size);
    }

    builder.create_file(file).map_err(|e| match e {
        redb::DatabaseError::DatabaseAlreadyOpen => BoltyError::Locked(config.path.clone()),
        other => other.into(),
    })
}

fn open_file(path: &Path, mode: u32) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(options.open(path)?)
}
