//! Prefix scans
//!
//! Ordered iteration over the keys of one bucket that share a byte prefix.

use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::ops::Bound;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use redb::{Database, ReadTransaction, ReadableTable};

use crate::codec::Codec;
use crate::error::{BoltyError, Result};

use super::txn::bucket_table;

/// A single key/value pair read from a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    /// Decode the value with the given codec
    pub fn decode<T: serde::de::DeserializeOwned>(&self, codec: Codec) -> Result<T> {
        codec.decode(&self.value)
    }

    /// Key as UTF-8, replacing invalid sequences
    pub fn key_lossy(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }
}

/// Read up to `limit` records whose key starts with `prefix`.
///
/// Starts at `prefix`, or strictly after `after` when resuming. The returned
/// flag is false once a key outside the prefix (or the end of the table) was
/// reached, meaning no further batch can produce anything.
pub(crate) fn read_prefix<T>(
    table: &T,
    prefix: &[u8],
    after: Option<&[u8]>,
    limit: usize,
) -> Result<(Vec<Record>, bool)>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let start = match after {
        Some(key) => Bound::Excluded(key),
        None => Bound::Included(prefix),
    };

    let mut records = Vec::new();
    for entry in table.range::<&[u8]>((start, Bound::Unbounded))? {
        let (key, value) = entry?;
        let key = key.value();

        // Keys are sorted bytewise, so the first miss ends the prefix range
        if !key.starts_with(prefix) {
            return Ok((records, false));
        }

        records.push(Record {
            key: key.to_vec(),
            value: value.value().to_vec(),
        });

        if records.len() >= limit {
            return Ok((records, true));
        }
    }

    Ok((records, false))
}

/// Read transaction plus the database handle it borrows from
///
/// Field order matters: the transaction drops before the handle.
pub(crate) struct Snapshot {
    tx: ReadTransaction,
    _db: Arc<Database>,
}

/// Where a scan's snapshot lives, shared with the owning [`Store`](crate::Store)
pub(crate) enum ScanSlot {
    Live(Snapshot),
    /// Every matching key was fetched; the snapshot is already released
    Finished,
    /// The store was closed under the scan
    Closed,
}

pub(crate) type SharedSlot = Arc<Mutex<ScanSlot>>;

/// Mark a scan closed and release its snapshot
pub(crate) fn close_slot(slot: &Mutex<ScanSlot>) {
    *slot.lock() = ScanSlot::Closed;
}

/// Lazy, ascending iterator over the records of a bucket matching a prefix
///
/// ## Consistency
/// The scan holds one read transaction for its whole life, so every batch is
/// read from the same snapshot regardless of writers committing meanwhile.
///
/// ## Memory
/// Records are pulled from the backend `batch_size` at a time; at most one
/// batch is buffered.
///
/// ## Close
/// [`Store::close`](crate::Store::close) releases the snapshot of every live
/// scan. The next call to `next()` then yields `Err(Closed)` once, buffered
/// records are discarded, and the scan ends.
///
/// The scan is single-use: once exhausted it keeps returning `None`. Call
/// [`Store::seek_prefix`](crate::Store::seek_prefix) again to re-scan.
pub struct PrefixScan {
    slot: SharedSlot,
    bucket: String,
    prefix: Vec<u8>,
    /// Records fetched but not yet yielded
    buffer: VecDeque<Record>,
    /// Last key fetched; the next batch resumes strictly after it
    last_key: Option<Vec<u8>>,
    done: bool,
    batch_size: usize,
}

impl PrefixScan {
    pub(crate) fn new(
        tx: ReadTransaction,
        db: Arc<Database>,
        bucket: &str,
        prefix: &[u8],
        batch_size: usize,
    ) -> Self {
        Self {
            slot: Arc::new(Mutex::new(ScanSlot::Live(Snapshot { tx, _db: db }))),
            bucket: bucket.to_string(),
            prefix: prefix.to_vec(),
            buffer: VecDeque::new(),
            last_key: None,
            done: false,
            batch_size: batch_size.max(1),
        }
    }

    /// Bucket being scanned
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Prefix being matched
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    pub(crate) fn slot(&self) -> Weak<Mutex<ScanSlot>> {
        Arc::downgrade(&self.slot)
    }

    fn fetch(&self, snapshot: &Snapshot) -> Result<(Vec<Record>, bool)> {
        let table = snapshot.tx.open_table(bucket_table(&self.bucket))?;
        read_prefix(
            &table,
            &self.prefix,
            self.last_key.as_deref(),
            self.batch_size,
        )
    }
}

impl Iterator for PrefixScan {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let slot = Arc::clone(&self.slot);
        let mut slot = slot.lock();

        if let ScanSlot::Closed = *slot {
            self.done = true;
            self.buffer.clear();
            return Some(Err(BoltyError::Closed));
        }
        if let Some(record) = self.buffer.pop_front() {
            return Some(Ok(record));
        }

        let fetched = match &*slot {
            ScanSlot::Live(snapshot) => self.fetch(snapshot),
            ScanSlot::Finished | ScanSlot::Closed => {
                self.done = true;
                return None;
            }
        };

        match fetched {
            Ok((batch, more)) => {
                if let Some(last) = batch.last() {
                    self.last_key = Some(last.key.clone());
                }
                self.buffer.extend(batch);
                if !more {
                    *slot = ScanSlot::Finished;
                }

                tracing::trace!(
                    bucket = %self.bucket,
                    buffered = self.buffer.len(),
                    exhausted = !more,
                    "prefix scan batch"
                );

                match self.buffer.pop_front() {
                    Some(record) => Some(Ok(record)),
                    None => {
                        self.done = true;
                        None
                    }
                }
            }
            Err(e) => {
                self.done = true;
                *slot = ScanSlot::Finished;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for PrefixScan {}
