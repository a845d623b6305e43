//! Transaction views
//!
//! Bucket-scoped wrappers over redb read and write transactions. Every
//! bucket is one redb table with raw byte keys and values.

use std::sync::Arc;

use redb::{
    Database, ReadOnlyTable, ReadTransaction, ReadableTable, Table, TableDefinition, TableError,
    TableHandle, WriteTransaction,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::config::CommitDurability;
use crate::error::{BoltyError, Result};

use super::scan::{read_prefix, PrefixScan, Record};

/// Table definition for a bucket
pub(crate) fn bucket_table(name: &str) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
    TableDefinition::new(name)
}

fn check_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        return Err(BoltyError::InvalidArgument(
            "bucket name must not be empty".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Read Transaction
// =============================================================================

/// A read-only snapshot of the store
///
/// Everything read through one `ReadTxn` reflects the same point in time.
pub struct ReadTxn {
    tx: ReadTransaction,
    db: Arc<Database>,
    codec: Codec,
}

impl ReadTxn {
    pub(crate) fn new(tx: ReadTransaction, db: Arc<Database>, codec: Codec) -> Self {
        Self { tx, db, codec }
    }

    /// Raw bytes stored under `key`
    ///
    /// Returns `BucketNotFound` or `KeyNotFound`; an empty value is only
    /// ever returned when an empty value was stored.
    pub fn get(&self, bucket: &str, key: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let table = self.open_bucket(bucket)?;
        let value = table.get(key.as_ref())?;
        match value {
            Some(value) => Ok(value.value().to_vec()),
            None => Err(BoltyError::KeyNotFound),
        }
    }

    /// Value stored under `key`, decoded with the store codec
    pub fn get_as<T: DeserializeOwned>(&self, bucket: &str, key: impl AsRef<[u8]>) -> Result<T> {
        let bytes = self.get(bucket, key)?;
        self.codec.decode(&bytes)
    }

    /// All records whose key starts with `prefix`, collected eagerly
    pub fn prefix(&self, bucket: &str, prefix: impl AsRef<[u8]>) -> Result<Vec<Record>> {
        let table = self.open_bucket(bucket)?;
        let (records, _) = read_prefix(&table, prefix.as_ref(), None, usize::MAX)?;
        Ok(records)
    }

    /// Bucket names in ascending order
    pub fn buckets(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .tx
            .list_tables()?
            .map(|handle| handle.name().to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Whether `bucket` exists in this snapshot
    pub fn contains_bucket(&self, bucket: &str) -> Result<bool> {
        match self.open_bucket(bucket) {
            Ok(_) => Ok(true),
            Err(BoltyError::BucketNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Turn this snapshot into a lazy prefix scan
    pub(crate) fn into_prefix_scan(
        self,
        bucket: &str,
        prefix: &[u8],
        batch_size: usize,
    ) -> Result<PrefixScan> {
        // Fail up front on a missing bucket rather than on the first `next()`
        self.open_bucket(bucket)?;
        Ok(PrefixScan::new(self.tx, self.db, bucket, prefix, batch_size))
    }

    fn open_bucket(&self, bucket: &str) -> Result<ReadOnlyTable<&'static [u8], &'static [u8]>> {
        check_bucket_name(bucket)?;
        match self.tx.open_table(bucket_table(bucket)) {
            Ok(table) => Ok(table),
            Err(TableError::TableDoesNotExist(_)) => {
                Err(BoltyError::BucketNotFound(bucket.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Write Transaction
// =============================================================================

/// A read-write transaction
///
/// Changes become visible to readers only when the enclosing
/// [`Store::update`](crate::Store::update) closure returns `Ok`.
pub struct WriteTxn {
    tx: WriteTransaction,
    _db: Arc<Database>,
    codec: Codec,
}

impl WriteTxn {
    pub(crate) fn new(
        mut tx: WriteTransaction,
        db: Arc<Database>,
        codec: Codec,
        durability: CommitDurability,
    ) -> Self {
        tx.set_durability(durability.to_redb());
        Self { tx, _db: db, codec }
    }

    /// Create a bucket; fails with `BucketExists` if it is already there
    pub fn create_bucket(&mut self, bucket: &str) -> Result<()> {
        check_bucket_name(bucket)?;
        if self.contains_bucket(bucket)? {
            return Err(BoltyError::BucketExists(bucket.to_string()));
        }
        // open_table creates the table as a side effect
        self.tx.open_table(bucket_table(bucket))?;
        Ok(())
    }

    /// Drop a bucket and every record in it
    pub fn delete_bucket(&mut self, bucket: &str) -> Result<()> {
        check_bucket_name(bucket)?;
        if !self.tx.delete_table(bucket_table(bucket))? {
            return Err(BoltyError::BucketNotFound(bucket.to_string()));
        }
        Ok(())
    }

    /// Encode `value` with the store codec and write it under `key`
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        bucket: &str,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        self.set_raw(bucket, key, &bytes)
    }

    /// Write `value` under `key` unchanged
    pub fn set_raw(&mut self, bucket: &str, key: impl AsRef<[u8]>, value: &[u8]) -> Result<()> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(BoltyError::InvalidArgument("key must not be empty".to_string()));
        }
        let mut table = self.open_bucket(bucket)?;
        table.insert(key, value)?;
        Ok(())
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&mut self, bucket: &str, key: impl AsRef<[u8]>) -> Result<bool> {
        let mut table = self.open_bucket(bucket)?;
        let removed = table.remove(key.as_ref())?.is_some();
        Ok(removed)
    }

    /// Raw bytes under `key`, including writes made earlier in this transaction
    pub fn get(&self, bucket: &str, key: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let table = self.open_bucket(bucket)?;
        let value = table.get(key.as_ref())?;
        match value {
            Some(value) => Ok(value.value().to_vec()),
            None => Err(BoltyError::KeyNotFound),
        }
    }

    /// Value under `key`, decoded with the store codec
    pub fn get_as<T: DeserializeOwned>(&self, bucket: &str, key: impl AsRef<[u8]>) -> Result<T> {
        let bytes = self.get(bucket, key)?;
        self.codec.decode(&bytes)
    }

    /// Whether `bucket` exists
    pub fn contains_bucket(&self, bucket: &str) -> Result<bool> {
        let found = self.tx.list_tables()?.any(|handle| handle.name() == bucket);
        Ok(found)
    }

    pub(crate) fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    pub(crate) fn abort(self) {
        // Nothing was published; an abort failure leaves nothing to undo
        drop(self.tx.abort());
    }

    /// Opening a table in a write transaction would create it, so check first
    fn open_bucket(&self, bucket: &str) -> Result<Table<'_, &'static [u8], &'static [u8]>> {
        check_bucket_name(bucket)?;
        if !self.contains_bucket(bucket)? {
            return Err(BoltyError::BucketNotFound(bucket.to_string()));
        }
        Ok(self.tx.open_table(bucket_table(bucket))?)
    }
}
