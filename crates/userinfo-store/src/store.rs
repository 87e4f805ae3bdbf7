//! Bucket-scoped record store backed by redb.
//!
//! Buckets are redb tables keyed by `&str` with raw byte values. Every write
//! or delete runs in its own write transaction and commits before returning,
//! so a failed call leaves nothing visible. Reads go through short read
//! transactions and see a consistent snapshot.

use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition, TableError, TableHandle, WriteTransaction};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use userinfo_common::Record;

fn bucket_table(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

fn bucket_exists(write_txn: &WriteTransaction, bucket: &str) -> StoreResult<bool> {
    Ok(write_txn.list_tables()?.any(|table| table.name() == bucket))
}

/// Persistent record store backed by redb.
pub struct RecordStore {
    /// `None` once the store has been closed
    db: RwLock<Option<Database>>,
    location: PathBuf,
}

impl RecordStore {
    /// Open (or create) the store file at `location` and make sure every
    /// bucket in `buckets` exists.
    ///
    /// Failing to open the file is an error; failing to seed a bucket is
    /// logged and skipped.
    pub fn open<I>(location: impl AsRef<Path>, buckets: I) -> StoreResult<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let location = location.as_ref();
        if let Some(parent) = location.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(location)?;
        let store = Self {
            db: RwLock::new(Some(db)),
            location: location.to_path_buf(),
        };

        for bucket in buckets {
            let bucket = bucket.as_ref();
            if let Err(e) = store.write(bucket, "", &[]) {
                warn!("Failed to create bucket '{}': {}", bucket, e);
            }
        }

        info!("Opened store at {}", store.location.display());
        Ok(store)
    }

    /// Path of the store file
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Returns false once [`close`](Self::close) has run
    pub fn is_open(&self) -> bool {
        self.db.read().is_some()
    }

    /// Flush and release the store file.
    ///
    /// A final empty commit surfaces any pending I/O failure. Every later
    /// call on this store fails with [`StoreError::Closed`].
    pub fn close(&self) -> StoreResult<()> {
        let db = self.db.write().take().ok_or(StoreError::Closed)?;
        let write_txn = db.begin_write()?;
        write_txn.commit()?;
        drop(db);
        info!("Closed store at {}", self.location.display());
        Ok(())
    }

    // ---- Raw bucket operations ----

    /// Store `value` under `key` in `bucket`, creating the bucket if needed.
    ///
    /// An empty `key` only ensures the bucket exists.
    pub fn write(&self, bucket: &str, key: &str, value: &[u8]) -> StoreResult<()> {
        if bucket.is_empty() {
            return Err(StoreError::InvalidBucket(bucket.to_string()));
        }
        self.with_db(|db| {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(bucket_table(bucket))?;
                if !key.is_empty() {
                    table.insert(key, value)?;
                }
            }
            write_txn.commit()?;
            debug!(bucket, key, len = value.len(), "write committed");
            Ok(())
        })
    }

    /// Value stored under `key` in `bucket`.
    ///
    /// Returns `None` when either name is empty or the bucket or key is
    /// missing. Engine failures are logged and also reported as `None`; use
    /// [`try_read`](Self::try_read) to see them.
    pub fn read(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        match self.try_read(bucket, key) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to read '{}/{}': {}", bucket, key, e);
                None
            }
        }
    }

    /// Like [`read`](Self::read), but engine failures are returned.
    pub fn try_read(&self, bucket: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if bucket.is_empty() || key.is_empty() {
            return Ok(None);
        }
        self.with_db(|db| {
            let read_txn = db.begin_read()?;
            let table = match read_txn.open_table(bucket_table(bucket)) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            Ok(table.get(key)?.map(|v| v.value().to_vec()))
        })
    }

    /// Remove `key` from `bucket`.
    ///
    /// Fails with [`StoreError::BucketNotFound`] if the bucket does not exist;
    /// the bucket is not created as a side effect. A missing key is not an
    /// error.
    pub fn delete(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.with_db(|db| {
            let write_txn = db.begin_write()?;
            if bucket.is_empty() || !bucket_exists(&write_txn, bucket)? {
                write_txn.abort()?;
                return Err(StoreError::BucketNotFound(bucket.to_string()));
            }
            {
                let mut table = write_txn.open_table(bucket_table(bucket))?;
                table.remove(key)?;
            }
            write_txn.commit()?;
            debug!(bucket, key, "delete committed");
            Ok(())
        })
    }

    /// Check whether `bucket` exists
    pub fn has_bucket(&self, bucket: &str) -> StoreResult<bool> {
        self.with_db(|db| {
            let read_txn = db.begin_read()?;
            Ok(read_txn.list_tables()?.any(|table| table.name() == bucket))
        })
    }

    /// Names of all buckets, sorted
    pub fn buckets(&self) -> StoreResult<Vec<String>> {
        self.with_db(|db| {
            let read_txn = db.begin_read()?;
            let mut names: Vec<String> = read_txn
                .list_tables()?
                .map(|table| table.name().to_string())
                .collect();
            names.sort();
            Ok(names)
        })
    }

    /// Visit every entry of `bucket` in key order.
    ///
    /// Runs inside a write transaction so the bucket is created if missing.
    /// The first error returned by `visit` aborts the scan and is returned.
    pub(crate) fn scan<F>(&self, bucket: &str, mut visit: F) -> StoreResult<usize>
    where
        F: FnMut(&str, &[u8]) -> StoreResult<()>,
    {
        if bucket.is_empty() {
            return Err(StoreError::InvalidBucket(bucket.to_string()));
        }
        self.with_db(|db| {
            let write_txn = db.begin_write()?;
            let count = {
                let table = write_txn.open_table(bucket_table(bucket))?;
                let mut count = 0;
                for entry in table.iter()? {
                    let (key, value) = entry?;
                    visit(key.value(), value.value())?;
                    count += 1;
                }
                count
            };
            write_txn.commit()?;
            Ok(count)
        })
    }

    // ---- Typed records ----

    /// Encode `record` and store it under its own key and bucket
    pub fn put_record<T: Record>(&self, record: &T) -> StoreResult<()> {
        let bytes = record.encode().map_err(StoreError::Encode)?;
        self.write(T::BUCKET, record.key(), &bytes)
    }

    /// Read and decode the record stored under `key`
    pub fn get_record<T: Record>(&self, key: &str) -> StoreResult<Option<T>> {
        let Some(bytes) = self.try_read(T::BUCKET, key)? else {
            return Ok(None);
        };
        T::decode(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                bucket: T::BUCKET.to_string(),
                key: key.to_string(),
                source,
            })
    }

    /// Remove the record stored under `key`
    pub fn delete_record<T: Record>(&self, key: &str) -> StoreResult<()> {
        self.delete(T::BUCKET, key)
    }

    // ---- Generic helpers ----

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StoreError::Closed)?;
        f(db)
    }
}
