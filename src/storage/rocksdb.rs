//! RocksDB handle shared by the content store and the user directory.
//!
//! Records are bincode-encoded. Index column families hold empty values and
//! carry all their information in the key, so ordered listings are a single
//! seek plus forward iteration.

use crate::error::{BlogError, Result};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Tuning knobs for the RocksDB instance.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Maximum number of open files.
    pub max_open_files: i32,
    /// Number of info log files to keep.
    pub keep_log_file_num: usize,
    /// Maximum WAL size in bytes.
    pub max_wal_size: u64,
    /// Write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Maximum number of write buffers.
    pub max_write_buffer_number: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            max_open_files: 128,
            keep_log_file_num: 2,
            max_wal_size: 16 * 1024 * 1024,      // 16MB
            write_buffer_size: 8 * 1024 * 1024, // 8MB
            max_write_buffer_number: 2,
        }
    }
}

impl RocksDbConfig {
    /// Configuration for the long-running server process.
    pub fn for_server() -> Self {
        Self {
            max_open_files: 256,
            keep_log_file_num: 3,
            max_wal_size: 64 * 1024 * 1024,      // 64MB
            write_buffer_size: 32 * 1024 * 1024, // 32MB
            max_write_buffer_number: 3,
        }
    }

    fn build_options(&self) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(self.max_open_files);
        opts.set_keep_log_file_num(self.keep_log_file_num);
        opts.set_max_total_wal_size(self.max_wal_size);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_write_buffer_size(self.write_buffer_size);
        opts.set_max_write_buffer_number(self.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Concatenates fixed-width key parts.
///
/// All parts used by this crate are fixed width (ids, timestamps), so no
/// separator is needed for prefix iteration to be unambiguous.
pub fn concat_key(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len()).sum();
    let mut key = Vec::with_capacity(len);
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Big-endian millisecond timestamp, sorts oldest first.
pub fn timestamp_key(millis: i64) -> [u8; 8] {
    (millis.max(0) as u64).to_be_bytes()
}

/// Inverted big-endian millisecond timestamp, sorts newest first.
pub fn inverted_timestamp_key(millis: i64) -> [u8; 8] {
    (u64::MAX - millis.max(0) as u64).to_be_bytes()
}

// =============================================================================
// Batched writes
// =============================================================================

enum WriteOp {
    Put {
        cf: &'static str,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        cf: &'static str,
        key: Vec<u8>,
    },
}

/// A set of writes committed atomically by [`RocksDbHandle::commit`].
#[derive(Default)]
pub struct WriteOps {
    ops: Vec<WriteOp>,
}

impl WriteOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a bincode-encoded record.
    pub fn put<T: Serialize>(&mut self, cf: &'static str, key: &[u8], value: &T) -> Result<()> {
        let value = bincode::serialize(value)
            .map_err(|e| BlogError::serialization(format!("Failed to serialize: {}", e)))?;
        self.ops.push(WriteOp::Put {
            cf,
            key: key.to_vec(),
            value,
        });
        Ok(())
    }

    /// Queues raw bytes, used for index entries.
    pub fn put_raw(&mut self, cf: &'static str, key: &[u8], value: &[u8]) {
        self.ops.push(WriteOp::Put {
            cf,
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    pub fn delete(&mut self, cf: &'static str, key: &[u8]) {
        self.ops.push(WriteOp::Delete {
            cf,
            key: key.to_vec(),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

// =============================================================================
// Database Handle
// =============================================================================

/// Thread-safe RocksDB wrapper with column-family helpers.
pub struct RocksDbHandle {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksDbHandle {
    /// Opens (or creates) the database with the given column families.
    pub fn open(
        db_path: impl AsRef<Path>,
        config: &RocksDbConfig,
        column_families: &[&str],
    ) -> Result<Self> {
        let opts = config.build_options();
        let cf_descriptors: Vec<_> = column_families
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, Options::default()))
            .collect();

        let db = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(
            &opts,
            db_path.as_ref(),
            cf_descriptors,
        )
        .map_err(|e| BlogError::storage(format!("Failed to open RocksDB: {}", e)))?;

        debug!(
            path = %db_path.as_ref().display(),
            column_families = column_families.len(),
            "db_open: database ready"
        );

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| BlogError::storage(format!("Column family '{}' not found", name)))
    }

    /// Loads and deserializes the record at `key`.
    pub fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        match self.get_raw(cf_name, key)? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes).map_err(|e| {
                    BlogError::serialization(format!("Failed to deserialize: {}", e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Loads raw bytes at `key`.
    pub fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let value = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| BlogError::storage(format!("Failed to read: {}", e)))?;

        trace!(
            cf = cf_name,
            key_len = key.len(),
            found = value.is_some(),
            "db_get: lookup"
        );

        Ok(value)
    }

    /// Checks whether `key` is present.
    pub fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        Ok(self.get_raw(cf_name, key)?.is_some())
    }

    /// Stores a single record outside of a batch.
    pub fn put<T: Serialize>(&self, cf_name: &'static str, key: &[u8], value: &T) -> Result<()> {
        let mut ops = WriteOps::new();
        ops.put(cf_name, key, value)?;
        self.commit(ops)
    }

    /// Applies all queued writes atomically.
    pub fn commit(&self, ops: WriteOps) -> Result<()> {
        let count = ops.len();
        let mut batch = WriteBatch::default();
        for op in ops.ops {
            match op {
                WriteOp::Put { cf, key, value } => {
                    let handle = self.cf(cf)?;
                    batch.put_cf(&handle, key, value);
                }
                WriteOp::Delete { cf, key } => {
                    let handle = self.cf(cf)?;
                    batch.delete_cf(&handle, key);
                }
            }
        }

        self.db
            .write(batch)
            .map_err(|e| BlogError::storage(format!("Failed to write batch: {}", e)))?;

        trace!(ops = count, "db_commit: batch written");
        Ok(())
    }

    /// Walks keys that start with `prefix`, in key order.
    ///
    /// The callback receives (key, value) and returns false to stop.
    pub fn prefix_iterate<F>(&self, cf_name: &str, prefix: &[u8], mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<bool>,
    {
        let cf = self.cf(cf_name)?;
        let mut iter = self.db.raw_iterator_cf(&cf);
        iter.seek(prefix);

        let mut count: usize = 0;
        while iter.valid() {
            let (Some(key), Some(value)) = (iter.key(), iter.value()) else {
                break;
            };
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
            if !callback(key, value)? {
                break;
            }
            iter.next();
        }
        if let Err(e) = iter.status() {
            warn!(cf = cf_name, "Iterator error: {}", e);
            return Err(BlogError::storage(format!("Iterator failed: {}", e)));
        }

        debug!(
            cf = cf_name,
            prefix_len = prefix.len(),
            records_iterated = count,
            "db_prefix_iterate: completed iteration"
        );

        Ok(())
    }

    /// Collects the keys under `prefix` with the prefix stripped.
    pub fn prefix_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        self.prefix_iterate(cf_name, prefix, |key, _| {
            keys.push(key[prefix.len()..].to_vec());
            Ok(true)
        })?;
        Ok(keys)
    }

    /// Deserializes every record in a column family.
    pub fn collect_all<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut results = Vec::new();
        let mut errors: usize = 0;

        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) =
                item.map_err(|e| BlogError::storage(format!("Iterator failed: {}", e)))?;
            match bincode::deserialize(&value) {
                Ok(record) => results.push(record),
                Err(e) => {
                    errors += 1;
                    warn!(cf = cf_name, "Failed to deserialize record: {}", e);
                }
            }
        }

        debug!(
            cf = cf_name,
            records_collected = results.len(),
            deserialization_errors = errors,
            "db_collect_all: collected records"
        );

        Ok(results)
    }
}

impl std::fmt::Debug for RocksDbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbHandle")
            .field("db", &"RocksDB")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Record {
        name: String,
        value: u64,
    }

    fn create_test_db() -> (RocksDbHandle, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = RocksDbConfig::default();
        let db = RocksDbHandle::open(temp_dir.path().join("db"), &config, &["data", "idx"])
            .expect("Failed to open db");
        (db, temp_dir)
    }

    #[test]
    fn test_concat_key() {
        assert_eq!(concat_key(&[b"ab", b"", b"cd"]), b"abcd");
    }

    #[test]
    fn test_timestamp_key_ordering() {
        assert!(timestamp_key(1) < timestamp_key(2));
        assert!(inverted_timestamp_key(2) < inverted_timestamp_key(1));
    }

    #[test]
    fn test_put_and_get() {
        let (db, _temp) = create_test_db();
        let record = Record {
            name: "first".to_string(),
            value: 7,
        };
        db.put("data", b"k1", &record).unwrap();
        let loaded: Record = db.get("data", b"k1").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(db.get::<Record>("data", b"missing").unwrap().is_none());
    }

    #[test]
    fn test_commit_is_applied_together() {
        let (db, _temp) = create_test_db();
        db.put("data", b"old", &1u64).unwrap();

        let mut ops = WriteOps::new();
        ops.put("data", b"new", &2u64).unwrap();
        ops.put_raw("idx", b"new", &[]);
        ops.delete("data", b"old");
        db.commit(ops).unwrap();

        assert!(!db.exists("data", b"old").unwrap());
        assert!(db.exists("data", b"new").unwrap());
        assert!(db.exists("idx", b"new").unwrap());
    }

    #[test]
    fn test_prefix_keys_in_order() {
        let (db, _temp) = create_test_db();
        for key in [&b"p:b"[..], b"p:a", b"q:a", b"p:c"] {
            db.put("idx", key, &0u8).unwrap();
        }
        let keys = db.prefix_keys("idx", b"p:").unwrap();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_prefix_iterate_stops_early() {
        let (db, _temp) = create_test_db();
        for i in 0u8..5 {
            db.put("idx", &[b'x', i], &i).unwrap();
        }
        let mut seen = 0;
        db.prefix_iterate("idx", b"x", |_, _| {
            seen += 1;
            Ok(seen < 2)
        })
        .unwrap();
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_unknown_column_family() {
        let (db, _temp) = create_test_db();
        assert!(matches!(
            db.get_raw("nope", b"k"),
            Err(BlogError::Storage(_))
        ));
    }
}
