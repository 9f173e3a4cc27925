//! Storage infrastructure shared by the content store and the user directory.
//!
//! ## Modules
//!
//! - `rocksdb`: RocksDB configuration, handle and batched writes
//! - `locks`: striped per-entity locks

pub mod locks;
pub mod rocksdb;

pub use locks::{EntityGuard, EntityLocks};
pub use rocksdb::{concat_key, RocksDbConfig, RocksDbHandle, WriteOps};

use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Database subdirectory under the configured data directory.
pub const DB_DIR: &str = "blogmate_db";

/// Opens the database with every column family used by the crate.
pub fn open_database(data_dir: impl AsRef<Path>, config: &RocksDbConfig) -> Result<Arc<RocksDbHandle>> {
    let column_families: Vec<&str> = crate::content::store::COLUMN_FAMILIES
        .iter()
        .chain(crate::users::directory::COLUMN_FAMILIES.iter())
        .copied()
        .collect();
    let db = RocksDbHandle::open(data_dir.as_ref().join(DB_DIR), config, &column_families)?;
    Ok(Arc::new(db))
}
