use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use super::invalid_config;
use crate::Result;

/// Document store implementation backing the ledger
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngineKind {
    /// Process-local, lost on restart
    Memory,
    /// Embedded sled database under `db_root_dir`
    #[default]
    Sled,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub engine: StorageEngineKind,

    #[serde(default = "default_db_dir")]
    pub db_root_dir: PathBuf,

    /// Sled page cache size in bytes
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Sled background flush interval. `None` flushes only on demand.
    #[serde(default = "default_flush_every_ms")]
    pub flush_every_ms: Option<u64>,

    #[serde(default = "default_use_compression")]
    pub use_compression: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: StorageEngineKind::default(),
            db_root_dir: default_db_dir(),
            cache_capacity: default_cache_capacity(),
            flush_every_ms: default_flush_every_ms(),
            use_compression: default_use_compression(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.engine == StorageEngineKind::Sled {
            if self.db_root_dir.as_os_str().is_empty() {
                return Err(invalid_config("storage.db_root_dir cannot be empty"));
            }
            if self.cache_capacity == 0 {
                return Err(invalid_config("storage.cache_capacity must be positive"));
            }
        }
        if self.flush_every_ms == Some(0) {
            return Err(invalid_config(
                "storage.flush_every_ms must be positive (omit it to disable periodic flush)",
            ));
        }
        Ok(())
    }
}

fn default_db_dir() -> PathBuf {
    PathBuf::from("./db")
}
fn default_cache_capacity() -> u64 {
    64 * 1024 * 1024 //64MB
}
fn default_flush_every_ms() -> Option<u64> {
    Some(500)
}
fn default_use_compression() -> bool {
    true
}
