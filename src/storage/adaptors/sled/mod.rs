mod sled_document_store;

pub use sled_document_store::*;

#[cfg(test)]
mod sled_document_store_test;

use crate::constants::SLED_DOCUMENTS_DIR;
use crate::Error;
use crate::StorageConfig;

/// Opens the sled database holding every collection, under
/// `<db_root_dir>/documents`.
#[doc(hidden)]
pub fn init_sled_document_db(config: &StorageConfig) -> Result<sled::Db, Error> {
    tracing::debug!("init_sled_document_db from path: {:?}", &config.db_root_dir);

    let db_path = config.db_root_dir.join(SLED_DOCUMENTS_DIR);

    sled::Config::default()
        .path(&db_path)
        .cache_capacity(config.cache_capacity)
        .flush_every_ms(config.flush_every_ms)
        .use_compression(config.use_compression)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            tracing::warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                db_path,
                e
            );
            e.into()
        })
}
