//! Persistence gateway: a document store with versioned single-document
//! reads, equality queries and atomic multi-document commits.

mod adaptors;
mod document;
mod document_store;
mod record;
mod transaction;


use std::sync::Arc;

pub use adaptors::*;
pub use document::Collection;
pub use document::Document;
pub use document::DocumentReader;
pub use document::Filter;
pub use document::Precondition;
pub use document::Value;
pub use document::VersionedDocument;
pub use document::WriteOp;
pub use document_store::*;
pub use record::Record;
pub use transaction::*;
use tracing::info;

use crate::Result;
use crate::StorageConfig;
use crate::StorageEngineKind;

/// Builds the document store selected by `config.engine`.
pub fn open_document_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    info!(engine = ?config.engine, "opening document store");
    Ok(match config.engine {
        StorageEngineKind::Memory => Arc::new(MemDocumentStore::new()),
        StorageEngineKind::Sled => Arc::new(SledDocumentStore::open(config)?),
    })
}
