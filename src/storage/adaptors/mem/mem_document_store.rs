use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use parking_lot::RwLock;
use tracing::trace;

use crate::storage::document::matches_all;
use crate::storage::document::StoredEntry;
use crate::Collection;
use crate::DocumentStore;
use crate::Filter;
use crate::Precondition;
use crate::Result;
use crate::StorageError;
use crate::VersionedDocument;
use crate::WriteOp;

/// In-memory document store.
///
/// A single write lock covers precondition checks and writes, so every
/// commit is atomic and serializable with respect to every other commit.
#[derive(Debug, Default)]
pub struct MemDocumentStore {
    documents: RwLock<HashMap<(Collection, String), StoredEntry>>,
    last_version: AtomicU64,
}

impl MemDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DocumentStore for MemDocumentStore {
    fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<VersionedDocument>> {
        let documents = self.documents.read();
        Ok(documents
            .get(&(collection, id.to_string()))
            .map(|entry| VersionedDocument {
                id: id.to_string(),
                version: entry.version,
                document: entry.document.clone(),
            }))
    }

    fn query_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<VersionedDocument>> {
        let documents = self.documents.read();
        let mut found: Vec<VersionedDocument> = documents
            .iter()
            .filter(|((c, _), entry)| *c == collection && matches_all(filters, &entry.document))
            .map(|((_, id), entry)| VersionedDocument {
                id: id.clone(),
                version: entry.version,
                document: entry.document.clone(),
            })
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    fn commit(
        &self,
        preconditions: Vec<Precondition>,
        writes: Vec<WriteOp>,
    ) -> Result<()> {
        let mut documents = self.documents.write();

        for p in &preconditions {
            let current = documents
                .get(&(p.collection, p.id.clone()))
                .map(|entry| entry.version);
            if current != p.version {
                trace!(collection = %p.collection, id = %p.id, ?current, expected = ?p.version, "precondition failed");
                return Err(StorageError::TransactionConflict {
                    collection: p.collection,
                    id: p.id.clone(),
                }
                .into());
            }
        }

        if writes.is_empty() {
            return Ok(());
        }

        let version = self.last_version.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(version, writes = writes.len(), "commit");
        for write in writes {
            match write {
                WriteOp::Put {
                    collection,
                    id,
                    document,
                } => {
                    documents.insert((collection, id), StoredEntry { version, document });
                }
                WriteOp::Delete { collection, id } => {
                    documents.remove(&(collection, id));
                }
            }
        }

        Ok(())
    }

    fn flush(&self) -> Result<()> {
        trace!("MemDocumentStore flush (no-op)");
        Ok(())
    }
}
