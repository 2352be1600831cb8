//! Document store persisted in a single sled tree.
//!
//! Keys are `<collection>/<id>`, values are the bincode encoding of the
//! document together with its version. Commits run inside a sled
//! transaction, which re-checks every precondition against the tree at
//! commit time.

use sled::transaction::ConflictableTransactionError;
use sled::transaction::TransactionError;
use sled::IVec;
use tracing::debug;
use tracing::error;
use tracing::trace;

use super::init_sled_document_db;
use crate::constants::SLED_DOCUMENTS_TREE;
use crate::storage::document::matches_all;
use crate::storage::document::StoredEntry;
use crate::Collection;
use crate::Document;
use crate::DocumentStore;
use crate::Filter;
use crate::Precondition;
use crate::Result;
use crate::StorageConfig;
use crate::StorageError;
use crate::VersionedDocument;
use crate::WriteOp;

pub struct SledDocumentStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl std::fmt::Debug for SledDocumentStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledDocumentStore")
            .field("tree_len", &self.tree.len())
            .finish()
    }
}

impl SledDocumentStore {
    pub fn open(config: &StorageConfig) -> Result<Self> {
        Self::from_db(init_sled_document_db(config)?)
    }

    pub fn from_db(db: sled::Db) -> Result<Self> {
        let tree = db.open_tree(SLED_DOCUMENTS_TREE)?;
        debug!(documents = tree.len(), "sled document store opened");
        Ok(Self { db, tree })
    }
}

fn document_key(
    collection: Collection,
    id: &str,
) -> Vec<u8> {
    format!("{}/{}", collection.as_str(), id).into_bytes()
}

fn collection_prefix(collection: Collection) -> Vec<u8> {
    format!("{}/", collection.as_str()).into_bytes()
}

fn decode_entry(raw: &IVec) -> std::result::Result<StoredEntry, StorageError> {
    bincode::deserialize(raw).map_err(StorageError::BincodeError)
}

fn encode_entry(
    version: u64,
    document: &Document,
) -> std::result::Result<Vec<u8>, StorageError> {
    // serialize through a borrowed view to avoid cloning the document
    #[derive(serde::Serialize)]
    struct EntryRef<'a> {
        version: u64,
        document: &'a Document,
    }
    bincode::serialize(&EntryRef { version, document }).map_err(StorageError::BincodeError)
}

impl DocumentStore for SledDocumentStore {
    fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<VersionedDocument>> {
        match self.tree.get(document_key(collection, id))? {
            Some(raw) => {
                let entry = decode_entry(&raw)?;
                Ok(Some(VersionedDocument {
                    id: id.to_string(),
                    version: entry.version,
                    document: entry.document,
                }))
            }
            None => Ok(None),
        }
    }

    fn query_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<VersionedDocument>> {
        let prefix = collection_prefix(collection);
        let mut found = Vec::new();

        // scan_prefix yields keys in lexicographic order, i.e. ordered by id
        for item in self.tree.scan_prefix(&prefix) {
            let (key, raw) = item?;
            let entry = decode_entry(&raw)?;
            if !matches_all(filters, &entry.document) {
                continue;
            }
            let id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            found.push(VersionedDocument {
                id,
                version: entry.version,
                document: entry.document,
            });
        }

        Ok(found)
    }

    fn commit(
        &self,
        preconditions: Vec<Precondition>,
        writes: Vec<WriteOp>,
    ) -> Result<()> {
        // one version per commit; sled ids are unique, monotonic and start at 0
        let version = self.db.generate_id()? + 1;

        let result = self.tree.transaction(|tx| {
            for p in &preconditions {
                let current = match tx.get(document_key(p.collection, &p.id))? {
                    Some(raw) => Some(
                        decode_entry(&raw)
                            .map_err(ConflictableTransactionError::Abort)?
                            .version,
                    ),
                    None => None,
                };
                if current != p.version {
                    return Err(ConflictableTransactionError::Abort(
                        StorageError::TransactionConflict {
                            collection: p.collection,
                            id: p.id.clone(),
                        },
                    ));
                }
            }

            for write in &writes {
                match write {
                    WriteOp::Put {
                        collection,
                        id,
                        document,
                    } => {
                        let raw = encode_entry(version, document)
                            .map_err(ConflictableTransactionError::Abort)?;
                        tx.insert(document_key(*collection, id), raw)?;
                    }
                    WriteOp::Delete { collection, id } => {
                        tx.remove(document_key(*collection, id))?;
                    }
                }
            }
            Ok(())
        });

        match result {
            Ok(()) => {
                trace!(version, writes = writes.len(), "commit");
                Ok(())
            }
            Err(TransactionError::Abort(e)) => Err(e.into()),
            Err(TransactionError::Storage(e)) => {
                error!("sled transaction failed: {}", e);
                Err(e.into())
            }
        }
    }

    fn flush(&self) -> Result<()> {
        let bytes = self.db.flush()?;
        debug!("Successfully flushed document store, bytes flushed: {}", bytes);
        Ok(())
    }
}
