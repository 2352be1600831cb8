use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tracing_test::traced_test;

use super::SledDocumentStore;
use crate::storage::document_store_test::DocumentStoreBuilder;
use crate::storage::document_store_test::DocumentStoreTestSuite;
use crate::Collection;
use crate::Document;
use crate::DocumentStore;
use crate::Error;
use crate::StorageConfig;
use crate::WriteOp;

struct SledDocumentStoreBuilder {
    temp_dir: TempDir,
}

impl SledDocumentStoreBuilder {
    fn new() -> Self {
        Self {
            temp_dir: tempfile::tempdir().expect("temp dir"),
        }
    }
}

#[async_trait]
impl DocumentStoreBuilder for SledDocumentStoreBuilder {
    type Store = SledDocumentStore;

    async fn build(&self) -> Result<Arc<Self::Store>, Error> {
        // every build gets a fresh database
        let db = sled::Config::new()
            .path(self.temp_dir.path().join(nanoid::nanoid!()))
            .open()?;
        Ok(Arc::new(SledDocumentStore::from_db(db)?))
    }

    async fn cleanup(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[tokio::test]
#[traced_test]
async fn test_sled_document_store() -> Result<(), Error> {
    DocumentStoreTestSuite::run_all_tests(SledDocumentStoreBuilder::new()).await
}

#[test]
fn test_documents_survive_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        db_root_dir: temp_dir.path().to_path_buf(),
        flush_every_ms: None,
        ..StorageConfig::default()
    };

    {
        let store = SledDocumentStore::open(&config).unwrap();
        store
            .batch_write(vec![WriteOp::Put {
                collection: Collection::Sessions,
                id: "s1".into(),
                document: Document::new().with("title", "Lunch"),
            }])
            .unwrap();
        store.flush().unwrap();
    }

    let store = SledDocumentStore::open(&config).unwrap();
    let doc = store.get_document(Collection::Sessions, "s1").unwrap().unwrap();
    assert_eq!(doc.document, Document::new().with("title", "Lunch"));
}

#[test]
fn test_first_commit_gets_nonzero_version() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = sled::Config::new().path(temp_dir.path().join("db")).open().unwrap();
    let store = SledDocumentStore::from_db(db).unwrap();

    store
        .batch_write(vec![WriteOp::Put {
            collection: Collection::Sessions,
            id: "s1".into(),
            document: Document::new(),
        }])
        .unwrap();

    let doc = store.get_document(Collection::Sessions, "s1").unwrap().unwrap();
    assert!(doc.version >= 1);
}
