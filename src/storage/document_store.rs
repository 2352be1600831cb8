#[cfg(test)]
use mockall::automock;

use super::Collection;
use super::Filter;
use super::Precondition;
use super::VersionedDocument;
use super::WriteOp;
use crate::Result;

/// Persistence gateway consumed by the vote service.
///
/// Implementations must make [`DocumentStore::commit`] atomic: either every
/// precondition holds and every write is applied, or nothing changes and a
/// `StorageError::TransactionConflict` is returned.
#[cfg_attr(test, automock)]
pub trait DocumentStore: Send + Sync + 'static {
    fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<VersionedDocument>>;

    /// Committed documents of `collection` matching every filter, ordered by id
    fn query_documents(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<VersionedDocument>>;

    fn commit(
        &self,
        preconditions: Vec<Precondition>,
        writes: Vec<WriteOp>,
    ) -> Result<()>;

    /// Unconditional atomic multi-write
    fn batch_write(
        &self,
        writes: Vec<WriteOp>,
    ) -> Result<()> {
        self.commit(Vec::new(), writes)
    }

    fn generate_id(&self) -> String {
        nanoid::nanoid!()
    }

    fn flush(&self) -> Result<()>;
}
