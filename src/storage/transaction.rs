//! Optimistic read-modify-write transactions over a [`DocumentStore`].
//!
//! A [`Transaction`] records the version of every document it reads and
//! buffers every write. Commit hands both to the store, which applies the
//! writes only if none of the recorded versions moved. [`run_transaction`]
//! re-runs the whole body on conflict with exponential backoff, bounded by
//! the policy's attempt count and deadline.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use super::document::matches_all;
use super::Collection;
use super::Document;
use super::DocumentStore;
use super::Filter;
use super::Precondition;
use super::WriteOp;
use crate::metrics::TRANSACTION_CONFLICT_COUNTER;
use crate::BackoffPolicy;
use crate::Error;
use crate::Result;
use crate::StorageError;
use crate::SystemError;
use crate::VoteError;

type DocKey = (Collection, String);

pub struct Transaction<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    /// Version observed at first read; `None` if the document was absent
    reads: BTreeMap<DocKey, Option<u64>>,
    /// Pending writes; `None` is a delete
    writes: BTreeMap<DocKey, Option<Document>>,
}

impl<'a, S: DocumentStore + ?Sized> Transaction<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    fn observe(
        &mut self,
        key: DocKey,
        version: Option<u64>,
    ) -> Result<()> {
        match self.reads.entry(key) {
            Entry::Vacant(e) => {
                e.insert(version);
                Ok(())
            }
            Entry::Occupied(e) if *e.get() == version => Ok(()),
            // the document moved under us between two reads
            Entry::Occupied(e) => {
                let (collection, id) = e.key().clone();
                Err(StorageError::TransactionConflict { collection, id }.into())
            }
        }
    }

    /// Reads a document, observing this transaction's own pending writes.
    pub fn get(
        &mut self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>> {
        let key = (collection, id.to_string());
        if let Some(pending) = self.writes.get(&key) {
            return Ok(pending.clone());
        }

        let current = self.store.get_document(collection, id)?;
        self.observe(key, current.as_ref().map(|d| d.version))?;
        Ok(current.map(|d| d.document))
    }

    /// Equality query over committed state overlaid with pending writes.
    ///
    /// Returned committed documents join the read set. Documents inserted
    /// concurrently by others are not detected here; callers serialize on a
    /// parent document read with [`Transaction::get`] and rewritten by every
    /// writer.
    pub fn query(
        &mut self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<(String, Document)>> {
        let mut found = BTreeMap::new();
        for doc in self.store.query_documents(collection, filters)? {
            self.observe((collection, doc.id.clone()), Some(doc.version))?;
            found.insert(doc.id, doc.document);
        }

        for ((c, id), pending) in &self.writes {
            if *c != collection {
                continue;
            }
            match pending {
                Some(doc) if matches_all(filters, doc) => {
                    found.insert(id.clone(), doc.clone());
                }
                _ => {
                    found.remove(id);
                }
            }
        }

        Ok(found.into_iter().collect())
    }

    /// Buffers a new document under a fresh id and returns the id.
    pub fn insert(
        &mut self,
        collection: Collection,
        document: Document,
    ) -> String {
        let id = self.store.generate_id();
        // an id collision must fail the commit rather than overwrite
        self.reads.entry((collection, id.clone())).or_insert(None);
        self.writes.insert((collection, id.clone()), Some(document));
        id
    }

    pub fn set(
        &mut self,
        collection: Collection,
        id: &str,
        document: Document,
    ) {
        self.writes.insert((collection, id.to_string()), Some(document));
    }

    pub fn delete(
        &mut self,
        collection: Collection,
        id: &str,
    ) {
        self.writes.insert((collection, id.to_string()), None);
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    pub fn commit(self) -> Result<()> {
        let preconditions = self
            .reads
            .into_iter()
            .map(|((collection, id), version)| Precondition {
                collection,
                id,
                version,
            })
            .collect();
        let writes = self
            .writes
            .into_iter()
            .map(|((collection, id), pending)| match pending {
                Some(document) => WriteOp::Put {
                    collection,
                    id,
                    document,
                },
                None => WriteOp::Delete { collection, id },
            })
            .collect();

        self.store.commit(preconditions, writes)
    }
}

/// Runs `body` inside a transaction until it commits.
///
/// Only write conflicts are retried; any other error from `body` or from the
/// commit is returned as is. When the attempt budget or the deadline runs
/// out, fails with [`VoteError::Conflict`].
pub async fn run_transaction<S, T, F>(
    store: &S,
    policy: &BackoffPolicy,
    mut body: F,
) -> Result<T>
where
    S: DocumentStore + ?Sized,
    F: FnMut(&mut Transaction<'_, S>) -> Result<T>,
{
    let deadline = Instant::now() + policy.timeout();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = {
            let mut txn = Transaction::new(store);
            body(&mut txn).and_then(|value| txn.commit().map(|_| value))
        };

        let (collection, id) = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "transaction committed after retry");
                }
                return Ok(value);
            }
            Err(Error::System(SystemError::Storage(StorageError::TransactionConflict {
                collection,
                id,
            }))) => (collection, id),
            Err(e) => return Err(e),
        };

        TRANSACTION_CONFLICT_COUNTER
            .with_label_values(&[collection.as_str()])
            .inc();

        if attempt >= policy.max_retries || Instant::now() >= deadline {
            warn!(%collection, %id, attempt, "transaction retries exhausted");
            return Err(VoteError::Conflict {
                collection,
                id,
                attempts: attempt,
            }
            .into());
        }

        let delay = with_jitter(policy.delay_for(attempt));
        debug!(%collection, %id, attempt, ?delay, "write conflict, retrying transaction");
        sleep(delay).await;
    }
}

/// Adds up to 50% random jitter so contending writers spread out.
fn with_jitter(delay: Duration) -> Duration {
    let millis = delay.as_millis() as u64;
    if millis == 0 {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..=millis / 2);
    Duration::from_millis(millis + extra)
}
