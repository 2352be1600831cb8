use tracing::warn;

use crate::Collection;
use crate::Document;
use crate::DocumentReader;
use crate::DocumentStore;
use crate::Filter;
use crate::Record;
use crate::Result;
use crate::Transaction;
use crate::VoterKey;

pub(crate) const FIELD_SESSION_ID: &str = "session_id";
pub(crate) const FIELD_VOTER: &str = "voter";
pub(crate) const FIELD_OPTION: &str = "option";
const FIELD_CAST_AT: &str = "cast_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    pub id: String,
    pub session_id: String,
    pub voter: VoterKey,
    pub option: String,
    /// ms since the Unix epoch
    pub cast_at: u64,
}

impl Record for VoteRecord {
    const COLLECTION: Collection = Collection::Votes;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_document(&self) -> Document {
        Document::new()
            .with(FIELD_SESSION_ID, &self.session_id)
            .with(FIELD_VOTER, self.voter.as_str())
            .with(FIELD_OPTION, &self.option)
            .with(FIELD_CAST_AT, self.cast_at)
    }

    fn from_document(
        id: &str,
        document: &Document,
    ) -> Result<Self> {
        let r = DocumentReader::new(Self::COLLECTION, id, document);
        Ok(Self {
            id: id.to_string(),
            session_id: r.str(FIELD_SESSION_ID)?,
            voter: VoterKey::from_stored(r.str(FIELD_VOTER)?),
            option: r.str(FIELD_OPTION)?,
            cast_at: r.u64(FIELD_CAST_AT)?,
        })
    }
}

fn decode_all(found: Vec<(String, Document)>) -> Result<Vec<VoteRecord>> {
    found
        .iter()
        .map(|(id, doc)| VoteRecord::from_document(id, doc))
        .collect()
}

/// Ledger operations inside a [`Transaction`].
pub(crate) struct Ledger;

impl Ledger {
    /// Current vote of `voter` in a session.
    ///
    /// More than one record means the uniqueness invariant was broken by an
    /// earlier writer; every extra record is returned so the caller can
    /// purge them in the same commit.
    pub(crate) fn records_for_voter<S: DocumentStore + ?Sized>(
        txn: &mut Transaction<'_, S>,
        session_id: &str,
        voter: &VoterKey,
    ) -> Result<Vec<VoteRecord>> {
        let records = decode_all(txn.query(
            Collection::Votes,
            &[
                Filter::eq(FIELD_SESSION_ID, session_id),
                Filter::eq(FIELD_VOTER, voter.as_str()),
            ],
        )?)?;
        if records.len() > 1 {
            warn!(
                session_id,
                count = records.len(),
                "multiple ledger entries for one voter"
            );
        }
        Ok(records)
    }

    pub(crate) fn records_for_option<S: DocumentStore + ?Sized>(
        txn: &mut Transaction<'_, S>,
        session_id: &str,
        option: &str,
    ) -> Result<Vec<VoteRecord>> {
        decode_all(txn.query(
            Collection::Votes,
            &[
                Filter::eq(FIELD_SESSION_ID, session_id),
                Filter::eq(FIELD_OPTION, option),
            ],
        )?)
    }

    pub(crate) fn get<S: DocumentStore + ?Sized>(
        txn: &mut Transaction<'_, S>,
        record_id: &str,
    ) -> Result<Option<VoteRecord>> {
        txn.get(Collection::Votes, record_id)?
            .map(|doc| VoteRecord::from_document(record_id, &doc))
            .transpose()
    }

    pub(crate) fn insert<S: DocumentStore + ?Sized>(
        txn: &mut Transaction<'_, S>,
        session_id: &str,
        voter: &VoterKey,
        option: &str,
        cast_at: u64,
    ) -> VoteRecord {
        let mut record = VoteRecord {
            id: String::new(),
            session_id: session_id.to_string(),
            voter: voter.clone(),
            option: option.to_string(),
            cast_at,
        };
        record.id = txn.insert(Collection::Votes, record.to_document());
        record
    }

    pub(crate) fn put<S: DocumentStore + ?Sized>(
        txn: &mut Transaction<'_, S>,
        record: &VoteRecord,
    ) {
        txn.set(Collection::Votes, &record.id, record.to_document());
    }

    pub(crate) fn delete<S: DocumentStore + ?Sized>(
        txn: &mut Transaction<'_, S>,
        record: &VoteRecord,
    ) {
        txn.delete(Collection::Votes, &record.id);
    }

    /// Non-transactional listing of a session's ledger, ordered by record id.
    pub(crate) fn list<S: DocumentStore + ?Sized>(
        store: &S,
        session_id: &str,
    ) -> Result<Vec<VoteRecord>> {
        store
            .query_documents(Collection::Votes, &[Filter::eq(FIELD_SESSION_ID, session_id)])?
            .iter()
            .map(|d| VoteRecord::from_document(&d.id, &d.document))
            .collect()
    }

    pub(crate) fn find_for_voter<S: DocumentStore + ?Sized>(
        store: &S,
        session_id: &str,
        voter: &VoterKey,
    ) -> Result<Option<VoteRecord>> {
        store
            .query_documents(
                Collection::Votes,
                &[
                    Filter::eq(FIELD_SESSION_ID, session_id),
                    Filter::eq(FIELD_VOTER, voter.as_str()),
                ],
            )?
            .first()
            .map(|d| VoteRecord::from_document(&d.id, &d.document))
            .transpose()
    }
}
