use std::sync::Arc;

use autometrics::autometrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::apply_delta;
use crate::constants::MAX_RECENT_AUDIT_ENTRIES;
use crate::ledger::Ledger;
use crate::metrics;
use crate::metrics::init_metrics;
use crate::metrics::VOTE_OPERATIONS_COUNTER;
use crate::open_document_store;
use crate::read_audit_trail;
use crate::read_recent_audit_entries;
use crate::run_transaction;
use crate::session::validate_label;
use crate::session::SESSION_CREATOR_FIELD;
use crate::utils::time::timestamp_millis;
use crate::AuditEntry;
use crate::AuditEvent;
use crate::AuditRecorder;
use crate::Collection;
use crate::DocumentStore;
use crate::Error;
use crate::Filter;
use crate::NewSession;
use crate::Record;
use crate::Result;
use crate::SessionUpdate;
use crate::Severity;
use crate::Tally;
use crate::Transaction;
use crate::VoteError;
use crate::VoteRecord;
use crate::VoteServiceConfig;
use crate::VoterKey;
use crate::VotingSession;
use crate::API_SLO;

/// Vote casting, retraction and option maintenance over a
/// [`DocumentStore`].
///
/// Every mutation is one optimistic transaction that reads and rewrites the
/// session document, so concurrent writers to a session serialize on it and
/// a commit either moves ledger and tally together or not at all. Audit
/// entries are emitted after the commit and never fail the call.
pub struct VoteService<S: DocumentStore + ?Sized = dyn DocumentStore> {
    store: Arc<S>,
    audit: AuditRecorder,
    config: VoteServiceConfig,
}

impl VoteService<dyn DocumentStore> {
    /// Validates `config`, opens the configured store and registers metrics.
    pub fn open(config: VoteServiceConfig) -> Result<Self> {
        let config = config.validate()?;
        init_metrics();
        let store = open_document_store(&config.storage)?;
        Ok(Self::new(store, config))
    }
}

impl<S: DocumentStore + ?Sized> VoteService<S> {
    pub fn new(
        store: Arc<S>,
        config: VoteServiceConfig,
    ) -> Self {
        let audit = AuditRecorder::from_config(&config.audit, store.clone());
        Self {
            store,
            audit,
            config,
        }
    }

    pub fn with_audit_recorder(
        mut self,
        audit: AuditRecorder,
    ) -> Self {
        self.audit = audit;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &VoteServiceConfig {
        &self.config
    }

    /// Serves `/metrics` on `monitoring.prometheus_port` until
    /// `shutdown_signal` fires. Returns `None` when Prometheus is disabled.
    pub fn start_metrics_server(
        &self,
        shutdown_signal: watch::Receiver<()>,
    ) -> Option<JoinHandle<()>> {
        let monitoring = &self.config.monitoring;
        if !monitoring.prometheus_enabled {
            debug!("prometheus disabled, metrics server not started");
            return None;
        }
        let port = monitoring.prometheus_port;
        Some(tokio::spawn(async move {
            metrics::start_server(port, shutdown_signal).await;
        }))
    }

    pub fn voter_key(
        &self,
        voter_id: &str,
    ) -> VoterKey {
        VoterKey::derive(&self.config.voting.voter_key_secret, voter_id)
    }

    // ============== Session maintenance ============== //

    #[autometrics(objective = API_SLO)]
    pub async fn create_session(
        &self,
        input: NewSession,
    ) -> Result<VotingSession> {
        input.validate(&self.config.voting)?;

        let session = run_transaction(self.store.as_ref(), &self.config.retry.transaction, |txn| {
            let mut session = input.clone().into_session(String::new(), timestamp_millis());
            session.id = txn.insert(Collection::Sessions, session.to_document());
            Ok(session)
        })
        .await?;

        info!(session_id = %session.id, options = session.options.len(), "session created");
        Ok(session)
    }

    #[autometrics(objective = API_SLO)]
    pub async fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<VotingSession> {
        require("session_id", session_id)?;
        if update.is_empty() {
            return self.get_session(session_id).await;
        }

        let session = run_transaction(self.store.as_ref(), &self.config.retry.transaction, |txn| {
            let mut session = load_session(txn, session_id)?;
            update.apply_to(&mut session, timestamp_millis())?;
            save_session(txn, &session);
            Ok(session)
        })
        .await?;

        info!(session_id, status = %session.status, "session updated");
        Ok(session)
    }

    /// Appends a new option with an explicit zero count.
    #[autometrics(objective = API_SLO)]
    pub async fn add_option(
        &self,
        session_id: &str,
        option: &str,
    ) -> Result<VotingSession> {
        require("session_id", session_id)?;
        validate_label(option, &self.config.voting)?;
        let max_options = self.config.voting.max_options;

        let session = run_transaction(self.store.as_ref(), &self.config.retry.transaction, |txn| {
            let mut session = load_session(txn, session_id)?;
            if session.has_option(option) {
                return Err(Error::invalid_argument(format!("option `{option}` already exists")));
            }
            if session.options.len() >= max_options {
                return Err(Error::invalid_argument(format!(
                    "a session allows at most {max_options} options"
                )));
            }
            session.options.push(option.to_string());
            session.tally = session.tally.add_option(option);
            session.updated_at = timestamp_millis();
            save_session(txn, &session);
            Ok(session)
        })
        .await?;

        info!(session_id, option, "option added");
        Ok(session)
    }

    /// Drops `option` from the session together with its tally key and every
    /// vote cast for it, in one commit. Returns the purged votes.
    #[autometrics(objective = API_SLO)]
    pub async fn remove_option(
        &self,
        session_id: &str,
        option: &str,
    ) -> Result<Vec<VoteRecord>> {
        require("session_id", session_id)?;
        require("option", option)?;

        let purged = run_transaction(self.store.as_ref(), &self.config.retry.transaction, |txn| {
            let mut session = load_session(txn, session_id)?;
            if !session.has_option(option) {
                return Err(unknown_option(option));
            }

            let purged = Ledger::records_for_option(txn, session_id, option)?;
            for record in &purged {
                Ledger::delete(txn, record);
            }
            session.options.retain(|o| o != option);
            session.tally = session.tally.remove_option(option);
            session.updated_at = timestamp_millis();
            save_session(txn, &session);
            Ok(purged)
        })
        .await?;

        let now = timestamp_millis();
        for record in &purged {
            self.audit
                .record(AuditEvent::vote_deleted(session_id, &record.voter, option, now));
        }
        VOTE_OPERATIONS_COUNTER
            .with_label_values(&["purge"])
            .inc_by(purged.len() as u64);
        info!(session_id, option, purged = purged.len(), "option removed");
        Ok(purged)
    }

    /// Renames an option in place. Its count moves to `new` and every vote
    /// for `old` is rewritten, in one commit.
    #[autometrics(objective = API_SLO)]
    pub async fn rename_option(
        &self,
        session_id: &str,
        old: &str,
        new: &str,
    ) -> Result<VotingSession> {
        require("session_id", session_id)?;
        require("option", old)?;
        validate_label(new, &self.config.voting)?;

        let (session, rewritten) =
            run_transaction(self.store.as_ref(), &self.config.retry.transaction, |txn| {
                let mut session = load_session(txn, session_id)?;
                if !session.has_option(old) {
                    return Err(unknown_option(old));
                }
                if session.has_option(new) {
                    return Err(Error::invalid_argument(format!("option `{new}` already exists")));
                }

                let records = Ledger::records_for_option(txn, session_id, old)?;
                for record in &records {
                    let mut renamed = record.clone();
                    renamed.option = new.to_string();
                    Ledger::put(txn, &renamed);
                }
                for o in session.options.iter_mut().filter(|o| o.as_str() == old) {
                    *o = new.to_string();
                }
                session.tally = session.tally.rename_option(old, new);
                session.updated_at = timestamp_millis();
                save_session(txn, &session);
                Ok((session, records.len()))
            })
            .await?;

        info!(session_id, old, new, rewritten, "option renamed");
        Ok(session)
    }

    // ============== Votes ============== //

    /// Records `voter_id`'s vote for `option`, replacing any earlier vote
    /// of the same voter in the session.
    #[autometrics(objective = API_SLO)]
    pub async fn cast_vote(
        &self,
        session_id: &str,
        voter_id: &str,
        option: &str,
    ) -> Result<VoteRecord> {
        require("session_id", session_id)?;
        require("voter_id", voter_id)?;
        require("option", option)?;
        let voter = self.voter_key(voter_id);

        let (record, previous) =
            run_transaction(self.store.as_ref(), &self.config.retry.transaction, |txn| {
                let now = timestamp_millis();
                let mut session = load_session(txn, session_id)?;
                if !session.has_option(option) {
                    return Err(unknown_option(option));
                }
                self.check_window(&session, now)?;

                let mut existing = Ledger::records_for_voter(txn, session_id, &voter)?.into_iter();
                let previous = existing.next();
                let mut tally = session.tally.clone();
                // duplicates from an earlier broken writer are purged here
                for extra in existing {
                    tally = apply_delta(&tally, Some(&extra.option), None);
                    Ledger::delete(txn, &extra);
                }
                if let Some(prev) = &previous {
                    Ledger::delete(txn, prev);
                }
                tally = apply_delta(&tally, previous.as_ref().map(|r| r.option.as_str()), Some(option));

                let record = Ledger::insert(txn, session_id, &voter, option, now);
                session.tally = tally;
                session.updated_at = now;
                save_session(txn, &session);
                Ok((record, previous.map(|r| r.option)))
            })
            .await?;

        VOTE_OPERATIONS_COUNTER.with_label_values(&["cast"]).inc();
        self.audit.record(AuditEvent::vote_cast(
            session_id,
            &voter,
            previous.as_deref(),
            option,
            record.cast_at,
        ));
        debug!(session_id, option, previous = ?previous, "vote cast");
        Ok(record)
    }

    /// Withdraws the voter's current vote. Returns the removed record.
    #[autometrics(objective = API_SLO)]
    pub async fn retract_vote(
        &self,
        session_id: &str,
        voter_id: &str,
    ) -> Result<VoteRecord> {
        require("session_id", session_id)?;
        require("voter_id", voter_id)?;
        let voter = self.voter_key(voter_id);

        let removed = run_transaction(self.store.as_ref(), &self.config.retry.transaction, |txn| {
            let now = timestamp_millis();
            let mut session = load_session(txn, session_id)?;
            self.check_window(&session, now)?;

            let records = Ledger::records_for_voter(txn, session_id, &voter)?;
            if records.is_empty() {
                return Err(VoteError::VoteNotFound {
                    session_id: session_id.to_string(),
                }
                .into());
            }
            for record in &records {
                session.tally = apply_delta(&session.tally, Some(&record.option), None);
                Ledger::delete(txn, record);
            }
            session.updated_at = now;
            save_session(txn, &session);
            Ok(records)
        })
        .await?;

        self.audit_deleted(&removed);
        debug!(session_id, "vote retracted");
        first_removed(removed, session_id)
    }

    /// Deletes a vote by record id. Not subject to the voting window.
    #[autometrics(objective = API_SLO)]
    pub async fn admin_delete_vote(
        &self,
        vote_record_id: &str,
    ) -> Result<VoteRecord> {
        require("vote_record_id", vote_record_id)?;

        let record = run_transaction(self.store.as_ref(), &self.config.retry.transaction, |txn| {
            let record = Ledger::get(txn, vote_record_id)?
                .ok_or_else(|| VoteError::VoteRecordNotFound(vote_record_id.to_string()))?;

            match txn.get(Collection::Sessions, &record.session_id)? {
                Some(doc) => {
                    let mut session = VotingSession::from_document(&record.session_id, &doc)?;
                    session.tally = apply_delta(&session.tally, Some(&record.option), None);
                    session.updated_at = timestamp_millis();
                    save_session(txn, &session);
                }
                None => {
                    warn!(session_id = %record.session_id, vote_record_id, "deleting vote of a missing session");
                }
            }
            Ledger::delete(txn, &record);
            Ok(record)
        })
        .await?;

        self.audit_deleted(std::slice::from_ref(&record));
        info!(session_id = %record.session_id, vote_record_id, "vote deleted by administrator");
        Ok(record)
    }

    // ============== Reads ============== //

    pub async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<VotingSession> {
        require("session_id", session_id)?;
        let doc = self
            .store
            .get_document(Collection::Sessions, session_id)?
            .ok_or_else(|| VoteError::SessionNotFound(session_id.to_string()))?;
        VotingSession::from_document(session_id, &doc.document)
    }

    /// Sessions owned by `created_by`, newest first
    pub async fn list_sessions(
        &self,
        created_by: &str,
    ) -> Result<Vec<VotingSession>> {
        require("created_by", created_by)?;
        let mut sessions = self
            .store
            .query_documents(Collection::Sessions, &[Filter::eq(SESSION_CREATOR_FIELD, created_by)])?
            .into_iter()
            .map(|doc| VotingSession::from_document(&doc.id, &doc.document))
            .collect::<Result<Vec<_>>>()?;
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    pub async fn get_tally(
        &self,
        session_id: &str,
    ) -> Result<Tally> {
        Ok(self.get_session(session_id).await?.tally)
    }

    /// Option the voter currently votes for, if any
    pub async fn get_voter_choice(
        &self,
        session_id: &str,
        voter_id: &str,
    ) -> Result<Option<String>> {
        require("session_id", session_id)?;
        require("voter_id", voter_id)?;
        let voter = self.voter_key(voter_id);
        Ok(Ledger::find_for_voter(self.store.as_ref(), session_id, &voter)?.map(|r| r.option))
    }

    pub async fn list_votes(
        &self,
        session_id: &str,
    ) -> Result<Vec<VoteRecord>> {
        self.get_session(session_id).await?;
        Ledger::list(self.store.as_ref(), session_id)
    }

    /// Newest first, fallback records included
    pub async fn audit_trail(
        &self,
        session_id: &str,
    ) -> Result<Vec<AuditEntry>> {
        require("session_id", session_id)?;
        read_audit_trail(self.store.as_ref(), session_id)
    }

    /// Most recent audit entries across every session, newest first.
    /// `limit` is capped at 100.
    pub async fn recent_audit_entries(
        &self,
        limit: usize,
        severity: Option<Severity>,
    ) -> Result<Vec<AuditEntry>> {
        if limit == 0 {
            return Err(Error::invalid_argument("limit must be positive"));
        }
        read_recent_audit_entries(
            self.store.as_ref(),
            limit.min(MAX_RECENT_AUDIT_ENTRIES),
            severity,
        )
    }

    // ============== Helpers ============== //

    fn check_window(
        &self,
        session: &VotingSession,
        now: u64,
    ) -> Result<()> {
        if !self.config.voting.enforce_window {
            return Ok(());
        }
        session.check_accepting_votes(now).map_err(|reason| {
            VoteError::VotingClosed {
                session_id: session.id.clone(),
                reason,
            }
            .into()
        })
    }

    fn audit_deleted(
        &self,
        removed: &[VoteRecord],
    ) {
        let now = timestamp_millis();
        for record in removed {
            VOTE_OPERATIONS_COUNTER.with_label_values(&["delete"]).inc();
            self.audit.record(AuditEvent::vote_deleted(
                &record.session_id,
                &record.voter,
                &record.option,
                now,
            ));
        }
    }
}

fn require(
    name: &str,
    value: &str,
) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(format!("{name} is required")));
    }
    Ok(())
}

fn unknown_option(option: &str) -> Error {
    Error::invalid_argument(format!("`{option}` is not an option of this session"))
}

fn first_removed(
    removed: Vec<VoteRecord>,
    session_id: &str,
) -> Result<VoteRecord> {
    removed.into_iter().next().ok_or_else(|| {
        VoteError::VoteNotFound {
            session_id: session_id.to_string(),
        }
        .into()
    })
}

fn load_session<S: DocumentStore + ?Sized>(
    txn: &mut Transaction<'_, S>,
    session_id: &str,
) -> Result<VotingSession> {
    let doc = txn
        .get(Collection::Sessions, session_id)?
        .ok_or_else(|| VoteError::SessionNotFound(session_id.to_string()))?;
    VotingSession::from_document(session_id, &doc)
}

fn save_session<S: DocumentStore + ?Sized>(
    txn: &mut Transaction<'_, S>,
    session: &VotingSession,
) {
    txn.set(Collection::Sessions, &session.id, session.to_document());
}
