use std::cmp::Reverse;
use std::sync::Arc;

use tracing::error;
use tracing::warn;

use super::entry::AUDIT_SESSION_FIELD;
use super::entry::AUDIT_SEVERITY_FIELD;
use super::AuditEntry;
use super::AuditEvent;
use super::AuditSink;
use super::Severity;
use super::StoreAuditSink;
use super::TracingAuditSink;
use crate::metrics::AUDIT_DROPPED_COUNTER;
use crate::metrics::AUDIT_FALLBACK_COUNTER;
use crate::AuditConfig;
use crate::AuditSinkKind;
use crate::Collection;
use crate::DocumentStore;
use crate::Filter;
use crate::Record;
use crate::Result;

/// Fans an event out to the primary sink, or to the fallback sink as a
/// degraded record when the primary fails.
#[derive(Clone)]
pub struct AuditRecorder {
    primary: Arc<dyn AuditSink>,
    fallback: Option<Arc<dyn AuditSink>>,
}

impl AuditRecorder {
    pub fn new(
        primary: Arc<dyn AuditSink>,
        fallback: Option<Arc<dyn AuditSink>>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub fn from_config<S: DocumentStore + ?Sized>(
        config: &AuditConfig,
        store: Arc<S>,
    ) -> Self {
        let primary: Arc<dyn AuditSink> = match config.sink {
            AuditSinkKind::Store => Arc::new(StoreAuditSink::primary(store.clone())),
            AuditSinkKind::Tracing => Arc::new(TracingAuditSink),
        };
        let fallback: Option<Arc<dyn AuditSink>> = if config.fallback_enabled {
            Some(Arc::new(StoreAuditSink::fallback(store)))
        } else {
            None
        };
        Self::new(primary, fallback)
    }

    /// Never fails. Sink errors are logged and counted.
    pub fn record(
        &self,
        event: AuditEvent,
    ) {
        let primary_err = match self.primary.append_event(&event) {
            Ok(()) => return,
            Err(e) => e,
        };
        warn!(
            sink = self.primary.name(),
            session_id = %event.session_id,
            action = %event.action,
            error = %primary_err,
            "audit sink failed"
        );

        let Some(fallback) = &self.fallback else {
            AUDIT_DROPPED_COUNTER.inc();
            return;
        };

        AUDIT_FALLBACK_COUNTER.inc();
        let degraded = AuditEvent {
            severity: event.severity.max(Severity::Warning),
            degraded: Some(primary_err.to_string()),
            ..event
        };
        if let Err(e) = fallback.append_event(&degraded) {
            AUDIT_DROPPED_COUNTER.inc();
            error!(
                sink = fallback.name(),
                session_id = %degraded.session_id,
                action = %degraded.action,
                error = %e,
                "audit fallback failed, entry dropped"
            );
        }
    }
}

/// Audit entries of a session, newest first, fallback records included.
///
/// Entries sharing an event time are ordered by store version, which
/// follows write order.
pub fn read_audit_trail<S: DocumentStore + ?Sized>(
    store: &S,
    session_id: &str,
) -> Result<Vec<AuditEntry>> {
    collect_newest_first(store, &[Filter::eq(AUDIT_SESSION_FIELD, session_id)])
}

/// The `limit` most recent audit entries across all sessions, optionally
/// only those recorded at `severity`.
pub fn read_recent_audit_entries<S: DocumentStore + ?Sized>(
    store: &S,
    limit: usize,
    severity: Option<Severity>,
) -> Result<Vec<AuditEntry>> {
    let filters: Vec<Filter> = severity
        .map(|s| Filter::eq(AUDIT_SEVERITY_FIELD, s.as_str()))
        .into_iter()
        .collect();
    let mut entries = collect_newest_first(store, &filters)?;
    entries.truncate(limit);
    Ok(entries)
}

fn collect_newest_first<S: DocumentStore + ?Sized>(
    store: &S,
    filters: &[Filter],
) -> Result<Vec<AuditEntry>> {
    let mut entries = Vec::new();
    for collection in [Collection::AuditLogs, Collection::AuditFallback] {
        for doc in store.query_documents(collection, filters)? {
            let entry = AuditEntry::from_document(&doc.id, &doc.document)?;
            entries.push((doc.version, entry));
        }
    }
    entries.sort_by_key(|(version, e)| Reverse((e.event.event_time, *version)));
    Ok(entries.into_iter().map(|(_, e)| e).collect())
}
