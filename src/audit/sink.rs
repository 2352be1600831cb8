use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::AuditEntry;
use super::AuditEvent;
use super::Severity;
use crate::constants::AUDIT_TRACING_TARGET;
use crate::utils::time::timestamp_millis;
use crate::AuditError;
use crate::Collection;
use crate::DocumentStore;
use crate::Record;
use crate::WriteOp;

/// Destination of audit events.
#[cfg_attr(test, automock)]
pub trait AuditSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn append_event(
        &self,
        event: &AuditEvent,
    ) -> Result<(), AuditError>;
}

/// Appends entries to a collection of the document store.
pub struct StoreAuditSink<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    collection: Collection,
}

impl<S: DocumentStore + ?Sized> StoreAuditSink<S> {
    /// Primary sink writing to `audit_logs`
    pub fn primary(store: Arc<S>) -> Self {
        Self {
            store,
            collection: Collection::AuditLogs,
        }
    }

    /// Fallback sink writing to `audit_fallback`
    pub fn fallback(store: Arc<S>) -> Self {
        Self {
            store,
            collection: Collection::AuditFallback,
        }
    }
}

impl<S: DocumentStore + ?Sized> AuditSink for StoreAuditSink<S> {
    fn name(&self) -> &'static str {
        self.collection.as_str()
    }

    fn append_event(
        &self,
        event: &AuditEvent,
    ) -> Result<(), AuditError> {
        let entry = AuditEntry {
            id: self.store.generate_id(),
            event: event.clone(),
            write_time: timestamp_millis(),
        };
        self.store.batch_write(vec![WriteOp::Put {
            collection: self.collection,
            id: entry.id.clone(),
            document: entry.to_document(),
        }])?;
        debug!(collection = %self.collection, id = %entry.id, "audit entry written");
        Ok(())
    }
}

/// Emits every event as a structured tracing event under the
/// `ballotbox::audit` target, at a level matching its severity.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

macro_rules! audit_event {
    ($level:ident, $event:ident) => {
        $level!(
            target: AUDIT_TRACING_TARGET,
            session_id = %$event.session_id,
            voter = %$event.voter,
            action = %$event.action,
            previous_option = ?$event.details.previous_option,
            new_option = ?$event.details.new_option,
            event_time = $event.event_time,
            degraded = ?$event.degraded,
            "voting activity"
        )
    };
}

impl AuditSink for TracingAuditSink {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn append_event(
        &self,
        event: &AuditEvent,
    ) -> Result<(), AuditError> {
        match event.severity {
            Severity::Debug => audit_event!(debug, event),
            Severity::Info | Severity::Notice => audit_event!(info, event),
            Severity::Warning => audit_event!(warn, event),
            Severity::Error => audit_event!(error, event),
        }
        Ok(())
    }
}
