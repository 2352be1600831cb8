use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::Collection;
use crate::Document;
use crate::DocumentReader;
use crate::Error;
use crate::Record;
use crate::Result;
use crate::StorageError;
use crate::VoterKey;

pub(crate) const AUDIT_SESSION_FIELD: &str = "session_id";
pub(crate) const AUDIT_SEVERITY_FIELD: &str = "severity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    NewVote,
    ChangeVote,
    DeleteVote,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::NewVote => "new_vote",
            AuditAction::ChangeVote => "change_vote",
            AuditAction::DeleteVote => "delete_vote",
        }
    }

    pub(crate) fn default_severity(&self) -> Severity {
        match self {
            AuditAction::NewVote | AuditAction::ChangeVote => Severity::Info,
            AuditAction::DeleteVote => Severity::Notice,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "new_vote" => Ok(AuditAction::NewVote),
            "change_vote" => Ok(AuditAction::ChangeVote),
            "delete_vote" => Ok(AuditAction::DeleteVote),
            other => Err(format!("unknown audit action `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "notice" => Ok(Severity::Notice),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity `{other}`")),
        }
    }
}

/// Options involved in a vote mutation. For `delete_vote` the previous
/// option is the deleted one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditDetails {
    pub previous_option: Option<String>,
    pub new_option: Option<String>,
}

/// What happened, before a sink gives it an id and a write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub session_id: String,
    pub voter: VoterKey,
    pub action: AuditAction,
    pub details: AuditDetails,
    pub severity: Severity,
    /// ms since the Unix epoch
    pub event_time: u64,
    /// Primary sink error, set only on fallback records
    pub degraded: Option<String>,
}

impl AuditEvent {
    pub fn new(
        session_id: &str,
        voter: &VoterKey,
        action: AuditAction,
        details: AuditDetails,
        event_time: u64,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            voter: voter.clone(),
            action,
            details,
            severity: action.default_severity(),
            event_time,
            degraded: None,
        }
    }

    pub fn vote_cast(
        session_id: &str,
        voter: &VoterKey,
        previous: Option<&str>,
        new: &str,
        event_time: u64,
    ) -> Self {
        let action = if previous.is_some() {
            AuditAction::ChangeVote
        } else {
            AuditAction::NewVote
        };
        Self::new(
            session_id,
            voter,
            action,
            AuditDetails {
                previous_option: previous.map(str::to_string),
                new_option: Some(new.to_string()),
            },
            event_time,
        )
    }

    pub fn vote_deleted(
        session_id: &str,
        voter: &VoterKey,
        option: &str,
        event_time: u64,
    ) -> Self {
        Self::new(
            session_id,
            voter,
            AuditAction::DeleteVote,
            AuditDetails {
                previous_option: Some(option.to_string()),
                new_option: None,
            },
            event_time,
        )
    }
}

/// A persisted audit record. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub id: String,
    pub event: AuditEvent,
    pub write_time: u64,
}

impl AuditEntry {
    pub fn deleted_option(&self) -> Option<&str> {
        match self.event.action {
            AuditAction::DeleteVote => self.event.details.previous_option.as_deref(),
            _ => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.event.degraded.is_some()
    }
}

impl Record for AuditEntry {
    const COLLECTION: Collection = Collection::AuditLogs;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_document(&self) -> Document {
        let e = &self.event;
        Document::new()
            .with(AUDIT_SESSION_FIELD, &e.session_id)
            .with("voter", e.voter.as_str())
            .with("action", e.action.as_str())
            .with("previous_option", e.details.previous_option.as_deref())
            .with("new_option", e.details.new_option.as_deref())
            .with(AUDIT_SEVERITY_FIELD, e.severity.as_str())
            .with("event_time", e.event_time)
            .with("write_time", self.write_time)
            .with("degraded", e.degraded.as_deref())
    }

    fn from_document(
        id: &str,
        document: &Document,
    ) -> Result<Self> {
        let r = DocumentReader::new(Self::COLLECTION, id, document);
        let malformed = |reason: String| -> Error {
            StorageError::MalformedDocument {
                collection: Self::COLLECTION,
                id: id.to_string(),
                reason,
            }
            .into()
        };

        Ok(Self {
            id: id.to_string(),
            event: AuditEvent {
                session_id: r.str(AUDIT_SESSION_FIELD)?,
                voter: VoterKey::from_stored(r.str("voter")?),
                action: r.str("action")?.parse::<AuditAction>().map_err(malformed)?,
                details: AuditDetails {
                    previous_option: r.opt_str("previous_option")?,
                    new_option: r.opt_str("new_option")?,
                },
                severity: r.str(AUDIT_SEVERITY_FIELD)?.parse::<Severity>().map_err(malformed)?,
                event_time: r.u64("event_time")?,
                degraded: r.opt_str("degraded")?,
            },
            write_time: r.u64("write_time")?,
        })
    }
}
