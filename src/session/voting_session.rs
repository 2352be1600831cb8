//! The voting session document: metadata, option list, and the tally it
//! owns.

use std::collections::HashSet;
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
use crate::Tally;
use crate::Value;
use crate::VotingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Pending,
    Active,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
            SessionStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "active" => Ok(SessionStatus::Active),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(format!("unknown session status `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VotingSession {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_by: String,
    /// Unique labels, in display order
    pub options: Vec<String>,
    pub tally: Tally,
    pub status: SessionStatus,
    /// Window bounds, ms since the Unix epoch
    pub start_time: u64,
    pub end_time: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl VotingSession {
    pub fn has_option(
        &self,
        option: &str,
    ) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// `Err(reason)` when a vote cast or retraction at `now` falls outside
    /// the session's window.
    pub fn check_accepting_votes(
        &self,
        now: u64,
    ) -> std::result::Result<(), String> {
        if self.status == SessionStatus::Closed {
            return Err("session is closed".to_string());
        }
        if now < self.start_time {
            return Err(format!("voting opens at {}", self.start_time));
        }
        if now > self.end_time {
            return Err(format!("voting ended at {}", self.end_time));
        }
        Ok(())
    }
}

pub(crate) const SESSION_CREATOR_FIELD: &str = "created_by";

impl Record for VotingSession {
    const COLLECTION: Collection = Collection::Sessions;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_document(&self) -> Document {
        Document::new()
            .with("title", &self.title)
            .with("description", &self.description)
            .with(SESSION_CREATOR_FIELD, &self.created_by)
            .with(
                "options",
                Value::List(self.options.iter().map(Value::from).collect()),
            )
            .with("tally", &self.tally)
            .with("status", self.status.as_str())
            .with("start_time", self.start_time)
            .with("end_time", self.end_time)
            .with("created_at", self.created_at)
            .with("updated_at", self.updated_at)
    }

    fn from_document(
        id: &str,
        document: &Document,
    ) -> Result<Self> {
        let r = DocumentReader::new(Self::COLLECTION, id, document);
        let status = r
            .str("status")?
            .parse::<SessionStatus>()
            .map_err(|reason| -> Error {
                StorageError::MalformedDocument {
                    collection: Self::COLLECTION,
                    id: id.to_string(),
                    reason,
                }
                .into()
            })?;

        Ok(Self {
            id: id.to_string(),
            title: r.str("title")?,
            description: r.opt_str("description")?.unwrap_or_default(),
            created_by: r.str(SESSION_CREATOR_FIELD)?,
            options: r.str_list("options")?,
            tally: Tally::from_counts(r.u64_map("tally")?),
            status,
            start_time: r.u64("start_time")?,
            end_time: r.u64("end_time")?,
            created_at: r.u64("created_at")?,
            updated_at: r.u64("updated_at")?,
        })
    }
}

/// Owner input for a new session
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub title: String,
    pub description: String,
    pub created_by: String,
    pub options: Vec<String>,
    pub status: Option<SessionStatus>,
    pub start_time: u64,
    pub end_time: u64,
}

impl NewSession {
    pub fn validate(
        &self,
        limits: &VotingConfig,
    ) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::invalid_argument("session title is required"));
        }
        if self.created_by.is_empty() {
            return Err(Error::invalid_argument("session creator is required"));
        }
        if self.options.len() < 2 {
            return Err(Error::invalid_argument("a session needs at least two options"));
        }
        if self.options.len() > limits.max_options {
            return Err(Error::invalid_argument(format!(
                "a session allows at most {} options",
                limits.max_options
            )));
        }
        let mut seen = HashSet::new();
        for option in &self.options {
            validate_label(option, limits)?;
            if !seen.insert(option.as_str()) {
                return Err(Error::invalid_argument(format!("duplicate option `{option}`")));
            }
        }
        validate_window(self.start_time, self.end_time)
    }

    pub(crate) fn into_session(
        self,
        id: String,
        now: u64,
    ) -> VotingSession {
        VotingSession {
            id,
            tally: Tally::for_options(self.options.iter().cloned()),
            title: self.title,
            description: self.description,
            created_by: self.created_by,
            options: self.options,
            status: self.status.unwrap_or_default(),
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial metadata update. `options` and `tally` are not reachable from
/// here; they change only through the option and vote operations.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<SessionStatus>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }

    pub(crate) fn apply_to(
        &self,
        session: &mut VotingSession,
        now: u64,
    ) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::invalid_argument("session title is required"));
            }
            session.title = title.clone();
        }
        if let Some(description) = &self.description {
            session.description = description.clone();
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        let start = self.start_time.unwrap_or(session.start_time);
        let end = self.end_time.unwrap_or(session.end_time);
        validate_window(start, end)?;
        session.start_time = start;
        session.end_time = end;
        session.updated_at = now;
        Ok(())
    }
}

pub(crate) fn validate_label(
    label: &str,
    limits: &VotingConfig,
) -> Result<()> {
    if label.trim().is_empty() {
        return Err(Error::invalid_argument("option label must not be empty"));
    }
    if label.chars().count() > limits.max_label_len {
        return Err(Error::invalid_argument(format!(
            "option label exceeds {} characters",
            limits.max_label_len
        )));
    }
    Ok(())
}

fn validate_window(
    start_time: u64,
    end_time: u64,
) -> Result<()> {
    if end_time <= start_time {
        return Err(Error::invalid_argument(format!(
            "end_time {end_time} must be after start_time {start_time}"
        )));
    }
    Ok(())
}
