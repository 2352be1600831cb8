//! Vote Ledger Error Hierarchy
//!
//! Errors are grouped by the layer that raises them: caller-facing voting
//! failures, infrastructure failures (storage, serialization), and
//! configuration failures. [`Error::kind`] collapses the hierarchy into the
//! small classification callers act on.

use config::ConfigError;

use crate::storage::Collection;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller-facing voting failures
    #[error(transparent)]
    Vote(#[from] VoteError),

    /// Infrastructure-level failures (storage, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Classification surfaced to callers of the vote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    FailedPrecondition,
    Unavailable,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("Voting session {0} not found")]
    SessionNotFound(String),

    #[error("No vote found for voter in session {session_id}")]
    VoteNotFound { session_id: String },

    #[error("Vote record {0} not found")]
    VoteRecordNotFound(String),

    /// Transaction retry budget exhausted
    #[error("Transaction on {collection}/{id} did not commit after {attempts} attempts")]
    Conflict {
        collection: Collection,
        id: String,
        attempts: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session {session_id} is not accepting votes: {reason}")]
    VotingClosed { session_id: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Serialization failures for persisted documents
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// A commit precondition no longer holds
    #[error("Write conflict on {collection}/{id}")]
    TransactionConflict { collection: Collection, id: String },

    /// A stored document is missing a field or has the wrong shape
    #[error("Malformed document {collection}/{id}: {reason}")]
    MalformedDocument {
        collection: Collection,
        id: String,
        reason: String,
    },

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),
}

/// Audit sink failures. Never leaves the audit recorder.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Audit sink {sink} rejected entry: {reason}")]
    SinkFailure { sink: &'static str, reason: String },

    #[error(transparent)]
    Storage(#[from] Box<Error>),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Vote(e) => match e {
                VoteError::SessionNotFound(_)
                | VoteError::VoteNotFound { .. }
                | VoteError::VoteRecordNotFound(_) => ErrorKind::NotFound,
                VoteError::Conflict { .. } => ErrorKind::Conflict,
                VoteError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                VoteError::VotingClosed { .. } => ErrorKind::FailedPrecondition,
            },
            Error::System(SystemError::Storage(StorageError::TransactionConflict { .. })) => {
                ErrorKind::Conflict
            }
            Error::System(SystemError::Storage(StorageError::IoError(_)))
            | Error::System(SystemError::Storage(StorageError::DbError(_))) => {
                ErrorKind::Unavailable
            }
            Error::System(_) | Error::Config(_) => ErrorKind::Internal,
        }
    }

    /// True when the error is a commit precondition failure that a fresh
    /// read-modify-write may resolve.
    pub fn is_transaction_conflict(&self) -> bool {
        matches!(
            self,
            Error::System(SystemError::Storage(StorageError::TransactionConflict { .. }))
        )
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        VoteError::InvalidArgument(msg.into()).into()
    }
}

// ============== Conversion Implementations ============== //
impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        StorageError::BincodeError(err).into()
    }
}

impl From<Error> for AuditError {
    fn from(err: Error) -> Self {
        AuditError::Storage(Box::new(err))
    }
}
