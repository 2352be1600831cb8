//! Schema-less documents as stored by the persistence gateway.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::Result;
use crate::StorageError;

/// Document collections known to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    Sessions,
    Votes,
    AuditLogs,
    AuditFallback,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Sessions => "voting_sessions",
            Collection::Votes => "votes",
            Collection::AuditLogs => "audit_logs",
            Collection::AuditFallback => "audit_fallback",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    UInt(u64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        field: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(
        &mut self,
        field: &str,
        value: impl Into<Value>,
    ) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(
        &self,
        field: &str,
    ) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// A committed document together with its store-wide version.
///
/// Versions are unique across the whole store and strictly increase with
/// every write, so a delete followed by a re-create never reuses a version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    pub id: String,
    pub version: u64,
    pub document: Document,
}

/// The persisted form of a document inside a storage adaptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredEntry {
    pub(crate) version: u64,
    pub(crate) document: Document,
}

/// Equality predicate on a top-level field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(
        field: &str,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(
        &self,
        document: &Document,
    ) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

pub(crate) fn matches_all(
    filters: &[Filter],
    document: &Document,
) -> bool {
    filters.iter().all(|f| f.matches(document))
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        collection: Collection,
        id: String,
        document: Document,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

/// Commit guard: the document must still be at `version` (`None`: absent).
#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    pub collection: Collection,
    pub id: String,
    pub version: Option<u64>,
}

/// Typed field access that reports which document is malformed.
pub struct DocumentReader<'a> {
    collection: Collection,
    id: &'a str,
    document: &'a Document,
}

impl<'a> DocumentReader<'a> {
    pub fn new(
        collection: Collection,
        id: &'a str,
        document: &'a Document,
    ) -> Self {
        Self {
            collection,
            id,
            document,
        }
    }

    fn malformed(
        &self,
        reason: String,
    ) -> crate::Error {
        StorageError::MalformedDocument {
            collection: self.collection,
            id: self.id.to_string(),
            reason,
        }
        .into()
    }

    fn field(
        &self,
        field: &str,
    ) -> Result<&'a Value> {
        self.document
            .get(field)
            .ok_or_else(|| self.malformed(format!("missing field `{field}`")))
    }

    pub fn str(
        &self,
        field: &str,
    ) -> Result<String> {
        match self.field(field)? {
            Value::Str(s) => Ok(s.clone()),
            other => Err(self.malformed(format!("`{field}` is not a string: {other:?}"))),
        }
    }

    pub fn opt_str(
        &self,
        field: &str,
    ) -> Result<Option<String>> {
        match self.document.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.malformed(format!("`{field}` is not a string: {other:?}"))),
        }
    }

    pub fn u64(
        &self,
        field: &str,
    ) -> Result<u64> {
        match self.field(field)? {
            Value::UInt(v) => Ok(*v),
            other => Err(self.malformed(format!("`{field}` is not an integer: {other:?}"))),
        }
    }

    pub fn str_list(
        &self,
        field: &str,
    ) -> Result<Vec<String>> {
        match self.field(field)? {
            Value::List(items) => items
                .iter()
                .map(|v| match v {
                    Value::Str(s) => Ok(s.clone()),
                    other => Err(self.malformed(format!("`{field}` holds a non-string: {other:?}"))),
                })
                .collect(),
            other => Err(self.malformed(format!("`{field}` is not a list: {other:?}"))),
        }
    }

    pub fn u64_map(
        &self,
        field: &str,
    ) -> Result<BTreeMap<String, u64>> {
        match self.field(field)? {
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| match v {
                    Value::UInt(n) => Ok((k.clone(), *n)),
                    other => Err(self.malformed(format!("`{field}.{k}` is not an integer: {other:?}"))),
                })
                .collect(),
            other => Err(self.malformed(format!("`{field}` is not a map: {other:?}"))),
        }
    }
}
