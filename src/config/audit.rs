use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Primary destination of audit entries
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    /// `audit_logs` collection of the document store
    #[default]
    Store,
    /// Structured tracing events only
    Tracing,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditConfig {
    #[serde(default)]
    pub sink: AuditSinkKind,

    /// Write a degraded record to the `audit_fallback` collection when the
    /// primary sink fails
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: AuditSinkKind::default(),
            fallback_enabled: default_fallback_enabled(),
        }
    }
}

impl AuditConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sink == AuditSinkKind::Tracing && !self.fallback_enabled {
            tracing::debug!("tracing audit sink without fallback: audit trail is not queryable");
        }
        Ok(())
    }
}

fn default_fallback_enabled() -> bool {
    true
}
