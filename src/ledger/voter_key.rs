use std::fmt;
use std::fmt::Write;

use sha2::Digest;
use sha2::Sha256;

/// Keyed one-way hash of an external voter identifier.
///
/// The ledger and the audit trail only ever hold this key, never the raw
/// identifier supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoterKey(String);

impl VoterKey {
    pub fn derive(
        secret: &str,
        voter_id: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        // length prefix keeps (secret, id) pairs unambiguous
        hasher.update((secret.len() as u64).to_be_bytes());
        hasher.update(secret.as_bytes());
        hasher.update(voter_id.as_bytes());

        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Wraps a key read back from storage.
    pub fn from_stored(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}
