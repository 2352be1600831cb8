use serde::Deserialize;
use serde::Serialize;

use super::invalid_config;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VotingConfig {
    /// Reject casts and retractions on closed sessions and outside
    /// `[start_time, end_time]`
    #[serde(default = "default_enforce_window")]
    pub enforce_window: bool,

    /// Key mixed into every voter hash. Rotating it orphans existing votes.
    #[serde(default)]
    pub voter_key_secret: String,

    #[serde(default = "default_max_options")]
    pub max_options: usize,

    /// Upper bound on option label length, in characters
    #[serde(default = "default_max_label_len")]
    pub max_label_len: usize,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            enforce_window: default_enforce_window(),
            voter_key_secret: String::new(),
            max_options: default_max_options(),
            max_label_len: default_max_label_len(),
        }
    }
}

impl VotingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_options < 2 {
            return Err(invalid_config(format!(
                "voting.max_options must allow at least 2 options, got {}",
                self.max_options
            )));
        }
        if self.max_label_len == 0 {
            return Err(invalid_config("voting.max_label_len must be positive"));
        }
        #[cfg(not(test))]
        if self.voter_key_secret.is_empty() {
            tracing::warn!("voting.voter_key_secret is empty; voter keys are plain SHA-256 digests");
        }
        Ok(())
    }
}

fn default_enforce_window() -> bool {
    true
}
fn default_max_options() -> usize {
    32
}
fn default_max_label_len() -> usize {
    200
}
