use crate::utils::time::timestamp_millis;
use crate::NewSession;
use crate::SessionStatus;

const HOUR_MS: u64 = 60 * 60 * 1000;

/// Builds a [`NewSession`] that is open for voting right now unless told
/// otherwise.
pub struct SessionBuilder {
    session: NewSession,
}

impl SessionBuilder {
    pub fn new(options: &[&str]) -> Self {
        let now = timestamp_millis();
        Self {
            session: NewSession {
                title: "Test poll".to_string(),
                description: String::new(),
                created_by: "owner".to_string(),
                options: options.iter().map(|o| o.to_string()).collect(),
                status: Some(SessionStatus::Active),
                start_time: now - HOUR_MS,
                end_time: now + HOUR_MS,
            },
        }
    }

    pub fn status(
        mut self,
        status: SessionStatus,
    ) -> Self {
        self.session.status = Some(status);
        self
    }

    /// Window that ended an hour ago
    pub fn ended(mut self) -> Self {
        let now = timestamp_millis();
        self.session.start_time = now - 2 * HOUR_MS;
        self.session.end_time = now - HOUR_MS;
        self
    }

    /// Window that opens in an hour
    pub fn upcoming(mut self) -> Self {
        let now = timestamp_millis();
        self.session.start_time = now + HOUR_MS;
        self.session.end_time = now + 2 * HOUR_MS;
        self
    }

    pub fn build(self) -> NewSession {
        self.session
    }
}
