use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ballotbox::time::timestamp_millis;
use ballotbox::BackoffPolicy;
use ballotbox::DocumentStore;
use ballotbox::NewSession;
use ballotbox::SessionStatus;
use ballotbox::StorageEngineKind;
use ballotbox::VoteService;
use ballotbox::VoteServiceConfig;

pub const HOUR_MS: u64 = 60 * 60 * 1000;

pub fn sled_config(db_root_dir: &Path) -> VoteServiceConfig {
    let mut config = VoteServiceConfig::default();
    config.storage.engine = StorageEngineKind::Sled;
    config.storage.db_root_dir = db_root_dir.to_path_buf();
    // no background flusher, so the database can be reopened in-process
    config.storage.flush_every_ms = None;
    config.voting.voter_key_secret = "integration-secret".to_string();
    config.retry.transaction = BackoffPolicy {
        max_retries: 100,
        timeout_ms: 30_000,
        base_delay_ms: 1,
        max_delay_ms: 50,
    };
    config
}

pub fn open_poll(options: &[&str]) -> NewSession {
    let now = timestamp_millis();
    NewSession {
        title: "Team lunch".to_string(),
        description: "Pick a place".to_string(),
        created_by: "owner".to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        status: Some(SessionStatus::Active),
        start_time: now - HOUR_MS,
        end_time: now + HOUR_MS,
    }
}

/// Recounts the ledger and compares it with the stored tally.
pub async fn assert_consistent(
    service: &VoteService<dyn DocumentStore>,
    session_id: &str,
) {
    let session = service.get_session(session_id).await.unwrap();
    let votes = service.list_votes(session_id).await.unwrap();

    let mut recount = BTreeMap::<&str, u64>::new();
    for vote in &votes {
        assert!(session.has_option(&vote.option), "vote for unknown option {}", vote.option);
        *recount.entry(vote.option.as_str()).or_default() += 1;
    }
    for (option, count) in session.tally.iter() {
        assert!(session.has_option(option));
        assert_eq!(recount.get(option).copied().unwrap_or(0), count, "tally of {option}");
    }
    assert_eq!(session.tally.total(), votes.len() as u64);

    let mut voters: Vec<_> = votes.iter().map(|v| v.voter.clone()).collect();
    voters.sort();
    voters.dedup();
    assert_eq!(voters.len(), votes.len(), "a voter holds more than one vote");
}

pub fn open_service(config: VoteServiceConfig) -> Arc<VoteService> {
    Arc::new(VoteService::open(config).unwrap())
}
