use std::collections::BTreeMap;
use std::sync::Arc;

use crate::BackoffPolicy;
use crate::DocumentStore;
use crate::Ledger;
use crate::MemDocumentStore;
use crate::VoteService;
use crate::VoteServiceConfig;

pub(crate) fn test_config() -> VoteServiceConfig {
    let mut config = VoteServiceConfig::default();
    config.voting.voter_key_secret = "test-secret".to_string();
    config.retry.transaction = BackoffPolicy {
        max_retries: 50,
        timeout_ms: 10_000,
        base_delay_ms: 1,
        max_delay_ms: 20,
    };
    config
}

pub(crate) fn mem_service() -> VoteService<MemDocumentStore> {
    VoteService::new(Arc::new(MemDocumentStore::new()), test_config())
}

/// Panics unless the stored tally equals a recount of the ledger and every
/// tally key is a current option.
pub(crate) async fn assert_tally_matches_ledger<S: DocumentStore + ?Sized>(
    service: &VoteService<S>,
    session_id: &str,
) {
    let session = service.get_session(session_id).await.unwrap();
    let records = Ledger::list(service.store().as_ref(), session_id).unwrap();

    let mut recount: BTreeMap<String, u64> = session.options.iter().map(|o| (o.clone(), 0)).collect();
    for record in &records {
        assert!(
            session.has_option(&record.option),
            "vote {} for removed option {}",
            record.id,
            record.option
        );
        *recount.entry(record.option.clone()).or_insert(0) += 1;
    }

    for (option, count) in session.tally.iter() {
        assert!(session.has_option(option), "tally key {option} is not an option");
        assert_eq!(recount.get(option).copied().unwrap_or(0), count, "count of {option}");
    }
    assert_eq!(session.tally.total(), records.len() as u64);
}
