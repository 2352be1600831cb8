use ballotbox::AuditAction;
use ballotbox::DocumentStore;
use ballotbox::ErrorKind;
use ballotbox::StorageEngineKind;

use crate::common::assert_consistent;
use crate::common::open_poll;
use crate::common::open_service;
use crate::common::sled_config;

#[tokio::test]
async fn test_ledger_and_audit_survive_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = sled_config(temp_dir.path());

    let sid = {
        let service = open_service(config.clone());
        let sid = service.create_session(open_poll(&["Red", "Blue"])).await.unwrap().id;
        service.cast_vote(&sid, "u1", "Red").await.unwrap();
        service.cast_vote(&sid, "u1", "Blue").await.unwrap();
        service.cast_vote(&sid, "u2", "Red").await.unwrap();
        service.store().flush().unwrap();
        sid
    };

    let service = open_service(config);
    let tally = service.get_tally(&sid).await.unwrap();
    assert_eq!((tally.get("Red"), tally.get("Blue")), (1, 1));
    assert_eq!(
        service.get_voter_choice(&sid, "u1").await.unwrap().as_deref(),
        Some("Blue")
    );

    let actions: Vec<AuditAction> = service
        .audit_trail(&sid)
        .await
        .unwrap()
        .iter()
        .map(|e| e.event.action)
        .collect();
    assert_eq!(
        actions,
        vec![AuditAction::NewVote, AuditAction::ChangeVote, AuditAction::NewVote]
    );
    assert_consistent(&service, &sid).await;
}

#[tokio::test]
async fn test_voter_keys_change_with_secret() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = sled_config(temp_dir.path());

    let sid = {
        let service = open_service(config.clone());
        let sid = service.create_session(open_poll(&["Red", "Blue"])).await.unwrap().id;
        service.cast_vote(&sid, "u1", "Red").await.unwrap();
        service.store().flush().unwrap();
        sid
    };

    config.voting.voter_key_secret = "rotated".to_string();
    let service = open_service(config);
    assert!(service.get_voter_choice(&sid, "u1").await.unwrap().is_none());
    assert_eq!(
        service.retract_vote(&sid, "u1").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_memory_engine_from_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = sled_config(temp_dir.path());
    config.storage.engine = StorageEngineKind::Memory;

    let service = open_service(config);
    let sid = service.create_session(open_poll(&["Red", "Blue"])).await.unwrap().id;
    service.cast_vote(&sid, "u1", "Red").await.unwrap();

    assert_eq!(service.get_tally(&sid).await.unwrap().get("Red"), 1);
    assert!(!temp_dir.path().join("documents").exists());
}
