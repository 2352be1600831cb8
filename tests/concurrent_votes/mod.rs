use futures::future::join_all;

use crate::common::assert_consistent;
use crate::common::open_poll;
use crate::common::open_service;
use crate::common::sled_config;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_voters_on_sled_store() {
    let temp_dir = tempfile::tempdir().unwrap();
    let service = open_service(sled_config(temp_dir.path()));
    let sid = service.create_session(open_poll(&["Blue", "Red"])).await.unwrap().id;

    let voters = 24u64;
    let tasks = (0..voters).map(|i| {
        let service = service.clone();
        let sid = sid.clone();
        tokio::spawn(async move { service.cast_vote(&sid, &format!("voter-{i}"), "Blue").await })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let tally = service.get_tally(&sid).await.unwrap();
    assert_eq!(tally.get("Blue"), voters);
    assert_eq!(tally.get("Red"), 0);
    assert_consistent(&service, &sid).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_changes_and_retractions_stay_consistent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let service = open_service(sled_config(temp_dir.path()));
    let sid = service
        .create_session(open_poll(&["A", "B", "C"]))
        .await
        .unwrap()
        .id;

    let tasks = (0..12).map(|i| {
        let service = service.clone();
        let sid = sid.clone();
        tokio::spawn(async move {
            let voter = format!("voter-{}", i % 4);
            let options = ["A", "B", "C"];
            service.cast_vote(&sid, &voter, options[i % 3]).await.unwrap();
            if i % 5 == 0 {
                // another task of the same voter may already have retracted
                let _ = service.retract_vote(&sid, &voter).await;
            }
        })
    });
    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert_consistent(&service, &sid).await;
    assert!(service.list_votes(&sid).await.unwrap().len() <= 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_option_removal_racing_with_votes() {
    let temp_dir = tempfile::tempdir().unwrap();
    let service = open_service(sled_config(temp_dir.path()));
    let sid = service
        .create_session(open_poll(&["Keep", "Drop"]))
        .await
        .unwrap()
        .id;

    let mut tasks = Vec::new();
    for i in 0..10 {
        let service = service.clone();
        let sid = sid.clone();
        tasks.push(tokio::spawn(async move {
            // votes landing after the removal are rejected
            let _ = service.cast_vote(&sid, &format!("voter-{i}"), "Drop").await;
        }));
    }
    let remover = {
        let service = service.clone();
        let sid = sid.clone();
        tokio::spawn(async move { service.remove_option(&sid, "Drop").await.unwrap() })
    };
    for result in join_all(tasks).await {
        result.unwrap();
    }
    remover.await.unwrap();

    let session = service.get_session(&sid).await.unwrap();
    assert!(!session.tally.contains("Drop"));
    assert!(service.list_votes(&sid).await.unwrap().is_empty());
    assert_consistent(&service, &sid).await;
}
