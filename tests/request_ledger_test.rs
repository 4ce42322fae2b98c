//! Tests for role scoped visibility of the request ledger

use coachhub::engine;
use coachhub::engine::MemoryStore;
use coachhub::models::AccountRole;

#[tokio::test]
async fn ledger_is_scoped_by_role() {
    let store = MemoryStore::new();
    let trainer_a = store.insert_user(AccountRole::Trainer, true).await;
    let trainer_b = store.insert_user(AccountRole::Trainer, true).await;
    let client_a = store.insert_user(AccountRole::Client, true).await;
    let client_b = store.insert_user(AccountRole::Client, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    let req_a = engine::request_association(&store, client_a, trainer_a, "a")
        .await
        .unwrap();
    let req_b = engine::request_association(&store, client_b, trainer_b, "b")
        .await
        .unwrap();

    // Clients see exactly their own requests
    let visible = engine::list_requests(&store, client_a).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].uuid, req_a.uuid);

    // Trainers see exactly the requests targeting them
    let visible = engine::list_requests(&store, trainer_b).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].uuid, req_b.uuid);

    // Admins see everything
    let visible = engine::list_requests(&store, admin).await.unwrap();
    assert_eq!(visible.len(), 2);
}

#[tokio::test]
async fn decided_requests_stay_in_the_ledger() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, trainer, "a")
        .await
        .unwrap();
    engine::decide_association(&store, request.uuid, trainer, false)
        .await
        .unwrap();

    // History is kept for auditability, only trainer deletion purges
    let visible = engine::list_requests(&store, client).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert!(visible[0].decided_at.is_some());
}

#[tokio::test]
async fn trainers_do_not_see_the_requests_of_their_clients() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let new_trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, trainer, "a")
        .await
        .unwrap();
    engine::decide_association(&store, request.uuid, trainer, true)
        .await
        .unwrap();

    // The change request targets the new trainer, the old one is only the
    // snapshot and must not see it
    engine::request_trainer_change(&store, client, new_trainer, "switch")
        .await
        .unwrap();

    let visible = engine::list_requests(&store, trainer).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].uuid, request.uuid);

    let visible = engine::list_requests(&store, new_trainer).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_ne!(visible[0].uuid, request.uuid);
}
