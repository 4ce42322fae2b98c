//! Tests for the association request flow

use coachhub::engine;
use coachhub::engine::{EngineError, MemoryStore, RelationshipStore};
use coachhub::models::{AccountRole, RequestKind, RequestStatus};

#[tokio::test]
async fn accept_binds_both_sides() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, trainer, "get me fit")
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.kind, RequestKind::Association);
    assert!(store.trainer_of(client).await.is_none());

    let decided = engine::decide_association(&store, request.uuid, trainer, true)
        .await
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Approved);
    assert_eq!(decided.decided_by, Some(trainer));
    assert!(decided.decided_at.is_some());

    assert_eq!(store.trainer_of(client).await, Some(trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn reject_leaves_client_unbound() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, trainer, "get me fit")
        .await
        .unwrap();

    let decided = engine::decide_association(&store, request.uuid, trainer, false)
        .await
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Rejected);

    assert!(store.trainer_of(client).await.is_none());

    // A rejected request no longer blocks a new one
    engine::request_association(&store, client, trainer, "second try")
        .await
        .unwrap();
}

#[tokio::test]
async fn at_most_one_pending_request_per_client() {
    let store = MemoryStore::new();
    let trainer_a = store.insert_user(AccountRole::Trainer, true).await;
    let trainer_b = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    engine::request_association(&store, client, trainer_a, "first")
        .await
        .unwrap();

    // Same trainer and a different trainer are both blocked
    assert!(matches!(
        engine::request_association(&store, client, trainer_a, "again").await,
        Err(EngineError::PendingRequestExists)
    ));
    assert!(matches!(
        engine::request_association(&store, client, trainer_b, "other").await,
        Err(EngineError::PendingRequestExists)
    ));

    assert_eq!(store.pending_count(client, RequestKind::Association).await, 1);
}

#[tokio::test]
async fn unvalidated_trainer_can_not_be_asked() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, false).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    assert!(matches!(
        engine::request_association(&store, client, trainer, "please").await,
        Err(EngineError::TrainerNotValidated)
    ));
}

#[tokio::test]
async fn bound_client_can_not_ask_again() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let other = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, trainer, "first")
        .await
        .unwrap();
    engine::decide_association(&store, request.uuid, trainer, true)
        .await
        .unwrap();

    assert!(matches!(
        engine::request_association(&store, client, other, "more").await,
        Err(EngineError::ClientAlreadyBound)
    ));
}

#[tokio::test]
async fn only_the_targeted_trainer_may_decide() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let other = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, trainer, "please")
        .await
        .unwrap();

    assert!(matches!(
        engine::decide_association(&store, request.uuid, other, true).await,
        Err(EngineError::NotRequestTarget)
    ));

    // The request is untouched
    assert_eq!(store.pending_count(client, RequestKind::Association).await, 1);
    assert!(store.trainer_of(client).await.is_none());
}

#[tokio::test]
async fn decided_requests_stay_decided() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, trainer, "please")
        .await
        .unwrap();
    engine::decide_association(&store, request.uuid, trainer, false)
        .await
        .unwrap();

    assert!(matches!(
        engine::decide_association(&store, request.uuid, trainer, true).await,
        Err(EngineError::RequestAlreadyDecided)
    ));
    assert!(store.trainer_of(client).await.is_none());
}

#[tokio::test]
async fn empty_reason_is_rejected() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    assert!(matches!(
        engine::request_association(&store, client, trainer, "   ").await,
        Err(EngineError::EmptyReason)
    ));
}

#[tokio::test]
async fn accept_against_a_bound_client_auto_rejects() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let poacher = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, poacher, "please")
        .await
        .unwrap();

    // The client gets bound through a plan while the request is pending
    engine::bind_for_plan(&store, trainer, client).await.unwrap();

    assert!(matches!(
        engine::decide_association(&store, request.uuid, poacher, true).await,
        Err(EngineError::ClientAlreadyBound)
    ));

    // The stale request was auto-rejected, the binding is untouched
    assert_eq!(store.pending_count(client, RequestKind::Association).await, 0);
    assert_eq!(store.trainer_of(client).await, Some(trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn accept_replay_after_interrupted_apply_converges() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(&store, client, trainer, "please")
        .await
        .unwrap();

    // An earlier accept wrote the trainer reference and then died before
    // the clients set and the request status
    assert!(store
        .set_trainer_if(client, None, Some(trainer))
        .await
        .unwrap());

    // Replaying the accept finishes the remaining steps
    let decided = engine::decide_association(&store, request.uuid, trainer, true)
        .await
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Approved);

    assert_eq!(store.trainer_of(client).await, Some(trainer));
    assert_eq!(store.clients_of(trainer).await.unwrap(), vec![client]);
    assert!(store.is_consistent().await);
}
