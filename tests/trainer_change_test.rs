//! Tests for the trainer change flow

use coachhub::engine;
use coachhub::engine::{EngineError, MemoryStore, RelationshipStore};
use coachhub::models::{AccountRole, RequestKind, RequestStatus};

async fn bound_pair(store: &MemoryStore) -> (uuid::Uuid, uuid::Uuid) {
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let request = engine::request_association(store, client, trainer, "start")
        .await
        .unwrap();
    engine::decide_association(store, request.uuid, trainer, true)
        .await
        .unwrap();

    (trainer, client)
}

#[tokio::test]
async fn approval_moves_the_binding() {
    let store = MemoryStore::new();
    let (old_trainer, client) = bound_pair(&store).await;
    let new_trainer = store.insert_user(AccountRole::Trainer, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    let request = engine::request_trainer_change(&store, client, new_trainer, "moved cities")
        .await
        .unwrap();
    assert_eq!(request.kind, RequestKind::TrainerChange);
    assert_eq!(request.current_trainer, Some(old_trainer));

    // Nothing moves until the admin decides
    assert_eq!(store.trainer_of(client).await, Some(old_trainer));

    let decided = engine::decide_trainer_change(&store, request.uuid, admin, true)
        .await
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Approved);
    assert_eq!(decided.decided_by, Some(admin));

    assert_eq!(store.trainer_of(client).await, Some(new_trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn rejection_leaves_the_binding() {
    let store = MemoryStore::new();
    let (old_trainer, client) = bound_pair(&store).await;
    let new_trainer = store.insert_user(AccountRole::Trainer, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    let request = engine::request_trainer_change(&store, client, new_trainer, "moved cities")
        .await
        .unwrap();

    let decided = engine::decide_trainer_change(&store, request.uuid, admin, false)
        .await
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Rejected);

    assert_eq!(store.trainer_of(client).await, Some(old_trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn unbound_clients_use_the_association_flow() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    assert!(matches!(
        engine::request_trainer_change(&store, client, trainer, "please").await,
        Err(EngineError::ClientNotBound)
    ));
}

#[tokio::test]
async fn changing_to_the_current_trainer_is_an_error() {
    let store = MemoryStore::new();
    let (trainer, client) = bound_pair(&store).await;

    assert!(matches!(
        engine::request_trainer_change(&store, client, trainer, "again").await,
        Err(EngineError::SameTrainer)
    ));
}

#[tokio::test]
async fn only_admins_decide_changes() {
    let store = MemoryStore::new();
    let (old_trainer, client) = bound_pair(&store).await;
    let new_trainer = store.insert_user(AccountRole::Trainer, true).await;

    let request = engine::request_trainer_change(&store, client, new_trainer, "moved")
        .await
        .unwrap();

    // Neither of the two involved trainers has authority here
    for actor in [old_trainer, new_trainer, client] {
        assert!(matches!(
            engine::decide_trainer_change(&store, request.uuid, actor, true).await,
            Err(EngineError::AdminRequired)
        ));
    }

    assert_eq!(store.trainer_of(client).await, Some(old_trainer));
}

#[tokio::test]
async fn target_deleted_before_decision() {
    let store = MemoryStore::new();
    let (old_trainer, client) = bound_pair(&store).await;
    let new_trainer = store.insert_user(AccountRole::Trainer, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    let request = engine::request_trainer_change(&store, client, new_trainer, "moved")
        .await
        .unwrap();

    // The target trainer disappears before the decision, which takes the
    // requests naming it along
    store.delete_user(new_trainer).await.unwrap();

    assert!(matches!(
        engine::decide_trainer_change(&store, request.uuid, admin, true).await,
        Err(EngineError::RequestNotFound)
    ));

    assert_eq!(store.trainer_of(client).await, Some(old_trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn target_devalidated_before_decision() {
    let store = MemoryStore::new();
    let (old_trainer, client) = bound_pair(&store).await;
    let new_trainer = store.insert_user(AccountRole::Trainer, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    let request = engine::request_trainer_change(&store, client, new_trainer, "moved")
        .await
        .unwrap();

    store.set_validated(new_trainer, false).await;

    assert!(matches!(
        engine::decide_trainer_change(&store, request.uuid, admin, true).await,
        Err(EngineError::TrainerNotValidated)
    ));

    // The binding is untouched and the request stays open for a later
    // decision
    assert_eq!(store.trainer_of(client).await, Some(old_trainer));
    let record = store.find_request(request.uuid).await.unwrap().unwrap();
    assert_eq!(record.status, RequestStatus::Pending);
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn one_pending_change_per_client() {
    let store = MemoryStore::new();
    let (_, client) = bound_pair(&store).await;
    let new_trainer = store.insert_user(AccountRole::Trainer, true).await;
    let another = store.insert_user(AccountRole::Trainer, true).await;

    engine::request_trainer_change(&store, client, new_trainer, "first")
        .await
        .unwrap();

    assert!(matches!(
        engine::request_trainer_change(&store, client, another, "second").await,
        Err(EngineError::PendingRequestExists)
    ));

    assert_eq!(
        store.pending_count(client, RequestKind::TrainerChange).await,
        1
    );
}

#[tokio::test]
async fn approval_after_admin_rebind_is_idempotent() {
    let store = MemoryStore::new();
    let (old_trainer, client) = bound_pair(&store).await;
    let new_trainer = store.insert_user(AccountRole::Trainer, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    let request = engine::request_trainer_change(&store, client, new_trainer, "moved")
        .await
        .unwrap();

    // An admin override already moved the client to the requested trainer
    engine::remove_association(&store, admin, client).await.unwrap();
    engine::bind_for_plan(&store, new_trainer, client).await.unwrap();

    let decided = engine::decide_trainer_change(&store, request.uuid, admin, true)
        .await
        .unwrap();
    assert_eq!(decided.status, RequestStatus::Approved);

    assert_eq!(store.trainer_of(client).await, Some(new_trainer));
    assert_ne!(store.trainer_of(client).await, Some(old_trainer));
    assert!(store.is_consistent().await);
}
