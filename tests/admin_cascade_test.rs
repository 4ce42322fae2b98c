//! Tests for administrative overrides and the deletion cascades

use coachhub::engine;
use coachhub::engine::{EngineError, MemoryStore, RelationshipStore};
use coachhub::models::AccountRole;

#[tokio::test]
async fn remove_association_unbinds_both_sides() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    engine::bind_for_plan(&store, trainer, client).await.unwrap();

    engine::remove_association(&store, admin, client).await.unwrap();

    assert!(store.trainer_of(client).await.is_none());
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn remove_association_requires_a_binding() {
    let store = MemoryStore::new();
    let client = store.insert_user(AccountRole::Client, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    assert!(matches!(
        engine::remove_association(&store, admin, client).await,
        Err(EngineError::ClientNotBound)
    ));
}

#[tokio::test]
async fn remove_association_is_admin_only() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    engine::bind_for_plan(&store, trainer, client).await.unwrap();

    assert!(matches!(
        engine::remove_association(&store, trainer, client).await,
        Err(EngineError::AdminRequired)
    ));
    assert_eq!(store.trainer_of(client).await, Some(trainer));
}

#[tokio::test]
async fn validation_is_single_shot() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, false).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    engine::validate_trainer(&store, admin, trainer).await.unwrap();

    let validated = store.find_user(trainer).await.unwrap().unwrap();
    assert!(validated.is_validated);

    assert!(matches!(
        engine::validate_trainer(&store, admin, trainer).await,
        Err(EngineError::AlreadyValidated)
    ));
}

#[tokio::test]
async fn clients_can_not_be_validated() {
    let store = MemoryStore::new();
    let client = store.insert_user(AccountRole::Client, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    assert!(matches!(
        engine::validate_trainer(&store, admin, client).await,
        Err(EngineError::NotATrainer)
    ));
}

#[tokio::test]
async fn trainer_deletion_cascades_completely() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let other_trainer = store.insert_user(AccountRole::Trainer, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    let client_a = store.insert_user(AccountRole::Client, true).await;
    let client_b = store.insert_user(AccountRole::Client, true).await;
    let outsider = store.insert_user(AccountRole::Client, true).await;

    engine::bind_for_plan(&store, trainer, client_a).await.unwrap();
    engine::bind_for_plan(&store, trainer, client_b).await.unwrap();
    engine::bind_for_plan(&store, other_trainer, outsider).await.unwrap();

    store.insert_active_plan(trainer, client_a).await;
    store.insert_active_plan(trainer, client_b).await;
    let untouched_plan = store.insert_active_plan(other_trainer, outsider).await;

    // A pending request targeting the doomed trainer
    engine::request_trainer_change(&store, outsider, trainer, "want to switch")
        .await
        .unwrap();

    let report = engine::delete_trainer(&store, admin, trainer).await.unwrap();
    assert_eq!(report.orphaned_clients, 2);
    assert_eq!(report.deactivated_plans, 2);
    assert_eq!(report.purged_requests, 1);

    // The clients survive, unbound
    assert!(store.find_user(client_a).await.unwrap().is_some());
    assert!(store.trainer_of(client_a).await.is_none());
    assert!(store.trainer_of(client_b).await.is_none());

    // The trainer itself is gone and nothing names it anymore
    assert!(store.find_user(trainer).await.unwrap().is_none());
    assert_eq!(store.requests_naming_count(trainer).await, 0);

    // Plans are deactivated, not deleted; other trainers are untouched
    let plans = store.plans_snapshot().await;
    assert!(plans
        .iter()
        .filter(|p| p.uuid != untouched_plan)
        .all(|p| !p.is_active));
    assert!(plans
        .iter()
        .find(|p| p.uuid == untouched_plan)
        .is_some_and(|p| p.is_active));

    assert_eq!(store.trainer_of(outsider).await, Some(other_trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn trainers_may_delete_themselves() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    engine::bind_for_plan(&store, trainer, client).await.unwrap();

    let report = engine::delete_trainer(&store, trainer, trainer).await.unwrap();
    assert_eq!(report.orphaned_clients, 1);

    assert!(store.find_user(trainer).await.unwrap().is_none());
    assert!(store.trainer_of(client).await.is_none());
}

#[tokio::test]
async fn trainer_deletion_is_admin_or_self_only() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let other = store.insert_user(AccountRole::Trainer, true).await;

    assert!(matches!(
        engine::delete_trainer(&store, other, trainer).await,
        Err(EngineError::AdminRequired)
    ));
    assert!(store.find_user(trainer).await.unwrap().is_some());
}

#[tokio::test]
async fn empty_cascade_still_deletes() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let admin = store.insert_user(AccountRole::Admin, true).await;

    let report = engine::delete_trainer(&store, admin, trainer).await.unwrap();
    assert_eq!(report.orphaned_clients, 0);
    assert_eq!(report.deactivated_plans, 0);
    assert_eq!(report.purged_requests, 0);

    assert!(store.find_user(trainer).await.unwrap().is_none());
}

#[tokio::test]
async fn client_deletion_cleans_up_the_trainer_side() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    engine::bind_for_plan(&store, trainer, client).await.unwrap();

    engine::delete_client(&store, client).await.unwrap();

    assert!(store.find_user(client).await.unwrap().is_none());
    assert!(store.clients_of(trainer).await.unwrap().is_empty());
    assert!(store.is_consistent().await);
}
