//! Tests for the implicit association through plan creation

use coachhub::engine;
use coachhub::engine::{EngineError, MemoryStore, PlanBinding};
use coachhub::models::AccountRole;

#[tokio::test]
async fn plan_for_unbound_client_binds_it() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let binding = engine::bind_for_plan(&store, trainer, client).await.unwrap();
    assert_eq!(binding, PlanBinding::AutoBound);

    assert_eq!(store.trainer_of(client).await, Some(trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn further_plans_for_an_own_client_change_nothing() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    engine::bind_for_plan(&store, trainer, client).await.unwrap();
    let binding = engine::bind_for_plan(&store, trainer, client).await.unwrap();
    assert_eq!(binding, PlanBinding::AlreadyOwn);

    assert_eq!(store.trainer_of(client).await, Some(trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn plans_for_foreign_clients_are_forbidden() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let other = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    engine::bind_for_plan(&store, trainer, client).await.unwrap();

    assert!(matches!(
        engine::bind_for_plan(&store, other, client).await,
        Err(EngineError::ForeignClient)
    ));

    // No silent steal
    assert_eq!(store.trainer_of(client).await, Some(trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn unvalidated_trainers_can_not_create_plans() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, false).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    assert!(matches!(
        engine::bind_for_plan(&store, trainer, client).await,
        Err(EngineError::TrainerNotValidated)
    ));

    assert!(store.trainer_of(client).await.is_none());
}

#[tokio::test]
async fn only_clients_can_be_planned_for() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let other_trainer = store.insert_user(AccountRole::Trainer, true).await;

    assert!(matches!(
        engine::bind_for_plan(&store, trainer, other_trainer).await,
        Err(EngineError::NotAClient)
    ));
}
