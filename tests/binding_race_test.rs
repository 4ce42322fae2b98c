//! Tests for concurrent operations racing on the same binding
//!
//! The store's conditional trainer update is the arbiter, so exactly one
//! of two racing binder operations may win, no matter how the tasks
//! interleave.

use std::sync::Arc;

use coachhub::engine;
use coachhub::engine::{MemoryStore, RelationshipStore};
use coachhub::models::AccountRole;
use tokio::sync::Barrier;

#[tokio::test]
async fn concurrent_accept_and_plan_bind_produce_one_winner() {
    // The interleaving is timing dependent, repeat to shake out both orders
    for _ in 0..50 {
        let store = MemoryStore::new();
        let accepting = store.insert_user(AccountRole::Trainer, true).await;
        let planning = store.insert_user(AccountRole::Trainer, true).await;
        let client = store.insert_user(AccountRole::Client, true).await;

        let request = engine::request_association(&store, client, accepting, "please")
            .await
            .unwrap();

        let barrier = Arc::new(Barrier::new(2));

        let accept_store = store.clone();
        let accept_barrier = barrier.clone();
        let accept = tokio::spawn(async move {
            accept_barrier.wait().await;
            engine::decide_association(&accept_store, request.uuid, accepting, true).await
        });

        let plan_store = store.clone();
        let plan_barrier = barrier.clone();
        let plan = tokio::spawn(async move {
            plan_barrier.wait().await;
            engine::bind_for_plan(&plan_store, planning, client).await
        });

        let accept_res = accept.await.unwrap();
        let plan_res = plan.await.unwrap();

        // Exactly one side may have bound the client
        assert_ne!(
            accept_res.is_ok(),
            plan_res.is_ok(),
            "exactly one racing operation has to win"
        );

        let winner = if accept_res.is_ok() { accepting } else { planning };
        assert_eq!(store.trainer_of(client).await, Some(winner));
        assert!(store.is_consistent().await);
    }
}

#[tokio::test]
async fn concurrent_plan_binds_by_two_trainers_produce_one_winner() {
    for _ in 0..50 {
        let store = MemoryStore::new();
        let trainer_a = store.insert_user(AccountRole::Trainer, true).await;
        let trainer_b = store.insert_user(AccountRole::Trainer, true).await;
        let client = store.insert_user(AccountRole::Client, true).await;

        let barrier = Arc::new(Barrier::new(2));

        let mut tasks = Vec::new();
        for trainer in [trainer_a, trainer_b] {
            let store = store.clone();
            let barrier = barrier.clone();
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                engine::bind_for_plan(&store, trainer, client).await
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert!(store.trainer_of(client).await.is_some());
        assert!(store.is_consistent().await);
    }
}

#[tokio::test]
async fn replayed_plan_bind_is_not_a_conflict() {
    let store = MemoryStore::new();
    let trainer = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    let barrier = Arc::new(Barrier::new(2));

    // The same trainer binds twice concurrently, the loser of the write
    // must recognize the binding as its own
    let mut tasks = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let barrier = barrier.clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            engine::bind_for_plan(&store, trainer, client).await
        }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(store.trainer_of(client).await, Some(trainer));
    assert!(store.is_consistent().await);
}

#[tokio::test]
async fn conditional_write_rejects_stale_expectations() {
    let store = MemoryStore::new();
    let first = store.insert_user(AccountRole::Trainer, true).await;
    let second = store.insert_user(AccountRole::Trainer, true).await;
    let client = store.insert_user(AccountRole::Client, true).await;

    // Unbound client: only an expectation of no binding may write
    assert!(!store
        .set_trainer_if(client, Some(first), Some(second))
        .await
        .unwrap());
    assert!(!store.set_trainer_if(client, Some(first), None).await.unwrap());
    assert!(store.set_trainer_if(client, None, None).await.unwrap());
    assert!(store
        .set_trainer_if(client, None, Some(first))
        .await
        .unwrap());
    store.add_client(first, client).await.unwrap();

    // Bound client: the stale shapes of every write must touch nothing
    assert!(!store
        .set_trainer_if(client, None, Some(second))
        .await
        .unwrap());
    assert!(!store
        .set_trainer_if(client, Some(second), Some(first))
        .await
        .unwrap());
    assert!(!store.set_trainer_if(client, Some(second), None).await.unwrap());
    assert!(!store.set_trainer_if(client, None, None).await.unwrap());
    assert_eq!(store.trainer_of(client).await, Some(first));

    // Matching expectations still move and clear the binding
    assert!(store
        .set_trainer_if(client, Some(first), Some(second))
        .await
        .unwrap());
    assert!(store
        .set_trainer_if(client, Some(second), None)
        .await
        .unwrap());
    assert!(store.trainer_of(client).await.is_none());
}
