//! An in-memory implementation of [RelationshipStore].
//!
//! This store keeps both sides of the binding denormalized, a `trainer`
//! reference on the client and a `clients` set on the trainer, exactly as
//! the engine's invariant states them. The integration tests run the
//! engine against it and check consistency through [MemoryStore::is_consistent].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::engine::store::{NewRequest, RelationshipStore, RequestRecord, UserRecord};
use crate::engine::EngineError;
use crate::models::{AccountRole, RequestKind, RequestStatus};

#[derive(Clone, Debug)]
struct MemUser {
    uuid: Uuid,
    username: String,
    display_name: String,
    role: AccountRole,
    is_validated: bool,
    trainer: Option<Uuid>,
    clients: HashSet<Uuid>,
}

/// A training plan as the memory store keeps it
#[derive(Clone, Debug)]
pub struct MemPlan {
    /// Primary key of the plan
    pub uuid: Uuid,
    /// The authoring trainer, cleared when the trainer is deleted
    pub trainer: Option<Uuid>,
    /// The client the plan is written for
    pub client: Uuid,
    /// Whether the plan is currently active
    pub is_active: bool,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, MemUser>,
    // Append order, the ledger is append-mostly
    requests: Vec<RequestRecord>,
    plans: Vec<MemPlan>,
}

/// In-memory [RelationshipStore], cheap to clone and share between tasks
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user with the given role and validation flag, returning its
    /// uuid
    pub async fn insert_user(&self, role: AccountRole, is_validated: bool) -> Uuid {
        let uuid = Uuid::new_v4();
        let mut state = self.state.lock().await;
        state.users.insert(
            uuid,
            MemUser {
                uuid,
                username: format!("user-{uuid}"),
                display_name: format!("User {uuid}"),
                role,
                is_validated,
                trainer: None,
                clients: HashSet::new(),
            },
        );
        uuid
    }

    /// Flip a trainer's validation flag
    pub async fn set_validated(&self, trainer: Uuid, validated: bool) {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.get_mut(&trainer) {
            user.is_validated = validated;
        }
    }

    /// Insert an active training plan for the given pair, returning its uuid
    pub async fn insert_active_plan(&self, trainer: Uuid, client: Uuid) -> Uuid {
        let uuid = Uuid::new_v4();
        let mut state = self.state.lock().await;
        state.plans.push(MemPlan {
            uuid,
            trainer: Some(trainer),
            client,
            is_active: true,
        });
        uuid
    }

    /// A copy of all plans in the store
    pub async fn plans_snapshot(&self) -> Vec<MemPlan> {
        self.state.lock().await.plans.clone()
    }

    /// Check the bidirectional consistency invariant over the whole store:
    /// a client is in a trainer's clients set iff the client's trainer
    /// reference points at that trainer.
    pub async fn is_consistent(&self) -> bool {
        let state = self.state.lock().await;

        for user in state.users.values() {
            if let Some(trainer) = user.trainer {
                let Some(trainer) = state.users.get(&trainer) else {
                    return false;
                };
                if !trainer.clients.contains(&user.uuid) {
                    return false;
                }
            }

            for client in &user.clients {
                let Some(client) = state.users.get(client) else {
                    return false;
                };
                if client.trainer != Some(user.uuid) {
                    return false;
                }
            }
        }

        true
    }

    /// The number of pending requests of the given kind for the client
    pub async fn pending_count(&self, client: Uuid, kind: RequestKind) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| {
                r.client == client && r.kind == kind && r.status == RequestStatus::Pending
            })
            .count()
    }

    /// The number of requests naming the trainer as current or target
    pub async fn requests_naming_count(&self, trainer: Uuid) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|r| r.target_trainer == trainer || r.current_trainer == Some(trainer))
            .count()
    }

    /// The trainer the client is currently bound to
    pub async fn trainer_of(&self, client: Uuid) -> Option<Uuid> {
        self.state
            .lock()
            .await
            .users
            .get(&client)
            .and_then(|u| u.trainer)
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn find_user(&self, user: Uuid) -> Result<Option<UserRecord>, EngineError> {
        let state = self.state.lock().await;
        Ok(state.users.get(&user).map(|u| UserRecord {
            uuid: u.uuid,
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            role: u.role,
            is_validated: u.is_validated,
            trainer: u.trainer,
        }))
    }

    async fn set_trainer_if(
        &self,
        client: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
    ) -> Result<bool, EngineError> {
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&client) else {
            return Ok(false);
        };

        if user.trainer != expected {
            return Ok(false);
        }

        user.trainer = new;
        Ok(true)
    }

    async fn add_client(&self, trainer: Uuid, client: Uuid) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        if let Some(trainer) = state.users.get_mut(&trainer) {
            trainer.clients.insert(client);
        }
        Ok(())
    }

    async fn remove_client(&self, trainer: Uuid, client: Uuid) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        if let Some(trainer) = state.users.get_mut(&trainer) {
            trainer.clients.remove(&client);
        }
        Ok(())
    }

    async fn clients_of(&self, trainer: Uuid) -> Result<Vec<Uuid>, EngineError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .get(&trainer)
            .map(|t| t.clients.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn orphan_clients(&self, trainer: Uuid) -> Result<u64, EngineError> {
        let mut state = self.state.lock().await;

        let mut orphaned = 0;
        for user in state.users.values_mut() {
            if user.trainer == Some(trainer) {
                user.trainer = None;
                orphaned += 1;
            }
        }

        if let Some(trainer) = state.users.get_mut(&trainer) {
            trainer.clients.clear();
        }

        Ok(orphaned)
    }

    async fn mark_validated(&self, trainer: Uuid) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.get_mut(&trainer) {
            user.is_validated = true;
        }
        Ok(())
    }

    async fn delete_user(&self, user: Uuid) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;

        state.users.remove(&user);

        // Mirror of the referential cleanup the database performs
        for other in state.users.values_mut() {
            other.clients.remove(&user);
            if other.trainer == Some(user) {
                other.trainer = None;
            }
        }
        state.requests.retain(|r| {
            r.client != user && r.target_trainer != user && r.current_trainer != Some(user)
        });
        state.plans.retain(|p| p.client != user);
        for plan in &mut state.plans {
            if plan.trainer == Some(user) {
                plan.trainer = None;
            }
        }

        Ok(())
    }

    async fn find_request(&self, request: Uuid) -> Result<Option<RequestRecord>, EngineError> {
        let state = self.state.lock().await;
        Ok(state.requests.iter().find(|r| r.uuid == request).cloned())
    }

    async fn find_pending(
        &self,
        client: Uuid,
        kind: RequestKind,
    ) -> Result<Option<RequestRecord>, EngineError> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .find(|r| r.client == client && r.kind == kind && r.status == RequestStatus::Pending)
            .cloned())
    }

    async fn create_request(&self, request: NewRequest) -> Result<RequestRecord, EngineError> {
        let mut state = self.state.lock().await;

        // The engine has checked already, but the check has to share the
        // atomic unit with the insert to hold under concurrent creations.
        if state.requests.iter().any(|r| {
            r.client == request.client
                && r.kind == request.kind
                && r.status == RequestStatus::Pending
        }) {
            return Err(EngineError::PendingRequestExists);
        }

        let record = RequestRecord {
            uuid: Uuid::new_v4(),
            kind: request.kind,
            client: request.client,
            current_trainer: request.current_trainer,
            target_trainer: request.target_trainer,
            reason: request.reason,
            status: RequestStatus::Pending,
            decided_by: None,
            decided_at: None,
            decision_note: None,
            created_at: Utc::now().naive_utc(),
        };
        state.requests.push(record.clone());

        Ok(record)
    }

    async fn decide_if_pending(
        &self,
        request: Uuid,
        status: RequestStatus,
        decider: Uuid,
        note: Option<String>,
    ) -> Result<bool, EngineError> {
        let mut state = self.state.lock().await;
        let Some(record) = state.requests.iter_mut().find(|r| r.uuid == request) else {
            return Ok(false);
        };

        if record.status != RequestStatus::Pending {
            return Ok(false);
        }

        record.status = status;
        record.decided_by = Some(decider);
        record.decided_at = Some(Utc::now().naive_utc());
        record.decision_note = note;

        Ok(true)
    }

    async fn requests_of_client(&self, client: Uuid) -> Result<Vec<RequestRecord>, EngineError> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .filter(|r| r.client == client)
            .cloned()
            .collect())
    }

    async fn requests_targeting(&self, trainer: Uuid) -> Result<Vec<RequestRecord>, EngineError> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .iter()
            .filter(|r| r.target_trainer == trainer)
            .cloned()
            .collect())
    }

    async fn all_requests(&self) -> Result<Vec<RequestRecord>, EngineError> {
        let state = self.state.lock().await;
        Ok(state.requests.clone())
    }

    async fn purge_requests_of_client(&self, client: Uuid) -> Result<u64, EngineError> {
        let mut state = self.state.lock().await;
        let before = state.requests.len();
        state.requests.retain(|r| r.client != client);
        Ok((before - state.requests.len()) as u64)
    }

    async fn purge_requests_naming(&self, trainer: Uuid) -> Result<u64, EngineError> {
        let mut state = self.state.lock().await;
        let before = state.requests.len();
        state
            .requests
            .retain(|r| r.target_trainer != trainer && r.current_trainer != Some(trainer));
        Ok((before - state.requests.len()) as u64)
    }

    async fn deactivate_plans_of(&self, trainer: Uuid) -> Result<u64, EngineError> {
        let mut state = self.state.lock().await;

        let mut deactivated = 0;
        for plan in &mut state.plans {
            if plan.trainer == Some(trainer) && plan.is_active {
                plan.is_active = false;
                deactivated += 1;
            }
        }

        Ok(deactivated)
    }
}
