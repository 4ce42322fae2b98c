//! The storage abstraction the engine operates on.
//!
//! The engine owns the rules of the relationship lifecycle, not the storage
//! of the records it touches. Everything it needs from storage is collected
//! in the [RelationshipStore] trait; the server runs it against
//! [DbStore](crate::engine::DbStore), the tests against
//! [MemoryStore](crate::engine::MemoryStore).

use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::engine::EngineError;
use crate::models::{AccountRole, RequestKind, RequestStatus};

/// The relationship relevant view of a user record
#[derive(Clone, Debug)]
pub struct UserRecord {
    /// Primary key of the user
    pub uuid: Uuid,
    /// The username of the user
    pub username: String,
    /// The name that is displayed for this user
    pub display_name: String,
    /// The role of the account
    pub role: AccountRole,
    /// Whether the account has been validated
    pub is_validated: bool,
    /// The trainer the user is currently bound to (clients only)
    pub trainer: Option<Uuid>,
}

/// A relationship request as the engine sees it
#[derive(Clone, Debug)]
pub struct RequestRecord {
    /// Primary key of the request
    pub uuid: Uuid,
    /// The kind of the request
    pub kind: RequestKind,
    /// The requesting client
    pub client: Uuid,
    /// The client's trainer at creation time, if any
    pub current_trainer: Option<Uuid>,
    /// The desired trainer
    pub target_trainer: Uuid,
    /// The reason given by the client
    pub reason: String,
    /// The lifecycle state
    pub status: RequestStatus,
    /// The account that decided the request
    pub decided_by: Option<Uuid>,
    /// The point in time the request was decided
    pub decided_at: Option<NaiveDateTime>,
    /// Internal note attached on decision
    pub decision_note: Option<String>,
    /// The point in time the request was created
    pub created_at: NaiveDateTime,
}

/// The data to create a new relationship request from
#[derive(Clone, Debug)]
pub struct NewRequest {
    /// The kind of the request
    pub kind: RequestKind,
    /// The requesting client
    pub client: Uuid,
    /// The client's trainer at creation time, if any
    pub current_trainer: Option<Uuid>,
    /// The desired trainer
    pub target_trainer: Uuid,
    /// The reason given by the client
    pub reason: String,
}

/// Storage operations the relationship engine is written against.
///
/// Every mutating operation is required to be a no-op if the desired state
/// is already present, so interrupted multi-step sequences can be replayed
/// safely. [set_trainer_if](Self::set_trainer_if) and
/// [decide_if_pending](Self::decide_if_pending) are conditional writes and
/// double as the arbiter between concurrent writers.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Look up a user by its uuid
    async fn find_user(&self, user: Uuid) -> Result<Option<UserRecord>, EngineError>;

    /// Set the client's trainer reference, but only if it currently equals
    /// `expected`.
    ///
    /// Returns whether the write was applied. This is the serialization
    /// point of every binding mutation: the losing writer of a race sees
    /// `false` here and must not touch the clients sets.
    async fn set_trainer_if(
        &self,
        client: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
    ) -> Result<bool, EngineError>;

    /// Add a client to a trainer's clients set. No-op if already present.
    async fn add_client(&self, trainer: Uuid, client: Uuid) -> Result<(), EngineError>;

    /// Remove a client from a trainer's clients set. No-op if absent.
    async fn remove_client(&self, trainer: Uuid, client: Uuid) -> Result<(), EngineError>;

    /// All clients currently in a trainer's clients set
    async fn clients_of(&self, trainer: Uuid) -> Result<Vec<Uuid>, EngineError>;

    /// Clear the trainer reference of every client bound to the given
    /// trainer and empty the trainer's clients set.
    ///
    /// Returns the number of clients that were orphaned.
    async fn orphan_clients(&self, trainer: Uuid) -> Result<u64, EngineError>;

    /// Flip the validation flag of a trainer account
    async fn mark_validated(&self, trainer: Uuid) -> Result<(), EngineError>;

    /// Delete a user record. No-op if already gone.
    async fn delete_user(&self, user: Uuid) -> Result<(), EngineError>;

    /// Look up a request by its uuid
    async fn find_request(&self, request: Uuid) -> Result<Option<RequestRecord>, EngineError>;

    /// The pending request of the given kind for the given client, if any
    async fn find_pending(
        &self,
        client: Uuid,
        kind: RequestKind,
    ) -> Result<Option<RequestRecord>, EngineError>;

    /// Append a new pending request to the ledger.
    ///
    /// The caller has checked for a pending duplicate; implementations
    /// should perform the insert in the same atomic unit as that check
    /// where they can.
    async fn create_request(&self, request: NewRequest) -> Result<RequestRecord, EngineError>;

    /// Transition a request out of `Pending` into the given terminal
    /// status, recording decider and decision time.
    ///
    /// Returns `false` without touching the record if it is no longer
    /// pending.
    async fn decide_if_pending(
        &self,
        request: Uuid,
        status: RequestStatus,
        decider: Uuid,
        note: Option<String>,
    ) -> Result<bool, EngineError>;

    /// All requests created by the given client
    async fn requests_of_client(&self, client: Uuid) -> Result<Vec<RequestRecord>, EngineError>;

    /// All requests targeting the given trainer
    async fn requests_targeting(&self, trainer: Uuid) -> Result<Vec<RequestRecord>, EngineError>;

    /// The whole ledger
    async fn all_requests(&self) -> Result<Vec<RequestRecord>, EngineError>;

    /// Delete every request created by the given client.
    ///
    /// Returns the number of deleted requests.
    async fn purge_requests_of_client(&self, client: Uuid) -> Result<u64, EngineError>;

    /// Delete every request naming the given trainer as current or target
    /// trainer.
    ///
    /// Returns the number of deleted requests.
    async fn purge_requests_naming(&self, trainer: Uuid) -> Result<u64, EngineError>;

    /// Deactivate every active training plan owned by the given trainer.
    ///
    /// Returns the number of plans that were deactivated.
    async fn deactivate_plans_of(&self, trainer: Uuid) -> Result<u64, EngineError>;
}
