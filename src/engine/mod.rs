//! The relationship engine.
//!
//! This module owns the rules of the trainer - client relationship
//! lifecycle: association requests, trainer changes, implicit binding
//! through plan creation, administrative overrides and the cascades that
//! keep dependent records consistent.
//!
//! The engine is transport agnostic. Its operations are free functions over
//! a [RelationshipStore] and report typed [EngineError]s which the http
//! layer maps to status codes. The global invariant every operation
//! preserves:
//!
//! > a client is in a trainer's clients set if and only if the client's
//! > trainer reference points at that trainer

pub use admin::*;
pub use association::*;
pub use change::*;
pub use db::DbStore;
pub use error::{EngineError, ErrorKind};
pub use memory::{MemPlan, MemoryStore};
pub use plan::*;
pub use store::{NewRequest, RelationshipStore, RequestRecord, UserRecord};

use uuid::Uuid;

use crate::models::AccountRole;

mod admin;
mod association;
mod change;
mod db;
mod error;
mod memory;
mod plan;
mod store;

/// Retrieve the relationship requests visible to the given actor.
///
/// Clients see the requests they created, trainers the requests targeting
/// them and admins the whole ledger.
pub async fn list_requests(
    store: &impl RelationshipStore,
    actor: Uuid,
) -> Result<Vec<RequestRecord>, EngineError> {
    let actor = store
        .find_user(actor)
        .await?
        .ok_or(EngineError::ClientNotFound)?;

    match actor.role {
        AccountRole::Client => store.requests_of_client(actor.uuid).await,
        AccountRole::Trainer => store.requests_targeting(actor.uuid).await,
        AccountRole::Admin => store.all_requests().await,
    }
}

/// Look up a trainer account and check it can be the target of an
/// association: it must exist, be a trainer and be validated.
pub(crate) async fn require_valid_trainer(
    store: &impl RelationshipStore,
    trainer: Uuid,
) -> Result<UserRecord, EngineError> {
    let trainer = store
        .find_user(trainer)
        .await?
        .ok_or(EngineError::TrainerNotFound)?;

    if trainer.role != AccountRole::Trainer {
        return Err(EngineError::TrainerNotFound);
    }

    if !trainer.is_validated {
        return Err(EngineError::TrainerNotValidated);
    }

    Ok(trainer)
}

/// Look up a client account, failing if the uuid does not name a client
pub(crate) async fn require_client(
    store: &impl RelationshipStore,
    client: Uuid,
) -> Result<UserRecord, EngineError> {
    let client = store
        .find_user(client)
        .await?
        .ok_or(EngineError::ClientNotFound)?;

    if client.role != AccountRole::Client {
        return Err(EngineError::NotAClient);
    }

    Ok(client)
}

/// Look up an admin account, failing if the uuid does not name an admin
pub(crate) async fn require_admin(
    store: &impl RelationshipStore,
    admin: Uuid,
) -> Result<UserRecord, EngineError> {
    let admin = store
        .find_user(admin)
        .await?
        .ok_or(EngineError::AdminRequired)?;

    if admin.role != AccountRole::Admin {
        return Err(EngineError::AdminRequired);
    }

    Ok(admin)
}
