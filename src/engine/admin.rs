//! Administrative overrides and the deletion cascades.

use uuid::Uuid;

use crate::engine::{require_admin, require_client, EngineError, RelationshipStore};
use crate::models::AccountRole;

/// What a trainer deletion cascade touched
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct CascadeReport {
    /// Clients whose trainer reference was cleared
    pub orphaned_clients: u64,
    /// Active plans that were deactivated
    pub deactivated_plans: u64,
    /// Requests naming the trainer that were deleted
    pub purged_requests: u64,
}

/// Force-unbind a client from its trainer. Admin only.
pub async fn remove_association(
    store: &impl RelationshipStore,
    admin: Uuid,
    client: Uuid,
) -> Result<(), EngineError> {
    require_admin(store, admin).await?;
    let client = require_client(store, client).await?;

    let Some(trainer) = client.trainer else {
        return Err(EngineError::ClientNotBound);
    };

    if !store.set_trainer_if(client.uuid, Some(trainer), None).await? {
        return Err(EngineError::BindingRaceLost);
    }

    store.remove_client(trainer, client.uuid).await?;

    Ok(())
}

/// Validate a trainer account. Admin only.
///
/// Deliberately an error, not a silent no-op, when the trainer is already
/// validated or the account is no trainer, so double submissions surface.
pub async fn validate_trainer(
    store: &impl RelationshipStore,
    admin: Uuid,
    trainer: Uuid,
) -> Result<(), EngineError> {
    require_admin(store, admin).await?;

    let trainer = store
        .find_user(trainer)
        .await?
        .ok_or(EngineError::TrainerNotFound)?;

    if trainer.role != AccountRole::Trainer {
        return Err(EngineError::NotATrainer);
    }

    if trainer.is_validated {
        return Err(EngineError::AlreadyValidated);
    }

    store.mark_validated(trainer.uuid).await
}

/// Delete a trainer and cascade over everything referencing it.
///
/// Clients are orphaned, not reassigned; their active plans from this
/// trainer are deactivated, not deleted; every request naming the trainer
/// as current or target is removed so nothing can be decided against a
/// nonexistent trainer. All steps run even on empty inputs and each one is
/// idempotent. The trainer record itself is removed last, which keeps the
/// whole cascade safely re-runnable after a crash in the middle.
///
/// Callable by an admin or by the trainer themself.
pub async fn delete_trainer(
    store: &impl RelationshipStore,
    actor: Uuid,
    trainer: Uuid,
) -> Result<CascadeReport, EngineError> {
    if actor != trainer {
        require_admin(store, actor).await?;
    }

    let trainer = store
        .find_user(trainer)
        .await?
        .ok_or(EngineError::TrainerNotFound)?;

    if trainer.role != AccountRole::Trainer {
        return Err(EngineError::NotATrainer);
    }

    let orphaned_clients = store.orphan_clients(trainer.uuid).await?;
    let deactivated_plans = store.deactivate_plans_of(trainer.uuid).await?;
    let purged_requests = store.purge_requests_naming(trainer.uuid).await?;

    store.delete_user(trainer.uuid).await?;

    Ok(CascadeReport {
        orphaned_clients,
        deactivated_plans,
        purged_requests,
    })
}

/// Delete a client account and clean up everything referencing it: the
/// binding (both sides) and the client's requests.
pub async fn delete_client(
    store: &impl RelationshipStore,
    client: Uuid,
) -> Result<(), EngineError> {
    let client = require_client(store, client).await?;

    if let Some(trainer) = client.trainer {
        // Losing the race here means the binding changed concurrently; the
        // deletion below clears whatever is left either way.
        if store.set_trainer_if(client.uuid, Some(trainer), None).await? {
            store.remove_client(trainer, client.uuid).await?;
        }
    }

    store.purge_requests_of_client(client.uuid).await?;
    store.delete_user(client.uuid).await
}
