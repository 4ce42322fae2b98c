//! The trainer change flow: a bound client asks to be moved to another
//! trainer, an admin arbitrates.

use uuid::Uuid;

use crate::engine::{
    require_admin, require_client, require_valid_trainer, EngineError, NewRequest,
    RelationshipStore, RequestRecord,
};
use crate::models::{RequestKind, RequestStatus};

/// Create a pending trainer change request.
///
/// The client's current trainer is recorded as a snapshot; deciders re-read
/// the live binding instead of trusting it.
pub async fn request_trainer_change(
    store: &impl RelationshipStore,
    client: Uuid,
    new_trainer: Uuid,
    reason: &str,
) -> Result<RequestRecord, EngineError> {
    if reason.trim().is_empty() {
        return Err(EngineError::EmptyReason);
    }

    let client = require_client(store, client).await?;

    let Some(current) = client.trainer else {
        // Unbound clients have to use the association flow
        return Err(EngineError::ClientNotBound);
    };

    let new_trainer = require_valid_trainer(store, new_trainer).await?;

    if current == new_trainer.uuid {
        return Err(EngineError::SameTrainer);
    }

    if store
        .find_pending(client.uuid, RequestKind::TrainerChange)
        .await?
        .is_some()
    {
        return Err(EngineError::PendingRequestExists);
    }

    store
        .create_request(NewRequest {
            kind: RequestKind::TrainerChange,
            client: client.uuid,
            current_trainer: Some(current),
            target_trainer: new_trainer.uuid,
            reason: reason.to_string(),
        })
        .await
}

/// Decide a pending trainer change request. Admin only.
///
/// On approval the client's *current* trainer is re-read (time may have
/// passed since the request was created) and the target trainer is
/// re-validated, then the binding is moved: trainer reference first
/// (conditional on the value just read), old clients set, new clients set,
/// request status. A lost race leaves the request pending so the admin may
/// decide again against fresh state.
pub async fn decide_trainer_change(
    store: &impl RelationshipStore,
    request: Uuid,
    admin: Uuid,
    accept: bool,
) -> Result<RequestRecord, EngineError> {
    let admin = require_admin(store, admin).await?;

    let request = store
        .find_request(request)
        .await?
        .ok_or(EngineError::RequestNotFound)?;

    if request.kind != RequestKind::TrainerChange {
        return Err(EngineError::RequestNotFound);
    }

    if request.status != RequestStatus::Pending {
        return Err(EngineError::RequestAlreadyDecided);
    }

    if !accept {
        if !store
            .decide_if_pending(request.uuid, RequestStatus::Rejected, admin.uuid, None)
            .await?
        {
            return Err(EngineError::RequestAlreadyDecided);
        }

        return reread(store, request.uuid).await;
    }

    let client = require_client(store, request.client).await?;

    // Re-validate the target at decision time, not just at creation: the
    // trainer may have been deleted or devalidated since.
    let target = require_valid_trainer(store, request.target_trainer).await?;

    // The live binding, not the snapshot taken at request creation
    let old_trainer = client.trainer;

    if old_trainer == Some(target.uuid) {
        // Already bound to the target, e.g. through a plan assignment in
        // the meantime. Make the set side consistent and settle the
        // request.
        store.add_client(target.uuid, client.uuid).await?;
        store
            .decide_if_pending(request.uuid, RequestStatus::Approved, admin.uuid, None)
            .await?;
        return reread(store, request.uuid).await;
    }

    if !store
        .set_trainer_if(client.uuid, old_trainer, Some(target.uuid))
        .await?
    {
        return Err(EngineError::BindingRaceLost);
    }

    // Clear the old side before filling the new one
    if let Some(old) = old_trainer {
        store.remove_client(old, client.uuid).await?;
    }
    store.add_client(target.uuid, client.uuid).await?;

    store
        .decide_if_pending(request.uuid, RequestStatus::Approved, admin.uuid, None)
        .await?;

    reread(store, request.uuid).await
}

async fn reread(
    store: &impl RelationshipStore,
    request: Uuid,
) -> Result<RequestRecord, EngineError> {
    store
        .find_request(request)
        .await?
        .ok_or(EngineError::RequestNotFound)
}
