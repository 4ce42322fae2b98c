//! The self service association flow: a client asks a trainer to coach
//! them, the trainer accepts or rejects.

use uuid::Uuid;

use crate::engine::{
    require_client, require_valid_trainer, EngineError, NewRequest, RelationshipStore,
    RequestRecord,
};
use crate::models::{RequestKind, RequestStatus};

/// Create a pending association request of `client` towards `trainer`.
///
/// No binding is mutated here, that only happens when the trainer accepts.
/// Fails if the trainer is invalid, the client is already bound or a
/// pending association request for the client exists.
pub async fn request_association(
    store: &impl RelationshipStore,
    client: Uuid,
    trainer: Uuid,
    reason: &str,
) -> Result<RequestRecord, EngineError> {
    if reason.trim().is_empty() {
        return Err(EngineError::EmptyReason);
    }

    let client = require_client(store, client).await?;

    if client.trainer.is_some() {
        return Err(EngineError::ClientAlreadyBound);
    }

    let trainer = require_valid_trainer(store, trainer).await?;

    // At most one pending association request per client. This also covers
    // the duplicate (client, trainer) pair.
    if store
        .find_pending(client.uuid, RequestKind::Association)
        .await?
        .is_some()
    {
        return Err(EngineError::PendingRequestExists);
    }

    store
        .create_request(NewRequest {
            kind: RequestKind::Association,
            client: client.uuid,
            current_trainer: None,
            target_trainer: trainer.uuid,
            reason: reason.to_string(),
        })
        .await
}

/// Decide a pending association request.
///
/// Only the targeted trainer may decide. On accept the client's binding is
/// re-checked right before the write: if a concurrent operation has bound
/// the client to someone else in the meantime, the request is auto-rejected
/// with an internal note and the caller gets a conflict instead of a silent
/// double-bind. A binding that already points at the request's own target
/// is an interrupted earlier apply and is completed instead.
pub async fn decide_association(
    store: &impl RelationshipStore,
    request: Uuid,
    decider: Uuid,
    accept: bool,
) -> Result<RequestRecord, EngineError> {
    let request = store
        .find_request(request)
        .await?
        .ok_or(EngineError::RequestNotFound)?;

    if request.kind != RequestKind::Association {
        return Err(EngineError::RequestNotFound);
    }

    if request.target_trainer != decider {
        return Err(EngineError::NotRequestTarget);
    }

    if request.status != RequestStatus::Pending {
        return Err(EngineError::RequestAlreadyDecided);
    }

    if !accept {
        if !store
            .decide_if_pending(request.uuid, RequestStatus::Rejected, decider, None)
            .await?
        {
            return Err(EngineError::RequestAlreadyDecided);
        }

        return reread(store, request.uuid).await;
    }

    let client = require_client(store, request.client).await?;

    // Fixed apply order: trainer reference, clients set, request status.
    // The conditional write arbitrates races with other accepts and with
    // plan assignment auto-association.
    if !store
        .set_trainer_if(client.uuid, None, Some(request.target_trainer))
        .await?
    {
        // Re-read before rejecting: a replay of an interrupted accept
        // finds the trainer reference already written and has to finish
        // the remaining steps instead.
        let fresh = require_client(store, client.uuid).await?;
        if fresh.trainer != Some(request.target_trainer) {
            store
                .decide_if_pending(
                    request.uuid,
                    RequestStatus::Rejected,
                    decider,
                    Some("client was already bound when the accept was applied".to_string()),
                )
                .await?;
            return Err(EngineError::ClientAlreadyBound);
        }
    }

    store.add_client(request.target_trainer, client.uuid).await?;

    store
        .decide_if_pending(request.uuid, RequestStatus::Approved, decider, None)
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
