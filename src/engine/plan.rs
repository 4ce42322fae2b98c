//! Implicit association through plan assignment.

use uuid::Uuid;

use crate::engine::{require_client, require_valid_trainer, EngineError, RelationshipStore};

/// The outcome of [bind_for_plan]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PlanBinding {
    /// The client was unbound and is now bound to the acting trainer
    AutoBound,
    /// The client was already coached by the acting trainer
    AlreadyOwn,
}

/// The single invariant preserving entry point for plan creation.
///
/// A trainer creating a plan for an unbound client implicitly associates
/// the client with themself, without a request record. Creating a plan for
/// another trainer's client is forbidden; such a client has to go through
/// the trainer change flow first. Creating further plans for an own client
/// is a no-op binding wise.
pub async fn bind_for_plan(
    store: &impl RelationshipStore,
    trainer: Uuid,
    client: Uuid,
) -> Result<PlanBinding, EngineError> {
    let trainer = require_valid_trainer(store, trainer).await?;
    let client = require_client(store, client).await?;

    match client.trainer {
        Some(current) if current == trainer.uuid => Ok(PlanBinding::AlreadyOwn),
        Some(_) => Err(EngineError::ForeignClient),
        None => {
            // Same two sided discipline as an accepted association:
            // trainer reference first, clients set second.
            if !store
                .set_trainer_if(client.uuid, None, Some(trainer.uuid))
                .await?
            {
                // Someone bound the client between our read and the write.
                // If it was us (a replay), the binding is fine; anyone else
                // owns the client now.
                let fresh = require_client(store, client.uuid).await?;
                return if fresh.trainer == Some(trainer.uuid) {
                    store.add_client(trainer.uuid, client.uuid).await?;
                    Ok(PlanBinding::AlreadyOwn)
                } else {
                    Err(EngineError::ForeignClient)
                };
            }

            store.add_client(trainer.uuid, client.uuid).await?;

            Ok(PlanBinding::AutoBound)
        }
    }
}
