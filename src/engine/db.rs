//! The database backed implementation of [RelationshipStore].

use async_trait::async_trait;
use chrono::Utc;
use rorm::fields::types::ForeignModelByField;
use rorm::{and, insert, or, query, update, Database, FieldAccess, Model};
use uuid::Uuid;

use crate::engine::store::{NewRequest, RelationshipStore, RequestRecord, UserRecord};
use crate::engine::EngineError;
use crate::models::{
    Account, Coaching, CoachingInsert, RelationshipRequest, RelationshipRequestInsert,
    RequestKind, RequestStatus, TrainingPlan,
};

/// [RelationshipStore] over a postgres database.
///
/// The binding lives in the [Coaching] table whose unique `client` column
/// is the schema level rendition of "at most one trainer per client"; both
/// sides of the engine's two step apply map onto that row. Multi record
/// steps run inside transactions.
#[derive(Clone)]
pub struct DbStore {
    db: Database,
}

impl DbStore {
    /// Wrap a database connection
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn to_record(request: RelationshipRequest) -> RequestRecord {
    RequestRecord {
        uuid: request.uuid,
        kind: request.kind,
        client: *request.client.key(),
        current_trainer: request.current_trainer.as_ref().map(|fm| *fm.key()),
        target_trainer: *request.target_trainer.key(),
        reason: request.reason,
        status: request.status,
        decided_by: request.decided_by.as_ref().map(|fm| *fm.key()),
        decided_at: request.decided_at,
        decision_note: request.decision_note,
        created_at: request.created_at,
    }
}

#[async_trait]
impl RelationshipStore for DbStore {
    async fn find_user(&self, user: Uuid) -> Result<Option<UserRecord>, EngineError> {
        let mut tx = self.db.start_transaction().await?;

        let Some(account) = query!(&mut tx, Account)
            .condition(Account::F.uuid.equals(user))
            .optional()
            .await?
        else {
            return Ok(None);
        };

        let coaching = query!(&mut tx, Coaching)
            .condition(Coaching::F.client.equals(user.as_ref()))
            .optional()
            .await?;

        tx.commit().await?;

        Ok(Some(UserRecord {
            uuid: account.uuid,
            username: account.username,
            display_name: account.display_name,
            role: account.role,
            is_validated: account.is_validated,
            trainer: coaching.map(|c| *c.trainer.key()),
        }))
    }

    async fn set_trainer_if(
        &self,
        client: Uuid,
        expected: Option<Uuid>,
        new: Option<Uuid>,
    ) -> Result<bool, EngineError> {
        // The expectation is part of each write's condition or constraint,
        // so a caller holding a stale read touches zero rows instead of
        // overwriting a concurrent winner.
        match (expected, new) {
            (Some(expected), Some(new)) => {
                let updated = update!(&self.db, Coaching)
                    .condition(and!(
                        Coaching::F.client.equals(client.as_ref()),
                        Coaching::F.trainer.equals(expected.as_ref())
                    ))
                    .set(Coaching::F.trainer, ForeignModelByField::Key(new))
                    .exec()
                    .await?;

                Ok(updated > 0)
            }
            (Some(expected), None) => {
                let deleted = rorm::delete!(&self.db, Coaching)
                    .condition(and!(
                        Coaching::F.client.equals(client.as_ref()),
                        Coaching::F.trainer.equals(expected.as_ref())
                    ))
                    .await?;

                Ok(deleted > 0)
            }
            (None, Some(new)) => {
                let inserted = insert!(&self.db, CoachingInsert)
                    .single(&CoachingInsert {
                        uuid: Uuid::new_v4(),
                        client: ForeignModelByField::Key(client),
                        trainer: ForeignModelByField::Key(new),
                    })
                    .await;

                match inserted {
                    Ok(_) => Ok(true),
                    Err(err) => {
                        // The unique client column turns a lost insert race
                        // into a constraint violation. Tell it apart from a
                        // genuine failure by whether a row exists now.
                        let row = query!(&self.db, (Coaching::F.uuid,))
                            .condition(Coaching::F.client.equals(client.as_ref()))
                            .optional()
                            .await?;

                        if row.is_some() {
                            Ok(false)
                        } else {
                            Err(err.into())
                        }
                    }
                }
            }
            (None, None) => {
                let row = query!(&self.db, (Coaching::F.uuid,))
                    .condition(Coaching::F.client.equals(client.as_ref()))
                    .optional()
                    .await?;

                Ok(row.is_none())
            }
        }
    }

    async fn add_client(&self, trainer: Uuid, client: Uuid) -> Result<(), EngineError> {
        let mut tx = self.db.start_transaction().await?;

        // The pair row is shared with the trainer field side, so the set
        // side is usually present already when this runs
        if query!(&mut tx, Coaching)
            .condition(Coaching::F.client.equals(client.as_ref()))
            .optional()
            .await?
            .is_none()
        {
            insert!(&mut tx, CoachingInsert)
                .single(&CoachingInsert {
                    uuid: Uuid::new_v4(),
                    client: ForeignModelByField::Key(client),
                    trainer: ForeignModelByField::Key(trainer),
                })
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn remove_client(&self, trainer: Uuid, client: Uuid) -> Result<(), EngineError> {
        rorm::delete!(&self.db, Coaching)
            .condition(and!(
                Coaching::F.client.equals(client.as_ref()),
                Coaching::F.trainer.equals(trainer.as_ref())
            ))
            .await?;

        Ok(())
    }

    async fn clients_of(&self, trainer: Uuid) -> Result<Vec<Uuid>, EngineError> {
        let clients = query!(&self.db, (Coaching::F.client,))
            .condition(Coaching::F.trainer.equals(trainer.as_ref()))
            .all()
            .await?;

        Ok(clients.into_iter().map(|(fm,)| *fm.key()).collect())
    }

    async fn orphan_clients(&self, trainer: Uuid) -> Result<u64, EngineError> {
        let orphaned = rorm::delete!(&self.db, Coaching)
            .condition(Coaching::F.trainer.equals(trainer.as_ref()))
            .await?;

        Ok(orphaned)
    }

    async fn mark_validated(&self, trainer: Uuid) -> Result<(), EngineError> {
        update!(&self.db, Account)
            .condition(Account::F.uuid.equals(trainer))
            .set(Account::F.is_validated, true)
            .exec()
            .await?;

        Ok(())
    }

    async fn delete_user(&self, user: Uuid) -> Result<(), EngineError> {
        rorm::delete!(&self.db, Account)
            .condition(Account::F.uuid.equals(user))
            .await?;

        Ok(())
    }

    async fn find_request(&self, request: Uuid) -> Result<Option<RequestRecord>, EngineError> {
        let request = query!(&self.db, RelationshipRequest)
            .condition(RelationshipRequest::F.uuid.equals(request))
            .optional()
            .await?;

        Ok(request.map(to_record))
    }

    async fn find_pending(
        &self,
        client: Uuid,
        kind: RequestKind,
    ) -> Result<Option<RequestRecord>, EngineError> {
        let request = query!(&self.db, RelationshipRequest)
            .condition(and!(
                RelationshipRequest::F.client.equals(client.as_ref()),
                RelationshipRequest::F.kind.equals(kind),
                RelationshipRequest::F.status.equals(RequestStatus::Pending)
            ))
            .optional()
            .await?;

        Ok(request.map(to_record))
    }

    async fn create_request(&self, request: NewRequest) -> Result<RequestRecord, EngineError> {
        let mut tx = self.db.start_transaction().await?;

        // Check-then-insert inside one transaction: the uniqueness of a
        // pending request is conditional on its status, which a plain
        // unique index cannot express
        if query!(&mut tx, (RelationshipRequest::F.uuid,))
            .condition(and!(
                RelationshipRequest::F.client.equals(request.client.as_ref()),
                RelationshipRequest::F.kind.equals(request.kind),
                RelationshipRequest::F.status.equals(RequestStatus::Pending)
            ))
            .optional()
            .await?
            .is_some()
        {
            return Err(EngineError::PendingRequestExists);
        }

        let uuid = Uuid::new_v4();
        insert!(&mut tx, RelationshipRequestInsert)
            .single(&RelationshipRequestInsert {
                uuid,
                kind: request.kind,
                client: ForeignModelByField::Key(request.client),
                current_trainer: request.current_trainer.map(ForeignModelByField::Key),
                target_trainer: ForeignModelByField::Key(request.target_trainer),
                reason: request.reason,
                status: RequestStatus::Pending,
            })
            .await?;

        let record = query!(&mut tx, RelationshipRequest)
            .condition(RelationshipRequest::F.uuid.equals(uuid))
            .one()
            .await?;

        tx.commit().await?;

        Ok(to_record(record))
    }

    async fn decide_if_pending(
        &self,
        request: Uuid,
        status: RequestStatus,
        decider: Uuid,
        note: Option<String>,
    ) -> Result<bool, EngineError> {
        let updated = update!(&self.db, RelationshipRequest)
            .condition(and!(
                RelationshipRequest::F.uuid.equals(request),
                RelationshipRequest::F.status.equals(RequestStatus::Pending)
            ))
            .set(RelationshipRequest::F.status, status)
            .set(
                RelationshipRequest::F.decided_by,
                Some(ForeignModelByField::Key(decider)),
            )
            .set(
                RelationshipRequest::F.decided_at,
                Some(Utc::now().naive_utc()),
            )
            .set(RelationshipRequest::F.decision_note, note)
            .exec()
            .await?;

        Ok(updated > 0)
    }

    async fn requests_of_client(&self, client: Uuid) -> Result<Vec<RequestRecord>, EngineError> {
        let requests = query!(&self.db, RelationshipRequest)
            .condition(RelationshipRequest::F.client.equals(client.as_ref()))
            .all()
            .await?;

        Ok(requests.into_iter().map(to_record).collect())
    }

    async fn requests_targeting(&self, trainer: Uuid) -> Result<Vec<RequestRecord>, EngineError> {
        let requests = query!(&self.db, RelationshipRequest)
            .condition(RelationshipRequest::F.target_trainer.equals(trainer.as_ref()))
            .all()
            .await?;

        Ok(requests.into_iter().map(to_record).collect())
    }

    async fn all_requests(&self) -> Result<Vec<RequestRecord>, EngineError> {
        let requests = query!(&self.db, RelationshipRequest).all().await?;

        Ok(requests.into_iter().map(to_record).collect())
    }

    async fn purge_requests_of_client(&self, client: Uuid) -> Result<u64, EngineError> {
        let purged = rorm::delete!(&self.db, RelationshipRequest)
            .condition(RelationshipRequest::F.client.equals(client.as_ref()))
            .await?;

        Ok(purged)
    }

    async fn purge_requests_naming(&self, trainer: Uuid) -> Result<u64, EngineError> {
        let purged = rorm::delete!(&self.db, RelationshipRequest)
            .condition(or!(
                RelationshipRequest::F.target_trainer.equals(trainer.as_ref()),
                RelationshipRequest::F.current_trainer.equals(trainer.as_ref())
            ))
            .await?;

        Ok(purged)
    }

    async fn deactivate_plans_of(&self, trainer: Uuid) -> Result<u64, EngineError> {
        let deactivated = update!(&self.db, TrainingPlan)
            .condition(and!(
                TrainingPlan::F.trainer.equals(trainer.as_ref()),
                TrainingPlan::F.is_active.equals(true)
            ))
            .set(TrainingPlan::F.is_active, false)
            .exec()
            .await?;

        Ok(deactivated)
    }
}
