use rorm::fields::types::ForeignModel;
use rorm::{DbEnum, Model, Patch};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Account;

/// The coaching binding between a trainer and a client.
///
/// The `client` field is unique, a client is bound to at most one trainer
/// at any time.
#[derive(Model)]
pub struct Coaching {
    /// Primary key of this coaching pair
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The coached client
    #[rorm(on_update = "Cascade", on_delete = "Cascade", unique)]
    pub client: ForeignModel<Account>,

    /// The coaching trainer
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub trainer: ForeignModel<Account>,

    /// The point in time the binding was established
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Coaching")]
pub(crate) struct CoachingInsert {
    pub(crate) uuid: Uuid,
    pub(crate) client: ForeignModel<Account>,
    pub(crate) trainer: ForeignModel<Account>,
}

/// The kind of a relationship request
#[derive(DbEnum, Serialize, Deserialize, ToSchema, Copy, Clone, Debug, Eq, PartialEq)]
pub enum RequestKind {
    /// First time association of an unbound client with a trainer.
    ///
    /// Decided by the targeted trainer.
    Association,
    /// Change of an already bound client to another trainer.
    ///
    /// Decided by an admin.
    TrainerChange,
}

/// The lifecycle state of a relationship request.
///
/// `Pending` is the initial state, the other two are terminal.
#[derive(DbEnum, Serialize, Deserialize, ToSchema, Copy, Clone, Debug, Eq, PartialEq)]
pub enum RequestStatus {
    /// Not decided yet
    Pending,
    /// Accepted by the trainer resp. admin
    Approved,
    /// Rejected by the trainer resp. admin
    Rejected,
}

/// A request of a client to be associated with a trainer or to change to
/// another trainer.
#[derive(Model)]
pub struct RelationshipRequest {
    /// The primary key of a request
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The kind of the request
    pub kind: RequestKind,

    /// The requesting client
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub client: ForeignModel<Account>,

    /// The trainer the client was bound to when the request was created.
    ///
    /// Unset for first time associations. This is a snapshot, deciders must
    /// re-read the current binding instead of trusting it.
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub current_trainer: Option<ForeignModel<Account>>,

    /// The desired trainer
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub target_trainer: ForeignModel<Account>,

    /// The reason given by the client
    #[rorm(max_length = 1024)]
    pub reason: String,

    /// The lifecycle state of this request
    pub status: RequestStatus,

    /// The account that decided the request
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub decided_by: Option<ForeignModel<Account>>,

    /// The point in time the request was decided
    pub decided_at: Option<chrono::NaiveDateTime>,

    /// Internal note attached on decision, e.g. when an accept lost the
    /// race against a concurrent binding
    #[rorm(max_length = 1024)]
    pub decision_note: Option<String>,

    /// The point in time the request was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "RelationshipRequest")]
pub(crate) struct RelationshipRequestInsert {
    pub(crate) uuid: Uuid,
    pub(crate) kind: RequestKind,
    pub(crate) client: ForeignModel<Account>,
    pub(crate) current_trainer: Option<ForeignModel<Account>>,
    pub(crate) target_trainer: ForeignModel<Account>,
    pub(crate) reason: String,
    pub(crate) status: RequestStatus,
}
