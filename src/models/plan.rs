use rorm::fields::types::ForeignModel;
use rorm::{Model, Patch};
use uuid::Uuid;

use crate::models::Account;

/// A training plan authored by a trainer for one of their clients.
///
/// Plans are scoped to exactly one (trainer, client) pair. They are
/// deactivated instead of deleted when the trainer is removed.
#[derive(Model)]
pub struct TrainingPlan {
    /// Primary key of the plan
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// Name of the plan
    #[rorm(max_length = 255)]
    pub name: String,

    /// Free text description of the plan's content
    #[rorm(max_length = 2048)]
    pub description: Option<String>,

    /// The authoring trainer.
    ///
    /// Cleared when the trainer is deleted, the plan itself survives
    /// deactivated.
    #[rorm(on_update = "Cascade", on_delete = "SetNull")]
    pub trainer: Option<ForeignModel<Account>>,

    /// The client the plan is written for
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub client: ForeignModel<Account>,

    /// Whether the plan is currently active
    pub is_active: bool,

    /// The point in time the plan was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "TrainingPlan")]
pub(crate) struct TrainingPlanInsert {
    pub(crate) uuid: Uuid,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) trainer: Option<ForeignModel<Account>>,
    pub(crate) client: ForeignModel<Account>,
    pub(crate) is_active: bool,
}

/// A workout a client has logged against one of their plans
#[derive(Model)]
pub struct WorkoutLog {
    /// Primary key of the log entry
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The plan the workout belongs to
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub plan: ForeignModel<TrainingPlan>,

    /// The client that performed the workout
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub client: ForeignModel<Account>,

    /// Duration of the workout in minutes
    pub duration_minutes: i32,

    /// Optional notes of the client
    #[rorm(max_length = 2048)]
    pub notes: Option<String>,

    /// When the workout was performed
    pub performed_at: chrono::NaiveDateTime,

    /// The point in time the log entry was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "WorkoutLog")]
pub(crate) struct WorkoutLogInsert {
    pub(crate) uuid: Uuid,
    pub(crate) plan: ForeignModel<TrainingPlan>,
    pub(crate) client: ForeignModel<Account>,
    pub(crate) duration_minutes: i32,
    pub(crate) notes: Option<String>,
    pub(crate) performed_at: chrono::NaiveDateTime,
}
