//! Handlers for workout logs

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json};
use actix_web::{get, post};
use chrono::{DateTime, Utc};
use rorm::fields::types::ForeignModelByField;
use rorm::{insert, query, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{AccountRole, TrainingPlan, WorkoutLog, WorkoutLogInsert};
use crate::server::handler::associations::utc;
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult};

/// A single workout log entry
#[derive(Serialize, ToSchema)]
pub struct WorkoutResponse {
    pub(crate) uuid: Uuid,
    /// The plan the workout was logged against
    pub(crate) plan: Uuid,
    pub(crate) client: Uuid,
    #[schema(example = 45)]
    pub(crate) duration_minutes: i32,
    pub(crate) notes: Option<String>,
    pub(crate) performed_at: DateTime<Utc>,
}

impl From<WorkoutLog> for WorkoutResponse {
    fn from(log: WorkoutLog) -> Self {
        Self {
            uuid: log.uuid,
            plan: *log.plan.key(),
            client: *log.client.key(),
            duration_minutes: log.duration_minutes,
            notes: log.notes,
            performed_at: utc(log.performed_at),
        }
    }
}

/// The response to a list of workouts
#[derive(Serialize, ToSchema)]
pub struct GetWorkoutsResponse {
    pub(crate) workouts: Vec<WorkoutResponse>,
}

/// The request to log a workout
#[derive(Deserialize, ToSchema)]
pub struct CreateWorkoutRequest {
    /// The plan the workout was performed against
    pub(crate) plan_uuid: Uuid,
    #[schema(example = 45)]
    pub(crate) duration_minutes: i32,
    pub(crate) notes: Option<String>,
    pub(crate) performed_at: DateTime<Utc>,
}

/// Log a workout against one of the executing client's active plans
#[utoipa::path(
    tag = "Workouts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The created log entry", body = WorkoutResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreateWorkoutRequest,
    security(("session_cookie" = []))
)]
#[post("/workouts")]
pub async fn create_workout(
    req: Json<CreateWorkoutRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<WorkoutResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.duration_minutes <= 0 {
        return Err(ApiError::EmptyJson);
    }

    let mut tx = db.start_transaction().await?;

    let plan = query!(&mut tx, TrainingPlan)
        .condition(TrainingPlan::F.uuid.equals(req.plan_uuid))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    if *plan.client.key() != uuid {
        return Err(ApiError::MissingPrivileges);
    }

    if !plan.is_active {
        return Err(ApiError::InvalidUuid);
    }

    let log = insert!(&mut tx, WorkoutLogInsert)
        .single(&WorkoutLogInsert {
            uuid: Uuid::new_v4(),
            plan: ForeignModelByField::Key(plan.uuid),
            client: ForeignModelByField::Key(uuid),
            duration_minutes: req.duration_minutes,
            notes: req.notes.clone(),
            performed_at: req.performed_at.naive_utc(),
        })
        .await?;

    let log = query!(&mut tx, WorkoutLog)
        .condition(WorkoutLog::F.uuid.equals(log.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InternalServerError)?;

    tx.commit().await?;

    Ok(Json(log.into()))
}

/// Retrieve the workouts visible to the executing account
///
/// Clients see their own logs, trainers the logs against plans they
/// authored and admins every log.
#[utoipa::path(
    tag = "Workouts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The visible workouts", body = GetWorkoutsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/workouts")]
pub async fn get_workouts(
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetWorkoutsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;
    let role: AccountRole = session.get("role")?.ok_or(ApiError::SessionCorrupt)?;

    let workouts = match role {
        AccountRole::Client => {
            query!(db.as_ref(), WorkoutLog)
                .condition(WorkoutLog::F.client.equals(uuid.as_ref()))
                .all()
                .await?
        }
        AccountRole::Trainer => {
            query!(db.as_ref(), WorkoutLog)
                .condition(WorkoutLog::F.plan.trainer.equals(uuid.as_ref()))
                .all()
                .await?
        }
        AccountRole::Admin => query!(db.as_ref(), WorkoutLog).all().await?,
    };

    Ok(Json(GetWorkoutsResponse {
        workouts: workouts.into_iter().map(Into::into).collect(),
    }))
}
