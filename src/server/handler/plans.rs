//! Handlers for training plans
//!
//! Plan creation is the implicit association path: a validated trainer
//! creating a plan for an unbound client binds the client to themself
//! without any request.

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, put, HttpResponse};
use chrono::{DateTime, Utc};
use log::{error, warn};
use rorm::fields::types::ForeignModelByField;
use rorm::{insert, query, update, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage, WsMessage};
use crate::engine;
use crate::engine::{DbStore, PlanBinding};
use crate::models::{AccountRole, TrainingPlan, TrainingPlanInsert};
use crate::server::handler::associations::utc;
use crate::server::handler::chats::ensure_chat_room;
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathUuid};

/// A single training plan
#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    pub(crate) uuid: Uuid,
    #[schema(example = "Hypertrophy block 1")]
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    /// The authoring trainer, cleared when its account was deleted
    pub(crate) trainer: Option<Uuid>,
    pub(crate) client: Uuid,
    pub(crate) is_active: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<TrainingPlan> for PlanResponse {
    fn from(plan: TrainingPlan) -> Self {
        Self {
            uuid: plan.uuid,
            name: plan.name,
            description: plan.description,
            trainer: plan.trainer.map(|fm| *fm.key()),
            client: *plan.client.key(),
            is_active: plan.is_active,
            created_at: utc(plan.created_at),
        }
    }
}

/// The response to a list of plans
#[derive(Serialize, ToSchema)]
pub struct GetPlansResponse {
    pub(crate) plans: Vec<PlanResponse>,
}

/// The request to create a new plan
#[derive(Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    /// The client the plan is written for
    pub(crate) client_uuid: Uuid,
    #[schema(example = "Hypertrophy block 1")]
    pub(crate) name: String,
    pub(crate) description: Option<String>,
}

/// Create a new plan for a client
///
/// Only validated trainers may create plans. An unbound client gets bound
/// to the executing trainer and is notified via websocket; creating a plan
/// for another trainer's client is rejected.
#[utoipa::path(
    tag = "Plans",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The created plan", body = PlanResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreatePlanRequest,
    security(("session_cookie" = []))
)]
#[post("/plans")]
pub async fn create_plan(
    req: Json<CreatePlanRequest>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<PlanResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.name.is_empty() {
        return Err(ApiError::InvalidName);
    }

    let store = DbStore::new(db.as_ref().clone());
    let binding = engine::bind_for_plan(&store, uuid, req.client_uuid).await?;

    let plan = insert!(db.as_ref(), TrainingPlanInsert)
        .single(&TrainingPlanInsert {
            uuid: Uuid::new_v4(),
            name: req.name.clone(),
            description: req.description.clone(),
            trainer: Some(ForeignModelByField::Key(uuid)),
            client: ForeignModelByField::Key(req.client_uuid),
            is_active: true,
        })
        .await?;

    let plan = query!(db.as_ref(), TrainingPlan)
        .condition(TrainingPlan::F.uuid.equals(plan.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InternalServerError)?;

    if binding == PlanBinding::AutoBound {
        if let Err(err) = ensure_chat_room(db.as_ref(), uuid, req.client_uuid).await {
            warn!("Could not open chat room: {err}");
        }

        if let Some(trainer) = AccountResponse::query(db.as_ref(), uuid).await? {
            if let Err(err) = ws_manager_chan
                .send(WsManagerMessage::SendMessage(
                    req.client_uuid,
                    WsMessage::TrainerAssigned { trainer },
                ))
                .await
            {
                error!("Could not send to ws manager chan: {err}");
            }
        }
    }

    Ok(Json(plan.into()))
}

/// Retrieve all plans visible to the executing account
///
/// Clients see the plans written for them, trainers the plans they
/// authored and admins every plan.
#[utoipa::path(
    tag = "Plans",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The visible plans", body = GetPlansResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/plans")]
pub async fn get_plans(db: Data<Database>, session: Session) -> ApiResult<Json<GetPlansResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;
    let role: AccountRole = session.get("role")?.ok_or(ApiError::SessionCorrupt)?;

    let plans = match role {
        AccountRole::Client => {
            query!(db.as_ref(), TrainingPlan)
                .condition(TrainingPlan::F.client.equals(uuid.as_ref()))
                .all()
                .await?
        }
        AccountRole::Trainer => {
            query!(db.as_ref(), TrainingPlan)
                .condition(TrainingPlan::F.trainer.equals(uuid.as_ref()))
                .all()
                .await?
        }
        AccountRole::Admin => query!(db.as_ref(), TrainingPlan).all().await?,
    };

    Ok(Json(GetPlansResponse {
        plans: plans.into_iter().map(Into::into).collect(),
    }))
}

fn may_access(plan: &TrainingPlan, uuid: Uuid, role: AccountRole) -> bool {
    match role {
        AccountRole::Client => *plan.client.key() == uuid,
        AccountRole::Trainer => plan.trainer.as_ref().map(|fm| *fm.key()) == Some(uuid),
        AccountRole::Admin => true,
    }
}

/// Retrieve a single plan
#[utoipa::path(
    tag = "Plans",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The requested plan", body = PlanResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/plans/{uuid}")]
pub async fn get_plan(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<PlanResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;
    let role: AccountRole = session.get("role")?.ok_or(ApiError::SessionCorrupt)?;

    let plan = query!(db.as_ref(), TrainingPlan)
        .condition(TrainingPlan::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    if !may_access(&plan, uuid, role) {
        return Err(ApiError::MissingPrivileges);
    }

    Ok(Json(plan.into()))
}

/// The request to update a plan
///
/// All parameter are optional, but at least one of them is required.
#[derive(Deserialize, ToSchema)]
pub struct UpdatePlanRequest {
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
}

/// Update name or description of a plan
///
/// Only the authoring trainer may update a plan.
#[utoipa::path(
    tag = "Plans",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The plan got updated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = UpdatePlanRequest,
    security(("session_cookie" = []))
)]
#[put("/plans/{uuid}")]
pub async fn update_plan(
    path: Path<PathUuid>,
    req: Json<UpdatePlanRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if let Some(name) = &req.name {
        if name.is_empty() {
            return Err(ApiError::InvalidName);
        }
    }

    let mut tx = db.start_transaction().await?;

    let plan = query!(&mut tx, TrainingPlan)
        .condition(TrainingPlan::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    if plan.trainer.as_ref().map(|fm| *fm.key()) != Some(uuid) {
        return Err(ApiError::MissingPrivileges);
    }

    update!(&mut tx, TrainingPlan)
        .condition(TrainingPlan::F.uuid.equals(path.uuid))
        .begin_dyn_set()
        .set_if(TrainingPlan::F.name, req.name.clone())
        .set_if(TrainingPlan::F.description, req.description.clone().map(Some))
        .finish_dyn_set()
        .map_err(|_| ApiError::EmptyJson)?
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Archive a plan
///
/// Archived plans stay queryable but can no longer be logged against.
/// Only the authoring trainer may archive a plan.
#[utoipa::path(
    tag = "Plans",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The plan got archived"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[post("/plans/{uuid}/archive")]
pub async fn archive_plan(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let plan = query!(&mut tx, TrainingPlan)
        .condition(TrainingPlan::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    if plan.trainer.as_ref().map(|fm| *fm.key()) != Some(uuid) {
        return Err(ApiError::MissingPrivileges);
    }

    update!(&mut tx, TrainingPlan)
        .condition(TrainingPlan::F.uuid.equals(path.uuid))
        .set(TrainingPlan::F.is_active, false)
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}
