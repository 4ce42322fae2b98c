//! Handlers for the association request flow and the request ledger

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, put};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{error, warn};
use rorm::Database;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage, WsMessage};
use crate::engine;
use crate::engine::{DbStore, RequestRecord};
use crate::models::{RequestKind, RequestStatus};
use crate::server::handler::chats::ensure_chat_room;
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathUuid};

/// A single entry of the request ledger
#[derive(Serialize, ToSchema)]
pub struct RelationshipRequestResponse {
    pub(crate) uuid: Uuid,
    pub(crate) kind: RequestKind,
    /// The requesting client
    pub(crate) client: Uuid,
    /// The client's trainer at creation time, if any
    pub(crate) current_trainer: Option<Uuid>,
    /// The desired trainer
    pub(crate) target_trainer: Uuid,
    #[schema(example = "I want to focus on strength training")]
    pub(crate) reason: String,
    pub(crate) status: RequestStatus,
    pub(crate) decided_by: Option<Uuid>,
    pub(crate) decided_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
}

/// The response to a list of requests
#[derive(Serialize, ToSchema)]
pub struct GetRequestsResponse {
    pub(crate) requests: Vec<RelationshipRequestResponse>,
}

pub(crate) fn utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

impl From<RequestRecord> for RelationshipRequestResponse {
    fn from(record: RequestRecord) -> Self {
        Self {
            uuid: record.uuid,
            kind: record.kind,
            client: record.client,
            current_trainer: record.current_trainer,
            target_trainer: record.target_trainer,
            reason: record.reason,
            status: record.status,
            decided_by: record.decided_by,
            decided_at: record.decided_at.map(utc),
            created_at: utc(record.created_at),
        }
    }
}

/// The request to ask a trainer for coaching
#[derive(Deserialize, ToSchema)]
pub struct CreateAssociationRequest {
    /// The desired trainer
    pub(crate) trainer_uuid: Uuid,
    /// Why the client wants this trainer, must not be empty
    #[schema(example = "I want to focus on strength training")]
    pub(crate) reason: String,
}

/// Ask a trainer for coaching
///
/// The executing client must not be coached yet. Nothing is bound until
/// the trainer accepts. The targeted trainer is notified via websocket.
#[utoipa::path(
    tag = "Associations",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The created request", body = RelationshipRequestResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreateAssociationRequest,
    security(("session_cookie" = []))
)]
#[post("/associations")]
pub async fn create_association_request(
    req: Json<CreateAssociationRequest>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<RelationshipRequestResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let store = DbStore::new(db.as_ref().clone());
    let record = engine::request_association(&store, uuid, req.trainer_uuid, &req.reason).await?;

    // Notify the targeted trainer
    if let Some(from) = AccountResponse::query(db.as_ref(), uuid).await? {
        if let Err(err) = ws_manager_chan
            .send(WsManagerMessage::SendMessage(
                record.target_trainer,
                WsMessage::IncomingAssociationRequest {
                    request_uuid: record.uuid,
                    from,
                    reason: record.reason.clone(),
                },
            ))
            .await
        {
            error!("Could not send to ws manager chan: {err}");
        }
    }

    Ok(Json(record.into()))
}

/// The decision for an association request
#[derive(Deserialize, ToSchema)]
pub struct DecideAssociationRequest {
    /// True accepts the request, false rejects it
    pub(crate) accept: bool,
}

/// Accept or reject an association request
///
/// Only the targeted trainer may decide. On accept the client gets bound
/// to the trainer and a chat room between the two is opened. The client is
/// notified of the decision via websocket.
#[utoipa::path(
    tag = "Associations",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The decided request", body = RelationshipRequestResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = DecideAssociationRequest,
    security(("session_cookie" = []))
)]
#[put("/associations/{uuid}")]
pub async fn decide_association_request(
    path: Path<PathUuid>,
    req: Json<DecideAssociationRequest>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<RelationshipRequestResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let store = DbStore::new(db.as_ref().clone());
    let record = engine::decide_association(&store, path.uuid, uuid, req.accept).await?;

    if record.status == RequestStatus::Approved {
        if let Err(err) = ensure_chat_room(db.as_ref(), record.target_trainer, record.client).await
        {
            warn!("Could not open chat room: {err}");
        }
    }

    if let Some(trainer) = AccountResponse::query(db.as_ref(), record.target_trainer).await? {
        if let Err(err) = ws_manager_chan
            .send(WsManagerMessage::SendMessage(
                record.client,
                WsMessage::AssociationDecided {
                    request_uuid: record.uuid,
                    trainer,
                    accepted: record.status == RequestStatus::Approved,
                },
            ))
            .await
        {
            error!("Could not send to ws manager chan: {err}");
        }
    }

    Ok(Json(record.into()))
}

/// Retrieve the request ledger, scoped to the executing account
///
/// Clients see their own requests, trainers the requests targeting them
/// and admins all requests.
#[utoipa::path(
    tag = "Associations",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The visible requests", body = GetRequestsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/requests")]
pub async fn get_requests(
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetRequestsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let store = DbStore::new(db.as_ref().clone());
    let requests = engine::list_requests(&store, uuid).await?;

    Ok(Json(GetRequestsResponse {
        requests: requests.into_iter().map(Into::into).collect(),
    }))
}

/// Retrieve a single request by uuid
#[utoipa::path(
    tag = "Associations",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The requested request", body = RelationshipRequestResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/requests/{uuid}")]
pub async fn get_request(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<RelationshipRequestResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let store = DbStore::new(db.as_ref().clone());
    let requests = engine::list_requests(&store, uuid).await?;

    let record = requests
        .into_iter()
        .find(|r| r.uuid == path.uuid)
        .ok_or(ApiError::InvalidUuid)?;

    Ok(Json(record.into()))
}
