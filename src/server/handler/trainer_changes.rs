//! Handlers for the trainer change flow

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{post, put};
use log::{error, warn};
use rorm::{query, Database, FieldAccess, Model};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage, WsMessage};
use crate::engine;
use crate::engine::DbStore;
use crate::models::{Account, AccountRole, RequestStatus};
use crate::server::handler::chats::ensure_chat_room;
use crate::server::handler::{
    AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathUuid, RelationshipRequestResponse,
};

/// The request to be moved to another trainer
#[derive(Deserialize, ToSchema)]
pub struct CreateTrainerChangeRequest {
    /// The desired new trainer
    pub(crate) new_trainer_uuid: Uuid,
    /// Why the client wants to change, must not be empty
    #[schema(example = "My schedule no longer matches")]
    pub(crate) reason: String,
}

/// Ask to be moved to another trainer
///
/// The executing client must currently be coached. The request is decided
/// by an admin, not by either trainer. All admins are notified via
/// websocket.
#[utoipa::path(
    tag = "TrainerChanges",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The created request", body = RelationshipRequestResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = CreateTrainerChangeRequest,
    security(("session_cookie" = []))
)]
#[post("/trainerChanges")]
pub async fn create_trainer_change_request(
    req: Json<CreateTrainerChangeRequest>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<RelationshipRequestResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let store = DbStore::new(db.as_ref().clone());
    let record =
        engine::request_trainer_change(&store, uuid, req.new_trainer_uuid, &req.reason).await?;

    let client = AccountResponse::query(db.as_ref(), record.client).await?;
    let target = AccountResponse::query(db.as_ref(), record.target_trainer).await?;

    if let (Some(client), Some(target_trainer)) = (client, target) {
        let admins = query!(db.as_ref(), (Account::F.uuid,))
            .condition(Account::F.role.equals(AccountRole::Admin))
            .all()
            .await?;

        for (admin,) in admins {
            if let Err(err) = ws_manager_chan
                .send(WsManagerMessage::SendMessage(
                    admin,
                    WsMessage::IncomingTrainerChangeRequest {
                        request_uuid: record.uuid,
                        client: client.clone(),
                        target_trainer: target_trainer.clone(),
                    },
                ))
                .await
            {
                error!("Could not send to ws manager chan: {err}");
            }
        }
    }

    Ok(Json(record.into()))
}

/// The decision for a trainer change request
#[derive(Deserialize, ToSchema)]
pub struct DecideTrainerChangeRequest {
    /// True approves the request, false rejects it
    pub(crate) accept: bool,
}

/// Approve or reject a trainer change request. Admin only.
///
/// On approval the client is rebound to the requested trainer and a chat
/// room with the new trainer is opened. The client is notified of the
/// decision via websocket.
#[utoipa::path(
    tag = "TrainerChanges",
    context_path = "/api/v1/admin",
    responses(
        (status = 200, description = "The decided request", body = RelationshipRequestResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = DecideTrainerChangeRequest,
    security(("session_cookie" = []))
)]
#[put("/trainerChanges/{uuid}")]
pub async fn decide_trainer_change_request(
    path: Path<PathUuid>,
    req: Json<DecideTrainerChangeRequest>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<RelationshipRequestResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let store = DbStore::new(db.as_ref().clone());
    let record = engine::decide_trainer_change(&store, path.uuid, uuid, req.accept).await?;

    let accepted = record.status == RequestStatus::Approved;

    if accepted {
        if let Err(err) = ensure_chat_room(db.as_ref(), record.target_trainer, record.client).await
        {
            warn!("Could not open chat room: {err}");
        }
    }

    let new_trainer = if accepted {
        AccountResponse::query(db.as_ref(), record.target_trainer).await?
    } else {
        None
    };

    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::SendMessage(
            record.client,
            WsMessage::TrainerChangeDecided {
                request_uuid: record.uuid,
                accepted,
                new_trainer,
            },
        ))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    Ok(Json(record.into()))
}
