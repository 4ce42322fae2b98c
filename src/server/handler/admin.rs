//! Handlers for administrative overrides

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, HttpResponse};
use log::error;
use rorm::{query, Database, FieldAccess, Model};
use serde::Serialize;
use tokio::sync::oneshot;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage, WsMessage};
use crate::engine;
use crate::engine::DbStore;
use crate::models::{Account, Coaching, RelationshipRequest, RequestStatus};
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathUuid};

/// Validate a trainer account
///
/// Only validated trainers can be targeted by association requests or
/// create plans. Validating an already validated trainer is an error.
#[utoipa::path(
    tag = "Admin",
    context_path = "/api/v1/admin",
    responses(
        (status = 200, description = "The trainer got validated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[post("/trainers/{uuid}/validate")]
pub async fn validate_trainer(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let store = DbStore::new(db.as_ref().clone());
    engine::validate_trainer(&store, uuid, path.uuid).await?;

    Ok(HttpResponse::Ok().finish())
}

/// What a trainer deletion touched
#[derive(Serialize, ToSchema)]
pub struct DeleteTrainerResponse {
    /// Clients whose trainer reference was cleared
    pub(crate) orphaned_clients: u64,
    /// Active plans that were deactivated
    pub(crate) deactivated_plans: u64,
    /// Requests naming the trainer that were deleted
    pub(crate) purged_requests: u64,
}

/// Delete a trainer account
///
/// Its clients are orphaned, its active plans deactivated and every
/// request naming the trainer is removed. The response reports what the
/// cascade touched.
#[utoipa::path(
    tag = "Admin",
    context_path = "/api/v1/admin",
    responses(
        (status = 200, description = "The cascade report", body = DeleteTrainerResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[delete("/trainers/{uuid}")]
pub async fn delete_trainer(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<DeleteTrainerResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    // Collected before the cascade clears the bindings
    let orphaned: Vec<Uuid> = query!(db.as_ref(), (Coaching::F.client,))
        .condition(Coaching::F.trainer.equals(path.uuid.as_ref()))
        .all()
        .await?
        .into_iter()
        .map(|(fm,)| *fm.key())
        .collect();

    let store = DbStore::new(db.as_ref().clone());
    let report = engine::delete_trainer(&store, uuid, path.uuid).await?;

    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::CloseSocket(path.uuid))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    for client in orphaned {
        if let Err(err) = ws_manager_chan
            .send(WsManagerMessage::SendMessage(
                client,
                WsMessage::AssociationRemoved { trainer: None },
            ))
            .await
        {
            error!("Could not send to ws manager chan: {err}");
        }
    }

    Ok(Json(DeleteTrainerResponse {
        orphaned_clients: report.orphaned_clients,
        deactivated_plans: report.deactivated_plans,
        purged_requests: report.purged_requests,
    }))
}

/// Force-remove the binding of a client
///
/// The client becomes unbound, the former trainer loses the client. The
/// client is notified via websocket.
#[utoipa::path(
    tag = "Admin",
    context_path = "/api/v1/admin",
    responses(
        (status = 200, description = "The association got removed"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[delete("/associations/{uuid}")]
pub async fn remove_association(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let former = query!(db.as_ref(), (Coaching::F.trainer,))
        .condition(Coaching::F.client.equals(path.uuid.as_ref()))
        .optional()
        .await?;

    let store = DbStore::new(db.as_ref().clone());
    engine::remove_association(&store, uuid, path.uuid).await?;

    let trainer = match former {
        Some((fm,)) => AccountResponse::query(db.as_ref(), *fm.key()).await?,
        None => None,
    };

    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::SendMessage(
            path.uuid,
            WsMessage::AssociationRemoved { trainer },
        ))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    Ok(HttpResponse::Ok().finish())
}

/// Operational counts of the running instance
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Number of registered accounts
    pub(crate) accounts: u64,
    /// Number of undecided relationship requests
    pub(crate) pending_requests: u64,
    /// Number of open websocket connections
    pub(crate) open_websockets: u64,
}

/// Retrieve operational counts of the running instance
#[utoipa::path(
    tag = "Admin",
    context_path = "/api/v1/admin",
    responses(
        (status = 200, description = "The current counts", body = HealthResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/health")]
pub async fn get_health(
    db: Data<Database>,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<HealthResponse>> {
    let mut tx = db.start_transaction().await?;

    let accounts = query!(&mut tx, (Account::F.uuid,)).all().await?.len() as u64;
    let pending_requests = query!(&mut tx, (RelationshipRequest::F.uuid,))
        .condition(RelationshipRequest::F.status.equals(RequestStatus::Pending))
        .all()
        .await?
        .len() as u64;

    tx.commit().await?;

    let (tx, rx) = oneshot::channel();
    ws_manager_chan
        .send(WsManagerMessage::RetrieveWsCount(tx))
        .await
        .map_err(|_| ApiError::InternalServerError)?;
    let open_websockets = rx.await.map_err(|_| ApiError::InternalServerError)?;

    Ok(Json(HealthResponse {
        accounts,
        pending_requests,
        open_websockets,
    }))
}
