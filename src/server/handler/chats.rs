//! Handlers for the chat between a coaching pair

use std::cmp::Ordering;

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{get, post};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::error;
use rorm::fields::types::ForeignModelByField;
use rorm::{and, insert, or, query, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage, WsMessage};
use crate::models::{ChatRoom, ChatRoomInsert, ChatRoomMessage, ChatRoomMessageInsert};
use crate::server::handler::associations::utc;
use crate::server::handler::{AccountResponse, ApiError, ApiErrorResponse, ApiResult, PathUuid};

/// The message of a chatroom
///
/// The parameter `uuid` should be used to uniquely identify a message
#[derive(Serialize, ToSchema, Eq, Deserialize, Clone, Debug)]
pub struct ChatMessage {
    pub(crate) uuid: Uuid,
    pub(crate) sender: AccountResponse,
    #[schema(example = "Hello there!")]
    pub(crate) message: String,
    pub(crate) created_at: DateTime<Utc>,
}

impl Ord for ChatMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created_at.cmp(&other.created_at)
    }
}

impl PartialOrd for ChatMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ChatMessage {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

/// Open the chat room of a coaching pair if it does not exist yet.
///
/// Rooms survive the end of the coaching so the history stays readable.
pub(crate) async fn ensure_chat_room(
    db: &Database,
    trainer: Uuid,
    client: Uuid,
) -> Result<Uuid, rorm::Error> {
    let mut tx = db.start_transaction().await?;

    if let Some((uuid,)) = query!(&mut tx, (ChatRoom::F.uuid,))
        .condition(and!(
            ChatRoom::F.trainer.equals(trainer.as_ref()),
            ChatRoom::F.client.equals(client.as_ref())
        ))
        .optional()
        .await?
    {
        tx.commit().await?;
        return Ok(uuid);
    }

    let room = insert!(&mut tx, ChatRoomInsert)
        .single(&ChatRoomInsert {
            uuid: Uuid::new_v4(),
            trainer: ForeignModelByField::Key(trainer),
            client: ForeignModelByField::Key(client),
        })
        .await?;

    tx.commit().await?;

    Ok(room.uuid)
}

/// A single chat room, without its messages
#[derive(Serialize, ToSchema)]
pub struct ChatRoomResponse {
    pub(crate) uuid: Uuid,
    pub(crate) trainer: AccountResponse,
    pub(crate) client: AccountResponse,
    /// Whether the other side of the room currently has a websocket open
    pub(crate) partner_online: bool,
}

/// All chat rooms the executing account takes part in
#[derive(Serialize, ToSchema)]
pub struct GetAllChatsResponse {
    pub(crate) chat_rooms: Vec<ChatRoomResponse>,
}

/// Retrieve all chats the executing account has access to
#[utoipa::path(
    tag = "Chats",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns all chat rooms of the current user", body = GetAllChatsResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/chats")]
pub async fn get_all_chats(
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<GetAllChatsResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let rooms = query!(
        db.as_ref(),
        (
            ChatRoom::F.uuid,
            ChatRoom::F.trainer.uuid,
            ChatRoom::F.trainer.username,
            ChatRoom::F.trainer.display_name,
            ChatRoom::F.client.uuid,
            ChatRoom::F.client.username,
            ChatRoom::F.client.display_name,
        )
    )
    .condition(or!(
        ChatRoom::F.trainer.equals(uuid.as_ref()),
        ChatRoom::F.client.equals(uuid.as_ref())
    ))
    .all()
    .await?;

    let partners = rooms
        .iter()
        .map(|(_, t_uuid, _, _, c_uuid, _, _)| if *t_uuid == uuid { *c_uuid } else { *t_uuid })
        .collect();

    let (cb_tx, cb_rx) = oneshot::channel();
    ws_manager_chan
        .send(WsManagerMessage::RetrieveOnlineState(partners, cb_tx))
        .await
        .map_err(|_| ApiError::InternalServerError)?;
    let online = cb_rx.await.map_err(|_| ApiError::InternalServerError)?;

    Ok(Json(GetAllChatsResponse {
        chat_rooms: rooms
            .into_iter()
            .zip(online)
            .map(
                |(
                    (uuid, t_uuid, t_username, t_display_name, c_uuid, c_username, c_display_name),
                    partner_online,
                )| {
                    ChatRoomResponse {
                        uuid,
                        trainer: AccountResponse {
                            uuid: t_uuid,
                            username: t_username,
                            display_name: t_display_name,
                        },
                        client: AccountResponse {
                            uuid: c_uuid,
                            username: c_username,
                            display_name: c_display_name,
                        },
                        partner_online,
                    }
                },
            )
            .collect(),
    }))
}

/// The response to a get chat
///
/// `messages` is sorted by `message.created_at`.
#[derive(Serialize, ToSchema)]
pub struct GetChatResponse {
    pub(crate) trainer: AccountResponse,
    pub(crate) client: AccountResponse,
    pub(crate) messages: Vec<ChatMessage>,
}

/// Retrieve the messages of a chatroom
///
/// `messages` is sorted by `message.created_at` and `message.uuid` should
/// be used to uniquely identify chat messages. This is needed as new
/// messages are delivered via websocket.
#[utoipa::path(
    tag = "Chats",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the messages of the chat room", body = GetChatResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = []))
)]
#[get("/chats/{uuid}")]
pub async fn get_chat(
    path: Path<PathUuid>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<Json<GetChatResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let room = query!(
        &mut tx,
        (
            ChatRoom::F.trainer.uuid,
            ChatRoom::F.trainer.username,
            ChatRoom::F.trainer.display_name,
            ChatRoom::F.client.uuid,
            ChatRoom::F.client.username,
            ChatRoom::F.client.display_name,
        )
    )
    .condition(ChatRoom::F.uuid.equals(path.uuid))
    .optional()
    .await?
    .ok_or(ApiError::InvalidUuid)?;

    let (t_uuid, t_username, t_display_name, c_uuid, c_username, c_display_name) = room;

    if uuid != t_uuid && uuid != c_uuid {
        return Err(ApiError::MissingPrivileges);
    }

    let messages = query!(
        &mut tx,
        (
            ChatRoomMessage::F.uuid,
            ChatRoomMessage::F.message,
            ChatRoomMessage::F.created_at,
            ChatRoomMessage::F.sender.uuid,
            ChatRoomMessage::F.sender.username,
            ChatRoomMessage::F.sender.display_name,
        )
    )
    .condition(ChatRoomMessage::F.chat_room.equals(path.uuid.as_ref()))
    .all()
    .await?;

    tx.commit().await?;

    Ok(Json(GetChatResponse {
        trainer: AccountResponse {
            uuid: t_uuid,
            username: t_username,
            display_name: t_display_name,
        },
        client: AccountResponse {
            uuid: c_uuid,
            username: c_username,
            display_name: c_display_name,
        },
        messages: messages
            .into_iter()
            .map(
                |(uuid, message, created_at, s_uuid, s_username, s_display_name)| ChatMessage {
                    uuid,
                    message,
                    created_at: utc(created_at),
                    sender: AccountResponse {
                        uuid: s_uuid,
                        username: s_username,
                        display_name: s_display_name,
                    },
                },
            )
            .sorted()
            .collect(),
    }))
}

/// The request to send a message
#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    #[schema(example = "Hello there!")]
    pub(crate) message: String,
}

/// Send a message to a chatroom
///
/// The other side of the room is notified via websocket.
#[utoipa::path(
    tag = "Chats",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "The sent message", body = ChatMessage),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    request_body = SendMessageRequest,
    security(("session_cookie" = []))
)]
#[post("/chats/{uuid}")]
pub async fn send_message(
    path: Path<PathUuid>,
    req: Json<SendMessageRequest>,
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<Json<ChatMessage>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.message.is_empty() {
        return Err(ApiError::EmptyJson);
    }

    let mut tx = db.start_transaction().await?;

    let (t_uuid, c_uuid) = query!(&mut tx, (ChatRoom::F.trainer, ChatRoom::F.client))
        .condition(ChatRoom::F.uuid.equals(path.uuid))
        .optional()
        .await?
        .map(|(t, c)| (*t.key(), *c.key()))
        .ok_or(ApiError::InvalidUuid)?;

    if uuid != t_uuid && uuid != c_uuid {
        return Err(ApiError::MissingPrivileges);
    }

    let message = insert!(&mut tx, ChatRoomMessageInsert)
        .single(&ChatRoomMessageInsert {
            uuid: Uuid::new_v4(),
            chat_room: ForeignModelByField::Key(path.uuid),
            sender: ForeignModelByField::Key(uuid),
            message: req.message.clone(),
        })
        .await?;

    let message = query!(&mut tx, ChatRoomMessage)
        .condition(ChatRoomMessage::F.uuid.equals(message.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InternalServerError)?;

    tx.commit().await?;

    let sender = AccountResponse::query(db.as_ref(), uuid)
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    let chat_message = ChatMessage {
        uuid: message.uuid,
        sender,
        message: message.message,
        created_at: utc(message.created_at),
    };

    let receiver = if uuid == t_uuid { c_uuid } else { t_uuid };
    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::SendMessage(
            receiver,
            WsMessage::IncomingChatMessage {
                chat_room_uuid: path.uuid,
                message: chat_message.clone(),
            },
        ))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    Ok(Json(chat_message))
}
