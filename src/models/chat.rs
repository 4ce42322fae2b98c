use rorm::fields::types::{BackRef, ForeignModel};
use rorm::{field, Model, Patch};
use uuid::Uuid;

use crate::models::Account;

/// This represents a chatroom in the database.
///
/// A room belongs to one coaching pair and is created lazily when the
/// binding between trainer and client forms.
#[derive(Model)]
pub struct ChatRoom {
    /// The primary key of a chat
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The trainer side of the conversation
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub trainer: ForeignModel<Account>,

    /// The client side of the conversation
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub client: ForeignModel<Account>,

    /// A backref to the messages of this chatroom
    pub messages: BackRef<field!(ChatRoomMessage::F.chat_room)>,

    /// The point in time the room was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "ChatRoom")]
pub(crate) struct ChatRoomInsert {
    pub(crate) uuid: Uuid,
    pub(crate) trainer: ForeignModel<Account>,
    pub(crate) client: ForeignModel<Account>,
}

/// A message of a chatroom
#[derive(Model)]
pub struct ChatRoomMessage {
    /// The primary key of a chatroom message
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The account that send the message
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub sender: ForeignModel<Account>,

    /// The relation to the chat room
    #[rorm(on_update = "Cascade", on_delete = "Cascade")]
    pub chat_room: ForeignModel<ChatRoom>,

    /// The maximum length of a message
    #[rorm(max_length = 2048)]
    pub message: String,

    /// The timestamp when the message was received
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "ChatRoomMessage")]
pub(crate) struct ChatRoomMessageInsert {
    pub(crate) uuid: Uuid,
    pub(crate) chat_room: ForeignModel<ChatRoom>,
    pub(crate) sender: ForeignModel<Account>,
    pub(crate) message: String,
}
