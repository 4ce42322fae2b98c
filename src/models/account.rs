use rorm::{DbEnum, Model, Patch};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The role of an account.
///
/// The role is fixed at registration time, only admins are created
/// out of band (through the server configuration).
#[derive(DbEnum, Serialize, Deserialize, ToSchema, Copy, Clone, Debug, Eq, PartialEq)]
pub enum AccountRole {
    /// A client that gets coached by a trainer
    Client,
    /// A trainer that coaches clients
    Trainer,
    /// An administrator of the platform
    Admin,
}

/// A user account
#[derive(Model)]
pub struct Account {
    /// The primary key of a user.
    ///
    /// This will be a uuid.
    #[rorm(primary_key)]
    pub uuid: Uuid,

    /// The username of the user
    #[rorm(max_length = 255, unique)]
    pub username: String,

    /// The name that is displayed for this user
    #[rorm(max_length = 255)]
    pub display_name: String,

    /// The password hash of the user.
    #[rorm(max_length = 1024)]
    pub password_hash: String,

    /// The role of this account
    pub role: AccountRole,

    /// Whether the account has been validated.
    ///
    /// Clients start validated, trainers have to be validated by an admin
    /// before clients can be associated with them.
    pub is_validated: bool,

    /// The last time the user has logged in
    pub last_login: Option<chrono::NaiveDateTime>,

    /// The point in time the account was created
    #[rorm(auto_create_time)]
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Patch)]
#[rorm(model = "Account")]
pub(crate) struct AccountInsert {
    pub(crate) uuid: Uuid,
    pub(crate) username: String,
    pub(crate) display_name: String,
    pub(crate) password_hash: String,
    pub(crate) role: AccountRole,
    pub(crate) is_validated: bool,
    pub(crate) last_login: Option<chrono::NaiveDateTime>,
}
