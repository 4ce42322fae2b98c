//! All handlers for the account endpoints live in here

use actix_toolbox::tb_middleware::Session;
use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};
use argon2::password_hash::{Error, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use log::error;
use rand::thread_rng;
use rorm::{insert, query, update, Database, FieldAccess, Model};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chan::{WsManagerChan, WsManagerMessage};
use crate::engine;
use crate::engine::DbStore;
use crate::models::{Account, AccountInsert, AccountRole, Coaching};
use crate::server::handler::{ApiError, ApiErrorResponse, ApiResult, PathUuid};

/// The content to register a new account
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccountRegistrationRequest {
    #[schema(example = "user123")]
    username: String,
    #[schema(example = "Herbert")]
    display_name: String,
    #[schema(example = "super-secure-password")]
    password: String,
    /// Whether to register as client or trainer.
    ///
    /// Admins can not be registered through the API.
    role: RegistrationRole,
}

/// The roles that can be registered through the API
#[derive(Debug, Copy, Clone, Deserialize, ToSchema)]
pub enum RegistrationRole {
    /// Register as client
    Client,
    /// Register as trainer
    Trainer,
}

/// Register a new account
///
/// Clients start validated, trainers have to be validated by an admin
/// before they can be associated with clients.
#[utoipa::path(
    tag = "Accounts",
    responses(
        (status = 200, description = "Account got created"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = AccountRegistrationRequest,
)]
#[post("/api/v1/accounts/register")]
pub async fn register_account(
    req: Json<AccountRegistrationRequest>,
    db: Data<Database>,
) -> ApiResult<HttpResponse> {
    let mut tx = db.start_transaction().await?;

    if req.username.is_empty() {
        return Err(ApiError::InvalidUsername);
    }

    if req.display_name.is_empty() {
        return Err(ApiError::InvalidDisplayName);
    }

    if req.password.is_empty() {
        return Err(ApiError::InvalidPassword);
    }

    if query!(&mut tx, (Account::F.uuid,))
        .condition(Account::F.username.equals(&req.username))
        .optional()
        .await?
        .is_some()
    {
        return Err(ApiError::UsernameAlreadyOccupied);
    }

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)?
        .to_string();

    let (role, is_validated) = match req.role {
        RegistrationRole::Client => (AccountRole::Client, true),
        RegistrationRole::Trainer => (AccountRole::Trainer, false),
    };

    insert!(&mut tx, AccountInsert)
        .single(&AccountInsert {
            uuid: Uuid::new_v4(),
            username: req.username.clone(),
            display_name: req.display_name.clone(),
            password_hash,
            role,
            is_validated,
            last_login: None,
        })
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// The account data
#[derive(Serialize, Deserialize, ToSchema, Eq, Ord, PartialOrd, PartialEq, Clone, Debug)]
pub struct AccountResponse {
    pub(crate) uuid: Uuid,
    #[schema(example = "user123")]
    pub(crate) username: String,
    #[schema(example = "Herbert")]
    pub(crate) display_name: String,
}

impl AccountResponse {
    /// Query the response data for a single account
    pub(crate) async fn query(
        db: &Database,
        uuid: Uuid,
    ) -> Result<Option<AccountResponse>, rorm::Error> {
        Ok(query!(db, (
            Account::F.uuid,
            Account::F.username,
            Account::F.display_name,
        ))
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .map(|(uuid, username, display_name)| AccountResponse {
            uuid,
            username,
            display_name,
        }))
    }
}

/// The full account data of the executing user
#[derive(Serialize, ToSchema)]
pub struct FullAccountResponse {
    pub(crate) uuid: Uuid,
    #[schema(example = "user123")]
    pub(crate) username: String,
    #[schema(example = "Herbert")]
    pub(crate) display_name: String,
    pub(crate) role: AccountRole,
    pub(crate) is_validated: bool,
    /// The coaching trainer, only ever set for clients
    pub(crate) trainer: Option<AccountResponse>,
}

/// Returns the account that is currently logged-in
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the account data of the current user", body = FullAccountResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[get("/accounts/me")]
pub async fn get_me(db: Data<Database>, session: Session) -> ApiResult<Json<FullAccountResponse>> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    let account = query!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    let trainer = query!(
        &mut tx,
        (
            Coaching::F.trainer.uuid,
            Coaching::F.trainer.username,
            Coaching::F.trainer.display_name,
        )
    )
    .condition(Coaching::F.client.equals(uuid.as_ref()))
    .optional()
    .await?;

    tx.commit().await?;

    Ok(Json(FullAccountResponse {
        uuid: account.uuid,
        username: account.username,
        display_name: account.display_name,
        role: account.role,
        is_validated: account.is_validated,
        trainer: trainer.map(|(uuid, username, display_name)| AccountResponse {
            uuid,
            username,
            display_name,
        }),
    }))
}

/// Deletes the currently logged-in account
///
/// Deleting a trainer runs the full cascade: its clients are orphaned,
/// its active plans deactivated and all requests naming it removed.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Deleted the currently logged-in account"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    security(("session_cookie" = []))
)]
#[delete("/accounts/me")]
pub async fn delete_me(
    db: Data<Database>,
    session: Session,
    ws_manager_chan: Data<WsManagerChan>,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let account = query!(db.as_ref(), Account)
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    let store = DbStore::new(db.as_ref().clone());

    match account.role {
        AccountRole::Client => engine::delete_client(&store, uuid).await?,
        AccountRole::Trainer => {
            engine::delete_trainer(&store, uuid, uuid).await?;
        }
        AccountRole::Admin => {
            rorm::delete!(db.as_ref(), Account)
                .condition(Account::F.uuid.equals(uuid))
                .await?;
        }
    }

    // Clear the current session
    session.purge();

    // Close open websocket connections
    if let Err(err) = ws_manager_chan
        .send(WsManagerMessage::CloseSocket(uuid))
        .await
    {
        error!("Could not send to ws manager chan: {err}");
    }

    Ok(HttpResponse::Ok().finish())
}

/// The set password request data
///
/// The parameter `new_password` must not be empty
#[derive(Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    #[schema(example = "super-secure-password")]
    old_password: String,
    #[schema(example = "ultra-secure-password!!11!")]
    new_password: String,
}

/// Sets a new password for the currently logged-in account
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "New password has been set"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = SetPasswordRequest,
    security(("session_cookie" = []))
)]
#[post("/accounts/me/setPassword")]
pub async fn set_password(
    req: Json<SetPasswordRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    if req.new_password.is_empty() {
        return Err(ApiError::InvalidPassword);
    }

    let mut tx = db.start_transaction().await?;

    let (pw_hash,) = query!(&mut tx, (Account::F.password_hash,))
        .condition(Account::F.uuid.equals(uuid))
        .optional()
        .await?
        .ok_or(ApiError::SessionCorrupt)?;

    Argon2::default()
        .verify_password(req.old_password.as_bytes(), &PasswordHash::new(&pw_hash)?)
        .map_err(|e| match e {
            Error::Password => ApiError::LoginFailed,
            _ => ApiError::InvalidHash(e),
        })?;

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.new_password.as_bytes(), &salt)?
        .to_string();

    update!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .set(Account::F.password_hash, password_hash)
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Update account request data
///
/// All parameter are optional, but at least one of them is required.
#[derive(Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    #[schema(example = "user321")]
    username: Option<String>,
    #[schema(example = "Heeeerbeeeert")]
    display_name: Option<String>,
}

/// Updates the currently logged-in account
///
/// All parameter are optional, but at least one of them is required.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Account has been updated"),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = UpdateAccountRequest,
    security(("session_cookie" = []))
)]
#[put("/accounts/me")]
pub async fn update_me(
    req: Json<UpdateAccountRequest>,
    db: Data<Database>,
    session: Session,
) -> ApiResult<HttpResponse> {
    let uuid: Uuid = session.get("uuid")?.ok_or(ApiError::SessionCorrupt)?;

    let mut tx = db.start_transaction().await?;

    if let Some(username) = &req.username {
        if username.is_empty() {
            return Err(ApiError::InvalidUsername);
        }

        if query!(&mut tx, (Account::F.uuid,))
            .condition(Account::F.username.equals(username))
            .optional()
            .await?
            .is_some()
        {
            return Err(ApiError::UsernameAlreadyOccupied);
        }
    }

    if let Some(display_name) = &req.display_name {
        if display_name.is_empty() {
            return Err(ApiError::InvalidDisplayName);
        }
    }

    update!(&mut tx, Account)
        .condition(Account::F.uuid.equals(uuid))
        .begin_dyn_set()
        .set_if(Account::F.username, req.username.clone())
        .set_if(Account::F.display_name, req.display_name.clone())
        .finish_dyn_set()
        .map_err(|_| ApiError::EmptyJson)?
        .exec()
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().finish())
}

/// Retrieve details for an account by uuid
///
/// As usernames are changeable, accounts are identified by uuids, which are used throughout
/// the API.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the requested account data", body = AccountResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    params(PathUuid),
    security(("session_cookie" = [])))]
#[get("/accounts/{uuid}")]
pub async fn lookup_account_by_uuid(
    req: Path<PathUuid>,
    db: Data<Database>,
) -> ApiResult<Json<AccountResponse>> {
    let account = query!(db.as_ref(), Account)
        .condition(Account::F.uuid.equals(req.uuid))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUuid)?;

    Ok(Json(AccountResponse {
        uuid: account.uuid,
        username: account.username,
        display_name: account.display_name,
    }))
}

/// The request to lookup an account by its username
#[derive(Deserialize, ToSchema)]
pub struct LookupAccountUsernameRequest {
    username: String,
}

/// Retrieve details for an account by its username
///
/// Usernames can be changed, so convert them to uuids with this endpoint
/// instead of caching them.
#[utoipa::path(
    tag = "Accounts",
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Returns the requested account data", body = AccountResponse),
        (status = 400, description = "Client error", body = ApiErrorResponse),
        (status = 500, description = "Server error", body = ApiErrorResponse),
    ),
    request_body = LookupAccountUsernameRequest,
    security(("session_cookie" = []))
)]
#[post("/accounts/lookup")]
pub async fn lookup_account_by_username(
    req: Json<LookupAccountUsernameRequest>,
    db: Data<Database>,
) -> ApiResult<Json<AccountResponse>> {
    let account = query!(db.as_ref(), Account)
        .condition(Account::F.username.equals(&req.username))
        .optional()
        .await?
        .ok_or(ApiError::InvalidUsername)?;

    Ok(Json(AccountResponse {
        uuid: account.uuid,
        username: account.username,
        display_name: account.display_name,
    }))
}
