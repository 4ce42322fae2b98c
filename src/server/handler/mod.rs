//! This module holds the handler of coachhub

use std::fmt::{Display, Formatter};

use actix_toolbox::tb_middleware::actix_session::{SessionGetError, SessionInsertError};
use actix_web::body::BoxBody;
use actix_web::HttpResponse;
use log::{debug, error, info, trace};
use serde::{Deserialize, Serialize};
use serde_repr::Serialize_repr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::engine::{EngineError, ErrorKind};

pub use crate::server::handler::accounts::*;
pub use crate::server::handler::admin::*;
pub use crate::server::handler::associations::*;
pub use crate::server::handler::auth::*;
pub use crate::server::handler::chats::*;
pub use crate::server::handler::plans::*;
pub use crate::server::handler::trainer_changes::*;
pub use crate::server::handler::version::*;
pub use crate::server::handler::websocket::*;
pub use crate::server::handler::workouts::*;

pub mod accounts;
pub mod admin;
pub mod associations;
pub mod auth;
pub mod chats;
pub mod plans;
pub mod trainer_changes;
pub mod version;
pub mod websocket;
pub mod workouts;

/// The result that is used throughout the complete api.
pub type ApiResult<T> = Result<T, ApiError>;

/// A uuid in a path
#[derive(Deserialize, IntoParams)]
pub struct PathUuid {
    /// The uuid
    pub(crate) uuid: Uuid,
}

#[derive(Serialize_repr, ToSchema)]
#[repr(u16)]
pub(crate) enum ApiStatusCode {
    Unauthenticated = 1000,
    LoginFailed = 1001,
    UsernameAlreadyOccupied = 1002,
    InvalidUsername = 1003,
    InvalidDisplayName = 1004,
    InvalidPassword = 1005,
    EmptyJson = 1006,
    InvalidUuid = 1007,
    MissingPrivileges = 1008,
    SessionCorrupt = 1009,
    InvalidName = 1010,

    ClientNotFound = 1100,
    TrainerNotFound = 1101,
    RequestNotFound = 1102,
    NotATrainer = 1103,
    NotAClient = 1104,
    TrainerNotValidated = 1105,
    AlreadyValidated = 1106,
    NotRequestTarget = 1107,
    AdminRequired = 1108,
    ForeignClient = 1109,
    ClientAlreadyBound = 1110,
    ClientNotBound = 1111,
    SameTrainer = 1112,
    PendingRequestExists = 1113,
    RequestAlreadyDecided = 1114,
    BindingRaceLost = 1115,
    EmptyReason = 1116,

    InternalServerError = 2000,
    DatabaseError = 2001,
    SessionError = 2002,
}

#[derive(Serialize, ToSchema)]
pub(crate) struct ApiErrorResponse {
    #[schema(example = "Error message is here")]
    message: String,
    #[schema(example = 1000)]
    status_code: ApiStatusCode,
}

impl ApiErrorResponse {
    pub(crate) fn new(status_code: ApiStatusCode, message: String) -> Self {
        Self {
            message,
            status_code,
        }
    }
}

/// This enum holds all possible error types that can occur in the API
#[derive(Debug)]
pub enum ApiError {
    /// The user is not allowed to access the resource
    Unauthenticated,
    /// Login was not successful. Can be caused by incorrect username / password
    LoginFailed,
    /// The username is already occupied
    UsernameAlreadyOccupied,
    /// The provided username is malformed
    InvalidUsername,
    /// The provided display name is malformed
    InvalidDisplayName,
    /// The provided password is malformed
    InvalidPassword,
    /// An update request without any fields to update
    EmptyJson,
    /// The provided uuid does not exist
    InvalidUuid,
    /// The executing user misses privileges for the operation
    MissingPrivileges,
    /// The session is in an invalid state
    SessionCorrupt,
    /// The provided name is malformed
    InvalidName,
    /// Unspecified internal error
    InternalServerError,
    /// All errors that are thrown by the database
    DatabaseError(rorm::Error),
    /// An invalid hash is retrieved from the database
    InvalidHash(argon2::password_hash::Error),
    /// An error occurred while retrieving data from the session
    SessionGet(SessionGetError),
    /// An error occurred while writing data to the session
    SessionInsert(SessionInsertError),
    /// A typed failure of the relationship engine
    Engine(EngineError),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthenticated => write!(f, "Unauthenticated"),
            ApiError::LoginFailed => write!(f, "The login was not successful"),
            ApiError::UsernameAlreadyOccupied => write!(f, "Username is already occupied"),
            ApiError::InvalidUsername => write!(f, "Invalid username"),
            ApiError::InvalidDisplayName => write!(f, "Invalid display name"),
            ApiError::InvalidPassword => write!(f, "Invalid password"),
            ApiError::EmptyJson => write!(f, "Missing fields in json"),
            ApiError::InvalidUuid => write!(f, "Invalid uuid"),
            ApiError::MissingPrivileges => write!(f, "Missing privileges"),
            ApiError::SessionCorrupt => write!(f, "Corrupt session"),
            ApiError::InvalidName => write!(f, "Invalid name"),
            ApiError::InternalServerError => write!(f, "Internal server error"),
            ApiError::DatabaseError(_) => write!(f, "Database error occurred"),
            ApiError::InvalidHash(_) => write!(f, "Internal server error"),
            ApiError::SessionGet(_) => write!(f, "Internal server error"),
            ApiError::SessionInsert(_) => write!(f, "Internal server error"),
            ApiError::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl ApiError {
    fn engine_status_code(err: &EngineError) -> ApiStatusCode {
        match err {
            EngineError::ClientNotFound => ApiStatusCode::ClientNotFound,
            EngineError::TrainerNotFound => ApiStatusCode::TrainerNotFound,
            EngineError::RequestNotFound => ApiStatusCode::RequestNotFound,
            EngineError::NotATrainer => ApiStatusCode::NotATrainer,
            EngineError::NotAClient => ApiStatusCode::NotAClient,
            EngineError::TrainerNotValidated => ApiStatusCode::TrainerNotValidated,
            EngineError::AlreadyValidated => ApiStatusCode::AlreadyValidated,
            EngineError::NotRequestTarget => ApiStatusCode::NotRequestTarget,
            EngineError::AdminRequired => ApiStatusCode::AdminRequired,
            EngineError::ForeignClient => ApiStatusCode::ForeignClient,
            EngineError::ClientAlreadyBound => ApiStatusCode::ClientAlreadyBound,
            EngineError::ClientNotBound => ApiStatusCode::ClientNotBound,
            EngineError::SameTrainer => ApiStatusCode::SameTrainer,
            EngineError::PendingRequestExists => ApiStatusCode::PendingRequestExists,
            EngineError::RequestAlreadyDecided => ApiStatusCode::RequestAlreadyDecided,
            EngineError::BindingRaceLost => ApiStatusCode::BindingRaceLost,
            EngineError::EmptyReason => ApiStatusCode::EmptyReason,
            EngineError::Database(_) => ApiStatusCode::DatabaseError,
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            ApiError::Unauthenticated => {
                trace!("Unauthenticated");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::Unauthenticated,
                    self.to_string(),
                ))
            }
            ApiError::LoginFailed => {
                debug!("Login request failed");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::LoginFailed,
                    self.to_string(),
                ))
            }
            ApiError::UsernameAlreadyOccupied => {
                debug!("Username is already occupied");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::UsernameAlreadyOccupied,
                    self.to_string(),
                ))
            }
            ApiError::InvalidUsername => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidUsername,
                self.to_string(),
            )),
            ApiError::InvalidDisplayName => HttpResponse::BadRequest().json(
                ApiErrorResponse::new(ApiStatusCode::InvalidDisplayName, self.to_string()),
            ),
            ApiError::InvalidPassword => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidPassword,
                self.to_string(),
            )),
            ApiError::EmptyJson => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::EmptyJson,
                self.to_string(),
            )),
            ApiError::InvalidUuid => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidUuid,
                self.to_string(),
            )),
            ApiError::InvalidName => HttpResponse::BadRequest().json(ApiErrorResponse::new(
                ApiStatusCode::InvalidName,
                self.to_string(),
            )),
            ApiError::MissingPrivileges => {
                debug!("Missing privileges");

                HttpResponse::Forbidden().json(ApiErrorResponse::new(
                    ApiStatusCode::MissingPrivileges,
                    self.to_string(),
                ))
            }
            ApiError::SessionCorrupt => {
                info!("Corrupt session");

                HttpResponse::BadRequest().json(ApiErrorResponse::new(
                    ApiStatusCode::SessionCorrupt,
                    self.to_string(),
                ))
            }
            ApiError::InternalServerError => HttpResponse::InternalServerError().json(
                ApiErrorResponse::new(ApiStatusCode::InternalServerError, self.to_string()),
            ),
            ApiError::DatabaseError(err) => {
                error!("Database error: {err}");

                HttpResponse::InternalServerError().json(ApiErrorResponse::new(
                    ApiStatusCode::DatabaseError,
                    self.to_string(),
                ))
            }
            ApiError::InvalidHash(err) => {
                error!("Got invalid password hash from db: {err}");

                HttpResponse::InternalServerError().json(ApiErrorResponse::new(
                    ApiStatusCode::InternalServerError,
                    self.to_string(),
                ))
            }
            ApiError::SessionGet(err) => {
                error!("Error retrieving data from session: {err}");

                HttpResponse::InternalServerError().json(ApiErrorResponse::new(
                    ApiStatusCode::SessionError,
                    self.to_string(),
                ))
            }
            ApiError::SessionInsert(err) => {
                error!("Error inserting data into session: {err}");

                HttpResponse::InternalServerError().json(ApiErrorResponse::new(
                    ApiStatusCode::SessionError,
                    self.to_string(),
                ))
            }
            ApiError::Engine(engine_err) => {
                let body = ApiErrorResponse::new(
                    Self::engine_status_code(engine_err),
                    self.to_string(),
                );

                match engine_err.kind() {
                    ErrorKind::NotFound => {
                        debug!("Engine rejected operation: {engine_err}");
                        HttpResponse::NotFound().json(body)
                    }
                    ErrorKind::Forbidden => {
                        debug!("Engine rejected operation: {engine_err}");
                        HttpResponse::Forbidden().json(body)
                    }
                    ErrorKind::Conflict => {
                        debug!("Engine rejected operation: {engine_err}");
                        HttpResponse::Conflict().json(body)
                    }
                    ErrorKind::Validation => HttpResponse::BadRequest().json(body),
                    ErrorKind::Internal => {
                        error!("Engine internal error: {engine_err}");
                        HttpResponse::InternalServerError().json(body)
                    }
                }
            }
        }
    }
}

impl From<rorm::Error> for ApiError {
    fn from(value: rorm::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::InvalidHash(value)
    }
}

impl From<SessionGetError> for ApiError {
    fn from(value: SessionGetError) -> Self {
        Self::SessionGet(value)
    }
}

impl From<SessionInsertError> for ApiError {
    fn from(value: SessionInsertError) -> Self {
        Self::SessionInsert(value)
    }
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        match value {
            EngineError::Database(err) => Self::DatabaseError(err),
            other => Self::Engine(other),
        }
    }
}
