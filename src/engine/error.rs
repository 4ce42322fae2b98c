//! The error taxonomy of the relationship engine

use std::fmt::{Display, Formatter};

/// The broad class of an [EngineError].
///
/// The http layer maps these to status codes, the engine itself is
/// transport agnostic.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A referenced user or request does not exist or has the wrong role
    NotFound,
    /// The actor lacks authority over the target
    Forbidden,
    /// The operation would violate an invariant of the current state
    Conflict,
    /// Malformed input
    Validation,
    /// Failure of the underlying store
    Internal,
}

/// All errors the relationship engine can produce.
///
/// Every variant carries enough information for a caller to distinguish
/// "nothing happened" from "something already happened".
#[derive(Debug)]
pub enum EngineError {
    /// The referenced client does not exist or is not a client
    ClientNotFound,
    /// The referenced trainer does not exist or is not a trainer
    TrainerNotFound,
    /// The referenced request does not exist (or is of another kind)
    RequestNotFound,
    /// The referenced account exists but is not a trainer
    NotATrainer,
    /// The targeted trainer has not been validated by an admin yet
    TrainerNotValidated,

    /// The acting account is not a client
    NotAClient,
    /// The decider is not the trainer the request targets
    NotRequestTarget,
    /// The operation requires admin privileges
    AdminRequired,
    /// The client is bound to a different trainer
    ForeignClient,

    /// The client already has a trainer
    ClientAlreadyBound,
    /// The client has no trainer
    ClientNotBound,
    /// The targeted trainer is already the client's current trainer
    SameTrainer,
    /// There already is a pending request of this kind for the client
    PendingRequestExists,
    /// The request has already been decided
    RequestAlreadyDecided,
    /// The binding changed concurrently, the mutation was not applied
    BindingRaceLost,
    /// The trainer is already validated
    AlreadyValidated,

    /// The reason of a request must not be empty
    EmptyReason,

    /// All errors that are thrown by the database
    Database(rorm::Error),
}

impl EngineError {
    /// The broad class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ClientNotFound
            | EngineError::TrainerNotFound
            | EngineError::RequestNotFound
            | EngineError::NotATrainer
            | EngineError::TrainerNotValidated => ErrorKind::NotFound,
            EngineError::NotAClient
            | EngineError::NotRequestTarget
            | EngineError::AdminRequired
            | EngineError::ForeignClient => ErrorKind::Forbidden,
            EngineError::ClientAlreadyBound
            | EngineError::ClientNotBound
            | EngineError::SameTrainer
            | EngineError::PendingRequestExists
            | EngineError::RequestAlreadyDecided
            | EngineError::BindingRaceLost
            | EngineError::AlreadyValidated => ErrorKind::Conflict,
            EngineError::EmptyReason => ErrorKind::Validation,
            EngineError::Database(_) => ErrorKind::Internal,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::ClientNotFound => write!(f, "The client was not found"),
            EngineError::TrainerNotFound => write!(f, "The trainer was not found"),
            EngineError::RequestNotFound => write!(f, "The request was not found"),
            EngineError::NotATrainer => write!(f, "The account is not a trainer"),
            EngineError::TrainerNotValidated => write!(f, "The trainer is not validated"),
            EngineError::NotAClient => write!(f, "The account is not a client"),
            EngineError::NotRequestTarget => {
                write!(f, "Only the targeted trainer may decide this request")
            }
            EngineError::AdminRequired => write!(f, "Admin privileges are required"),
            EngineError::ForeignClient => {
                write!(f, "The client is coached by a different trainer")
            }
            EngineError::ClientAlreadyBound => write!(f, "The client already has a trainer"),
            EngineError::ClientNotBound => write!(f, "The client has no trainer"),
            EngineError::SameTrainer => {
                write!(f, "The targeted trainer is already the current trainer")
            }
            EngineError::PendingRequestExists => {
                write!(f, "There already is a pending request for this client")
            }
            EngineError::RequestAlreadyDecided => {
                write!(f, "The request has already been decided")
            }
            EngineError::BindingRaceLost => {
                write!(f, "The binding changed concurrently, please refresh")
            }
            EngineError::AlreadyValidated => write!(f, "The trainer is already validated"),
            EngineError::EmptyReason => write!(f, "The reason must not be empty"),
            EngineError::Database(_) => write!(f, "Database error occurred"),
        }
    }
}

impl From<rorm::Error> for EngineError {
    fn from(value: rorm::Error) -> Self {
        Self::Database(value)
    }
}
