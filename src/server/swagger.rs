//! This module holds the definition of the swagger declaration

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::{AccountRole, RequestKind, RequestStatus};
use crate::server::handler;

struct CookieSecurity;

impl Modify for CookieSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("id"))),
            )
        }
    }
}

/// Helper struct for the openapi definitions.
#[derive(OpenApi)]
#[openapi(
    paths(
        handler::register_account,
        handler::get_me,
        handler::delete_me,
        handler::update_me,
        handler::set_password,
        handler::lookup_account_by_uuid,
        handler::lookup_account_by_username,
        handler::login,
        handler::logout,
        handler::websocket,
        handler::version,
        handler::create_association_request,
        handler::decide_association_request,
        handler::get_requests,
        handler::get_request,
        handler::create_trainer_change_request,
        handler::create_plan,
        handler::get_plans,
        handler::get_plan,
        handler::update_plan,
        handler::archive_plan,
        handler::create_workout,
        handler::get_workouts,
        handler::get_all_chats,
        handler::get_chat,
        handler::send_message,
    ),
    components(schemas(
        handler::AccountRegistrationRequest,
        handler::RegistrationRole,
        handler::ApiErrorResponse,
        handler::ApiStatusCode,
        handler::LoginRequest,
        handler::AccountResponse,
        handler::FullAccountResponse,
        handler::SetPasswordRequest,
        handler::UpdateAccountRequest,
        handler::LookupAccountUsernameRequest,
        handler::VersionResponse,
        handler::CreateAssociationRequest,
        handler::DecideAssociationRequest,
        handler::RelationshipRequestResponse,
        handler::GetRequestsResponse,
        handler::CreateTrainerChangeRequest,
        handler::CreatePlanRequest,
        handler::UpdatePlanRequest,
        handler::PlanResponse,
        handler::GetPlansResponse,
        handler::CreateWorkoutRequest,
        handler::WorkoutResponse,
        handler::GetWorkoutsResponse,
        handler::ChatMessage,
        handler::ChatRoomResponse,
        handler::GetAllChatsResponse,
        handler::GetChatResponse,
        handler::SendMessageRequest,
        AccountRole,
        RequestKind,
        RequestStatus,
    )),
    modifiers(&CookieSecurity)
)]
pub struct ApiDoc;

/// Helper struct for the admin openapi definitions.
#[derive(OpenApi)]
#[openapi(
    paths(
        handler::get_health,
        handler::validate_trainer,
        handler::delete_trainer,
        handler::remove_association,
        handler::decide_trainer_change_request,
    ),
    components(schemas(
        handler::ApiErrorResponse,
        handler::ApiStatusCode,
        handler::HealthResponse,
        handler::DeleteTrainerResponse,
        handler::DecideTrainerChangeRequest,
        handler::RelationshipRequestResponse,
        RequestKind,
        RequestStatus,
    )),
    modifiers(&CookieSecurity)
)]
pub struct AdminApiDoc;
