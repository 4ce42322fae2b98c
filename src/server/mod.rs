//! This module holds the server definition

use std::net::SocketAddr;

use actix_toolbox::tb_middleware::{
    setup_logging_mw, DBSessionStore, LoggingMiddlewareConfig, PersistentSession,
    SessionMiddleware,
};
use actix_web::cookie::time::Duration;
use actix_web::cookie::Key;
use actix_web::http::StatusCode;
use actix_web::middleware::{Compress, ErrorHandlers};
use actix_web::web::{scope, Data, JsonConfig, PayloadConfig};
use actix_web::{App, HttpServer};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use log::info;
use rand::thread_rng;
use rorm::{insert, query, Database, FieldAccess, Model};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::chan::WsManagerChan;
use crate::config::Config;
use crate::models::{Account, AccountInsert, AccountRole};
use crate::server::error::StartServerError;
use crate::server::handler::{
    archive_plan, create_association_request, create_plan, create_trainer_change_request,
    create_workout, decide_association_request, decide_trainer_change_request, delete_me,
    delete_trainer, get_all_chats, get_chat, get_health, get_me, get_plan, get_plans, get_request,
    get_requests, get_workouts, login, logout, lookup_account_by_username, lookup_account_by_uuid,
    register_account, remove_association, send_message, set_password, update_me, update_plan,
    validate_trainer, version, websocket,
};
use crate::server::middleware::{
    handle_not_found, json_extractor_error, AdminRequired, AuthenticationRequired,
};
use crate::server::swagger::{AdminApiDoc, ApiDoc};

pub mod error;
pub mod handler;
pub mod middleware;
pub mod swagger;

/// Create the configured admin account if it does not exist yet.
///
/// Admins can not register through the API, the only way in is the
/// configuration file.
pub async fn ensure_admin_account(db: &Database, config: &Config) -> Result<(), String> {
    let existing = query!(db, (Account::F.uuid,))
        .condition(Account::F.username.equals(&config.admin.username))
        .optional()
        .await
        .map_err(|e| e.to_string())?;

    if existing.is_some() {
        return Ok(());
    }

    let salt = SaltString::generate(&mut thread_rng());
    let password_hash = Argon2::default()
        .hash_password(config.admin.password.as_bytes(), &salt)
        .map_err(|e| e.to_string())?
        .to_string();

    insert!(db, AccountInsert)
        .single(&AccountInsert {
            uuid: Uuid::new_v4(),
            username: config.admin.username.clone(),
            display_name: config.admin.display_name.clone(),
            password_hash,
            role: AccountRole::Admin,
            is_validated: true,
            last_login: None,
        })
        .await
        .map_err(|e| e.to_string())?;

    info!("Created admin account {}", config.admin.username);

    Ok(())
}

/// Start the coachhub server
///
/// **Parameter**:
/// - `config`: Reference to a [Config] struct
/// - `db`: [Database]
/// - `ws_manager_chan`: [WsManagerChan] : The channel to manage websocket connections
pub async fn start_server(
    config: &Config,
    db: Database,
    ws_manager_chan: WsManagerChan,
) -> Result<(), StartServerError> {
    let s_addr = SocketAddr::new(config.server.listen_address, config.server.listen_port);

    let key = Key::try_from(
        BASE64_STANDARD
            .decode(&config.server.secret_key)
            .map_err(|_| StartServerError::InvalidSecretKey)?
            .as_slice(),
    )
    .map_err(|_| StartServerError::InvalidSecretKey)?;

    info!("Starting to listen on {}", s_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(PayloadConfig::default())
            .app_data(JsonConfig::default().error_handler(json_extractor_error))
            .app_data(Data::new(db.clone()))
            .app_data(Data::new(ws_manager_chan.clone()))
            .wrap(setup_logging_mw(LoggingMiddlewareConfig::default()))
            .wrap(
                SessionMiddleware::builder(DBSessionStore::new(db.clone()), key.clone())
                    .session_lifecycle(PersistentSession::default().session_ttl(Duration::hours(24)))
                    .build(),
            )
            .wrap(Compress::default())
            .wrap(ErrorHandlers::new().handler(StatusCode::NOT_FOUND, handle_not_found))
            .service(SwaggerUi::new("/docs/{_:.*}").urls(vec![
                (
                    utoipa_swagger_ui::Url::new("api", "/api-doc/openapi.json"),
                    ApiDoc::openapi(),
                ),
                (
                    utoipa_swagger_ui::Url::new("admin-api", "/api-doc/admin-openapi.json"),
                    AdminApiDoc::openapi(),
                ),
            ]))
            .service(register_account)
            .service(version)
            .service(scope("/api/v1/auth").service(login).service(logout))
            .service(
                scope("/api/v1/admin")
                    .wrap(AdminRequired)
                    .wrap(AuthenticationRequired)
                    .service(get_health)
                    .service(validate_trainer)
                    .service(delete_trainer)
                    .service(remove_association)
                    .service(decide_trainer_change_request),
            )
            .service(
                scope("/api/v1")
                    .wrap(AuthenticationRequired)
                    .service(websocket)
                    .service(get_me)
                    .service(update_me)
                    .service(delete_me)
                    .service(set_password)
                    .service(lookup_account_by_uuid)
                    .service(lookup_account_by_username)
                    .service(create_association_request)
                    .service(decide_association_request)
                    .service(get_requests)
                    .service(get_request)
                    .service(create_trainer_change_request)
                    .service(create_plan)
                    .service(get_plans)
                    .service(get_plan)
                    .service(update_plan)
                    .service(archive_plan)
                    .service(create_workout)
                    .service(get_workouts)
                    .service(get_all_chats)
                    .service(get_chat)
                    .service(send_message),
            )
    })
    .bind(s_addr)?
    .run()
    .await?;

    Ok(())
}
