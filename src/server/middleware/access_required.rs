//! Session based access gates for the API scopes.
//!
//! Both gates share one middleware type and differ only in what they
//! require from the session: a logged in flag, or the admin role on top.

use std::future::{ready, Ready};

use actix_toolbox::tb_middleware::actix_session::SessionExt;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use futures::future::LocalBoxFuture;

use crate::models::AccountRole;
use crate::server::handler::ApiError;

/// Rejects requests without a logged in session
pub(crate) struct AuthenticationRequired;

/// Rejects requests whose session role is not [AccountRole::Admin].
///
/// Wrap inside [AuthenticationRequired] so a missing session is reported
/// as unauthenticated rather than as missing privileges.
pub(crate) struct AdminRequired;

impl<S, B> Transform<S, ServiceRequest> for AuthenticationRequired
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = AccessRequiredMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessRequiredMiddleware {
            service,
            admin_only: false,
        }))
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminRequired
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = AccessRequiredMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessRequiredMiddleware {
            service,
            admin_only: true,
        }))
    }
}

pub(crate) struct AccessRequiredMiddleware<S> {
    service: S,
    admin_only: bool,
}

impl<S, B> Service<ServiceRequest> for AccessRequiredMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let session = req.get_session();

        let gate = if self.admin_only {
            session.get::<AccountRole>("role").map(|role| match role {
                Some(AccountRole::Admin) => Ok(()),
                Some(_) => Err(ApiError::MissingPrivileges),
                None => Err(ApiError::Unauthenticated),
            })
        } else {
            session.get::<bool>("logged_in").map(|logged_in| {
                if logged_in.unwrap_or(false) {
                    Ok(())
                } else {
                    Err(ApiError::Unauthenticated)
                }
            })
        };

        let next = self.service.call(req);
        Box::pin(async move {
            gate.map_err(ApiError::SessionGet)??;

            next.await
        })
    }
}
