//! Access control list middleware for the settlement server.
//! This middleware can be placed on any route or service.
//!
//! It identifies the caller from the auth provider's headers (see [`crate::auth`]) and checks their role against the
//! roles the route accepts. If the caller holds one of them, the request continues with the [`AuthUser`] stored in
//! the request extensions. Otherwise, a 403 Forbidden response is returned (401 if no identity was supplied).

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden, ErrorUnauthorized},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;
use settlement_engine::db_types::Role;

use crate::{auth::AuthUser, errors::AuthError};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let user = AuthUser::from_headers(req.headers()).map_err(|e| {
                warn!("🔐️ Denying access to {}. {e}", req.path());
                match e {
                    AuthError::MissingIdentity => ErrorUnauthorized(e.to_string()),
                    _ => ErrorBadRequest(e.to_string()),
                }
            })?;
            if user.has_any_role(&required_roles) {
                trace!("🔐️ {} ({}) may access {}", user.id, user.role, req.path());
                req.extensions_mut().insert(user);
                service.call(req).await
            } else {
                debug!("🔐️ {} ({}) may not access {}", user.id, user.role, req.path());
                Err(ErrorForbidden("Insufficient permissions."))
            }
        })
    }
}
