//! Caller identity.
//!
//! Authentication happens upstream of this server. The auth provider forwards the authenticated user's id and role in
//! the `X-Auth-User-Id` and `X-Auth-Role` headers. Handlers that need the caller take an [`AuthUser`] argument, and the
//! ACL middleware uses the same headers to enforce the roles a route requires.
use std::{
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpMessage, HttpRequest};
use log::debug;
use serde::{Deserialize, Serialize};
use settlement_engine::db_types::{Role, UserId};

use crate::errors::{AuthError, ServerError};

pub const USER_ID_HEADER: &str = "X-Auth-User-Id";
pub const ROLE_HEADER: &str = "X-Auth-Role";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub role: Role,
}

impl AuthUser {
    pub fn new<U: Into<UserId>>(id: U, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingIdentity)?;
        let role = headers.get(ROLE_HEADER).and_then(|v| v.to_str().ok()).ok_or(AuthError::MissingIdentity)?;
        let role = Role::from_str(role).map_err(|_| AuthError::InvalidRole(role.to_string()))?;
        Ok(Self::new(id, role))
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }

    /// Super admins pass every admin check.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role) || (self.role == Role::SuperAdmin && roles.contains(&Role::Admin))
    }

    /// True if the caller may see or act on resources belonging to `owner`.
    pub fn can_access(&self, owner: &UserId) -> bool {
        self.is_admin() || &self.id == owner
    }
}

impl FromRequest for AuthUser {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        let result = AuthUser::from_headers(req.headers()).map_err(|e| {
            debug!("💻️ Could not identify caller. {e}");
            ServerError::from(e)
        });
        ready(result)
    }
}
