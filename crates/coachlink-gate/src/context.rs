//! Per-request auth context.
//!
//! The gate stores what it resolved in the request's extensions so page
//! handlers can read the session and role without a second lookup.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use coachlink_core::{Identity, Role, RouteTable, Session};
use serde::Serialize;

/// Session and role resolved for the current request.
///
/// Requests that never passed through the gate (bypassed paths) extract as
/// the anonymous context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    /// Session, when the request carried valid credentials.
    #[serde(skip)]
    pub session: Option<Session>,

    /// Role for the session's identity; `Unknown` without a session.
    pub role: Role,
}

impl AuthContext {
    /// Context for a request without a session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for a signed-in request.
    pub fn signed_in(session: Session, role: Role) -> Self {
        Self {
            session: Some(session),
            role,
        }
    }

    /// True when a session was resolved.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Identity of the session's subject.
    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.identity)
    }

    /// Home page for the resolved role.
    pub fn home_path<'a>(&self, routes: &'a RouteTable) -> Option<&'a str> {
        self.session.as_ref().and(routes.home_for(self.role))
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default())
    }
}
