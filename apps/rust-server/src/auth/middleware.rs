// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization middleware for Axum.
//!
//! ## Checks (in order)
//!
//! 1. `Authorization: Bearer <token>` header
//! 2. Session token signature, kind and expiry
//! 3. `active` claim
//! 4. Store re-check: the user still exists, is active, and holds exactly
//!    the roles the token claims
//! 5. Role requirement (any-of, `admin` satisfies everything)
//!
//! On success the [`AuthenticatedUser`] is inserted into the request
//! extensions, where the `Auth` extractor picks it up.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/roles", get(list_roles))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         RoleGate::any_of(state.clone(), &[ADMIN_ROLE]),
//!         require_roles,
//!     ));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::roles::{has_any_role, roles_match};
use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Extract the bearer token from the request headers.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedAuthHeader)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedAuthHeader)?
        .trim();

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MalformedAuthHeader);
    }
    Ok(token)
}

/// Authorize a request against a set of acceptable roles.
///
/// An empty `required` set only requires a valid, active, current session.
pub fn authorize<S: AsRef<str>>(
    state: &AppState,
    headers: &HeaderMap,
    required: &[S],
) -> Result<AuthenticatedUser, AuthError> {
    let token = bearer_token(headers)?;

    let claims = state.tokens.parse_session_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AuthError::Unauthenticated(e)
    })?;

    if !claims.active {
        return Err(AuthError::AccountInactive);
    }

    let user_id = claims.user_id().map_err(AuthError::Unauthenticated)?;

    let stored = state
        .db
        .get_user(user_id)
        .map_err(|e| {
            tracing::error!(user_id, error = %e, "User lookup failed during authorization");
            AuthError::Internal(e.to_string())
        })?
        .ok_or_else(|| {
            tracing::debug!(user_id, "Session refers to a deleted user");
            AuthError::Unauthenticated(super::TokenError::Malformed)
        })?;

    if !stored.is_active {
        return Err(AuthError::AccountInactive);
    }

    if !roles_match(&claims.roles, &stored.roles) {
        tracing::info!(
            user_id,
            claimed = ?claims.roles,
            stored = ?stored.roles,
            "Session roles no longer match stored roles"
        );
        return Err(AuthError::StaleRoles);
    }

    if !has_any_role(&stored.roles, required) {
        return Err(AuthError::Forbidden);
    }

    Ok(AuthenticatedUser {
        user_id,
        roles: stored.roles,
        expires_at: claims.exp,
    })
}

/// Middleware state: the app state plus the roles a route accepts.
#[derive(Clone)]
pub struct RoleGate {
    state: AppState,
    roles: Arc<[String]>,
}

impl RoleGate {
    pub fn new<S: AsRef<str>>(state: AppState, roles: &[S]) -> Self {
        Self {
            state,
            roles: roles.iter().map(|r| r.as_ref().to_string()).collect(),
        }
    }

    /// Any authenticated, active user.
    pub fn authenticated(state: AppState) -> Self {
        Self::new::<&str>(state, &[])
    }

    /// Users holding at least one of `roles` (or `admin`).
    pub fn any_of(state: AppState, roles: &[&str]) -> Self {
        Self::new(state, roles)
    }
}

/// Middleware function for [`RoleGate`].
pub async fn require_roles(
    State(gate): State<RoleGate>,
    mut request: Request,
    next: Next,
) -> Response {
    match authorize(&gate.state, request.headers(), &gate.roles[..]) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
