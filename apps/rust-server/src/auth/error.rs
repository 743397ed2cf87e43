// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::codec::TokenError;

/// Rejection produced by the authorization middleware and extractor.
///
/// Messages are deliberately generic; the underlying cause of an
/// authentication failure is logged, never returned.
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Header present but not `Bearer <token>`
    MalformedAuthHeader,
    /// Token failed verification
    Unauthenticated(TokenError),
    /// Account not active (claim or stored record)
    AccountInactive,
    /// Claimed roles differ from the stored role set
    StaleRoles,
    /// Authenticated but lacking every required role
    Forbidden,
    /// Store failure during the re-check
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::MalformedAuthHeader => "malformed_auth_header",
            AuthError::Unauthenticated(TokenError::Expired) => "token_expired",
            AuthError::Unauthenticated(TokenError::WrongTokenKind { .. }) => "wrong_token_kind",
            AuthError::Unauthenticated(_) => "invalid_token",
            AuthError::AccountInactive => "account_inactive",
            AuthError::StaleRoles => "stale_roles",
            AuthError::Forbidden => "insufficient_permissions",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MalformedAuthHeader => StatusCode::BAD_REQUEST,
            AuthError::MissingAuthHeader
            | AuthError::Unauthenticated(_)
            | AuthError::AccountInactive
            | AuthError::StaleRoles => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::MalformedAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::Unauthenticated(TokenError::Expired) => write!(f, "Token has expired"),
            AuthError::Unauthenticated(_) => write!(f, "Invalid or expired token"),
            AuthError::AccountInactive => write!(f, "Account is not activated"),
            AuthError::StaleRoles => {
                write!(f, "Your roles have changed, please sign in again")
            }
            AuthError::Forbidden => write!(f, "Insufficient permissions for this operation"),
            AuthError::Internal(_) => write!(f, "Internal authentication error"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
