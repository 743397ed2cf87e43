// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public account endpoints: login, activation and password reset.
//!
//! Activation and reset tokens are redeemed by email lookup followed by a
//! fingerprint check against the stored password hash. Redeeming changes
//! the hash, so the same token cannot be used twice.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::{require_email, require_non_empty, require_strong_password};
use crate::{
    auth::password::{hash_password_blocking, verify_password_blocking},
    error::ApiError,
    notify::OutgoingMail,
    state::AppState,
    storage::{StoreError, UserId},
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    /// Session token for the `Authorization: Bearer` header
    pub token: String,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_wallet_address: Option<String>,
}

/// Body shared by activation and password reset.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

const INVALID_CREDENTIALS: &str = "Incorrect user credentials.";

const RESET_SENT: &str =
    "If an account with that email exists, password reset instructions have been sent";

// ============================================================================
// Handlers
// ============================================================================

/// Exchange email and password for a session token.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    tag = "Account",
    responses(
        (status = 200, body = LoginResponse),
        (status = 401, description = "Wrong credentials or inactive account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .db
        .find_user_by_email(&request.email)?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    let password_ok = verify_password_blocking(request.password, user.password_hash.clone())
        .await
        .map_err(ApiError::internal)?;
    if !password_ok {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    if !user.is_active {
        return Err(ApiError::unauthorized(
            "Your account isn't active, check your email for the activation link.",
        ));
    }

    let token = state
        .tokens
        .issue_session_token(user.id, &user.roles, user.is_active)
        .map_err(ApiError::internal)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "User validated".to_string(),
        token,
        user_id: user.id,
        public_wallet_address: user.wallet_address,
    }))
}

/// Redeem a verification token: set the first password and activate.
#[utoipa::path(
    put,
    path = "/api/v1/user/activate",
    request_body = TokenPasswordRequest,
    tag = "Account",
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Weak password or invalid token")
    )
)]
pub async fn activate_account(
    State(state): State<AppState>,
    Json(request): Json<TokenPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_non_empty("token", &request.token)?;
    require_strong_password(&request.password)?;

    let invalid =
        || ApiError::bad_request("Your token is invalid, please request a new activation token");

    let claims = state
        .tokens
        .parse_verification_token(&request.token)
        .map_err(|e| {
            tracing::info!(error = %e, "Activation token rejected");
            invalid()
        })?;

    let user = state
        .db
        .find_user_by_email(&claims.email)?
        .ok_or_else(invalid)?;

    claims.verify_fingerprint(&user.password_hash).map_err(|e| {
        tracing::info!(user_id = user.id, error = %e, "Activation token already used");
        invalid()
    })?;

    let password_hash = hash_password_blocking(request.password)
        .await
        .map_err(ApiError::internal)?;
    state
        .db
        .activate_user_if(user.id, &claims.fingerprint, password_hash)
        .map_err(|e| match e {
            StoreError::StaleCredential(_) => {
                tracing::info!(user_id = user.id, "Activation token redeemed concurrently");
                invalid()
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, "Account activated");
    Ok(MessageResponse::new("Account successfully activated"))
}

/// Mail a password reset link.
///
/// Replies identically whether or not the account exists.
#[utoipa::path(
    post,
    path = "/api/v1/user/forgot-password",
    request_body = ForgotPasswordRequest,
    tag = "Account",
    responses(
        (status = 200, body = MessageResponse),
        (status = 422, description = "Email missing")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_email(&request.email)?;

    let Some(user) = state.db.find_user_by_email(&request.email)? else {
        tracing::debug!("Password reset requested for unknown email");
        return Ok(MessageResponse::new(RESET_SENT));
    };

    if !user.is_active {
        tracing::info!(user_id = user.id, "Password reset requested for inactive account");
        return Ok(MessageResponse::new(RESET_SENT));
    }

    let token = state
        .tokens
        .issue_password_reset_token(&user.email, &user.password_hash)
        .map_err(ApiError::internal)?;

    state
        .mailer
        .send(OutgoingMail::password_reset(
            &state.frontend_url,
            &user.email,
            &token,
        ))
        .map_err(ApiError::internal)?;

    tracing::info!(user_id = user.id, "Password reset link sent");
    Ok(MessageResponse::new(RESET_SENT))
}

/// Redeem a password reset token.
#[utoipa::path(
    put,
    path = "/api/v1/user/reset-password",
    request_body = TokenPasswordRequest,
    tag = "Account",
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Weak password, invalid or used token"),
        (status = 422, description = "Token or password missing")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<TokenPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if request.token.trim().is_empty() {
        return Err(ApiError::unprocessable(
            "Token is required, make sure you arrived at this page from the link in your email.",
        ));
    }
    require_strong_password(&request.password)?;

    let claims = state
        .tokens
        .parse_password_reset_token(&request.token)
        .map_err(|e| {
            tracing::info!(error = %e, "Password reset token rejected");
            ApiError::bad_request("Your reset link is invalid or has expired")
        })?;

    let user = state
        .db
        .find_user_by_email(&claims.email)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let changed =
        || ApiError::bad_request("Password has been changed since reset was requested");
    claims
        .verify_fingerprint(&user.password_hash)
        .map_err(|_| changed())?;

    let password_hash = hash_password_blocking(request.password)
        .await
        .map_err(ApiError::internal)?;
    state
        .db
        .set_password_hash_if(user.id, &claims.fingerprint, password_hash)
        .map_err(|e| match e {
            StoreError::StaleCredential(_) => changed(),
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, "Password reset");
    Ok(MessageResponse::new("Password has been successfully reset"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::notify::MailKind;
    use crate::state::testing::test_state;
    use crate::storage::NewUser;
    use axum::http::StatusCode;

    fn seed_active_user(state: &AppState, email: &str, password: &str) -> UserId {
        let user = state
            .db
            .create_user(NewUser {
                email: email.to_string(),
                first_name: "Yacine".to_string(),
                last_name: "Brahimi".to_string(),
                phone_number: None,
                password_hash: "placeholder".to_string(),
                roles: ["tender".to_string()].into_iter().collect(),
            })
            .unwrap();
        state
            .db
            .activate_user(user.id, hash_password(password).unwrap())
            .unwrap();
        user.id
    }

    #[tokio::test]
    async fn login_issues_session_token() {
        let (state, _mailer, _dir) = test_state();
        let id = seed_active_user(&state, "y@example.com", "Str0ng#Pass");

        let Json(response) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "Y@Example.com".to_string(),
                password: "Str0ng#Pass".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.user_id, id);
        let claims = state.tokens.parse_session_token(&response.token).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.roles, vec!["tender".to_string()]);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email() {
        let (state, _mailer, _dir) = test_state();
        seed_active_user(&state, "y@example.com", "Str0ng#Pass");

        let err = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "y@example.com".to_string(),
                password: "wrong".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "Str0ng#Pass".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn activation_token_is_single_use() {
        let (state, _mailer, _dir) = test_state();
        let user = state
            .db
            .create_user(NewUser {
                email: "new@example.com".to_string(),
                first_name: "New".to_string(),
                last_name: "User".to_string(),
                phone_number: None,
                password_hash: hash_password("Initial#Pw1").unwrap(),
                roles: Default::default(),
            })
            .unwrap();
        let token = state
            .tokens
            .issue_verification_token(&user.email, &user.password_hash)
            .unwrap();

        activate_account(
            State(state.clone()),
            Json(TokenPasswordRequest {
                token: token.clone(),
                password: "Chosen#Pw1".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(state.db.get_user(user.id).unwrap().unwrap().is_active);

        let err = activate_account(
            State(state),
            Json(TokenPasswordRequest {
                token,
                password: "Another#Pw2".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn forgot_password_replies_the_same_for_unknown_email() {
        let (state, mailer, _dir) = test_state();
        seed_active_user(&state, "y@example.com", "Str0ng#Pass");

        let Json(known) = forgot_password(
            State(state.clone()),
            Json(ForgotPasswordRequest {
                email: "y@example.com".to_string(),
            }),
        )
        .await
        .unwrap();
        let Json(unknown) = forgot_password(
            State(state),
            Json(ForgotPasswordRequest {
                email: "ghost@example.com".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(known.message, unknown.message);
        assert_eq!(mailer.sent().len(), 1);
        assert!(mailer.last_token(MailKind::PasswordReset).is_some());
    }

    #[tokio::test]
    async fn reset_token_stops_working_after_use() {
        let (state, mailer, _dir) = test_state();
        seed_active_user(&state, "y@example.com", "Str0ng#Pass");

        forgot_password(
            State(state.clone()),
            Json(ForgotPasswordRequest {
                email: "y@example.com".to_string(),
            }),
        )
        .await
        .unwrap();
        let token = mailer.last_token(MailKind::PasswordReset).unwrap();

        reset_password(
            State(state.clone()),
            Json(TokenPasswordRequest {
                token: token.clone(),
                password: "Fresh#Pass1".to_string(),
            }),
        )
        .await
        .unwrap();

        let err = reset_password(
            State(state.clone()),
            Json(TokenPasswordRequest {
                token,
                password: "Other#Pass2".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let Json(response) = login(
            State(state),
            Json(LoginRequest {
                email: "y@example.com".to_string(),
                password: "Fresh#Pass1".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!(!response.token.is_empty());
    }

    #[tokio::test]
    async fn session_token_cannot_reset_password() {
        let (state, _mailer, _dir) = test_state();
        let id = seed_active_user(&state, "y@example.com", "Str0ng#Pass");
        let session = state
            .tokens
            .issue_session_token(id, &["tender".to_string()].into_iter().collect(), true)
            .unwrap();

        let err = reset_password(
            State(state),
            Json(TokenPasswordRequest {
                token: session,
                password: "Fresh#Pass1".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_redemptions_of_one_reset_token_succeed_once() {
        let (state, mailer, _dir) = test_state();
        seed_active_user(&state, "y@example.com", "Str0ng#Pass");
        forgot_password(
            State(state.clone()),
            Json(ForgotPasswordRequest {
                email: "y@example.com".to_string(),
            }),
        )
        .await
        .unwrap();
        let token = mailer.last_token(MailKind::PasswordReset).unwrap();

        let attempts: Vec<_> = ["First#Pass1", "Second#Pass2"]
            .into_iter()
            .map(|password| {
                let state = state.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    reset_password(
                        State(state),
                        Json(TokenPasswordRequest {
                            token,
                            password: password.to_string(),
                        }),
                    )
                    .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(err) => assert_eq!(err.status, StatusCode::BAD_REQUEST),
            }
        }
        assert_eq!(succeeded, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_activations_of_one_token_succeed_once() {
        let (state, _mailer, _dir) = test_state();
        let user = state
            .db
            .create_user(NewUser {
                email: "new@example.com".to_string(),
                first_name: "New".to_string(),
                last_name: "User".to_string(),
                phone_number: None,
                password_hash: hash_password("Initial#Pw1").unwrap(),
                roles: Default::default(),
            })
            .unwrap();
        let token = state
            .tokens
            .issue_verification_token(&user.email, &user.password_hash)
            .unwrap();

        let attempts: Vec<_> = ["First#Pass1", "Second#Pass2"]
            .into_iter()
            .map(|password| {
                let state = state.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    activate_account(
                        State(state),
                        Json(TokenPasswordRequest {
                            token,
                            password: password.to_string(),
                        }),
                    )
                    .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 1);
        assert!(state.db.get_user(user.id).unwrap().unwrap().is_active);
    }
}
