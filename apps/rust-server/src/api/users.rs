// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public user profiles and endpoints for the signed-in user.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validation::{require_email, require_phone_number};
use crate::{
    auth::{Auth, AuthenticatedUser},
    blockchain::parse_address,
    error::ApiError,
    state::AppState,
    storage::{ProfileUpdate, UserId, UserProfile, UserView},
};

/// Response for GET /api/v1/me
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: UserId,
    /// Roles confirmed against the store on this request
    pub roles: Vec<String>,
    /// Session expiry (Unix timestamp)
    pub expires_at: i64,
}

impl From<AuthenticatedUser> for MeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.user_id,
            roles: user.roles.into_iter().collect(),
            expires_at: user.expires_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhoneNumberRequest {
    pub phone_number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetWalletRequest {
    /// Hex EVM address, `0x`-prefixed
    pub wallet_address: String,
}

/// Response for GET /api/v1/user-profile/{user_id}
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Public contact card of a user. No authentication required.
#[utoipa::path(
    get,
    path = "/api/v1/user-profile/{user_id}",
    tag = "Users",
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, body = UserProfileResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let user = state
        .db
        .get_user(user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserProfileResponse {
        message: "user profile successfully fetched".to_string(),
        user: user.into(),
    }))
}

/// Get the current authenticated user's identity.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User identity", body = MeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<MeResponse> {
    Json(user.into())
}

/// Fetch a user. Non-admins may only fetch themselves.
#[utoipa::path(
    get,
    path = "/api/v1/user/{user_id}",
    tag = "Users",
    security(("bearer" = [])),
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, body = UserView),
        (status = 403, description = "Not your account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserView>, ApiError> {
    if caller.user_id != user_id && !caller.is_admin() {
        return Err(ApiError::forbidden("Access denied"));
    }

    let user = state
        .db
        .get_user(user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// Change the caller's email address.
#[utoipa::path(
    put,
    path = "/api/v1/user/email",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateEmailRequest,
    responses(
        (status = 200, body = UserView),
        (status = 400, description = "Invalid email"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_email(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<UpdateEmailRequest>,
) -> Result<Json<UserView>, ApiError> {
    require_email(&request.email)?;

    let user = state.db.update_email(caller.user_id, &request.email)?;
    tracing::info!(user_id = user.id, "Email updated");
    Ok(Json(user.into()))
}

/// Change the caller's phone number.
#[utoipa::path(
    put,
    path = "/api/v1/user/phone-number",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdatePhoneNumberRequest,
    responses(
        (status = 200, body = UserView),
        (status = 400, description = "Invalid phone number")
    )
)]
pub async fn update_phone_number(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<UpdatePhoneNumberRequest>,
) -> Result<Json<UserView>, ApiError> {
    let phone_number = request.phone_number.trim();
    require_phone_number(phone_number)?;

    let user = state.db.update_profile(
        caller.user_id,
        ProfileUpdate {
            phone_number: Some(phone_number.to_string()),
            ..Default::default()
        },
    )?;
    Ok(Json(user.into()))
}

/// Link the caller's public wallet address.
///
/// The address can be set once; it is what on-chain role checks query.
#[utoipa::path(
    put,
    path = "/api/v1/user/wallet",
    tag = "Users",
    security(("bearer" = [])),
    request_body = SetWalletRequest,
    responses(
        (status = 200, body = UserView),
        (status = 400, description = "Not a valid EVM address"),
        (status = 409, description = "Wallet already linked")
    )
)]
pub async fn set_wallet(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<SetWalletRequest>,
) -> Result<Json<UserView>, ApiError> {
    let address = parse_address(&request.wallet_address)
        .map_err(|_| ApiError::bad_request("walletAddress is not a valid EVM address"))?;

    let user = state
        .db
        .set_wallet_address(caller.user_id, &address.to_checksum(None))?;

    tracing::info!(user_id = user.id, wallet = %address, "Wallet linked");
    Ok(Json(user.into()))
}
