// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only user management endpoints.
//!
//! Every route here sits behind a `RoleGate` requiring the `admin` role;
//! the handlers still take [`Auth`] to know who the acting admin is.

use std::collections::BTreeSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::validation::{require_email, require_non_empty, require_phone_number};
use crate::{
    auth::{
        password::{generate_initial_password, hash_password_blocking},
        Auth,
    },
    error::ApiError,
    notify::OutgoingMail,
    state::AppState,
    storage::{normalize_role_name, NewUser, ProfileUpdate, UserId, UserView},
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

const INITIAL_PASSWORD_LEN: usize = 16;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for the user list.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserListParams {
    /// 1-based page number (default 1).
    pub page: Option<usize>,
    /// Page size (default 10, max 100).
    pub limit: Option<usize>,
    /// Case-insensitive match on email, names or phone number.
    pub search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserView>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddRoleRequest {
    pub role_name: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// List users, paginated and optionally filtered.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Admin",
    security(("bearer" = [])),
    params(UserListParams),
    responses(
        (status = 200, body = UserListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<Json<UserListResponse>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let (users, total) = state
        .db
        .search_users(params.search.as_deref(), page, limit)?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserView::from).collect(),
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    }))
}

/// Create an inactive user and mail them an activation link.
///
/// The account gets a random password nobody knows; activation replaces it.
#[utoipa::path(
    post,
    path = "/api/v1/user",
    tag = "Admin",
    security(("bearer" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, body = UserView),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Unknown role"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Auth(admin): Auth,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    require_email(&request.email)?;
    require_non_empty("firstName", &request.first_name)?;
    require_non_empty("lastName", &request.last_name)?;
    let phone_number = request
        .phone_number
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if let Some(phone) = &phone_number {
        require_phone_number(phone)?;
    }
    let roles: BTreeSet<String> = request
        .roles
        .iter()
        .map(|r| normalize_role_name(r))
        .filter(|r| !r.is_empty())
        .collect();

    let initial_password = generate_initial_password(INITIAL_PASSWORD_LEN);
    let password_hash = hash_password_blocking(initial_password)
        .await
        .map_err(ApiError::internal)?;

    let user = state.db.create_user(NewUser {
        email: request.email,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        phone_number,
        password_hash,
        roles,
    })?;

    let token = state
        .tokens
        .issue_verification_token(&user.email, &user.password_hash)
        .map_err(ApiError::internal)?;
    state
        .mailer
        .send(OutgoingMail::activation(
            &state.frontend_url,
            &user.email,
            &token,
        ))
        .map_err(ApiError::internal)?;

    tracing::info!(
        user_id = user.id,
        created_by = admin.user_id,
        roles = ?user.roles,
        "User created"
    );
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Update a user's profile fields.
#[utoipa::path(
    put,
    path = "/api/v1/user/{user_id}",
    tag = "Admin",
    security(("bearer" = [])),
    params(("user_id" = u64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, body = UserView),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserView>, ApiError> {
    if let Some(first_name) = &request.first_name {
        require_non_empty("firstName", first_name)?;
    }
    if let Some(last_name) = &request.last_name {
        require_non_empty("lastName", last_name)?;
    }
    let phone_number = request.phone_number.map(|p| p.trim().to_string());
    if let Some(phone) = phone_number.as_deref().filter(|p| !p.is_empty()) {
        require_phone_number(phone)?;
    }

    let user = state.db.update_profile(
        user_id,
        ProfileUpdate {
            first_name: request.first_name.map(|s| s.trim().to_string()),
            last_name: request.last_name.map(|s| s.trim().to_string()),
            // An empty string clears the number
            phone_number,
        },
    )?;
    Ok(Json(user.into()))
}

/// Delete a user. Admins cannot delete their own account.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "Admin",
    security(("bearer" = [])),
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Attempted self-deletion"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Auth(admin): Auth,
    Path(user_id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    if admin.user_id == user_id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    state.db.delete_user(user_id)?;
    tracing::info!(user_id, deleted_by = admin.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Assign a role to a user.
///
/// The user's current session tokens stop working until they log in again.
#[utoipa::path(
    post,
    path = "/api/v1/user/{user_id}/roles",
    tag = "Admin",
    security(("bearer" = [])),
    params(("user_id" = u64, Path, description = "User ID")),
    request_body = AddRoleRequest,
    responses(
        (status = 200, body = UserView),
        (status = 404, description = "User or role not found"),
        (status = 409, description = "Role already assigned")
    )
)]
pub async fn add_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(request): Json<AddRoleRequest>,
) -> Result<Json<UserView>, ApiError> {
    require_non_empty("roleName", &request.role_name)?;

    let user = state.db.add_user_role(user_id, &request.role_name)?;
    tracing::info!(user_id, role = %request.role_name, "Role assigned");
    Ok(Json(user.into()))
}

/// Remove a role from a user. Removing a role the user lacks is a no-op.
#[utoipa::path(
    delete,
    path = "/api/v1/user/{user_id}/roles/{role_name}",
    tag = "Admin",
    security(("bearer" = [])),
    params(
        ("user_id" = u64, Path, description = "User ID"),
        ("role_name" = String, Path, description = "Role name")
    ),
    responses(
        (status = 204, description = "Role removed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn remove_user_role(
    State(state): State<AppState>,
    Path((user_id, role_name)): Path<(UserId, String)>,
) -> Result<StatusCode, ApiError> {
    if state.db.remove_user_role(user_id, &role_name)? {
        tracing::info!(user_id, role = %role_name, "Role removed");
    }
    Ok(StatusCode::NO_CONTENT)
}
