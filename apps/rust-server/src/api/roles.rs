// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Role catalogue endpoints (admin only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::validation::require_non_empty;
use crate::{
    auth::ADMIN_ROLE,
    error::ApiError,
    state::AppState,
    storage::{normalize_role_name, StoredRole},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleRequest {
    pub name: String,
}

fn reject_admin_role(name: &str) -> Result<(), ApiError> {
    if normalize_role_name(name) == ADMIN_ROLE {
        return Err(ApiError::bad_request("The admin role cannot be modified"));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "Roles",
    security(("bearer" = [])),
    responses((status = 200, body = Vec<StoredRole>))
)]
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<StoredRole>>, ApiError> {
    Ok(Json(state.db.list_roles()?))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles",
    tag = "Roles",
    security(("bearer" = [])),
    request_body = RoleRequest,
    responses(
        (status = 201, body = StoredRole),
        (status = 409, description = "Role already exists")
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    Json(request): Json<RoleRequest>,
) -> Result<(StatusCode, Json<StoredRole>), ApiError> {
    require_non_empty("name", &request.name)?;

    let role = state.db.create_role(&request.name)?;
    tracing::info!(role = %role.name, "Role created");
    Ok((StatusCode::CREATED, Json(role)))
}

/// Rename a role. Users holding it are moved to the new name.
#[utoipa::path(
    put,
    path = "/api/v1/roles/{role_name}",
    tag = "Roles",
    security(("bearer" = [])),
    params(("role_name" = String, Path, description = "Current role name")),
    request_body = RoleRequest,
    responses(
        (status = 200, body = StoredRole),
        (status = 400, description = "The admin role cannot be renamed"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Target name already exists")
    )
)]
pub async fn rename_role(
    State(state): State<AppState>,
    Path(role_name): Path<String>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<StoredRole>, ApiError> {
    require_non_empty("name", &request.name)?;
    reject_admin_role(&role_name)?;
    reject_admin_role(&request.name)?;

    let role = state.db.rename_role(&role_name, &request.name)?;
    tracing::info!(from = %role_name, to = %role.name, "Role renamed");
    Ok(Json(role))
}

/// Delete a role. Fails while any user still holds it.
#[utoipa::path(
    delete,
    path = "/api/v1/roles/{role_name}",
    tag = "Roles",
    security(("bearer" = [])),
    params(("role_name" = String, Path, description = "Role name")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 400, description = "The admin role cannot be deleted"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Role still assigned")
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(role_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    reject_admin_role(&role_name)?;

    state.db.delete_role(&role_name)?;
    tracing::info!(role = %role_name, "Role deleted");
    Ok(StatusCode::NO_CONTENT)
}
