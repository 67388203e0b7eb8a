//! Staff account administration. Admin-only; enforced in the core service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use refer_core::account::{NewUser, User, UserPatch};
use refer_core::session::Role;
use refer_core::ReferError;

use crate::api::ApiError;
use crate::auth::AuthUser;
use crate::state::AppState;

/// Account as returned on the wire; the password hash never leaves the server.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub location_name: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role.as_str().into(),
            location_name: user.location_name,
            name: user.name,
            position: user.position,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCreateReq {
    pub username: String,
    pub password: String,
    /// `admin`, `hospital` or `hc`.
    pub role: String,
    pub location_name: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserUpdateReq {
    /// New password; omitted or empty leaves the current one.
    pub password: Option<String>,
    pub role: Option<String>,
    pub location_name: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
}

fn parse_role(value: &str) -> Result<Role, ReferError> {
    value.parse()
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All accounts", body = [UserOut]),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<UserOut>>, ApiError> {
    let users = state.users.list(&identity)?;
    Ok(Json(users.into_iter().map(UserOut::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = UserCreateReq,
    responses(
        (status = 201, description = "Account created", body = UserOut),
        (status = 409, description = "Username taken")
    ),
    security(("bearer" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(req): Json<UserCreateReq>,
) -> Result<(StatusCode, Json<UserOut>), ApiError> {
    let new = NewUser {
        username: req.username,
        password: req.password,
        role: parse_role(&req.role)?,
        location_name: req.location_name,
        name: req.name,
        position: req.position,
    };
    let user = state.users.create(&identity, new)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "Account id")),
    request_body = UserUpdateReq,
    responses(
        (status = 200, description = "Account updated", body = UserOut),
        (status = 404, description = "No such account")
    ),
    security(("bearer" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdateReq>,
) -> Result<Json<UserOut>, ApiError> {
    let patch = UserPatch {
        password: req.password,
        role: req.role.as_deref().map(parse_role).transpose()?,
        location_name: req.location_name,
        name: req.name,
        position: req.position,
    };
    let user = state.users.update(&identity, id, patch)?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Attempted self-deletion"),
        (status = 404, description = "No such account")
    ),
    security(("bearer" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.users.delete(&identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}
