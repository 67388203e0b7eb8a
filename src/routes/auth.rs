//! Login endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::ApiError;
use crate::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginRes {
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
    pub role: String,
    /// Bound zone for `hc` users.
    pub location: Option<String>,
    /// Display name, if the account has one.
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeRes {
    pub username: String,
    pub role: String,
    pub location: Option<String>,
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Token issued", body = LoginRes),
        (status = 401, description = "Invalid credentials")
    )
)]
/// Exchange credentials for a bearer token.
///
/// The token carries the username, role and bound zone; clients send it back in
/// the `Authorization: Bearer` header on every other endpoint.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<LoginRes>, ApiError> {
    let user = state.users.authenticate(&req.username, &req.password)?;
    let identity = user.identity();
    let access_token = state.tokens.issue(&identity)?;

    tracing::info!(username = %identity.username, role = %identity.role, "login");

    Ok(Json(LoginRes {
        access_token,
        token_type: "bearer".into(),
        role: identity.role.as_str().into(),
        location: identity.location,
        name: user.name,
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The caller's identity", body = MeRes),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
/// Who the presented token belongs to. Clients use this to restore a session.
pub async fn me(AuthUser(identity): AuthUser) -> Json<MeRes> {
    Json(MeRes {
        username: identity.username,
        role: identity.role.as_str().into(),
        location: identity.location,
    })
}
