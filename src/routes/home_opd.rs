//! Home OPD log endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use refer_core::home_opd::{HomeOpdEntry, HomeOpdKind, NewHomeOpdEntry};
use refer_core::ReferError;

use crate::api::ApiError;
use crate::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HomeOpdOut {
    pub id: i64,
    pub patient_id: Option<i64>,
    pub cid: Option<String>,
    pub name: Option<String>,
    /// `patient` or `osm`.
    pub kind: String,
    pub note: Option<String>,
    /// `hospital` or `hc`.
    pub source: String,
    pub location: Option<String>,
    /// ISO date of entry.
    pub created_at: String,
}

impl From<HomeOpdEntry> for HomeOpdOut {
    fn from(entry: HomeOpdEntry) -> Self {
        Self {
            id: entry.id,
            patient_id: entry.patient_id,
            cid: entry.cid,
            name: entry.name,
            kind: match entry.kind {
                HomeOpdKind::Patient => "patient".into(),
                HomeOpdKind::Osm => "osm".into(),
            },
            note: entry.note,
            source: match entry.source {
                refer_core::home_opd::HomeOpdSource::Hospital => "hospital".into(),
                refer_core::home_opd::HomeOpdSource::Hc => "hc".into(),
            },
            location: entry.location,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HomeOpdReq {
    pub patient_id: Option<i64>,
    pub cid: Option<String>,
    pub name: Option<String>,
    /// `patient` or `osm`.
    pub kind: String,
    pub note: Option<String>,
}

fn parse_kind(value: &str) -> Result<HomeOpdKind, ReferError> {
    match value {
        "patient" => Ok(HomeOpdKind::Patient),
        "osm" => Ok(HomeOpdKind::Osm),
        other => Err(ReferError::Validation(format!(
            "unknown home OPD kind: {other}"
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/home-opd",
    responses(
        (status = 200, description = "Entries visible to the caller", body = [HomeOpdOut])
    ),
    security(("bearer" = []))
)]
/// List home OPD entries. HC callers see entries from their zone or linked to
/// one of their patients.
pub async fn list_home_opd(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<HomeOpdOut>>, ApiError> {
    let entries = state.home_opd.list(&identity)?;
    Ok(Json(entries.into_iter().map(HomeOpdOut::from).collect()))
}

#[utoipa::path(
    post,
    path = "/home-opd",
    request_body = HomeOpdReq,
    responses(
        (status = 201, description = "Entry logged", body = HomeOpdOut),
        (status = 400, description = "Neither cid nor patient_id supplied")
    ),
    security(("bearer" = []))
)]
/// Log a home OPD case. Source and location come from the caller's identity.
pub async fn create_home_opd(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(req): Json<HomeOpdReq>,
) -> Result<(StatusCode, Json<HomeOpdOut>), ApiError> {
    let new = NewHomeOpdEntry {
        patient_id: req.patient_id,
        cid: req.cid,
        name: req.name,
        kind: parse_kind(&req.kind)?,
        note: req.note,
    };
    let entry = state
        .home_opd
        .create(&identity, new, Utc::now().date_naive())?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}
