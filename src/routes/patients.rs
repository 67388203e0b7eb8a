//! Patient directory endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use refer_core::import::{ImportRow, ImportSummary};
use refer_core::patient::{NewPatient, Patient};

use crate::api::ApiError;
use crate::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PatientOut {
    pub id: i64,
    pub hn: String,
    pub name: String,
    pub cid: String,
    pub phone: Option<String>,
    pub medical_rights: Option<String>,
    pub clinic: Option<String>,
    pub house_no: Option<String>,
    pub moo: Option<String>,
    pub tumbol: Option<String>,
    pub amphoe: Option<String>,
    pub province: Option<String>,
    pub hc_zone: Option<String>,
}

impl From<Patient> for PatientOut {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            hn: p.hn,
            name: p.name,
            cid: p.cid,
            phone: p.phone,
            medical_rights: p.medical_rights,
            clinic: p.clinic,
            house_no: p.house_no,
            moo: p.moo,
            tumbol: p.tumbol,
            amphoe: p.amphoe,
            province: p.province,
            hc_zone: p.hc_zone,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PatientReq {
    pub hn: String,
    pub name: String,
    pub cid: String,
    pub phone: Option<String>,
    pub medical_rights: Option<String>,
    pub clinic: Option<String>,
    pub house_no: Option<String>,
    pub moo: Option<String>,
    pub tumbol: Option<String>,
    pub amphoe: Option<String>,
    pub province: Option<String>,
    pub hc_zone: Option<String>,
}

impl From<PatientReq> for NewPatient {
    fn from(req: PatientReq) -> Self {
        Self {
            hn: req.hn,
            name: req.name,
            cid: req.cid,
            phone: req.phone,
            medical_rights: req.medical_rights,
            clinic: req.clinic,
            house_no: req.house_no,
            moo: req.moo,
            tumbol: req.tumbol,
            amphoe: req.amphoe,
            province: req.province,
            hc_zone: req.hc_zone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub hn: Option<String>,
    pub cid: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportSummaryRes {
    pub created: usize,
    pub rejected: usize,
}

impl From<ImportSummary> for ImportSummaryRes {
    fn from(summary: ImportSummary) -> Self {
        Self {
            created: summary.created,
            rejected: summary.rejected,
        }
    }
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "Patients visible to the caller", body = [PatientOut])
    ),
    security(("bearer" = []))
)]
/// List patients. HC callers only receive their own zone.
pub async fn list_patients(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<PatientOut>>, ApiError> {
    let patients = state.patients.list(&identity)?;
    Ok(Json(patients.into_iter().map(PatientOut::from).collect()))
}

#[utoipa::path(
    get,
    path = "/patients/search",
    params(
        ("hn" = Option<String>, Query, description = "Hospital number"),
        ("cid" = Option<String>, Query, description = "National identity number")
    ),
    responses(
        (status = 200, description = "Matching patient", body = PatientOut),
        (status = 404, description = "No match in the caller's scope")
    ),
    security(("bearer" = []))
)]
/// Look a patient up by HN or CID. Out-of-zone matches read as not found.
pub async fn search_patient(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<PatientOut>, ApiError> {
    let patient = state
        .patients
        .search(&identity, params.hn.as_deref(), params.cid.as_deref())?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientReq,
    responses(
        (status = 201, description = "Patient registered", body = PatientOut),
        (status = 409, description = "HN or CID already exists")
    ),
    security(("bearer" = []))
)]
/// Register a patient. HC callers' patients land in their own zone regardless of
/// the submitted value.
pub async fn create_patient(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(req): Json<PatientReq>,
) -> Result<(StatusCode, Json<PatientOut>), ApiError> {
    let patient = state.patients.create(&identity, req.into())?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = PatientReq,
    responses(
        (status = 200, description = "Patient updated", body = PatientOut),
        (status = 404, description = "No such patient")
    ),
    security(("bearer" = []))
)]
pub async fn update_patient(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<PatientReq>,
) -> Result<Json<PatientOut>, ApiError> {
    let patient = state.patients.update(&identity, id, req.into())?;
    Ok(Json(patient.into()))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 204, description = "Patient and their appointments deleted"),
        (status = 404, description = "No such patient")
    ),
    security(("bearer" = []))
)]
pub async fn delete_patient(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.patients.delete(&identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/patients/import",
    request_body = Object,
    responses(
        (status = 200, description = "Per-row import tally", body = ImportSummaryRes),
        (status = 403, description = "HC staff cannot bulk import")
    ),
    security(("bearer" = []))
)]
/// Bulk import from a parsed spreadsheet: an array of header-to-cell maps.
/// One bad row never blocks the batch.
pub async fn import_patients(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(rows): Json<Vec<ImportRow>>,
) -> Result<Json<ImportSummaryRes>, ApiError> {
    let summary = state.patients.import_rows(&identity, &rows)?;
    tracing::info!(
        created = summary.created,
        rejected = summary.rejected,
        "bulk patient import"
    );
    Ok(Json(summary.into()))
}
