//! Referral appointment endpoints: scheduling, visit entry, the refer-back path,
//! batch submission and export.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use refer_core::appointment::{AppointmentWithPatient, DateRange, NewAppointment};
use refer_core::export::{export_rows, ExportRow};
use refer_core::triage::{TriagePolicy, VitalReadings};
use refer_types::NonEmptyText;

use crate::api::ApiError;
use crate::auth::AuthUser;
use crate::routes::patients::PatientOut;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentOut {
    pub id: i64,
    pub patient_id: i64,
    pub appointment_date: NaiveDate,
    pub note: Option<String>,
    pub req_bp: bool,
    pub req_bs: bool,
    /// `pending`, `completed` or `referred_back`.
    pub status: String,
    pub bp_sys: Option<i32>,
    pub bp_dia: Option<i32>,
    pub bp_sys_2: Option<i32>,
    pub bp_dia_2: Option<i32>,
    pub blood_sugar: Option<i32>,
    pub refer_back_note: Option<String>,
    /// Reporting-policy tier, re-derived from the stored readings.
    pub risk: String,
    pub patient: PatientOut,
}

impl From<AppointmentWithPatient> for AppointmentOut {
    fn from(joined: AppointmentWithPatient) -> Self {
        let a = joined.appointment;
        let risk = a.tier(TriagePolicy::Reporting).as_str().to_string();
        Self {
            id: a.id,
            patient_id: a.patient_id,
            appointment_date: a.appointment_date,
            note: a.note,
            req_bp: a.req_bp,
            req_bs: a.req_bs,
            status: a.status.as_str().into(),
            bp_sys: a.bp_sys,
            bp_dia: a.bp_dia,
            bp_sys_2: a.bp_sys_2,
            bp_dia_2: a.bp_dia_2,
            blood_sugar: a.blood_sugar,
            refer_back_note: a.refer_back_note,
            risk,
            patient: joined.patient.into(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleReq {
    pub patient_id: i64,
    pub appointment_date: NaiveDate,
    pub note: Option<String>,
    #[serde(default)]
    pub req_bp: bool,
    #[serde(default)]
    pub req_bs: bool,
}

impl From<ScheduleReq> for NewAppointment {
    fn from(req: ScheduleReq) -> Self {
        Self {
            patient_id: req.patient_id,
            appointment_date: req.appointment_date,
            note: req.note,
            req_bp: req.req_bp,
            req_bs: req.req_bs,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl From<RangeParams> for DateRange {
    fn from(params: RangeParams) -> Self {
        Self {
            start: params.start,
            end: params.end,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VisitReq {
    pub bp_sys: Option<i32>,
    pub bp_dia: Option<i32>,
    pub bp_sys_2: Option<i32>,
    pub bp_dia_2: Option<i32>,
    pub blood_sugar: Option<i32>,
}

impl From<VisitReq> for VitalReadings {
    fn from(req: VisitReq) -> Self {
        Self {
            sys1: req.bp_sys,
            dia1: req.bp_dia,
            sys2: req.bp_sys_2,
            dia2: req.bp_dia_2,
            blood_sugar: req.blood_sugar,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReferBackReq {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EditReq {
    pub appointment_date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// An appointment row without its patient join, as the edit endpoint returns it.
#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentRowOut {
    pub id: i64,
    pub patient_id: i64,
    pub appointment_date: NaiveDate,
    pub note: Option<String>,
    pub req_bp: bool,
    pub req_bs: bool,
    pub status: String,
    pub bp_sys: Option<i32>,
    pub bp_dia: Option<i32>,
    pub bp_sys_2: Option<i32>,
    pub bp_dia_2: Option<i32>,
    pub blood_sugar: Option<i32>,
    pub refer_back_note: Option<String>,
}

impl From<refer_core::appointment::Appointment> for AppointmentRowOut {
    fn from(a: refer_core::appointment::Appointment) -> Self {
        Self {
            id: a.id,
            patient_id: a.patient_id,
            appointment_date: a.appointment_date,
            note: a.note,
            req_bp: a.req_bp,
            req_bs: a.req_bs,
            status: a.status.as_str().into(),
            bp_sys: a.bp_sys,
            bp_dia: a.bp_dia,
            bp_sys_2: a.bp_sys_2,
            bp_dia_2: a.bp_dia_2,
            blood_sugar: a.blood_sugar,
            refer_back_note: a.refer_back_note,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchRes {
    pub success: usize,
    pub failed: usize,
    /// Whether the submitting client should clear its cart.
    pub clear_cart: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExportRowOut {
    /// Appointment date in Buddhist-era display form, `DD/MM/YYYY`.
    pub date: String,
    pub hn: String,
    pub name: String,
    pub zone: String,
    pub bp_round_1: String,
    pub bp_round_2: String,
    pub blood_sugar: String,
    pub risk: String,
}

impl From<ExportRow> for ExportRowOut {
    fn from(row: ExportRow) -> Self {
        Self {
            date: row.date,
            hn: row.hn,
            name: row.name,
            zone: row.zone,
            bp_round_1: row.bp_round_1,
            bp_round_2: row.bp_round_2,
            blood_sugar: row.blood_sugar,
            risk: row.risk,
        }
    }
}

#[utoipa::path(
    get,
    path = "/appointments",
    params(
        ("start" = Option<String>, Query, description = "Inclusive start date, YYYY-MM-DD"),
        ("end" = Option<String>, Query, description = "Inclusive end date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Appointments in range, scoped to the caller", body = [AppointmentOut])
    ),
    security(("bearer" = []))
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<AppointmentOut>>, ApiError> {
    let joined = state.appointments.list(&identity, params.into())?;
    Ok(Json(joined.into_iter().map(AppointmentOut::from).collect()))
}

#[utoipa::path(
    post,
    path = "/appointments",
    request_body = ScheduleReq,
    responses(
        (status = 201, description = "Appointment scheduled", body = AppointmentOut),
        (status = 404, description = "No such patient")
    ),
    security(("bearer" = []))
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(req): Json<ScheduleReq>,
) -> Result<(StatusCode, Json<AppointmentOut>), ApiError> {
    let joined = state.appointments.create(&identity, req.into())?;
    Ok((StatusCode::CREATED, Json(joined.into())))
}

#[utoipa::path(
    post,
    path = "/appointments/batch",
    request_body = [ScheduleReq],
    responses(
        (status = 200, description = "Per-item tally", body = BatchRes)
    ),
    security(("bearer" = []))
)]
/// Schedule a cart of appointments. Items fail independently; the tally reports
/// how many stuck.
pub async fn batch_appointments(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(items): Json<Vec<ScheduleReq>>,
) -> Result<Json<BatchRes>, ApiError> {
    let items = items.into_iter().map(NewAppointment::from).collect();
    let outcome = state.appointments.submit_batch(&identity, items)?;
    Ok(Json(BatchRes {
        success: outcome.success,
        failed: outcome.failed,
        clear_cart: outcome.clears_cart(),
    }))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/visit",
    params(("id" = i64, Path, description = "Appointment id")),
    request_body = VisitReq,
    responses(
        (status = 200, description = "Visit recorded; status reflects the triage outcome", body = AppointmentOut),
        (status = 400, description = "Missing required measurement or not pending"),
        (status = 403, description = "Appointment outside the caller's zone")
    ),
    security(("bearer" = []))
)]
/// Record a visit's measurements. The server classifies the readings and either
/// completes the appointment or refers it back with a generated reason.
pub async fn record_visit(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<VisitReq>,
) -> Result<Json<AppointmentOut>, ApiError> {
    let joined = state.appointments.record_visit(&identity, id, req.into())?;
    Ok(Json(joined.into()))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}/refer-back",
    params(("id" = i64, Path, description = "Appointment id")),
    request_body = ReferBackReq,
    responses(
        (status = 200, description = "Appointment referred back", body = AppointmentOut),
        (status = 400, description = "Empty reason or not pending")
    ),
    security(("bearer" = []))
)]
/// Manually refer a pending appointment back, bypassing measurement.
pub async fn refer_back(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<ReferBackReq>,
) -> Result<Json<AppointmentOut>, ApiError> {
    let reason = NonEmptyText::new(req.reason).map_err(refer_core::ReferError::from)?;
    let joined = state.appointments.refer_back(&identity, id, reason)?;
    Ok(Json(joined.into()))
}

#[utoipa::path(
    put,
    path = "/appointments/{id}",
    params(("id" = i64, Path, description = "Appointment id")),
    request_body = EditReq,
    responses(
        (status = 200, description = "Date/note updated; measurements and status untouched", body = AppointmentRowOut),
        (status = 404, description = "No such appointment")
    ),
    security(("bearer" = []))
)]
pub async fn edit_appointment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<EditReq>,
) -> Result<Json<AppointmentRowOut>, ApiError> {
    let appointment = state
        .appointments
        .edit(&identity, id, req.appointment_date, req.note)?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 204, description = "Appointment deleted"),
        (status = 404, description = "No such appointment")
    ),
    security(("bearer" = []))
)]
pub async fn delete_appointment(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.appointments.delete(&identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/appointments/export",
    params(
        ("start" = Option<String>, Query, description = "Inclusive start date, YYYY-MM-DD"),
        ("end" = Option<String>, Query, description = "Inclusive end date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Spreadsheet-shaped rows for completed and referred visits", body = [ExportRowOut])
    ),
    security(("bearer" = []))
)]
/// Export rows for review: non-pending visits in range, date-sorted, with the
/// reporting-policy risk column.
pub async fn export_appointments(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<ExportRowOut>>, ApiError> {
    use refer_core::appointment::AppointmentStatus;

    let joined: Vec<AppointmentWithPatient> = state
        .appointments
        .list(&identity, params.into())?
        .into_iter()
        .filter(|v| v.appointment.status != AppointmentStatus::Pending)
        .collect();

    let rows = export_rows(&joined);
    Ok(Json(rows.into_iter().map(ExportRowOut::from).collect()))
}
