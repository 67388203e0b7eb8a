//! Referral appointments and their state machine.
//!
//! An appointment is scheduled against a patient's zone, measured by that zone's
//! staff, and then either completed or automatically referred back to the hospital
//! based on the live-entry triage policy. Status never moves back to pending.
//!
//! The readings write and the status transition are two independent gateway writes,
//! not one transaction. If the transition write fails the appointment stays visibly
//! pending with readings stored and no note; resubmitting the visit recomputes the
//! tier and re-attempts both writes, so the recovery path is idempotent.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use refer_types::NonEmptyText;

use crate::patient::Patient;
use crate::session::Identity;
use crate::store::Gateway;
use crate::triage::{bp_level, sugar_level, Tier, TriagePolicy, VitalReadings};
use crate::zone::{in_zone, scope_by_zone};
use crate::{ReferError, ReferResult};

/// Appointment lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Scheduled, awaiting measurement.
    Pending,
    /// Measured with acceptable readings; the visit is closed.
    Completed,
    /// Sent back to the hospital, always with a reason.
    ReferredBack,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::ReferredBack => "referred_back",
        }
    }
}

/// A referral appointment row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub appointment_date: NaiveDate,
    pub note: Option<String>,
    /// Requires a two-round blood-pressure measurement.
    pub req_bp: bool,
    /// Requires a blood-sugar measurement.
    pub req_bs: bool,
    pub status: AppointmentStatus,
    pub bp_sys: Option<i32>,
    pub bp_dia: Option<i32>,
    pub bp_sys_2: Option<i32>,
    pub bp_dia_2: Option<i32>,
    pub blood_sugar: Option<i32>,
    pub refer_back_note: Option<String>,
}

impl Appointment {
    /// The stored measurements, as a classifier input.
    pub fn readings(&self) -> VitalReadings {
        VitalReadings {
            sys1: self.bp_sys,
            dia1: self.bp_dia,
            sys2: self.bp_sys_2,
            dia2: self.bp_dia_2,
            blood_sugar: self.blood_sugar,
        }
    }

    /// Derived risk under the given policy. Never stored; always recomputed so the
    /// displayed tier can never go stale against the stored readings.
    pub fn tier(&self, policy: TriagePolicy) -> Tier {
        policy.classify(&self.readings())
    }
}

/// Payload for scheduling an appointment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub appointment_date: NaiveDate,
    pub note: Option<String>,
    #[serde(default)]
    pub req_bp: bool,
    #[serde(default)]
    pub req_bs: bool,
}

/// An appointment joined with its patient, as the read path returns it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppointmentWithPatient {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient: Patient,
}

impl AppointmentWithPatient {
    pub fn zone(&self) -> Option<&str> {
        self.patient.hc_zone.as_deref()
    }
}

/// Inclusive date-range filter for appointment listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// What the live-entry classifier decided for a visit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VisitOutcome {
    Completed,
    ReferredBack { reason: String },
}

/// Check that every measurement the appointment's flags require is present and a
/// positive integer. Field-level failure, before anything is written.
pub fn validate_required(appointment: &Appointment, readings: &VitalReadings) -> ReferResult<()> {
    fn require(value: Option<i32>, field: &'static str) -> ReferResult<()> {
        match value {
            Some(v) if v > 0 => Ok(()),
            _ => Err(ReferError::MissingMeasurement { field }),
        }
    }

    if appointment.req_bp {
        require(readings.sys1, "bp_sys")?;
        require(readings.dia1, "bp_dia")?;
        require(readings.sys2, "bp_sys_2")?;
        require(readings.dia2, "bp_dia_2")?;
    }
    if appointment.req_bs {
        require(readings.blood_sugar, "blood_sugar")?;
    }
    Ok(())
}

/// Build the auto-referral reason from the readings that triggered it.
///
/// The explanation lists every non-green sub-reading: sugar first, then round-1 BP,
/// then round-2 BP. Round-1 BP shows up here even though the live-entry decision
/// excludes it; the source system does the same on both of its code paths, so this
/// is contract, not an accident to repair.
pub fn build_referral_note(readings: &VitalReadings) -> String {
    let mut parts = Vec::new();

    let sugar = sugar_level(readings.blood_sugar);
    if sugar.requires_referral() {
        parts.push(format!(
            "blood sugar {} ({sugar})",
            readings.blood_sugar.unwrap_or_default()
        ));
    }

    let bp1 = bp_level(readings.sys1);
    if bp1.requires_referral() {
        parts.push(format!(
            "BP round 1 ({}/{})",
            readings.sys1.unwrap_or_default(),
            readings.dia1.unwrap_or_default()
        ));
    }

    let bp2 = bp_level(readings.sys2);
    if bp2.requires_referral() {
        parts.push(format!(
            "BP round 2 ({}/{})",
            readings.sys2.unwrap_or_default(),
            readings.dia2.unwrap_or_default()
        ));
    }

    format!("Automatic referral: {}", parts.join(", "))
}

/// Decide the transition for a pending appointment given new readings.
///
/// Pure: validates the required fields and classifies under the live-entry policy
/// without touching storage.
pub fn plan_visit(
    appointment: &Appointment,
    readings: &VitalReadings,
) -> ReferResult<VisitOutcome> {
    if appointment.status != AppointmentStatus::Pending {
        return Err(ReferError::IllegalTransition(appointment.status.as_str()));
    }

    validate_required(appointment, readings)?;

    let tier = TriagePolicy::LiveEntry.classify(readings);
    if tier.requires_referral() {
        Ok(VisitOutcome::ReferredBack {
            reason: build_referral_note(readings),
        })
    } else {
        Ok(VisitOutcome::Completed)
    }
}

/// Appointment workflow operations, scoped by the acting identity.
#[derive(Clone)]
pub struct AppointmentService {
    gateway: Arc<dyn Gateway>,
}

impl AppointmentService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub(crate) fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// Schedule an appointment. Hospital/admin only; starts pending.
    pub fn create(&self, identity: &Identity, new: NewAppointment) -> ReferResult<AppointmentWithPatient> {
        identity.require_record_manager()?;

        let patient = self
            .gateway
            .find_patient(new.patient_id)?
            .ok_or(ReferError::NotFound("patient"))?;
        let appointment = self.gateway.insert_appointment(new)?;

        Ok(AppointmentWithPatient {
            appointment,
            patient,
        })
    }

    /// List appointments in a date range, joined with their patients and scoped
    /// to the caller's zone.
    pub fn list(
        &self,
        identity: &Identity,
        range: DateRange,
    ) -> ReferResult<Vec<AppointmentWithPatient>> {
        let mut joined = Vec::new();
        for appointment in self.gateway.list_appointments(&range)? {
            let Some(patient) = self.gateway.find_patient(appointment.patient_id)? else {
                tracing::warn!(
                    appointment_id = appointment.id,
                    patient_id = appointment.patient_id,
                    "appointment references a missing patient; skipping"
                );
                continue;
            };
            joined.push(AppointmentWithPatient {
                appointment,
                patient,
            });
        }

        Ok(scope_by_zone(joined, identity, |item| item.zone()))
    }

    /// Record a visit's measurements and drive the automatic transition.
    ///
    /// Readings are persisted first and unconditionally; the status transition is a
    /// second, independent write (see the module docs for the recovery story).
    pub fn record_visit(
        &self,
        identity: &Identity,
        id: i64,
        readings: VitalReadings,
    ) -> ReferResult<AppointmentWithPatient> {
        let (appointment, patient) = self.fetch_in_zone(identity, id)?;

        let outcome = plan_visit(&appointment, &readings)?;

        self.gateway.store_readings(id, &readings)?;

        let appointment = match &outcome {
            VisitOutcome::Completed => {
                self.gateway
                    .transition_appointment(id, AppointmentStatus::Completed, None)?
            }
            VisitOutcome::ReferredBack { reason } => {
                tracing::info!(appointment_id = id, reason, "auto-referring visit");
                self.gateway.transition_appointment(
                    id,
                    AppointmentStatus::ReferredBack,
                    Some(reason.clone()),
                )?
            }
        };

        Ok(AppointmentWithPatient {
            appointment,
            patient,
        })
    }

    /// Manually refer a pending appointment back, bypassing measurement.
    pub fn refer_back(
        &self,
        identity: &Identity,
        id: i64,
        reason: NonEmptyText,
    ) -> ReferResult<AppointmentWithPatient> {
        let (appointment, patient) = self.fetch_in_zone(identity, id)?;

        if appointment.status != AppointmentStatus::Pending {
            return Err(ReferError::IllegalTransition(appointment.status.as_str()));
        }

        let appointment = self.gateway.transition_appointment(
            id,
            AppointmentStatus::ReferredBack,
            Some(reason.into_inner()),
        )?;

        Ok(AppointmentWithPatient {
            appointment,
            patient,
        })
    }

    /// Update an appointment's date and note. Hospital/admin only; measurements and
    /// status are never touched here, and no status restriction applies.
    pub fn edit(
        &self,
        identity: &Identity,
        id: i64,
        date: Option<NaiveDate>,
        note: Option<String>,
    ) -> ReferResult<Appointment> {
        identity.require_record_manager()?;

        if self.gateway.find_appointment(id)?.is_none() {
            return Err(ReferError::NotFound("appointment"));
        }
        self.gateway.update_appointment_schedule(id, date, note)
    }

    /// Delete an appointment, regardless of status. Hospital/admin only.
    pub fn delete(&self, identity: &Identity, id: i64) -> ReferResult<()> {
        identity.require_record_manager()?;

        if self.gateway.find_appointment(id)?.is_none() {
            return Err(ReferError::NotFound("appointment"));
        }
        self.gateway.delete_appointment(id)
    }

    /// Fetch an appointment and its patient, rejecting HC access across zones.
    fn fetch_in_zone(
        &self,
        identity: &Identity,
        id: i64,
    ) -> ReferResult<(Appointment, Patient)> {
        let appointment = self
            .gateway
            .find_appointment(id)?
            .ok_or(ReferError::NotFound("appointment"))?;
        let patient = self
            .gateway
            .find_patient(appointment.patient_id)?
            .ok_or(ReferError::NotFound("patient"))?;

        if !in_zone(identity, patient.hc_zone.as_deref()) {
            return Err(ReferError::Forbidden("not in your zone".into()));
        }

        Ok((appointment, patient))
    }
}
