//! Export contract for completed and referred visits.
//!
//! The spreadsheet writer is an external collaborator; this module shapes the rows
//! it receives. The risk column is recomputed from the stored readings under the
//! reporting policy, which — unlike the live-entry policy — includes the round-1
//! blood pressure.

use serde::Serialize;

use crate::appointment::AppointmentWithPatient;
use crate::calendar::format_thai;
use crate::triage::{Tier, TriagePolicy};

/// One export row, display-formatted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    /// Appointment date in Buddhist-era display form.
    pub date: String,
    pub hn: String,
    pub name: String,
    pub zone: String,
    /// `sys/dia`, or `-` unless both halves are present.
    pub bp_round_1: String,
    pub bp_round_2: String,
    pub blood_sugar: String,
    /// Reporting-policy tier; `-` when no reading produced one.
    pub risk: String,
}

fn bp_cell(sys: Option<i32>, dia: Option<i32>) -> String {
    match (sys, dia) {
        (Some(s), Some(d)) if s > 0 && d > 0 => format!("{s}/{d}"),
        _ => "-".to_string(),
    }
}

fn sugar_cell(value: Option<i32>) -> String {
    match value {
        Some(v) if v > 0 => v.to_string(),
        _ => "-".to_string(),
    }
}

fn risk_cell(tier: Tier) -> String {
    match tier {
        Tier::None => "-".to_string(),
        other => other.as_str().to_string(),
    }
}

/// Shape a visit list into export rows, sorted by appointment date.
pub fn export_rows(visits: &[AppointmentWithPatient]) -> Vec<ExportRow> {
    let mut sorted: Vec<&AppointmentWithPatient> = visits.iter().collect();
    sorted.sort_by_key(|v| v.appointment.appointment_date);

    sorted
        .into_iter()
        .map(|visit| {
            let a = &visit.appointment;
            ExportRow {
                date: format_thai(a.appointment_date),
                hn: visit.patient.hn.clone(),
                name: visit.patient.name.clone(),
                zone: visit
                    .patient
                    .hc_zone
                    .clone()
                    .unwrap_or_else(|| "-".to_string()),
                bp_round_1: bp_cell(a.bp_sys, a.bp_dia),
                bp_round_2: bp_cell(a.bp_sys_2, a.bp_dia_2),
                blood_sugar: sugar_cell(a.blood_sugar),
                risk: risk_cell(a.tier(TriagePolicy::Reporting)),
            }
        })
        .collect()
}
