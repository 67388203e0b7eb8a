//! Home OPD log.
//!
//! A lightweight intake list for home-visit outpatient cases, entered either by
//! hospital staff or by a health center, optionally linked to a registered patient.
//! HC users see entries created in their zone or linked to a patient of their zone.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::session::{Identity, Role, ZoneScope};
use crate::store::Gateway;
use crate::{ReferError, ReferResult};

/// What kind of case the entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeOpdKind {
    /// A registered or identifiable patient.
    Patient,
    /// A village health volunteer referral.
    Osm,
}

/// Which side of the network created the entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeOpdSource {
    Hospital,
    Hc,
}

/// A home OPD entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeOpdEntry {
    pub id: i64,
    /// Link to a registered patient, if known.
    pub patient_id: Option<i64>,
    /// National identity number for unlinked entries.
    pub cid: Option<String>,
    pub name: Option<String>,
    pub kind: HomeOpdKind,
    pub note: Option<String>,
    pub source: HomeOpdSource,
    /// Creator's zone, used for HC filtering of unlinked entries.
    pub location: Option<String>,
    /// ISO date of entry.
    pub created_at: String,
}

/// Payload for logging a home OPD case.
#[derive(Clone, Debug, Deserialize)]
pub struct NewHomeOpdEntry {
    pub patient_id: Option<i64>,
    pub cid: Option<String>,
    pub name: Option<String>,
    pub kind: HomeOpdKind,
    pub note: Option<String>,
}

/// Home OPD operations.
#[derive(Clone)]
pub struct HomeOpdService {
    gateway: Arc<dyn Gateway>,
}

impl HomeOpdService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Log an entry. Source and location come from the acting identity, not the
    /// payload.
    pub fn create(
        &self,
        identity: &Identity,
        new: NewHomeOpdEntry,
        today: chrono::NaiveDate,
    ) -> ReferResult<HomeOpdEntry> {
        if new.cid.as_deref().map_or(true, |c| c.trim().is_empty())
            && new.patient_id.is_none()
        {
            return Err(ReferError::Validation(
                "cid or patient_id is required".into(),
            ));
        }

        let source = match identity.role {
            Role::Admin | Role::Hospital => HomeOpdSource::Hospital,
            Role::Hc => HomeOpdSource::Hc,
        };

        self.gateway.insert_home_opd(
            new,
            source,
            identity.location.clone(),
            today.format("%Y-%m-%d").to_string(),
        )
    }

    /// List entries visible to `identity`: everything for hospital/admin; for HC,
    /// entries whose location matches the bound zone or whose linked patient belongs
    /// to it.
    pub fn list(&self, identity: &Identity) -> ReferResult<Vec<HomeOpdEntry>> {
        let entries = self.gateway.list_home_opd()?;

        let bound = match identity.zone_scope() {
            ZoneScope::All => return Ok(entries),
            ZoneScope::Zone(bound) => bound,
            ZoneScope::Nothing => return Ok(Vec::new()),
        };

        let mut visible = Vec::new();
        for entry in entries {
            if entry.location.as_deref() == Some(bound) {
                visible.push(entry);
                continue;
            }
            if let Some(patient_id) = entry.patient_id {
                if let Some(patient) = self.gateway.find_patient(patient_id)? {
                    if patient.hc_zone.as_deref() == Some(bound) {
                        visible.push(entry);
                    }
                }
            }
        }
        Ok(visible)
    }
}
