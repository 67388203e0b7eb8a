//! Patient records and the patient directory service.
//!
//! Patients are owned by a zone (the community health center responsible for them)
//! and referenced by appointments. HN and CID are unique across the network; the
//! gateway enforces both on insert and update.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::session::{Identity, ZoneScope};
use crate::store::Gateway;
use crate::zone::scope_patients;
use crate::{ReferError, ReferResult};

/// A registered patient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    /// Hospital number; unique.
    pub hn: String,
    pub name: String,
    /// National identity number (13 digits); unique.
    pub cid: String,
    pub phone: Option<String>,
    pub medical_rights: Option<String>,
    /// Clinic type, e.g. diabetes, hypertension or both.
    pub clinic: Option<String>,
    pub house_no: Option<String>,
    /// Village number.
    pub moo: Option<String>,
    /// Sub-district.
    pub tumbol: Option<String>,
    /// District.
    pub amphoe: Option<String>,
    pub province: Option<String>,
    /// Owning facility; matches an `hc` user's bound zone.
    pub hc_zone: Option<String>,
}

/// Payload for creating or replacing a patient record.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewPatient {
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

impl NewPatient {
    fn validate(&self) -> ReferResult<()> {
        if self.hn.trim().is_empty() {
            return Err(ReferError::Validation("hn is required".into()));
        }
        if self.name.trim().is_empty() {
            return Err(ReferError::Validation("name is required".into()));
        }
        if self.cid.trim().is_empty() {
            return Err(ReferError::Validation("cid is required".into()));
        }
        Ok(())
    }
}

/// Patient directory operations, scoped by the acting identity.
#[derive(Clone)]
pub struct PatientService {
    gateway: Arc<dyn Gateway>,
}

impl PatientService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub(crate) fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// List patients visible to `identity`. HC users only receive their zone.
    pub fn list(&self, identity: &Identity) -> ReferResult<Vec<Patient>> {
        let patients = self.gateway.list_patients()?;
        Ok(scope_patients(patients, identity))
    }

    /// Look a patient up by HN or CID.
    ///
    /// Out-of-zone matches are reported as not found rather than denied, so the
    /// lookup does not confirm the existence of records outside the caller's zone.
    pub fn search(
        &self,
        identity: &Identity,
        hn: Option<&str>,
        cid: Option<&str>,
    ) -> ReferResult<Patient> {
        let found = match (hn, cid) {
            (Some(hn), _) => self.gateway.find_patient_by_hn(hn)?,
            (None, Some(cid)) => self.gateway.find_patient_by_cid(cid)?,
            (None, None) => {
                return Err(ReferError::Validation("hn or cid is required".into()))
            }
        };

        match found {
            Some(p) if crate::zone::in_zone(identity, p.hc_zone.as_deref()) => Ok(p),
            _ => Err(ReferError::NotFound("patient")),
        }
    }

    /// Create a patient. All staff roles may create; an HC user's patients are
    /// forced into the creator's own zone regardless of the submitted value.
    pub fn create(&self, identity: &Identity, mut new: NewPatient) -> ReferResult<Patient> {
        new.validate()?;

        match identity.zone_scope() {
            ZoneScope::All => {}
            ZoneScope::Zone(bound) => {
                if new.hc_zone.as_deref() != Some(bound) {
                    tracing::debug!(
                        zone = bound,
                        "overriding submitted zone with creator's bound zone"
                    );
                    new.hc_zone = Some(bound.to_string());
                }
            }
            ZoneScope::Nothing => {
                return Err(ReferError::Forbidden(
                    "hc account has no zone binding".into(),
                ));
            }
        }

        self.gateway.insert_patient(new)
    }

    /// Replace a patient's fields. Hospital/admin only.
    pub fn update(&self, identity: &Identity, id: i64, new: NewPatient) -> ReferResult<Patient> {
        identity.require_record_manager()?;
        new.validate()?;
        self.gateway.update_patient(id, new)
    }

    /// Delete a patient and, with it, the patient's appointments. Hospital/admin only.
    pub fn delete(&self, identity: &Identity, id: i64) -> ReferResult<()> {
        identity.require_record_manager()?;
        self.gateway.delete_patient(id)
    }
}

#[cfg(test)]
impl Patient {
    pub(crate) fn sample() -> Self {
        Patient {
            id: 1,
            hn: "650001".into(),
            name: "Somchai Test".into(),
            cid: "1100200300401".into(),
            phone: None,
            medical_rights: None,
            clinic: None,
            house_no: None,
            moo: None,
            tumbol: None,
            amphoe: None,
            province: None,
            hc_zone: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use crate::store::MemoryGateway;

    fn service() -> PatientService {
        PatientService::new(Arc::new(MemoryGateway::new()))
    }

    fn new_patient(hn: &str, cid: &str, zone: &str) -> NewPatient {
        NewPatient {
            hn: hn.into(),
            name: "Test Patient".into(),
            cid: cid.into(),
            hc_zone: Some(zone.into()),
            ..NewPatient::default()
        }
    }

    fn hospital() -> Identity {
        Identity::new("clerk", Role::Hospital, None)
    }

    #[test]
    fn hc_creation_forces_own_zone() {
        let service = service();
        let hc = Identity::new("nurse", Role::Hc, Some("Ban Puan Phu HPH".into()));

        let created = service
            .create(&hc, new_patient("650001", "1100200300401", "Nong Hin Hospital"))
            .expect("create patient");
        assert_eq!(created.hc_zone.as_deref(), Some("Ban Puan Phu HPH"));
    }

    #[test]
    fn unbound_hc_cannot_create_patients() {
        let service = service();
        let unbound = Identity::new("nurse", Role::Hc, None);

        let err = service
            .create(&unbound, new_patient("650001", "1100200300401", "Nong Hin Hospital"))
            .expect_err("no zone binding");
        assert!(matches!(err, ReferError::Forbidden(_)));
    }

    #[test]
    fn duplicate_hn_and_cid_are_conflicts() {
        let service = service();
        service
            .create(&hospital(), new_patient("650001", "1100200300401", "Nong Hin Hospital"))
            .expect("first create");

        let err = service
            .create(&hospital(), new_patient("650001", "1100200300402", "Nong Hin Hospital"))
            .expect_err("duplicate hn");
        assert!(matches!(err, ReferError::Conflict(_)));

        let err = service
            .create(&hospital(), new_patient("650002", "1100200300401", "Nong Hin Hospital"))
            .expect_err("duplicate cid");
        assert!(matches!(err, ReferError::Conflict(_)));
    }

    #[test]
    fn search_hides_out_of_zone_patients() {
        let service = service();
        service
            .create(&hospital(), new_patient("650001", "1100200300401", "Nong Hin Hospital"))
            .expect("create");

        let other_hc = Identity::new("nurse", Role::Hc, Some("Ban Puan Phu HPH".into()));
        let err = service
            .search(&other_hc, Some("650001"), None)
            .expect_err("out of zone");
        assert!(matches!(err, ReferError::NotFound("patient")));

        let found = service
            .search(&hospital(), Some("650001"), None)
            .expect("in scope");
        assert_eq!(found.hn, "650001");
    }

    #[test]
    fn missing_patient_is_not_found() {
        let service = service();
        let err = service
            .search(&hospital(), None, Some("9999999999999"))
            .expect_err("absent cid");
        assert!(matches!(err, ReferError::NotFound("patient")));
    }

    #[test]
    fn hc_cannot_update_or_delete() {
        let service = service();
        let created = service
            .create(&hospital(), new_patient("650001", "1100200300401", "Nong Hin Hospital"))
            .expect("create");

        let hc = Identity::new("nurse", Role::Hc, Some("Nong Hin Hospital".into()));
        assert!(matches!(
            service.update(&hc, created.id, new_patient("650001", "1100200300401", "x")),
            Err(ReferError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&hc, created.id),
            Err(ReferError::Forbidden(_))
        ));
    }
}
