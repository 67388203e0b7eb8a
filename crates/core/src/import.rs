//! Bulk patient import contract.
//!
//! The spreadsheet parser itself is an external collaborator; this module defines
//! the row contract it must feed: a map of header to cell value per patient row,
//! with the header contract `[HN, Name, CID, Phone, Rights, Clinic, HouseNo, Moo,
//! Tumbol, Amphoe, Province]` plus an optional `Zone` column. Real exports from the
//! hospital system vary their header spellings, so each field accepts a small alias
//! set.
//!
//! Rows missing an HN or CID are rejected; duplicates are rejected both within the
//! file and against records already in the gateway. A row without an explicit zone
//! gets one resolved from its address via the catchment table.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::patient::{NewPatient, PatientService};
use crate::session::Identity;
use crate::zone::resolve_zone;
use crate::ReferResult;

/// The fixed header contract for bulk patient files.
pub const HEADER_CONTRACT: [&str; 11] = [
    "HN", "Name", "CID", "Phone", "Rights", "Clinic", "HouseNo", "Moo", "Tumbol", "Amphoe",
    "Province",
];

/// One tabular row, keyed by the file's header cells.
pub type ImportRow = HashMap<String, String>;

/// Outcome of a bulk import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub rejected: usize,
}

/// First non-blank value among the accepted header spellings for a field.
fn get_val(row: &ImportRow, keys: &[&str]) -> String {
    for key in keys {
        if let Some(value) = row.get(*key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("nan") {
                return trimmed.to_string();
            }
        }
    }
    String::new()
}

fn opt(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl PatientService {
    /// Ingest a batch of patient rows, creating what can be created and counting
    /// the rest as rejected. Per-row isolation: one bad row never blocks the batch.
    pub fn import_rows(
        &self,
        identity: &Identity,
        rows: &[ImportRow],
    ) -> ReferResult<ImportSummary> {
        identity.require_record_manager()?;

        let mut summary = ImportSummary::default();
        let mut seen_hns: HashSet<String> = HashSet::new();
        let mut seen_cids: HashSet<String> = HashSet::new();

        for row in rows {
            let hn = get_val(row, &["HN", "hn", "Hn"]);
            if hn.is_empty()
                || seen_hns.contains(&hn)
                || self.gateway().find_patient_by_hn(&hn)?.is_some()
            {
                summary.rejected += 1;
                continue;
            }

            let cid = get_val(row, &["CID", "cid", "Cid"]);
            if cid.is_empty()
                || seen_cids.contains(&cid)
                || self.gateway().find_patient_by_cid(&cid)?.is_some()
            {
                summary.rejected += 1;
                continue;
            }

            // Claim the keys now so in-file duplicates of this row are rejected.
            seen_hns.insert(hn.clone());
            seen_cids.insert(cid.clone());

            let tumbol = get_val(row, &["Tumbol", "tumbol"]);
            let moo = get_val(row, &["Moo", "moo"]);

            let zone = match opt(get_val(row, &["Zone", "zone"])) {
                Some(zone) => zone,
                None => resolve_zone(&tumbol, &moo).to_string(),
            };

            let new = NewPatient {
                hn,
                name: get_val(row, &["Name", "name"]),
                cid,
                phone: opt(get_val(row, &["Phone", "phone"])),
                medical_rights: opt(get_val(row, &["Rights", "rights"])),
                clinic: opt(get_val(row, &["Clinic", "clinic"])),
                house_no: opt(get_val(row, &["HouseNo", "house_no"])),
                moo: opt(moo),
                tumbol: opt(tumbol),
                amphoe: opt(get_val(row, &["Amphoe", "amphoe"])),
                province: opt(get_val(row, &["Province", "province"])),
                hc_zone: Some(zone),
            };

            match self.gateway().insert_patient(new) {
                Ok(_) => summary.created += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "import row rejected by gateway");
                    summary.rejected += 1;
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use crate::store::MemoryGateway;
    use std::sync::Arc;

    fn row(pairs: &[(&str, &str)]) -> ImportRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn hospital() -> Identity {
        Identity::new("clerk", Role::Hospital, None)
    }

    fn service() -> PatientService {
        PatientService::new(Arc::new(MemoryGateway::new()))
    }

    #[test]
    fn creates_rows_and_counts_rejections() {
        let service = service();
        let rows = vec![
            row(&[
                ("HN", "650001"),
                ("Name", "Somchai Test"),
                ("CID", "1100200300401"),
                ("Tumbol", "Tat Kha"),
                ("Moo", "3"),
            ]),
            // Missing CID.
            row(&[("HN", "650002"), ("Name", "No Cid")]),
            // Duplicate HN within the file.
            row(&[
                ("HN", "650001"),
                ("Name", "Duplicate"),
                ("CID", "1100200300402"),
            ]),
        ];

        let summary = service.import_rows(&hospital(), &rows).expect("import");
        assert_eq!(summary, ImportSummary { created: 1, rejected: 2 });

        let created = service.search(&hospital(), Some("650001"), None).unwrap();
        assert_eq!(created.hc_zone.as_deref(), Some("Ban Noi Samakkhi HPH"));
    }

    #[test]
    fn accepts_alternate_header_spellings() {
        let service = service();
        let rows = vec![row(&[
            ("hn", "650003"),
            ("name", "Lower Case"),
            ("cid", "1100200300403"),
            ("zone", "Nong Hin Hospital"),
        ])];

        let summary = service.import_rows(&hospital(), &rows).expect("import");
        assert_eq!(summary.created, 1);
    }

    #[test]
    fn existing_gateway_records_reject_duplicates() {
        let service = service();
        let rows = vec![row(&[
            ("HN", "650001"),
            ("Name", "First"),
            ("CID", "1100200300401"),
        ])];
        service.import_rows(&hospital(), &rows).expect("first import");

        let summary = service.import_rows(&hospital(), &rows).expect("re-import");
        assert_eq!(summary, ImportSummary { created: 0, rejected: 1 });
    }

    #[test]
    fn nan_cells_are_treated_as_blank() {
        let service = service();
        let rows = vec![row(&[
            ("HN", "650001"),
            ("Name", "Somchai Test"),
            ("CID", "1100200300401"),
            ("Zone", "NaN"),
            ("Tumbol", "Puan Phu"),
            ("Moo", "6.0"),
        ])];

        service.import_rows(&hospital(), &rows).expect("import");
        let created = service.search(&hospital(), Some("650001"), None).unwrap();
        assert_eq!(created.hc_zone.as_deref(), Some("Ban Nong Mak Kaeo HPH"));
    }

    #[test]
    fn hc_users_cannot_bulk_import() {
        let service = service();
        let hc = Identity::new("nurse", Role::Hc, Some("zone".into()));
        assert!(service.import_rows(&hc, &[]).is_err());
    }
}
