//! Zone roster and scoping.
//!
//! Zones are the community health centers of the referral network. The set is closed
//! configuration data: zones are not created or deleted at runtime. Each patient is
//! owned by exactly one zone, and `hc`-role users are bound to one zone.
//!
//! Scoping here is the authoritative read-path filter: services apply it to every
//! gateway read before results leave the core, so an HC user can never receive
//! another zone's records regardless of what the display layer does.

use crate::patient::Patient;
use crate::session::{Identity, ZoneScope};

/// The closed set of facilities that can own patients.
pub const ZONES: [&str; 6] = [
    "Nong Hin Hospital",
    "Ban Puan Phu HPH",
    "Ban Nong Mak Kaeo HPH",
    "Lak Roi Hok Sip HPH",
    "Chaloem Phra Kiat Health Station",
    "Ban Noi Samakkhi HPH",
];

/// Fallback owner for addresses outside every mapped sub-district.
pub const DEFAULT_ZONE: &str = "Nong Hin Hospital";

/// Moo values arrive from spreadsheets as float strings ("1.0"); keep the integer part.
fn normalize_moo(moo: &str) -> &str {
    let trimmed = moo.trim();
    trimmed.split('.').next().unwrap_or(trimmed)
}

/// Resolve the owning zone from a patient's sub-district (tumbol) and village
/// number (moo).
///
/// This table is the network's catchment-area assignment and is only consulted for
/// imported rows that carry no explicit zone.
pub fn resolve_zone(tumbol: &str, moo: &str) -> &'static str {
    let tumbol = tumbol.trim();
    let moo = normalize_moo(moo);

    match tumbol {
        "Puan Phu" => {
            if matches!(moo, "6" | "7" | "9" | "12" | "15") {
                "Ban Nong Mak Kaeo HPH"
            } else {
                "Ban Puan Phu HPH"
            }
        }
        "Nong Hin" => {
            if moo == "2" {
                "Nong Hin Hospital"
            } else if matches!(moo, "8" | "9" | "10" | "11" | "12" | "14") {
                "Lak Roi Hok Sip HPH"
            } else {
                "Chaloem Phra Kiat Health Station"
            }
        }
        "Tat Kha" => "Ban Noi Samakkhi HPH",
        _ => DEFAULT_ZONE,
    }
}

/// Whether `identity` may see a record owned by `zone`.
pub fn in_zone(identity: &Identity, zone: Option<&str>) -> bool {
    match identity.zone_scope() {
        ZoneScope::All => true,
        ZoneScope::Zone(bound) => zone == Some(bound),
        ZoneScope::Nothing => false,
    }
}

/// Filter a patient list down to what `identity` may see.
pub fn scope_patients(patients: Vec<Patient>, identity: &Identity) -> Vec<Patient> {
    match identity.zone_scope() {
        ZoneScope::All => patients,
        ZoneScope::Zone(bound) => patients
            .into_iter()
            .filter(|p| p.hc_zone.as_deref() == Some(bound))
            .collect(),
        ZoneScope::Nothing => Vec::new(),
    }
}

/// Filter items carrying a patient zone down to what `identity` may see.
///
/// Generic over the item so appointment joins and home-OPD entries share one rule.
pub fn scope_by_zone<T>(items: Vec<T>, identity: &Identity, zone_of: impl Fn(&T) -> Option<&str>) -> Vec<T> {
    match identity.zone_scope() {
        ZoneScope::All => items,
        ZoneScope::Zone(bound) => items
            .into_iter()
            .filter(|item| zone_of(item) == Some(bound))
            .collect(),
        ZoneScope::Nothing => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    fn hc(zone: &str) -> Identity {
        Identity::new("hc-user", Role::Hc, Some(zone.to_string()))
    }

    fn patient_in(zone: &str) -> Patient {
        Patient {
            hc_zone: Some(zone.to_string()),
            ..Patient::sample()
        }
    }

    #[test]
    fn puan_phu_splits_by_village_number() {
        assert_eq!(resolve_zone("Puan Phu", "6"), "Ban Nong Mak Kaeo HPH");
        assert_eq!(resolve_zone("Puan Phu", "15"), "Ban Nong Mak Kaeo HPH");
        assert_eq!(resolve_zone("Puan Phu", "3"), "Ban Puan Phu HPH");
    }

    #[test]
    fn nong_hin_has_three_way_split() {
        assert_eq!(resolve_zone("Nong Hin", "2"), "Nong Hin Hospital");
        assert_eq!(resolve_zone("Nong Hin", "10"), "Lak Roi Hok Sip HPH");
        assert_eq!(resolve_zone("Nong Hin", "1"), "Chaloem Phra Kiat Health Station");
    }

    #[test]
    fn float_string_moo_is_normalized() {
        assert_eq!(resolve_zone("Nong Hin", "2.0"), "Nong Hin Hospital");
        assert_eq!(resolve_zone("Puan Phu", " 7.0 "), "Ban Nong Mak Kaeo HPH");
    }

    #[test]
    fn unknown_tumbol_falls_back_to_hospital() {
        assert_eq!(resolve_zone("Elsewhere", "1"), DEFAULT_ZONE);
    }

    #[test]
    fn hc_user_never_sees_other_zones() {
        let patients = vec![patient_in("Ban Puan Phu HPH"), patient_in("Nong Hin Hospital")];
        let visible = scope_patients(patients, &hc("Ban Puan Phu HPH"));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].hc_zone.as_deref(), Some("Ban Puan Phu HPH"));
    }

    #[test]
    fn hc_user_without_a_zone_binding_sees_nothing() {
        let unbound = Identity::new("nurse", Role::Hc, None);
        let patients = vec![patient_in("Ban Puan Phu HPH"), patient_in("Nong Hin Hospital")];

        assert!(scope_patients(patients, &unbound).is_empty());
        assert!(!in_zone(&unbound, Some("Ban Puan Phu HPH")));
        assert!(!in_zone(&unbound, None));

        let rows = vec![("a", Some("Ban Puan Phu HPH")), ("b", None)];
        assert!(scope_by_zone(rows, &unbound, |(_, zone)| *zone).is_empty());
    }

    #[test]
    fn hospital_user_sees_everything() {
        let identity = Identity::new("clerk", Role::Hospital, None);
        let patients = vec![patient_in("Ban Puan Phu HPH"), patient_in("Nong Hin Hospital")];
        assert_eq!(scope_patients(patients, &identity).len(), 2);
    }
}
