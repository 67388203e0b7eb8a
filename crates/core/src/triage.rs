//! Deterministic risk classification of vital-sign readings.
//!
//! Two classification policies coexist in this domain and both are deliberate:
//!
//! - [`TriagePolicy::LiveEntry`] drives auto-referral at the moment staff record a
//!   visit. It considers only the confirmatory round-2 blood pressure and the blood
//!   sugar; the round-1 reading is a screening read and is excluded from the decision.
//! - [`TriagePolicy::Reporting`] is used when tabulating completed visits for review
//!   and export. It considers all three inputs, round-1 included.
//!
//! The policy is always selected explicitly by the call site. Classification is pure:
//! the tier is never stored, only re-derived from the stored readings.

use serde::{Deserialize, Serialize};

/// Risk tier, ordered so that `max` picks the worst reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No usable reading.
    None,
    Green,
    Yellow,
    Red,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::None => "none",
            Tier::Green => "green",
            Tier::Yellow => "yellow",
            Tier::Red => "red",
        }
    }

    /// A red or yellow tier triggers automatic referral back to the hospital.
    pub fn requires_referral(&self) -> bool {
        matches!(self, Tier::Red | Tier::Yellow)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One visit's worth of measurements. Absent fields are readings that were not taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalReadings {
    /// Round-1 (screening) systolic blood pressure, mmHg.
    pub sys1: Option<i32>,
    /// Round-1 diastolic. Captured for the record; never part of tier determination.
    pub dia1: Option<i32>,
    /// Round-2 (confirmatory) systolic blood pressure, mmHg.
    pub sys2: Option<i32>,
    /// Round-2 diastolic.
    pub dia2: Option<i32>,
    /// Blood sugar, mg/dL.
    pub blood_sugar: Option<i32>,
}

/// Blood-pressure level from the systolic value alone.
///
/// Diastolic is captured but not used for the tier. This mirrors both the live-entry
/// and reporting paths of the source system, which agree on systolic-only grading.
pub fn bp_level(sys: Option<i32>) -> Tier {
    match sys {
        None | Some(0) => Tier::None,
        Some(s) if s >= 160 => Tier::Red,
        Some(s) if (140..=159).contains(&s) => Tier::Yellow,
        Some(_) => Tier::Green,
    }
}

/// Blood-sugar level.
pub fn sugar_level(value: Option<i32>) -> Tier {
    match value {
        None | Some(0) => Tier::None,
        Some(v) if v >= 160 => Tier::Red,
        Some(v) if v >= 140 => Tier::Yellow,
        Some(_) => Tier::Green,
    }
}

/// Which readings participate in the overall tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriagePolicy {
    /// Worst of {round-2 BP, blood sugar}. Round 1 excluded from the decision.
    LiveEntry,
    /// Worst of {round-1 BP, round-2 BP, blood sugar}.
    Reporting,
}

impl TriagePolicy {
    /// Classify a set of readings under this policy.
    ///
    /// "Worst" ordering: red > yellow > green > none.
    pub fn classify(&self, readings: &VitalReadings) -> Tier {
        let bp2 = bp_level(readings.sys2);
        let sugar = sugar_level(readings.blood_sugar);

        match self {
            TriagePolicy::LiveEntry => bp2.max(sugar),
            TriagePolicy::Reporting => bp_level(readings.sys1).max(bp2).max(sugar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(
        sys1: Option<i32>,
        sys2: Option<i32>,
        blood_sugar: Option<i32>,
    ) -> VitalReadings {
        VitalReadings {
            sys1,
            dia1: sys1.map(|_| 80),
            sys2,
            dia2: sys2.map(|_| 80),
            blood_sugar,
        }
    }

    #[test]
    fn bp_boundaries_hit_the_documented_side() {
        assert_eq!(bp_level(Some(139)), Tier::Green);
        assert_eq!(bp_level(Some(140)), Tier::Yellow);
        assert_eq!(bp_level(Some(159)), Tier::Yellow);
        assert_eq!(bp_level(Some(160)), Tier::Red);
        assert_eq!(bp_level(Some(0)), Tier::None);
        assert_eq!(bp_level(None), Tier::None);
    }

    #[test]
    fn sugar_boundaries_hit_the_documented_side() {
        assert_eq!(sugar_level(Some(139)), Tier::Green);
        assert_eq!(sugar_level(Some(140)), Tier::Yellow);
        assert_eq!(sugar_level(Some(159)), Tier::Yellow);
        assert_eq!(sugar_level(Some(160)), Tier::Red);
        assert_eq!(sugar_level(None), Tier::None);
    }

    #[test]
    fn live_entry_ignores_round_one() {
        // Fixed round 2 and sugar; sweeping round 1 through every band must not move
        // the tier.
        for sys1 in [None, Some(90), Some(145), Some(200)] {
            let tier = TriagePolicy::LiveEntry.classify(&readings(sys1, Some(120), Some(100)));
            assert_eq!(tier, Tier::Green);
        }
    }

    #[test]
    fn reporting_includes_round_one() {
        // sys1 yellow, sys2 green, sugar green: reporting sees yellow, live entry does not.
        let r = readings(Some(150), Some(110), Some(50));
        assert_eq!(TriagePolicy::Reporting.classify(&r), Tier::Yellow);
        assert_eq!(TriagePolicy::LiveEntry.classify(&r), Tier::Green);
    }

    #[test]
    fn worst_reading_wins() {
        let r = readings(None, Some(165), Some(110));
        assert_eq!(TriagePolicy::LiveEntry.classify(&r), Tier::Red);

        let r = readings(None, Some(120), Some(150));
        assert_eq!(TriagePolicy::LiveEntry.classify(&r), Tier::Yellow);
    }

    #[test]
    fn no_readings_yields_none() {
        let r = VitalReadings::default();
        assert_eq!(TriagePolicy::LiveEntry.classify(&r), Tier::None);
        assert_eq!(TriagePolicy::Reporting.classify(&r), Tier::None);
    }

    #[test]
    fn classification_is_pure() {
        let r = readings(Some(150), Some(165), Some(100));
        let first = TriagePolicy::Reporting.classify(&r);
        for _ in 0..10 {
            assert_eq!(TriagePolicy::Reporting.classify(&r), first);
        }
    }
}
